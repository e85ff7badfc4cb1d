//! The dispatcher schema: command, message and callback routing.
//!
//! The handler tree translates Telegram updates into engine [`Answer`]s
//! and renders the resulting prompts back out. It is built as a plain
//! function over [`HandlerDeps`] so integration tests can drive the
//! exact tree production uses.

use std::sync::Arc;

use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, Message, MessageId};

use crate::airtable::AirtableClient;
use crate::flow::{advance, prompt_for, Answer, Draft, Session, StepOutcome, UpdateDraft};
use crate::session::{ConflictPolicy, SessionStore};
use crate::submit::{submit_project, submit_update};
use crate::telegram::bot::Command;
use crate::telegram::render::{
    self, send_markdown, send_prompt, SEARCH_SKIP, SEARCH_STAGE_PREFIX, SELECT_PROJECT_PREFIX, STAGE_PREFIX,
    UPDATE_PROJECT_PREFIX, VIEW_PROJECT_PREFIX,
};
use crate::telegram::{commands, Bot};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Telegram user ids are u64 on the wire; the datastore keys owners by
/// i64.
pub(crate) fn participant_from(user_id: u64) -> Option<i64> {
    i64::try_from(user_id).ok()
}

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub airtable: Arc<AirtableClient>,
    pub sessions: Arc<dyn SessionStore>,
    pub conflict_policy: ConflictPolicy,
}

impl HandlerDeps {
    pub fn new(airtable: Arc<AirtableClient>, sessions: Arc<dyn SessionStore>, conflict_policy: ConflictPolicy) -> Self {
        Self {
            airtable,
            sessions,
            conflict_policy,
        }
    }
}

/// Creates the main dispatcher schema for the bot.
///
/// The same tree is used in production and in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callbacks = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callbacks))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                match cmd {
                    Command::Start => commands::start(&bot, &msg).await?,
                    Command::Help => commands::help(&bot, &msg).await?,
                    Command::NewProject => commands::new_project(&bot, &msg, &deps).await?,
                    Command::UpdateProject => commands::update_project(&bot, &msg, &deps).await?,
                    Command::MyProjects => commands::my_projects(&bot, &msg, &deps).await?,
                    Command::SearchProjects => commands::search_projects(&bot, &msg, &deps).await?,
                    Command::Cancel => commands::cancel(&bot, &msg, &deps).await?,
                }
                Ok(())
            }
        })
}

/// Free-text (and non-text) replies feed the active session. A message
/// from a participant with no session is ignored.
fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let deps = deps.clone();
        async move {
            let Some(participant) = msg.from.as_ref().and_then(|user| participant_from(user.id.0)) else {
                return Ok(());
            };

            if deps.sessions.get(participant).is_none() {
                log::debug!("Message from {} with no active session, ignoring", participant);
                return Ok(());
            }

            let answer = match msg.text() {
                Some(text) => Answer::Text(text.to_string()),
                None => Answer::Unsupported,
            };
            handle_answer(&bot, &deps, msg.chat.id, participant, answer).await?;
            Ok(())
        }
    })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            bot.answer_callback_query(q.id.clone()).await?;

            let Some(data) = q.data.as_deref() else {
                return Ok(());
            };
            let Some((chat_id, message_id)) = q.message.as_ref().map(|m| (m.chat().id, m.id())) else {
                log::debug!("Callback '{}' without an originating message, ignoring", data);
                return Ok(());
            };
            let Some(participant) = participant_from(q.from.id.0) else {
                return Ok(());
            };

            if let Some(project_id) = data.strip_prefix(UPDATE_PROJECT_PREFIX) {
                start_targeted_update(&bot, &deps, chat_id, participant, project_id).await?;
            } else if let Some(project_id) = data.strip_prefix(VIEW_PROJECT_PREFIX) {
                show_project_view(&bot, &deps, chat_id, project_id).await?;
            } else if let Some(project_id) = data.strip_prefix(SELECT_PROJECT_PREFIX) {
                handle_project_selection(&bot, &deps, chat_id, message_id, participant, project_id).await?;
            } else if let Some(stage) = data.strip_prefix(SEARCH_STAGE_PREFIX) {
                ack_selection(&bot, &deps, chat_id, message_id, participant, render::search_stage_ack_text(stage)).await;
                handle_answer(&bot, &deps, chat_id, participant, Answer::Choice(stage.to_string())).await?;
            } else if data == SEARCH_SKIP {
                if let Some(text) = deps
                    .sessions
                    .get(participant)
                    .and_then(|session| render::skip_ack_text(session.state))
                {
                    ack_selection(&bot, &deps, chat_id, message_id, participant, text).await;
                }
                handle_answer(&bot, &deps, chat_id, participant, Answer::Choice("skip".to_string())).await?;
            } else if let Some(stage) = data.strip_prefix(STAGE_PREFIX) {
                ack_selection(&bot, &deps, chat_id, message_id, participant, render::stage_ack_text(stage)).await;
                handle_answer(&bot, &deps, chat_id, participant, Answer::Choice(stage.to_string())).await?;
            } else {
                log::warn!("Unknown callback data: {}", data);
            }

            Ok(())
        }
    })
}

/// Edits a button-bearing message into a selection confirmation, which
/// also retires its inline keyboard. No-op without an active session;
/// a failed edit is logged, not fatal.
async fn ack_selection(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    message_id: MessageId,
    participant: i64,
    text: String,
) {
    if deps.sessions.get(participant).is_none() {
        return;
    }
    if let Err(e) = bot.edit_message_text(chat_id, message_id, text).await {
        log::debug!("Could not edit selection message: {}", e);
    }
}

/// The project picker press: records the choice and edits the picker
/// message straight into the progress prompt, the keyboard with it.
async fn handle_project_selection(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    message_id: MessageId,
    participant: i64,
    project_id: &str,
) -> Result<(), HandlerError> {
    let Some(mut session) = deps.sessions.get(participant) else {
        log::debug!("Project selection from {} with no active session, ignoring", participant);
        return Ok(());
    };

    match advance(&mut session, Answer::Choice(project_id.to_string())) {
        StepOutcome::Next(prompt) => {
            deps.sessions.put(participant, session);
            let name = match deps.airtable.get_project(project_id).await {
                Ok(project) => project.fields.name.unwrap_or_else(|| "this project".to_string()),
                Err(e) => {
                    log::warn!("Could not load project {} for selection: {}", project_id, e);
                    "this project".to_string()
                }
            };
            let text = render::project_selection_text(&name, &prompt.text);
            if let Err(e) = bot.edit_message_text(chat_id, message_id, &text).await {
                log::warn!("Could not edit picker message ({}), sending instead", e);
                bot.send_message(chat_id, &text).await?;
            }
        }
        StepOutcome::Reprompt { error, prompt } => {
            deps.sessions.put(participant, session);
            bot.send_message(chat_id, format!("⚠️ {}", error)).await?;
            send_prompt(bot, chat_id, &prompt).await?;
        }
        StepOutcome::Complete(draft) => {
            deps.sessions.remove(participant);
            complete_flow(bot, deps, chat_id, participant, draft).await?;
        }
    }
    Ok(())
}

/// The per-project "📝 Update" button: jumps straight into the update
/// flow for that project, skipping the choose step.
async fn start_targeted_update(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    participant: i64,
    project_id: &str,
) -> Result<(), HandlerError> {
    if !commands::flow_entry_allowed(bot, deps, chat_id, participant).await? {
        return Ok(());
    }

    let project_name = match deps.airtable.get_project(project_id).await {
        Ok(project) => project.fields.name,
        Err(e) => {
            log::error!("Could not load project {} for update: {}", project_id, e);
            bot.send_message(chat_id, "❌ Error: Project not found. Please try /myprojects again.")
                .await?;
            return Ok(());
        }
    };

    let session = Session::update_targeted(project_id.to_string(), project_name);
    let prompt = prompt_for(session.state);
    deps.sessions.put(participant, session);
    send_prompt(bot, chat_id, &prompt).await?;
    Ok(())
}

/// The per-project "👁 View" button: project summary plus its most
/// recent updates and an inline update shortcut.
async fn show_project_view(bot: &Bot, deps: &HandlerDeps, chat_id: ChatId, project_id: &str) -> Result<(), HandlerError> {
    let project = match deps.airtable.get_project(project_id).await {
        Ok(project) => project,
        Err(e) => {
            log::error!("Could not load project {} for view: {}", project_id, e);
            bot.send_message(chat_id, "❌ Error: Project not found. Please try /myprojects again.")
                .await?;
            return Ok(());
        }
    };
    let updates = deps.airtable.updates_for_project(project_id).await.unwrap_or_else(|e| {
        log::warn!("Could not load updates for project {}: {}", project_id, e);
        Vec::new()
    });

    let text = render::format_project_view(&project.fields, &updates);
    let keyboard = teloxide::types::InlineKeyboardMarkup::new(vec![vec![
        teloxide::types::InlineKeyboardButton::callback(
            "📝 Update Project",
            format!("{}{}", UPDATE_PROJECT_PREFIX, project_id),
        ),
    ]]);

    match bot
        .send_message(chat_id, &text)
        .parse_mode(teloxide::types::ParseMode::Markdown)
        .reply_markup(keyboard.clone())
        .await
    {
        Ok(_) => {}
        Err(e) => {
            log::warn!("Markdown send failed ({}), retrying as plain text", e);
            bot.send_message(chat_id, &text).reply_markup(keyboard).await?;
        }
    }
    Ok(())
}

/// Feeds one answer to the participant's session and acts on the
/// outcome. Sessions are written back on every accepted step and
/// removed before any submission I/O starts.
pub async fn handle_answer(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    participant: i64,
    answer: Answer,
) -> Result<(), HandlerError> {
    let Some(mut session) = deps.sessions.get(participant) else {
        log::debug!("Answer from {} with no active session, ignoring", participant);
        return Ok(());
    };

    match advance(&mut session, answer) {
        StepOutcome::Next(prompt) => {
            deps.sessions.put(participant, session);
            send_prompt(bot, chat_id, &prompt).await?;
        }
        StepOutcome::Reprompt { error, prompt } => {
            deps.sessions.put(participant, session);
            bot.send_message(chat_id, format!("⚠️ {}", error)).await?;
            send_prompt(bot, chat_id, &prompt).await?;
        }
        StepOutcome::Complete(draft) => {
            deps.sessions.remove(participant);
            complete_flow(bot, deps, chat_id, participant, draft).await?;
        }
    }

    Ok(())
}

async fn complete_flow(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    participant: i64,
    draft: Draft,
) -> Result<(), HandlerError> {
    match draft {
        Draft::Project(draft) => {
            let name = draft.name.clone().unwrap_or_default();
            match submit_project(&deps.airtable, participant, &draft).await {
                Ok(_) => {
                    bot.send_message(chat_id, format!("Project '{}' created successfully!", name))
                        .await?;
                }
                Err(e) => {
                    log::error!("Project creation failed for {}: {}", participant, e);
                    bot.send_message(
                        chat_id,
                        "Sorry, there was an error creating your project. Please try again later.",
                    )
                    .await?;
                }
            }
        }
        Draft::Update(draft) => {
            let name = resolve_update_name(deps, &draft).await;
            match submit_update(&deps.airtable, participant, &draft).await {
                Ok(_) => {
                    bot.send_message(chat_id, format!("Update for '{}' saved successfully!", name))
                        .await?;
                }
                Err(e) => {
                    log::error!("Update submission failed for {}: {}", participant, e);
                    bot.send_message(chat_id, "Sorry, there was an error saving your update. Please try again.")
                        .await?;
                }
            }
        }
        Draft::Search(criteria) => {
            if !criteria.has_criteria() {
                bot.send_message(
                    chat_id,
                    "No search criteria provided. Please try again with at least one filter.",
                )
                .await?;
                return Ok(());
            }
            match deps.airtable.search_projects(&criteria).await {
                Ok(results) => {
                    send_markdown(bot, chat_id, &render::format_search_results(&results)).await?;
                }
                Err(e) => {
                    log::error!("Project search failed for {}: {}", participant, e);
                    bot.send_message(chat_id, "Sorry, the search failed. Please try again later.")
                        .await?;
                }
            }
        }
    }
    Ok(())
}

/// Display name for the update confirmation. The draft carries the name
/// when the flow started from a project button; otherwise one lookup.
async fn resolve_update_name(deps: &HandlerDeps, draft: &UpdateDraft) -> String {
    if let Some(name) = draft.project_name.clone() {
        return name;
    }
    if let Some(project_id) = draft.project_id.as_deref() {
        if let Ok(project) = deps.airtable.get_project(project_id).await {
            if let Some(name) = project.fields.name {
                return name;
            }
        }
    }
    "your project".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_from_rejects_out_of_range_ids() {
        assert_eq!(participant_from(42), Some(42));
        assert_eq!(participant_from(i64::MAX as u64), Some(i64::MAX));
        assert_eq!(participant_from(u64::MAX), None);
    }
}
