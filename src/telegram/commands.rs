//! Command endpoints.

use teloxide::prelude::*;
use teloxide::types::{Message, ParseMode};

use crate::flow::{prompt_for, Session};
use crate::telegram::handlers::{participant_from, HandlerDeps, HandlerError};
use crate::telegram::render::{self, send_prompt};
use crate::telegram::Bot;

fn participant_id(msg: &Message) -> Option<i64> {
    msg.from.as_ref().and_then(|user| participant_from(user.id.0))
}

/// Enforces the configured session conflict policy at a flow entry
/// point. Under `Replace` the caller may overwrite the session; under
/// `RequireCancel` an active session blocks the new flow.
pub async fn flow_entry_allowed(
    bot: &Bot,
    deps: &HandlerDeps,
    chat_id: ChatId,
    participant: i64,
) -> Result<bool, HandlerError> {
    if !deps.conflict_policy.allows_new_flow(deps.sessions.get(participant).is_some()) {
        bot.send_message(
            chat_id,
            "You're in the middle of another operation. Send /cancel to abandon it first.",
        )
        .await?;
        return Ok(false);
    }
    Ok(true)
}

pub async fn start(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    let first_name = msg
        .from
        .as_ref()
        .map(|user| user.first_name.clone())
        .unwrap_or_else(|| "there".to_string());
    log::info!("User {:?} started the bot", participant_id(msg));
    bot.send_message(
        msg.chat.id,
        format!(
            "Hi {}! I'm the Project Tracker bot. Use /newproject to create a new project, or /help to see all commands.",
            first_name
        ),
    )
    .await?;
    Ok(())
}

pub async fn help(bot: &Bot, msg: &Message) -> Result<(), HandlerError> {
    let help_text = "*Available Commands:*\n\n\
                     /newproject - Create a new project\n\
                     /updateproject - Update an existing project\n\
                     /myprojects - View your projects\n\
                     /searchprojects - Search for projects\n\
                     /help - Show this help message\n\
                     /cancel - Cancel current operation";
    bot.send_message(msg.chat.id, help_text)
        .parse_mode(ParseMode::Markdown)
        .await?;
    Ok(())
}

/// `/newproject` — enters the creation flow.
pub async fn new_project(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(participant) = participant_id(msg) else {
        return Ok(());
    };
    if !flow_entry_allowed(bot, deps, msg.chat.id, participant).await? {
        return Ok(());
    }

    let session = Session::new_project();
    let prompt = prompt_for(session.state);
    deps.sessions.put(participant, session);
    send_prompt(bot, msg.chat.id, &prompt).await?;
    Ok(())
}

/// `/updateproject` — enters the update flow with a project picker.
pub async fn update_project(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(participant) = participant_id(msg) else {
        return Ok(());
    };
    if !flow_entry_allowed(bot, deps, msg.chat.id, participant).await? {
        return Ok(());
    }

    let projects = match deps.airtable.projects_by_owner(&participant.to_string()).await {
        Ok(projects) => projects,
        Err(e) => {
            log::error!("Could not list projects for {}: {}", participant, e);
            bot.send_message(msg.chat.id, "Sorry, I couldn't load your projects. Please try again later.")
                .await?;
            return Ok(());
        }
    };

    if projects.is_empty() {
        bot.send_message(
            msg.chat.id,
            "You don't have any projects to update. Use /newproject to create one first.",
        )
        .await?;
        return Ok(());
    }

    let session = Session::update_choosing();
    let prompt = prompt_for(session.state);
    deps.sessions.put(participant, session);
    bot.send_message(msg.chat.id, prompt.text)
        .reply_markup(render::project_select_keyboard(&projects))
        .await?;
    Ok(())
}

/// `/myprojects` — lists the participant's projects with per-project
/// update/view buttons.
pub async fn my_projects(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(participant) = participant_id(msg) else {
        return Ok(());
    };

    let projects = match deps.airtable.projects_by_owner(&participant.to_string()).await {
        Ok(projects) => projects,
        Err(e) => {
            log::error!("Could not list projects for {}: {}", participant, e);
            bot.send_message(msg.chat.id, "Sorry, I couldn't load your projects. Please try again later.")
                .await?;
            return Ok(());
        }
    };

    if projects.is_empty() {
        bot.send_message(
            msg.chat.id,
            "You don't have any projects yet. Use /newproject to create one!",
        )
        .await?;
        return Ok(());
    }

    let text = render::format_project_list(&projects);
    let keyboard = render::project_list_keyboard(&projects);
    match bot
        .send_message(msg.chat.id, &text)
        .parse_mode(ParseMode::Markdown)
        .reply_markup(keyboard.clone())
        .await
    {
        Ok(_) => {}
        Err(e) => {
            log::warn!("Markdown send failed ({}), retrying as plain text", e);
            bot.send_message(msg.chat.id, &text).reply_markup(keyboard).await?;
        }
    }
    Ok(())
}

/// `/searchprojects` — enters the search flow.
pub async fn search_projects(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(participant) = participant_id(msg) else {
        return Ok(());
    };
    if !flow_entry_allowed(bot, deps, msg.chat.id, participant).await? {
        return Ok(());
    }

    let session = Session::search();
    let prompt = prompt_for(session.state);
    deps.sessions.put(participant, session);
    send_prompt(bot, msg.chat.id, &prompt).await?;
    Ok(())
}

/// `/cancel` — discards whatever flow is active.
pub async fn cancel(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> Result<(), HandlerError> {
    let Some(participant) = participant_id(msg) else {
        return Ok(());
    };

    if deps.sessions.remove(participant).is_some() {
        log::info!("User {} cancelled their active flow", participant);
        bot.send_message(msg.chat.id, "Operation cancelled.").await?;
    } else {
        bot.send_message(msg.chat.id, "Nothing to cancel.").await?;
    }
    Ok(())
}
