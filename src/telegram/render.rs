//! Message and keyboard rendering.
//!
//! Everything user-visible is assembled here: prompt keyboards, the
//! project list with its per-project buttons, the project summary view
//! and search result messages. Callback data is `prefix + payload`;
//! the prefixes below are the single source of truth for both building
//! buttons and parsing presses.

use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, ParseMode};

use crate::airtable::{ProjectFields, Record, UpdateFields};
use crate::core::config;
use crate::flow::{FlowState, Prompt, PromptKeyboard, Stage};
use crate::telegram::Bot;

/// Stage pick in the creation flow, payload is the stage label.
pub const STAGE_PREFIX: &str = "stage_";
/// Skip button on a free-text search criterion.
pub const SEARCH_SKIP: &str = "search_skip";
/// Stage pick in the search flow, payload is a stage label or `any`.
pub const SEARCH_STAGE_PREFIX: &str = "search_stage_";
/// Project pick in the update flow, payload is the record key.
pub const SELECT_PROJECT_PREFIX: &str = "selectproject_";
/// Per-project update button on the project list.
pub const UPDATE_PROJECT_PREFIX: &str = "updateproject_";
/// Per-project view button on the project list.
pub const VIEW_PROJECT_PREFIX: &str = "viewproject_";

fn stage_buttons(prefix: &str) -> Vec<InlineKeyboardButton> {
    Stage::ALL
        .into_iter()
        .map(|stage| InlineKeyboardButton::callback(stage.as_str(), format!("{}{}", prefix, stage.as_str())))
        .collect()
}

/// Renders the inline markup an engine prompt asked for.
pub fn keyboard_markup(keyboard: PromptKeyboard) -> InlineKeyboardMarkup {
    match keyboard {
        PromptKeyboard::StageSelect => InlineKeyboardMarkup::new(vec![stage_buttons(STAGE_PREFIX)]),
        PromptKeyboard::SearchSkip => {
            InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback("Skip", SEARCH_SKIP)]])
        }
        PromptKeyboard::SearchStageSelect => InlineKeyboardMarkup::new(vec![
            stage_buttons(SEARCH_STAGE_PREFIX),
            vec![InlineKeyboardButton::callback(
                "Any Status",
                format!("{}any", SEARCH_STAGE_PREFIX),
            )],
        ]),
    }
}

/// Sends an engine prompt, attaching its keyboard when it has one.
pub async fn send_prompt(bot: &Bot, chat_id: ChatId, prompt: &Prompt) -> Result<(), teloxide::RequestError> {
    let request = bot.send_message(chat_id, &prompt.text);
    match prompt.keyboard {
        Some(keyboard) => request.reply_markup(keyboard_markup(keyboard)).await?,
        None => request.await?,
    };
    Ok(())
}

/// Confirmation a stage button press is edited into.
pub fn stage_ack_text(stage: &str) -> String {
    format!("Project stage set to: {}", stage)
}

/// Confirmation a search status button press is edited into.
pub fn search_stage_ack_text(choice: &str) -> String {
    if choice == "any" {
        "Status filter skipped (any status).".to_string()
    } else {
        format!("Status filter set to: {}", choice)
    }
}

/// Confirmation a skip button press is edited into. `None` for states
/// whose prompt carries no skip button.
pub fn skip_ack_text(state: FlowState) -> Option<String> {
    match state {
        FlowState::AwaitingKeyword => Some("Keyword skipped.".to_string()),
        FlowState::AwaitingStackFilter => Some("Stack filter skipped.".to_string()),
        _ => None,
    }
}

/// The project picker press edits its message straight into the
/// progress prompt.
pub fn project_selection_text(name: &str, progress_prompt: &str) -> String {
    format!("Updating '{}'. {}", name, progress_prompt)
}

/// One button per project, for the update flow's project choice.
pub fn project_select_keyboard(projects: &[Record<ProjectFields>]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = projects
        .iter()
        .map(|project| {
            let name = project.fields.name.as_deref().unwrap_or("Unnamed Project");
            vec![InlineKeyboardButton::callback(
                name,
                format!("{}{}", SELECT_PROJECT_PREFIX, project.id),
            )]
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// Update/view button pair per project, for `/myprojects`.
pub fn project_list_keyboard(projects: &[Record<ProjectFields>]) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = projects
        .iter()
        .map(|project| {
            let name = project.fields.name.as_deref().unwrap_or("Project");
            vec![
                InlineKeyboardButton::callback(
                    format!("📝 Update {}", name),
                    format!("{}{}", UPDATE_PROJECT_PREFIX, project.id),
                ),
                InlineKeyboardButton::callback(
                    format!("👁 View {}", name),
                    format!("{}{}", VIEW_PROJECT_PREFIX, project.id),
                ),
            ]
        })
        .collect();
    InlineKeyboardMarkup::new(rows)
}

/// The numbered `/myprojects` listing.
pub fn format_project_list(projects: &[Record<ProjectFields>]) -> String {
    let mut message = String::from("Here are your projects:\n\n");
    for (i, project) in projects.iter().enumerate() {
        let fields = &project.fields;
        message.push_str(&format!(
            "{}. {}\n   Status: {}\n   {}\n\n",
            i + 1,
            fields.name.as_deref().unwrap_or("Unnamed Project"),
            fields.status.as_deref().unwrap_or("N/A"),
            fields.one_liner.as_deref().unwrap_or("")
        ));
    }
    message
}

fn field_or<'a>(value: &'a Option<String>, default: &'a str) -> &'a str {
    value.as_deref().filter(|v| !v.is_empty()).unwrap_or(default)
}

/// The single-project detail view, including its most recent updates.
pub fn format_project_view(project: &ProjectFields, updates: &[Record<UpdateFields>]) -> String {
    let mut message = format!(
        "📋 *{}*\n_{}_\n\n*Status:* {}\n*Tech Stack:* {}\n*Help Needed:* {}\n*GitHub/Demo Link:* {}",
        field_or(&project.name, "N/A"),
        field_or(&project.one_liner, "No tagline provided."),
        field_or(&project.status, "N/A"),
        field_or(&project.stack, "Not specified."),
        field_or(&project.help_needed, "None specified."),
        field_or(&project.github_demo, "No link provided."),
    );

    message.push_str("\n\n*Recent Updates:*\n");
    if updates.is_empty() {
        message.push_str("\nNo updates yet.");
    } else {
        for update in updates.iter().take(config::VIEW_RECENT_UPDATES) {
            let fields = &update.fields;
            message.push_str(&format!(
                "\n📅 {}\nProgress: {}\n",
                field_or(&fields.timestamp, "No date"),
                field_or(&fields.update_text, "No update"),
            ));
            if let Some(blockers) = fields.blockers.as_deref().filter(|b| !b.is_empty()) {
                message.push_str(&format!("Blockers: {}\n", blockers));
            }
        }
    }

    message
}

/// The search result listing, capped with an "...and N more" trailer.
pub fn format_search_results(results: &[Record<ProjectFields>]) -> String {
    if results.is_empty() {
        return "No projects found matching your criteria.".to_string();
    }

    let mut message = String::from("*Search Results:*\n\n");
    for project in results.iter().take(config::SEARCH_RESULT_LIMIT) {
        let fields = &project.fields;
        message.push_str(&format!(
            "- *{}* ({})\n  _Stack:_ {}\n  _Tagline:_ {}\n\n",
            fields.name.as_deref().unwrap_or("N/A"),
            fields.status.as_deref().unwrap_or("N/A"),
            fields.stack.as_deref().unwrap_or("N/A"),
            fields.one_liner.as_deref().unwrap_or("")
        ));
    }

    if results.len() > config::SEARCH_RESULT_LIMIT {
        message.push_str(&format!(
            "\n...and {} more. Consider refining your search.",
            results.len() - config::SEARCH_RESULT_LIMIT
        ));
    }

    message
}

/// Sends a Markdown-formatted message, falling back to plain text when
/// Telegram rejects the entity parse (user content can break Markdown).
pub async fn send_markdown(bot: &Bot, chat_id: ChatId, text: &str) -> Result<(), teloxide::RequestError> {
    match bot.send_message(chat_id, text).parse_mode(ParseMode::Markdown).await {
        Ok(_) => Ok(()),
        Err(e) => {
            log::warn!("Markdown send failed ({}), retrying as plain text", e);
            bot.send_message(chat_id, text).await?;
            Ok(())
        }
    }
}
