//! Periodic community digest.
//!
//! On a fixed interval, collects the progress updates recorded over a
//! trailing window, groups them by project and broadcasts one summary
//! message to the configured community chat (optionally into a forum
//! topic). A window with no updates sends nothing.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode, ThreadId};

use crate::airtable::AirtableClient;
use crate::core::error::AppResult;
use crate::telegram::Bot;

/// Update texts of one window, grouped per project in the order the
/// projects first appeared (newest activity first).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DigestContent {
    pub updates_by_project: Vec<(String, Vec<String>)>,
}

impl DigestContent {
    pub fn is_empty(&self) -> bool {
        self.updates_by_project.is_empty()
    }
}

/// Fetches the window's updates and resolves each to its project name.
///
/// Project names are resolved once per distinct project; an update whose
/// link cannot be resolved is skipped with a warning rather than failing
/// the whole digest.
pub async fn collect_digest(client: &AirtableClient, window_days: i64) -> AppResult<DigestContent> {
    let cutoff = (Utc::now() - Duration::days(window_days))
        .format("%Y-%m-%dT%H:%M:%SZ")
        .to_string();
    log::info!("Collecting digest updates since {}", cutoff);

    let updates = client.updates_since(&cutoff).await?;

    let mut name_cache: HashMap<String, String> = HashMap::new();
    let mut content = DigestContent::default();

    for update in updates {
        let Some(project_id) = update.fields.project_id() else {
            log::warn!("Update {} has no linked project, skipping", update.id);
            continue;
        };

        let name = match name_cache.get(project_id) {
            Some(name) => name.clone(),
            None => match client.get_project(project_id).await {
                Ok(project) => {
                    let name = project
                        .fields
                        .name
                        .unwrap_or_else(|| "Unknown project".to_string());
                    name_cache.insert(project_id.to_string(), name.clone());
                    name
                }
                Err(e) => {
                    log::warn!("Could not resolve project {} for digest: {}", project_id, e);
                    continue;
                }
            },
        };

        let text = update
            .fields
            .update_text
            .unwrap_or_else(|| "No details.".to_string());

        match content.updates_by_project.iter_mut().find(|(n, _)| *n == name) {
            Some((_, texts)) => texts.push(text),
            None => content.updates_by_project.push((name, vec![text])),
        }
    }

    Ok(content)
}

/// Renders the digest broadcast. Returns `None` when the window had no
/// updates, in which case nothing should be sent.
pub fn format_digest_message(content: &DigestContent) -> Option<String> {
    if content.is_empty() {
        return None;
    }

    let mut message = String::from("*Weekly Project Digest!*\n\n*Recent Updates:*\n");
    for (project_name, updates) in &content.updates_by_project {
        message.push_str(&format!("*{}:*\n", project_name));
        for update in updates {
            message.push_str(&format!("  - {}\n", truncate_summary(update, 150)));
        }
        message.push('\n');
    }
    message.push_str("Remember to update your progress via the bot! `/updateproject`");

    Some(message)
}

/// Cuts an update text to at most `limit` characters, appending an
/// ellipsis when anything was dropped.
fn truncate_summary(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let cut: String = text.chars().take(limit).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

/// Broadcasts the digest on a schedule.
pub struct DigestReporter {
    bot: Bot,
    chat_id: ChatId,
    topic_id: Option<i32>,
    airtable: Arc<AirtableClient>,
    window_days: i64,
}

impl DigestReporter {
    pub fn new(
        bot: Bot,
        chat_id: ChatId,
        topic_id: Option<i32>,
        airtable: Arc<AirtableClient>,
        window_days: i64,
    ) -> Self {
        Self {
            bot,
            chat_id,
            topic_id,
            airtable,
            window_days,
        }
    }

    /// Collects, formats and sends one digest. A quiet window is a
    /// no-op, not an error.
    pub async fn send_digest(&self) -> AppResult<()> {
        let content = collect_digest(&self.airtable, self.window_days).await?;

        let Some(message) = format_digest_message(&content) else {
            log::info!("No updates in the last {} days, skipping digest", self.window_days);
            return Ok(());
        };

        let mut request = self
            .bot
            .send_message(self.chat_id, &message)
            .parse_mode(ParseMode::Markdown);
        if let Some(topic_id) = self.topic_id {
            request = request.message_thread_id(ThreadId(MessageId(topic_id)));
        }
        request.await?;

        log::info!(
            "Sent digest covering {} projects to chat {}",
            content.updates_by_project.len(),
            self.chat_id.0
        );
        Ok(())
    }
}

/// Starts the digest background task, sending every `interval_hours`.
pub fn start_digest_scheduler(
    bot: Bot,
    chat_id: ChatId,
    topic_id: Option<i32>,
    airtable: Arc<AirtableClient>,
    interval_hours: u64,
    window_days: i64,
) -> Arc<DigestReporter> {
    let reporter = Arc::new(DigestReporter::new(bot, chat_id, topic_id, airtable, window_days));

    let reporter_clone = Arc::clone(&reporter);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(interval_hours * 3600));

        // Skip the first immediate tick
        interval.tick().await;

        loop {
            interval.tick().await;

            if let Err(e) = reporter_clone.send_digest().await {
                log::error!("Digest error: {}", e);
            }
        }
    });

    log::info!(
        "Digest scheduler started (every {} hours, {}-day window, chat {})",
        interval_hours,
        window_days,
        chat_id.0
    );

    reporter
}
