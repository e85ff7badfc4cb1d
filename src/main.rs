use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::update_listeners::Polling;

use loopbot::airtable::AirtableClient;
use loopbot::core::{config, init_logger, log_startup_configuration};
use loopbot::digest::start_digest_scheduler;
use loopbot::session::{ConflictPolicy, InMemorySessionStore, SessionStore};
use loopbot::telegram::{create_bot, run_webhook, schema, setup_bot_commands, HandlerDeps};

/// Main entry point for the Telegram bot
///
/// # Errors
/// Returns an error if initialization fails (logging, bot creation,
/// Airtable configuration).
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();

    // Initialize logger (console + file)
    init_logger(&config::LOG_FILE_PATH)?;
    log_startup_configuration();

    let bot = create_bot()?;

    let bot_info = bot.get_me().await?;
    log::info!("Bot username: {:?}, Bot ID: {}", bot_info.username, bot_info.id);

    setup_bot_commands(&bot).await?;

    let airtable = Arc::new(AirtableClient::from_env()?);
    let sessions: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new());
    let conflict_policy = ConflictPolicy::from_env();

    // Start the periodic digest broadcast if a target chat is configured
    if *config::digest::INTERVAL_HOURS == 0 {
        log::info!("Digest disabled (DIGEST_INTERVAL_HOURS=0)");
    } else if let Some(chat_id) = *config::digest::CHAT_ID {
        let _digest = start_digest_scheduler(
            bot.clone(),
            ChatId(chat_id),
            *config::digest::TOPIC_ID,
            Arc::clone(&airtable),
            *config::digest::INTERVAL_HOURS,
            *config::digest::WINDOW_DAYS,
        );
    } else {
        log::info!("Digest disabled (DIGEST_CHAT_ID not set)");
    }

    let handler = schema(HandlerDeps::new(airtable, sessions, conflict_policy));

    match config::WEBHOOK_URL.clone() {
        Some(url) => {
            log::info!("Starting bot in webhook mode at {}", url);
            run_webhook(bot, handler, &url).await?;
        }
        None => {
            log::info!("Starting bot in long polling mode");

            // Drop the stale webhook registration, if any, then poll
            let _ = bot.delete_webhook().await;
            let listener = Polling::builder(bot.clone()).drop_pending_updates().build();

            Dispatcher::builder(bot, handler)
                .enable_ctrlc_handler()
                .build()
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the update listener"),
                )
                .await;
        }
    }

    log::info!("Bot shut down gracefully");
    Ok(())
}
