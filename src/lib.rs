//! Loophole Project Tracker bot.
//!
//! A Telegram bot that lets community members self-report project
//! status into an Airtable base: guided project creation, weekly
//! progress updates, per-member project listings, project search and a
//! scheduled community digest.

pub mod airtable;
pub mod core;
pub mod digest;
pub mod flow;
pub mod session;
pub mod submit;
pub mod telegram;

// Re-exports for convenience
pub use crate::core::{init_logger, log_startup_configuration, AppError, AppResult};
