use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Bot token
/// Read from BOT_TOKEN or TELOXIDE_TOKEN environment variable
pub static BOT_TOKEN: Lazy<String> = Lazy::new(|| {
    env::var("BOT_TOKEN")
        .or_else(|_| env::var("TELOXIDE_TOKEN"))
        .unwrap_or_else(|_| String::new())
});

/// Public base URL Telegram delivers webhook updates to
/// Read from WEBHOOK_URL environment variable
/// When unset the bot falls back to long polling (local development)
pub static WEBHOOK_URL: Lazy<Option<String>> = Lazy::new(|| env::var("WEBHOOK_URL").ok());

/// Port the webhook/liveness HTTP server listens on
/// Read from PORT environment variable
/// Default: 8080
pub static PORT: Lazy<u16> = Lazy::new(|| {
    env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(8080)
});

/// Log file path
/// Read from LOG_FILE_PATH environment variable
/// Default: bot.log
pub static LOG_FILE_PATH: Lazy<String> =
    Lazy::new(|| env::var("LOG_FILE_PATH").unwrap_or_else(|_| "bot.log".to_string()));

/// Airtable configuration
pub mod airtable {
    use once_cell::sync::Lazy;
    use std::env;
    use std::time::Duration;

    /// Airtable API key (bearer credential)
    pub static API_KEY: Lazy<String> =
        Lazy::new(|| env::var("AIRTABLE_API_KEY").unwrap_or_else(|_| String::new()));

    /// Airtable base identifier
    pub static BASE_ID: Lazy<String> =
        Lazy::new(|| env::var("AIRTABLE_BASE_ID").unwrap_or_else(|_| String::new()));

    /// Projects table name
    pub static PROJECTS_TABLE: Lazy<String> =
        Lazy::new(|| env::var("AIRTABLE_PROJECTS_TABLE").unwrap_or_else(|_| "Projects".to_string()));

    /// Updates table name
    pub static UPDATES_TABLE: Lazy<String> =
        Lazy::new(|| env::var("AIRTABLE_UPDATES_TABLE").unwrap_or_else(|_| "Updates".to_string()));

    /// Request timeout for Airtable REST calls (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Digest broadcast configuration
pub mod digest {
    use once_cell::sync::Lazy;
    use std::env;

    /// Chat the periodic digest is posted to
    /// Read from DIGEST_CHAT_ID environment variable
    /// When unset the digest job is not started
    pub static CHAT_ID: Lazy<Option<i64>> =
        Lazy::new(|| env::var("DIGEST_CHAT_ID").ok().and_then(|v| v.parse::<i64>().ok()));

    /// Forum topic thread the digest is posted into (optional)
    /// Read from DIGEST_TOPIC_ID environment variable
    pub static TOPIC_ID: Lazy<Option<i32>> =
        Lazy::new(|| env::var("DIGEST_TOPIC_ID").ok().and_then(|v| v.parse::<i32>().ok()));

    /// Hours between digest posts
    /// Read from DIGEST_INTERVAL_HOURS, default 168 (weekly)
    pub static INTERVAL_HOURS: Lazy<u64> = Lazy::new(|| {
        env::var("DIGEST_INTERVAL_HOURS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(168)
    });

    /// Trailing window of update activity included in each digest
    /// Read from DIGEST_WINDOW_DAYS, default 7
    pub static WINDOW_DAYS: Lazy<i64> = Lazy::new(|| {
        env::var("DIGEST_WINDOW_DAYS")
            .ok()
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(7)
    });
}

/// Session behavior configuration
pub mod session {
    use once_cell::sync::Lazy;
    use std::env;

    /// What happens when a top-level command arrives while a session is
    /// already active: "replace" discards the old session, "require-cancel"
    /// asks the participant to /cancel first.
    /// Read from SESSION_CONFLICT_POLICY environment variable
    pub static CONFLICT_POLICY: Lazy<String> =
        Lazy::new(|| env::var("SESSION_CONFLICT_POLICY").unwrap_or_else(|_| "replace".to_string()));
}

/// Maximum accepted input lengths per conversation field (characters)
pub mod limits {
    pub const MAX_PROJECT_NAME: usize = 1000;
    pub const MAX_TAGLINE: usize = 2500;
    pub const MAX_PROBLEM_STATEMENT: usize = 5500;
    pub const MAX_TECH_STACK: usize = 5000;
    pub const MAX_LINK: usize = 300;
    pub const MAX_HELP_NEEDED: usize = 7500;
    pub const MAX_UPDATE_TEXT: usize = 9000;
    pub const MAX_BLOCKERS: usize = 10000;
    pub const MAX_SEARCH_KEYWORD: usize = 200;
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for the Telegram HTTP client (in seconds)
    pub const REQUEST_TIMEOUT_SECS: u64 = 60;

    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// How many projects a search result message shows before the
/// "...and N more" trailer.
pub const SEARCH_RESULT_LIMIT: usize = 10;

/// How many recent updates the project view shows.
pub const VIEW_RECENT_UPDATES: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_are_ordered_like_the_form() {
        // A sanity check that the loosest limits stay on the free-text
        // fields collected late in the flow.
        assert!(limits::MAX_LINK < limits::MAX_PROJECT_NAME);
        assert!(limits::MAX_UPDATE_TEXT < limits::MAX_BLOCKERS);
    }

    #[test]
    fn test_airtable_timeout() {
        assert_eq!(airtable::timeout(), Duration::from_secs(30));
    }
}
