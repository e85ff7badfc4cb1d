use thiserror::Error;

/// Centralized error types for the application
///
/// All errors in the application are converted to this enum for consistent error handling.
/// Uses `thiserror` for automatic error conversion and display formatting.
#[derive(Error, Debug)]
pub enum AppError {
    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),

    /// HTTP transport errors talking to Airtable
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Airtable replied with a non-success status
    #[error("Airtable request failed with status {status}: {message}")]
    Airtable { status: u16, message: String },

    /// Rate-limit retries exhausted without a successful response
    #[error("Airtable rate limit retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    /// JSON (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A completed session was missing a field it must have collected.
    /// This is a contract violation, not user error; it is logged and
    /// surfaced as an internal error message, never retried.
    #[error("Session is missing required field '{0}'")]
    MissingField(&'static str),

    /// Input validation errors (recovered locally by re-prompting)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Anyhow errors (for general error handling)
    #[error("Application error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// True when the error is an Airtable HTTP 429 and a bounded
    /// backoff retry is appropriate.
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, AppError::Airtable { status: 429, .. })
    }
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_detection() {
        let err = AppError::Airtable {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert!(err.is_rate_limit());

        let err = AppError::Airtable {
            status: 422,
            message: "unprocessable".to_string(),
        };
        assert!(!err.is_rate_limit());

        assert!(!AppError::MissingField("name").is_rate_limit());
    }

    #[test]
    fn test_error_display() {
        let err = AppError::Airtable {
            status: 404,
            message: "table not found".to_string(),
        };
        assert!(err.to_string().contains("404"));
        assert!(err.to_string().contains("table not found"));

        let err = AppError::MissingField("stage");
        assert!(err.to_string().contains("stage"));
    }
}
