//! Input validation for conversation answers
//!
//! Free-text answers are checked for emptiness and a per-field maximum
//! length; the link answer must additionally be a well-formed http(s)
//! URL or the literal `skip`. Validation failures are never surfaced as
//! errors — the conversation engine re-prompts with the message.

use thiserror::Error;
use url::Url;

/// Validation errors. The display string is shown to the user verbatim
/// above the re-emitted prompt.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} cannot be empty. Please provide some text.")]
    Empty(&'static str),

    #[error("{field} is too long. Max {max} characters allowed, you entered {got}.")]
    TooLong {
        field: &'static str,
        max: usize,
        got: usize,
    },

    #[error("That doesn't look like a valid link. Send an http(s) URL, or type 'skip'.")]
    InvalidLink,
}

/// Validates a free-text answer: trims, rejects empty and over-long input.
///
/// # Arguments
/// * `text` - Raw message text
/// * `field` - Human-readable field name for error messages
/// * `max_len` - Maximum accepted length in characters
///
/// # Returns
/// * `Ok(String)` - The trimmed answer
/// * `Err(ValidationError)` - Empty or too long
pub fn validate_text(text: &str, field: &'static str, max_len: usize) -> Result<String, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(field));
    }
    let len = trimmed.chars().count();
    if len > max_len {
        return Err(ValidationError::TooLong {
            field,
            max: max_len,
            got: len,
        });
    }
    Ok(trimmed.to_string())
}

/// Validates the link answer.
///
/// Accepts an http(s) URL or the literal `skip` (case-insensitive).
///
/// # Returns
/// * `Ok(Some(url))` - A well-formed link
/// * `Ok(None)` - The participant skipped the field
/// * `Err(ValidationError)` - Malformed or non-http(s) input
pub fn validate_link(text: &str, max_len: usize) -> Result<Option<String>, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty("Link"));
    }
    if trimmed.eq_ignore_ascii_case("skip") {
        return Ok(None);
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::TooLong {
            field: "Link",
            max: max_len,
            got: trimmed.chars().count(),
        });
    }

    let parsed = Url::parse(trimmed).map_err(|_| ValidationError::InvalidLink)?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ValidationError::InvalidLink);
    }
    if parsed.host_str().is_none() {
        return Err(ValidationError::InvalidLink);
    }

    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== validate_text Tests ====================

    #[test]
    fn test_validate_text_trims_and_accepts() {
        assert_eq!(validate_text("  Widget  ", "Project name", 100).unwrap(), "Widget");
    }

    #[test]
    fn test_validate_text_rejects_empty() {
        for input in ["", "   ", "\n\t"] {
            let err = validate_text(input, "Project name", 100).unwrap_err();
            assert_eq!(err, ValidationError::Empty("Project name"), "Failed for: {:?}", input);
        }
    }

    #[test]
    fn test_validate_text_rejects_over_limit() {
        let input = "x".repeat(101);
        let err = validate_text(&input, "Tagline", 100).unwrap_err();
        assert_eq!(
            err,
            ValidationError::TooLong {
                field: "Tagline",
                max: 100,
                got: 101
            }
        );
    }

    #[test]
    fn test_validate_text_boundary() {
        let input = "x".repeat(100);
        assert!(validate_text(&input, "Tagline", 100).is_ok());
    }

    #[test]
    fn test_validate_text_counts_chars_not_bytes() {
        // 10 Cyrillic chars, 20 bytes
        let input = "версиядваа";
        assert!(validate_text(input, "Name", 10).is_ok());
    }

    // ==================== validate_link Tests ====================

    #[test]
    fn test_validate_link_valid() {
        let valid = vec![
            "https://example.com",
            "http://example.com/repo",
            "https://github.com/user/project",
        ];
        for url in valid {
            assert_eq!(validate_link(url, 300).unwrap(), Some(url.to_string()), "Failed for: {}", url);
        }
    }

    #[test]
    fn test_validate_link_skip() {
        for input in ["skip", "Skip", "SKIP", "  skip  "] {
            assert_eq!(validate_link(input, 300).unwrap(), None, "Failed for: {:?}", input);
        }
    }

    #[test]
    fn test_validate_link_invalid() {
        let invalid = vec![
            "not a url",
            "example.com",
            "ftp://example.com/file",
            "javascript:alert(1)",
        ];
        for url in invalid {
            assert_eq!(
                validate_link(url, 300).unwrap_err(),
                ValidationError::InvalidLink,
                "Should fail for: {}",
                url
            );
        }
    }

    #[test]
    fn test_validate_link_empty() {
        assert_eq!(validate_link("  ", 300).unwrap_err(), ValidationError::Empty("Link"));
    }

    #[test]
    fn test_validate_link_too_long() {
        let url = format!("https://example.com/{}", "a".repeat(300));
        assert!(matches!(
            validate_link(&url, 300).unwrap_err(),
            ValidationError::TooLong { field: "Link", .. }
        ));
    }
}
