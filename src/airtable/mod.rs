//! Airtable integration: record shapes and the REST client.

pub mod client;
pub mod records;

pub use client::{compose_search_formula, AirtableClient};
pub use records::{ListResponse, ProjectFields, Record, UpdateFields};

/// Current UTC time in the timestamp format the base stores,
/// e.g. `2024-05-01T12:00:00Z`.
pub fn now_utc_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_utc_iso_shape() {
        let ts = now_utc_iso();
        assert_eq!(ts.len(), 20);
        assert!(ts.ends_with('Z'));
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[10..11], "T");
    }
}
