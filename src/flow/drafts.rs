//! In-progress records accumulated across conversation turns.
//!
//! One optional slot per expected field, populated incrementally by the
//! engine and validated complete only at submission time.

use crate::flow::Stage;

/// The accumulated answers of whichever flow is active.
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Project(ProjectDraft),
    Update(UpdateDraft),
    Search(SearchDraft),
}

/// Answers collected by the creation flow. `link` stays `None` when the
/// participant typed `skip`; every other field is guaranteed present by
/// the time the cursor reaches the end (checked again at submission).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectDraft {
    pub name: Option<String>,
    pub tagline: Option<String>,
    pub problem: Option<String>,
    pub stack: Option<String>,
    pub link: Option<String>,
    pub stage: Option<Stage>,
    pub help: Option<String>,
}

/// Answers collected by the update flow. `project_name` is a display
/// nicety filled in by the handler when it resolves the selection; only
/// `project_id` matters for submission.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateDraft {
    pub project_id: Option<String>,
    pub project_name: Option<String>,
    pub progress: Option<String>,
    pub blockers: Option<String>,
}

/// Criteria collected by the search flow. Every slot is optional but at
/// least one must be set for a search to run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchDraft {
    pub keyword: Option<String>,
    pub stack: Option<String>,
    pub stage: Option<Stage>,
}

impl SearchDraft {
    /// True when at least one criterion was provided.
    pub fn has_criteria(&self) -> bool {
        self.keyword.is_some() || self.stack.is_some() || self.stage.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_search_has_no_criteria() {
        assert!(!SearchDraft::default().has_criteria());
    }

    #[test]
    fn test_any_slot_counts_as_criteria() {
        let draft = SearchDraft {
            stage: Some(Stage::Mvp),
            ..SearchDraft::default()
        };
        assert!(draft.has_criteria());

        let draft = SearchDraft {
            keyword: Some("widgets".to_string()),
            ..SearchDraft::default()
        };
        assert!(draft.has_criteria());
    }
}
