//! Conversation flows: per-participant finite state machines that walk
//! a user through an ordered sequence of prompts.
//!
//! Three flows exist: project creation (`/newproject`), weekly update
//! (`/updateproject` or a per-project button) and project search
//! (`/searchprojects`). The engine in [`engine`] is pure — it knows
//! nothing about Telegram; the handlers translate messages and callback
//! presses into [`Answer`]s and render [`Prompt`]s back out.

pub mod drafts;
pub mod engine;

pub use drafts::{Draft, ProjectDraft, SearchDraft, UpdateDraft};
pub use engine::{advance, prompt_for, FlowState, StepOutcome};

use std::fmt;

/// Project lifecycle stage. The fixed enumeration behind the stage
/// selection buttons and the `Status` column in Airtable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idea,
    Mvp,
    Launched,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Idea, Stage::Mvp, Stage::Launched];

    /// The datastore representation (also the button label).
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idea => "Idea",
            Stage::Mvp => "MVP",
            Stage::Launched => "Launched",
        }
    }

    /// Parses the datastore/button representation. Exact match only —
    /// stage answers come from buttons, not free text.
    pub fn parse(s: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| stage.as_str() == s)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One inbound answer to the current prompt.
#[derive(Debug, Clone)]
pub enum Answer {
    /// Free-text message content
    Text(String),
    /// A constrained choice (inline button press), prefix already stripped
    Choice(String),
    /// A message of the wrong type (photo, sticker, ...) where text was
    /// expected — always rejected with a re-prompt
    Unsupported,
}

/// Keyboard attached to a prompt. The engine only names the keyboard;
/// the Telegram layer renders the actual inline markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKeyboard {
    /// Idea / MVP / Launched buttons for the creation flow
    StageSelect,
    /// A single "skip" button for a search criterion
    SearchSkip,
    /// Stage buttons plus "Any Status" for the search flow
    SearchStageSelect,
}

/// What the bot should ask next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub keyboard: Option<PromptKeyboard>,
}

impl Prompt {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: PromptKeyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}

/// Active conversation state for one participant: the cursor plus the
/// accumulated draft. Ephemeral — created on flow entry, discarded on
/// submission or cancellation.
#[derive(Debug, Clone)]
pub struct Session {
    pub state: FlowState,
    pub draft: Draft,
}

impl Session {
    /// Entry point of the creation flow.
    pub fn new_project() -> Self {
        Self {
            state: FlowState::AwaitingName,
            draft: Draft::Project(ProjectDraft::default()),
        }
    }

    /// Entry point of the update flow when the project still has to be
    /// chosen from a list.
    pub fn update_choosing() -> Self {
        Self {
            state: FlowState::ChoosingProject,
            draft: Draft::Update(UpdateDraft::default()),
        }
    }

    /// Entry point of the update flow pre-targeted at one project
    /// (the per-project button on `/myprojects`).
    pub fn update_targeted(project_id: String, project_name: Option<String>) -> Self {
        Self {
            state: FlowState::AwaitingProgress,
            draft: Draft::Update(UpdateDraft {
                project_id: Some(project_id),
                project_name,
                ..UpdateDraft::default()
            }),
        }
    }

    /// Entry point of the search flow.
    pub fn search() -> Self {
        Self {
            state: FlowState::AwaitingKeyword,
            draft: Draft::Search(SearchDraft::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::parse(stage.as_str()), Some(stage));
        }
    }

    #[test]
    fn test_stage_parse_is_exact() {
        assert_eq!(Stage::parse("mvp"), None);
        assert_eq!(Stage::parse("Shipped"), None);
        assert_eq!(Stage::parse(""), None);
    }
}
