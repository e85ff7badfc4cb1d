//! The conversation state machine.
//!
//! Each flow is a fixed, ordered sequence of states with one transition
//! function per state. A transition consumes one [`Answer`]: on a valid
//! answer the value is stored in the draft and the cursor advances; on
//! an invalid answer the same prompt is re-emitted and the cursor stays
//! put. Reaching the end of a flow yields [`StepOutcome::Complete`] —
//! the caller hands the draft to the record submitter and discards the
//! session whatever the submission outcome. Cancellation is not a state
//! here: the caller clears the session from the store.

use crate::core::config::limits;
use crate::core::validation::{validate_link, validate_text};
use crate::flow::{Answer, Draft, Prompt, PromptKeyboard, Session, Stage};

/// Cursor positions across all three flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    // Creation flow
    AwaitingName,
    AwaitingTagline,
    AwaitingProblem,
    AwaitingStack,
    AwaitingLink,
    AwaitingStage,
    AwaitingHelp,
    // Update flow
    ChoosingProject,
    AwaitingProgress,
    AwaitingBlockers,
    // Search flow
    AwaitingKeyword,
    AwaitingStackFilter,
    AwaitingStageFilter,
}

/// Result of feeding one answer to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Answer accepted, cursor advanced; ask this next.
    Next(Prompt),
    /// Answer rejected; cursor unchanged, re-ask with an explanation.
    Reprompt { error: String, prompt: Prompt },
    /// Flow finished; the draft is ready for submission.
    Complete(Draft),
}

/// The prompt belonging to a state. Used both for the first prompt on
/// flow entry and for re-prompts after validation failures.
pub fn prompt_for(state: FlowState) -> Prompt {
    match state {
        FlowState::AwaitingName => Prompt::text_only("Let's create a new project! What's the project name?"),
        FlowState::AwaitingTagline => {
            Prompt::text_only("Great! Now, what's the one-liner tagline for your project?")
        }
        FlowState::AwaitingProblem => {
            Prompt::text_only("What problem is this project trying to solve? (Problem Statement)")
        }
        FlowState::AwaitingStack => Prompt::text_only("What's the tech stack? (e.g., Python, React, Firebase)"),
        FlowState::AwaitingLink => Prompt::text_only(
            "Please provide a GitHub or demo link (URL) if you have one.\n\
             You can also type 'skip' to continue without a link.",
        ),
        FlowState::AwaitingStage => Prompt::with_keyboard(
            "What's the current stage of the project?\n\n\
             • Idea: Early concept, no code required\n\
             • MVP: Working prototype, requires GitHub/demo link\n\
             • Launched: Live product, requires GitHub/demo link",
            PromptKeyboard::StageSelect,
        ),
        FlowState::AwaitingHelp => Prompt::text_only(
            "What kind of help do you need for this project? (e.g., 'Frontend dev', 'User feedback')",
        ),
        FlowState::ChoosingProject => Prompt::text_only("Which project do you want to update?"),
        FlowState::AwaitingProgress => Prompt::text_only("What progress did you make this week?"),
        FlowState::AwaitingBlockers => Prompt::text_only("Any blockers this week? (Type 'None' if no blockers)"),
        FlowState::AwaitingKeyword => Prompt::with_keyboard(
            "Let's find some projects! Enter a keyword to search in name, tagline, or problem statement (or skip):",
            PromptKeyboard::SearchSkip,
        ),
        FlowState::AwaitingStackFilter => Prompt::with_keyboard(
            "Enter a tech stack to filter by (e.g., Python, React) (or skip):",
            PromptKeyboard::SearchSkip,
        ),
        FlowState::AwaitingStageFilter => {
            Prompt::with_keyboard("Filter by project status (or choose any):", PromptKeyboard::SearchStageSelect)
        }
    }
}

/// Feeds one answer to the session's current state.
pub fn advance(session: &mut Session, answer: Answer) -> StepOutcome {
    match session.state {
        FlowState::AwaitingName => on_name(session, answer),
        FlowState::AwaitingTagline => on_tagline(session, answer),
        FlowState::AwaitingProblem => on_problem(session, answer),
        FlowState::AwaitingStack => on_stack(session, answer),
        FlowState::AwaitingLink => on_link(session, answer),
        FlowState::AwaitingStage => on_stage(session, answer),
        FlowState::AwaitingHelp => on_help(session, answer),
        FlowState::ChoosingProject => on_project_choice(session, answer),
        FlowState::AwaitingProgress => on_progress(session, answer),
        FlowState::AwaitingBlockers => on_blockers(session, answer),
        FlowState::AwaitingKeyword => on_keyword(session, answer),
        FlowState::AwaitingStackFilter => on_stack_filter(session, answer),
        FlowState::AwaitingStageFilter => on_stage_filter(session, answer),
    }
}

// ==================== shared helpers ====================

fn reprompt(state: FlowState, error: impl Into<String>) -> StepOutcome {
    StepOutcome::Reprompt {
        error: error.into(),
        prompt: prompt_for(state),
    }
}

/// Extracts and validates a free-text answer, or builds the re-prompt.
fn text_answer(answer: Answer, state: FlowState, field: &'static str, max_len: usize) -> Result<String, StepOutcome> {
    match answer {
        Answer::Text(text) => validate_text(&text, field, max_len).map_err(|e| reprompt(state, e.to_string())),
        Answer::Choice(_) => Err(reprompt(state, "Please answer with a text message.")),
        Answer::Unsupported => Err(reprompt(state, "I can only accept text here.")),
    }
}

/// The session's draft did not match its cursor. A contract violation:
/// logged, surfaced as an internal error, never retried.
fn draft_mismatch(state: FlowState) -> StepOutcome {
    log::error!("Session draft kind does not match state {:?}", state);
    reprompt(
        state,
        "Something went wrong with your session. Please /cancel and start over.",
    )
}

macro_rules! project_draft {
    ($session:expr, $state:expr) => {
        match &mut $session.draft {
            Draft::Project(draft) => draft,
            _ => return draft_mismatch($state),
        }
    };
}

macro_rules! update_draft {
    ($session:expr, $state:expr) => {
        match &mut $session.draft {
            Draft::Update(draft) => draft,
            _ => return draft_mismatch($state),
        }
    };
}

macro_rules! search_draft {
    ($session:expr, $state:expr) => {
        match &mut $session.draft {
            Draft::Search(draft) => draft,
            _ => return draft_mismatch($state),
        }
    };
}

fn next(session: &mut Session, state: FlowState) -> StepOutcome {
    session.state = state;
    StepOutcome::Next(prompt_for(state))
}

// ==================== creation flow ====================

fn on_name(session: &mut Session, answer: Answer) -> StepOutcome {
    let name = match text_answer(answer, FlowState::AwaitingName, "Project name", limits::MAX_PROJECT_NAME) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    project_draft!(session, FlowState::AwaitingName).name = Some(name);
    next(session, FlowState::AwaitingTagline)
}

fn on_tagline(session: &mut Session, answer: Answer) -> StepOutcome {
    let tagline = match text_answer(answer, FlowState::AwaitingTagline, "Tagline", limits::MAX_TAGLINE) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    project_draft!(session, FlowState::AwaitingTagline).tagline = Some(tagline);
    next(session, FlowState::AwaitingProblem)
}

fn on_problem(session: &mut Session, answer: Answer) -> StepOutcome {
    let problem = match text_answer(
        answer,
        FlowState::AwaitingProblem,
        "Problem statement",
        limits::MAX_PROBLEM_STATEMENT,
    ) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    project_draft!(session, FlowState::AwaitingProblem).problem = Some(problem);
    next(session, FlowState::AwaitingStack)
}

fn on_stack(session: &mut Session, answer: Answer) -> StepOutcome {
    let stack = match text_answer(answer, FlowState::AwaitingStack, "Tech stack", limits::MAX_TECH_STACK) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    project_draft!(session, FlowState::AwaitingStack).stack = Some(stack);
    next(session, FlowState::AwaitingLink)
}

fn on_link(session: &mut Session, answer: Answer) -> StepOutcome {
    let text = match answer {
        Answer::Text(text) => text,
        Answer::Choice(_) => return reprompt(FlowState::AwaitingLink, "Please answer with a text message."),
        Answer::Unsupported => return reprompt(FlowState::AwaitingLink, "I can only accept text here."),
    };
    match validate_link(&text, limits::MAX_LINK) {
        Ok(link) => {
            project_draft!(session, FlowState::AwaitingLink).link = link;
            next(session, FlowState::AwaitingStage)
        }
        Err(e) => reprompt(FlowState::AwaitingLink, e.to_string()),
    }
}

fn on_stage(session: &mut Session, answer: Answer) -> StepOutcome {
    let choice = match answer {
        Answer::Choice(choice) => choice,
        _ => return reprompt(FlowState::AwaitingStage, "Use the buttons to pick a stage."),
    };
    let Some(stage) = Stage::parse(&choice) else {
        return reprompt(FlowState::AwaitingStage, "Use the buttons to pick a stage.");
    };
    project_draft!(session, FlowState::AwaitingStage).stage = Some(stage);
    next(session, FlowState::AwaitingHelp)
}

fn on_help(session: &mut Session, answer: Answer) -> StepOutcome {
    let help = match text_answer(answer, FlowState::AwaitingHelp, "Help needed", limits::MAX_HELP_NEEDED) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    project_draft!(session, FlowState::AwaitingHelp).help = Some(help);
    StepOutcome::Complete(session.draft.clone())
}

// ==================== update flow ====================

fn on_project_choice(session: &mut Session, answer: Answer) -> StepOutcome {
    let choice = match answer {
        Answer::Choice(choice) if !choice.is_empty() => choice,
        _ => {
            return reprompt(
                FlowState::ChoosingProject,
                "Use the buttons above to pick a project.",
            )
        }
    };
    update_draft!(session, FlowState::ChoosingProject).project_id = Some(choice);
    next(session, FlowState::AwaitingProgress)
}

fn on_progress(session: &mut Session, answer: Answer) -> StepOutcome {
    let progress = match text_answer(
        answer,
        FlowState::AwaitingProgress,
        "Progress update",
        limits::MAX_UPDATE_TEXT,
    ) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    update_draft!(session, FlowState::AwaitingProgress).progress = Some(progress);
    next(session, FlowState::AwaitingBlockers)
}

fn on_blockers(session: &mut Session, answer: Answer) -> StepOutcome {
    let blockers = match text_answer(answer, FlowState::AwaitingBlockers, "Blockers", limits::MAX_BLOCKERS) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    update_draft!(session, FlowState::AwaitingBlockers).blockers = Some(blockers);
    StepOutcome::Complete(session.draft.clone())
}

// ==================== search flow ====================

/// Search text steps also accept the skip button (`Choice("skip")`).
fn search_text_or_skip(
    answer: Answer,
    state: FlowState,
    field: &'static str,
    max_len: usize,
) -> Result<Option<String>, StepOutcome> {
    match answer {
        Answer::Choice(choice) if choice == "skip" => Ok(None),
        Answer::Choice(_) => Err(reprompt(state, "Use the skip button or type an answer.")),
        Answer::Text(text) => validate_text(&text, field, max_len)
            .map(Some)
            .map_err(|e| reprompt(state, e.to_string())),
        Answer::Unsupported => Err(reprompt(state, "I can only accept text here.")),
    }
}

fn on_keyword(session: &mut Session, answer: Answer) -> StepOutcome {
    let keyword = match search_text_or_skip(
        answer,
        FlowState::AwaitingKeyword,
        "Keyword",
        limits::MAX_SEARCH_KEYWORD,
    ) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    search_draft!(session, FlowState::AwaitingKeyword).keyword = keyword;
    next(session, FlowState::AwaitingStackFilter)
}

fn on_stack_filter(session: &mut Session, answer: Answer) -> StepOutcome {
    let stack = match search_text_or_skip(
        answer,
        FlowState::AwaitingStackFilter,
        "Tech stack",
        limits::MAX_TECH_STACK,
    ) {
        Ok(value) => value,
        Err(outcome) => return outcome,
    };
    search_draft!(session, FlowState::AwaitingStackFilter).stack = stack;
    next(session, FlowState::AwaitingStageFilter)
}

fn on_stage_filter(session: &mut Session, answer: Answer) -> StepOutcome {
    let choice = match answer {
        Answer::Choice(choice) => choice,
        _ => return reprompt(FlowState::AwaitingStageFilter, "Use the buttons to pick a status."),
    };
    let stage = if choice == "any" {
        None
    } else {
        match Stage::parse(&choice) {
            Some(stage) => Some(stage),
            None => return reprompt(FlowState::AwaitingStageFilter, "Use the buttons to pick a status."),
        }
    };
    search_draft!(session, FlowState::AwaitingStageFilter).stage = stage;
    StepOutcome::Complete(session.draft.clone())
}
