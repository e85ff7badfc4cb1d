//! Turns completed drafts into Airtable records.
//!
//! The engine guarantees the drafts it hands over are complete; the
//! checks here are the last line before the wire and surface as
//! [`AppError::MissingField`] if that contract is ever broken.

use crate::airtable::{now_utc_iso, AirtableClient, ProjectFields, Record, UpdateFields};
use crate::core::error::{AppError, AppResult};
use crate::flow::{ProjectDraft, UpdateDraft};

/// Maps a completed creation draft to Projects-table columns.
///
/// `Last Updated` is stamped with the current time so a fresh project
/// sorts alongside recently updated ones. The link column is omitted
/// entirely when the participant skipped it.
pub fn project_fields_from_draft(owner_telegram_id: i64, draft: &ProjectDraft) -> AppResult<ProjectFields> {
    let name = draft.name.clone().ok_or(AppError::MissingField("name"))?;
    let tagline = draft.tagline.clone().ok_or(AppError::MissingField("tagline"))?;
    let problem = draft.problem.clone().ok_or(AppError::MissingField("problem"))?;
    let stack = draft.stack.clone().ok_or(AppError::MissingField("stack"))?;
    let stage = draft.stage.ok_or(AppError::MissingField("stage"))?;
    let help = draft.help.clone().ok_or(AppError::MissingField("help"))?;

    Ok(ProjectFields {
        name: Some(name),
        owner_telegram_id: Some(owner_telegram_id.to_string()),
        one_liner: Some(tagline),
        problem_statement: Some(problem),
        stack: Some(stack),
        github_demo: draft.link.clone(),
        status: Some(stage.as_str().to_string()),
        help_needed: Some(help),
        last_updated: Some(now_utc_iso()),
    })
}

/// Creates the project record for a completed creation flow.
pub async fn submit_project(
    client: &AirtableClient,
    owner_telegram_id: i64,
    draft: &ProjectDraft,
) -> AppResult<Record<ProjectFields>> {
    let fields = project_fields_from_draft(owner_telegram_id, draft)?;
    let record = client.create_project(&fields).await?;
    log::info!(
        "Created project '{}' ({}) for participant {}",
        fields.name.as_deref().unwrap_or("?"),
        record.id,
        owner_telegram_id
    );
    Ok(record)
}

/// Records a progress update: creates the update row, then patches the
/// parent project's `Last Updated` to the same timestamp so the parent
/// is never older than its newest update.
pub async fn submit_update(
    client: &AirtableClient,
    updated_by: i64,
    draft: &UpdateDraft,
) -> AppResult<Record<UpdateFields>> {
    let project_id = draft
        .project_id
        .clone()
        .ok_or(AppError::MissingField("project_id"))?;
    let progress = draft.progress.clone().ok_or(AppError::MissingField("progress"))?;
    let blockers = draft.blockers.clone().ok_or(AppError::MissingField("blockers"))?;

    let timestamp = now_utc_iso();
    let fields = UpdateFields {
        project: Some(vec![project_id.clone()]),
        update_text: Some(progress),
        blockers: Some(blockers),
        updated_by: Some(updated_by.to_string()),
        timestamp: Some(timestamp.clone()),
    };

    let record = client.create_update(&fields).await?;

    let patch = ProjectFields {
        last_updated: Some(timestamp),
        ..ProjectFields::default()
    };
    client.update_project(&project_id, &patch).await?;

    log::info!(
        "Recorded update {} on project {} by participant {}",
        record.id,
        project_id,
        updated_by
    );
    Ok(record)
}
