//! Airtable REST client.
//!
//! Thin reqwest wrapper over the record create/update/list endpoints of
//! the two tables. Bearer-authenticated; HTTP 429 responses get bounded
//! backoff retry, every other failure is returned on the first attempt.

use reqwest::Method;
use serde::de::DeserializeOwned;
use url::Url;

use crate::airtable::records::{ListResponse, ProjectFields, Record, UpdateFields};
use crate::core::config;
use crate::core::error::{AppError, AppResult};
use crate::core::retry::{retry_on_rate_limit, RetryConfig};
use crate::flow::SearchDraft;

const DEFAULT_BASE_URL: &str = "https://api.airtable.com/v0";

/// Client for one Airtable base with a Projects and an Updates table.
#[derive(Debug, Clone)]
pub struct AirtableClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    base_id: String,
    projects_table: String,
    updates_table: String,
    retry: RetryConfig,
}

impl AirtableClient {
    /// Creates a client from explicit configuration.
    pub fn new(
        api_key: impl Into<String>,
        base_id: impl Into<String>,
        projects_table: impl Into<String>,
        updates_table: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder().timeout(config::airtable::timeout()).build()?;
        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            base_id: base_id.into(),
            projects_table: projects_table.into(),
            updates_table: updates_table.into(),
            retry: RetryConfig::rate_limit(),
        })
    }

    /// Creates a client from the AIRTABLE_* environment configuration.
    pub fn from_env() -> anyhow::Result<Self> {
        if config::airtable::API_KEY.is_empty() || config::airtable::BASE_ID.is_empty() {
            anyhow::bail!("Airtable configuration missing (AIRTABLE_API_KEY / AIRTABLE_BASE_ID)");
        }
        Self::new(
            config::airtable::API_KEY.clone(),
            config::airtable::BASE_ID.clone(),
            config::airtable::PROJECTS_TABLE.clone(),
            config::airtable::UPDATES_TABLE.clone(),
        )
    }

    /// Points the client at a different API root (tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Overrides the retry timing (tests).
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.base_id, urlencoding::encode(table))
    }

    fn record_url(&self, table: &str, record_id: &str) -> String {
        format!("{}/{}", self.table_url(table), record_id)
    }

    /// Sends one request with bearer auth and rate-limit retry, decoding
    /// the JSON response.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> AppResult<T> {
        retry_on_rate_limit(&self.retry, || {
            let mut req = self.http.request(method.clone(), url).bearer_auth(&self.api_key);
            if let Some(json) = body {
                req = req.json(json);
            }
            async move {
                let response = req.send().await?;
                let status = response.status();
                if !status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    return Err(AppError::Airtable {
                        status: status.as_u16(),
                        message,
                    });
                }
                Ok(response.json::<T>().await?)
            }
        })
        .await
    }

    /// Fetches every page of a filtered list.
    async fn list<T: DeserializeOwned>(
        &self,
        table: &str,
        formula: Option<&str>,
        sort: Option<(&str, &str)>,
    ) -> AppResult<Vec<Record<T>>> {
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut url = Url::parse(&self.table_url(table))?;
            {
                let mut query = url.query_pairs_mut();
                if let Some(formula) = formula {
                    query.append_pair("filterByFormula", formula);
                }
                if let Some((field, direction)) = sort {
                    query.append_pair("sort[0][field]", field);
                    query.append_pair("sort[0][direction]", direction);
                }
                if let Some(ref offset) = offset {
                    query.append_pair("offset", offset);
                }
            }

            let page: ListResponse<T> = self.request(Method::GET, url.as_str(), None).await?;
            records.extend(page.records);

            match page.offset {
                Some(next) => offset = Some(next),
                None => break,
            }
        }

        Ok(records)
    }

    // ==================== Projects ====================

    /// Creates one project record.
    pub async fn create_project(&self, fields: &ProjectFields) -> AppResult<Record<ProjectFields>> {
        let body = serde_json::json!({ "fields": fields });
        self.request(Method::POST, &self.table_url(&self.projects_table), Some(&body))
            .await
    }

    /// Fetches one project by record key.
    pub async fn get_project(&self, record_id: &str) -> AppResult<Record<ProjectFields>> {
        self.request(Method::GET, &self.record_url(&self.projects_table, record_id), None)
            .await
    }

    /// Patches the given columns of one project record.
    pub async fn update_project(&self, record_id: &str, fields: &ProjectFields) -> AppResult<Record<ProjectFields>> {
        let body = serde_json::json!({ "fields": fields });
        self.request(
            Method::PATCH,
            &self.record_url(&self.projects_table, record_id),
            Some(&body),
        )
        .await
    }

    /// All projects owned by one participant, most recently updated first.
    pub async fn projects_by_owner(&self, owner_telegram_id: &str) -> AppResult<Vec<Record<ProjectFields>>> {
        let formula = format!(
            "{{Owner Telegram ID}} = '{}'",
            escape_formula_value(owner_telegram_id)
        );
        self.list(&self.projects_table, Some(&formula), Some(("Last Updated", "desc")))
            .await
    }

    /// Projects matching the search criteria, most recently updated
    /// first. Returns an empty list when no criterion is set.
    pub async fn search_projects(&self, criteria: &SearchDraft) -> AppResult<Vec<Record<ProjectFields>>> {
        let Some(formula) = compose_search_formula(criteria) else {
            return Ok(Vec::new());
        };
        self.list(&self.projects_table, Some(&formula), Some(("Last Updated", "desc")))
            .await
    }

    // ==================== Updates ====================

    /// Creates one update record.
    pub async fn create_update(&self, fields: &UpdateFields) -> AppResult<Record<UpdateFields>> {
        let body = serde_json::json!({ "fields": fields });
        self.request(Method::POST, &self.table_url(&self.updates_table), Some(&body))
            .await
    }

    /// Updates linked to one project, newest first.
    pub async fn updates_for_project(&self, project_record_id: &str) -> AppResult<Vec<Record<UpdateFields>>> {
        let formula = format!(
            "FIND('{}', ARRAYJOIN({{Project}}))",
            escape_formula_value(project_record_id)
        );
        self.list(&self.updates_table, Some(&formula), Some(("Timestamp", "desc")))
            .await
    }

    /// Updates created on or after the cutoff (ISO-8601 UTC), newest first.
    pub async fn updates_since(&self, cutoff_iso: &str) -> AppResult<Vec<Record<UpdateFields>>> {
        let formula = format!("{{Timestamp}} >= '{}'", escape_formula_value(cutoff_iso));
        self.list(&self.updates_table, Some(&formula), Some(("Timestamp", "desc")))
            .await
    }
}

/// Escapes a value for interpolation into a single-quoted formula string.
fn escape_formula_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Builds the filterByFormula expression for a project search. The
/// keyword matches name, tagline or problem statement
/// (case-insensitive substring); stack is a case-insensitive substring
/// of the Stack column; stage is an exact Status match. Multiple
/// criteria are ANDed. Returns `None` when no criterion is set.
pub fn compose_search_formula(criteria: &SearchDraft) -> Option<String> {
    let mut parts = Vec::new();

    if let Some(keyword) = criteria.keyword.as_deref() {
        let needle = escape_formula_value(&keyword.to_lowercase());
        parts.push(format!(
            "OR(FIND('{n}', LOWER({{Project Name}})), FIND('{n}', LOWER({{One-liner}})), FIND('{n}', LOWER({{Problem Statement}})))",
            n = needle
        ));
    }

    if let Some(stack) = criteria.stack.as_deref() {
        parts.push(format!(
            "FIND('{}', LOWER({{Stack}}))",
            escape_formula_value(&stack.to_lowercase())
        ));
    }

    if let Some(stage) = criteria.stage {
        parts.push(format!("{{Status}} = '{}'", stage.as_str()));
    }

    match parts.len() {
        0 => None,
        1 => parts.pop(),
        _ => Some(format!("AND({})", parts.join(", "))),
    }
}
