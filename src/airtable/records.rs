//! Record shapes for the two Airtable tables.
//!
//! Field structs serialize with the exact Airtable column names. Every
//! field is optional: Airtable omits unset columns in responses, and a
//! PATCH only carries the columns it changes.

use serde::{Deserialize, Serialize};

/// One Airtable record: opaque record key plus typed fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record<T> {
    pub id: String,
    pub fields: T,
    #[serde(rename = "createdTime", default, skip_serializing_if = "Option::is_none")]
    pub created_time: Option<String>,
}

/// A page of list results. `offset` is present when more pages follow.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub records: Vec<Record<T>>,
    #[serde(default)]
    pub offset: Option<String>,
}

/// Columns of the Projects table.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProjectFields {
    #[serde(rename = "Project Name", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Owner Telegram ID", skip_serializing_if = "Option::is_none")]
    pub owner_telegram_id: Option<String>,
    #[serde(rename = "One-liner", skip_serializing_if = "Option::is_none")]
    pub one_liner: Option<String>,
    #[serde(rename = "Problem Statement", skip_serializing_if = "Option::is_none")]
    pub problem_statement: Option<String>,
    #[serde(rename = "Stack", skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(rename = "GitHub/Demo", skip_serializing_if = "Option::is_none")]
    pub github_demo: Option<String>,
    #[serde(rename = "Status", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(rename = "Help Needed", skip_serializing_if = "Option::is_none")]
    pub help_needed: Option<String>,
    #[serde(rename = "Last Updated", skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

/// Columns of the Updates table. `project` is an Airtable linked-record
/// column and always carries exactly one project record key.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateFields {
    #[serde(rename = "Project", skip_serializing_if = "Option::is_none")]
    pub project: Option<Vec<String>>,
    #[serde(rename = "Update Text", skip_serializing_if = "Option::is_none")]
    pub update_text: Option<String>,
    #[serde(rename = "Blockers", skip_serializing_if = "Option::is_none")]
    pub blockers: Option<String>,
    #[serde(rename = "Updated By", skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(rename = "Timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl UpdateFields {
    /// The linked project's record key, when the link is present.
    pub fn project_id(&self) -> Option<&str> {
        self.project.as_ref().and_then(|ids| ids.first()).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_project_fields_serialize_with_airtable_names() {
        let fields = ProjectFields {
            name: Some("Widget".to_string()),
            owner_telegram_id: Some("42".to_string()),
            status: Some("MVP".to_string()),
            ..ProjectFields::default()
        };

        let value = serde_json::to_value(&fields).unwrap();
        assert_eq!(
            value,
            json!({
                "Project Name": "Widget",
                "Owner Telegram ID": "42",
                "Status": "MVP",
            })
        );
    }

    #[test]
    fn test_record_deserializes_sparse_fields() {
        let raw = json!({
            "id": "recABC",
            "createdTime": "2024-05-01T12:00:00.000Z",
            "fields": { "Project Name": "Widget" }
        });

        let record: Record<ProjectFields> = serde_json::from_value(raw).unwrap();
        assert_eq!(record.id, "recABC");
        assert_eq!(record.fields.name.as_deref(), Some("Widget"));
        assert_eq!(record.fields.status, None);
    }

    #[test]
    fn test_update_fields_project_id() {
        let fields = UpdateFields {
            project: Some(vec!["recXYZ".to_string()]),
            ..UpdateFields::default()
        };
        assert_eq!(fields.project_id(), Some("recXYZ"));
        assert_eq!(UpdateFields::default().project_id(), None);
    }

    #[test]
    fn test_list_response_offset() {
        let raw = json!({
            "records": [],
            "offset": "itrNextPage"
        });
        let page: ListResponse<ProjectFields> = serde_json::from_value(raw).unwrap();
        assert_eq!(page.offset.as_deref(), Some("itrNextPage"));
    }
}
