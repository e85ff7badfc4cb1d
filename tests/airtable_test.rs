//! Airtable client integration tests against a mock HTTP server.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use loopbot::airtable::{AirtableClient, ProjectFields};
use loopbot::core::retry::RetryConfig;
use loopbot::flow::{ProjectDraft, Stage};
use loopbot::submit::{submit_project, submit_update};
use loopbot::AppError;

fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_retries: 2,
        initial_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        backoff_multiplier: 1.0,
        add_jitter: false,
    }
}

fn client(server: &MockServer) -> AirtableClient {
    AirtableClient::new("test-key", "appBase", "Projects", "Updates")
        .unwrap()
        .with_base_url(server.uri())
        .with_retry(fast_retry())
}

fn record_response(id: &str, fields: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "id": id,
        "createdTime": "2024-05-01T12:00:00.000Z",
        "fields": fields,
    }))
}

#[tokio::test]
async fn test_create_project_sends_bearer_auth_and_fields() {
    let server = MockServer::start().await;

    let expected_body = json!({
        "fields": {
            "Project Name": "Widget",
            "Owner Telegram ID": "42",
            "Status": "MVP",
        }
    });

    Mock::given(method("POST"))
        .and(path("/appBase/Projects"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_json(&expected_body))
        .respond_with(record_response("recNEW", json!({"Project Name": "Widget"})))
        .expect(1)
        .mount(&server)
        .await;

    let fields = ProjectFields {
        name: Some("Widget".to_string()),
        owner_telegram_id: Some("42".to_string()),
        status: Some("MVP".to_string()),
        ..ProjectFields::default()
    };

    let record = client(&server).create_project(&fields).await.unwrap();
    assert_eq!(record.id, "recNEW");
}

#[tokio::test]
async fn test_projects_by_owner_filters_and_sorts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appBase/Projects"))
        .and(query_param("filterByFormula", "{Owner Telegram ID} = '42'"))
        .and(query_param("sort[0][field]", "Last Updated"))
        .and(query_param("sort[0][direction]", "desc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "rec1", "fields": {"Project Name": "Widget", "Status": "MVP"}},
                {"id": "rec2", "fields": {"Project Name": "Gadget", "Status": "Idea"}},
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let projects = client(&server).projects_by_owner("42").await.unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].fields.name.as_deref(), Some("Widget"));
    assert_eq!(projects[1].id, "rec2");
}

#[tokio::test]
async fn test_list_follows_pagination_offset() {
    let server = MockServer::start().await;

    // First page carries an offset; the mock is consumed after one hit
    // so the second request falls through to the final-page mock.
    Mock::given(method("GET"))
        .and(path("/appBase/Projects"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"id": "rec1", "fields": {"Project Name": "Widget"}}],
            "offset": "itrNext",
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appBase/Projects"))
        .and(query_param("offset", "itrNext"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"id": "rec2", "fields": {"Project Name": "Gadget"}}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let projects = client(&server).projects_by_owner("42").await.unwrap();
    assert_eq!(projects.len(), 2);
    assert_eq!(projects[0].id, "rec1");
    assert_eq!(projects[1].id, "rec2");
}

#[tokio::test]
async fn test_rate_limit_is_retried_until_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appBase/Projects/rec1"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/appBase/Projects/rec1"))
        .respond_with(record_response("rec1", json!({"Project Name": "Widget"})))
        .expect(1)
        .mount(&server)
        .await;

    let record = client(&server).get_project("rec1").await.unwrap();
    assert_eq!(record.fields.name.as_deref(), Some("Widget"));
}

#[tokio::test]
async fn test_persistent_rate_limit_exhausts_retries() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appBase/Projects/rec1"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
        // max_retries = 2, so 3 attempts total
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server).get_project("rec1").await.unwrap_err();
    assert!(matches!(err, AppError::RetriesExhausted { attempts: 3 }));
}

#[tokio::test]
async fn test_non_rate_limit_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/appBase/Projects/recMissing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("NOT_FOUND"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server).get_project("recMissing").await.unwrap_err();
    match err {
        AppError::Airtable { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "NOT_FOUND");
        }
        other => panic!("expected Airtable error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_submit_project_maps_the_draft() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appBase/Projects"))
        .respond_with(record_response("recNEW", json!({"Project Name": "Widget"})))
        .expect(1)
        .mount(&server)
        .await;

    let draft = ProjectDraft {
        name: Some("Widget".to_string()),
        tagline: Some("Widgets for all".to_string()),
        problem: Some("No one has widgets".to_string()),
        stack: Some("Python".to_string()),
        link: Some("https://example.com".to_string()),
        stage: Some(Stage::Mvp),
        help: Some("Need a designer".to_string()),
    };

    submit_project(&client(&server), 42, &draft).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let fields = &body["fields"];
    assert_eq!(fields["Project Name"], "Widget");
    assert_eq!(fields["Owner Telegram ID"], "42");
    assert_eq!(fields["One-liner"], "Widgets for all");
    assert_eq!(fields["Problem Statement"], "No one has widgets");
    assert_eq!(fields["Stack"], "Python");
    assert_eq!(fields["GitHub/Demo"], "https://example.com");
    assert_eq!(fields["Status"], "MVP");
    assert_eq!(fields["Help Needed"], "Need a designer");
    assert!(fields["Last Updated"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_submit_update_creates_record_and_touches_parent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/appBase/Updates"))
        .respond_with(record_response("updNEW", json!({"Update Text": "Shipped v2"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path("/appBase/Projects/recParent"))
        .respond_with(record_response("recParent", json!({"Project Name": "Widget"})))
        .expect(1)
        .mount(&server)
        .await;

    let draft = loopbot::flow::UpdateDraft {
        project_id: Some("recParent".to_string()),
        project_name: Some("Widget".to_string()),
        progress: Some("Shipped v2".to_string()),
        blockers: Some("None".to_string()),
    };

    submit_update(&client(&server), 42, &draft).await.unwrap();

    // The parent's Last Updated must carry the same timestamp the new
    // update record was stamped with.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let create_body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let patch_body: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();

    assert_eq!(create_body["fields"]["Project"], json!(["recParent"]));
    assert_eq!(create_body["fields"]["Update Text"], "Shipped v2");
    assert_eq!(create_body["fields"]["Blockers"], "None");
    assert_eq!(create_body["fields"]["Updated By"], "42");

    let update_timestamp = create_body["fields"]["Timestamp"].as_str().unwrap();
    assert_eq!(patch_body["fields"], json!({"Last Updated": update_timestamp}));
}
