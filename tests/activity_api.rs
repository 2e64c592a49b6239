mod common;

use axum::http::{Method, StatusCode};
use chrono::Duration;
use serde_json::{json, Value};

use common::{image, TestApp, STAFF};

async fn ticket_id(app: &TestApp, token: &str) -> String {
    let ticket = app
        .create_ticket(token, json!({ "title": "Server room AC", "description": "Too warm" }))
        .await;
    ticket["id"].as_str().unwrap().to_string()
}

fn activity(handler: &str, status: &str) -> Value {
    json!({
        "handler_name": handler,
        "action_taken": "Checked the unit",
        "notes": "Filter clogged",
        "status": status,
        "face_photo": image(handler.as_bytes()),
    })
}

#[tokio::test]
async fn test_handover_closes_previous_entry() {
    let app = TestApp::new().await;
    let token = app.login(STAFF).await;
    let id = ticket_id(&app, &token).await;
    let uri = format!("/api/tickets/{}/activities", id);

    let (status, first) = app
        .request(Method::POST, &uri, Some(&token), Some(activity("Dina", "in_progress")))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", first);
    assert_eq!(first["data"]["ticket"]["status"], "in_progress");
    let dina_entry = first["data"]["opened_handler_entry"]["id"].clone();

    app.clock.advance(Duration::hours(3));

    let (status, second) = app
        .request(Method::POST, &uri, Some(&token), Some(activity("Rafi", "resolved")))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", second);
    assert_eq!(second["data"]["ticket"]["status"], "resolved");
    assert_eq!(second["data"]["closed_handler_entry"], dina_entry);

    let (_, history) = app
        .request(
            Method::GET,
            &format!("/api/tickets/{}/handlers", id),
            Some(&token),
            None,
        )
        .await;
    let entries = history["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["handler_name"], "Dina");
    assert_eq!(entries[0]["ended_at"], entries[1]["started_at"]);
    assert_eq!(entries[1]["handler_name"], "Rafi");
    assert!(entries[1]["ended_at"].is_null());
}

#[tokio::test]
async fn test_same_handler_continues_shift() {
    let app = TestApp::new().await;
    let token = app.login(STAFF).await;
    let id = ticket_id(&app, &token).await;
    let uri = format!("/api/tickets/{}/activities", id);

    app.request(Method::POST, &uri, Some(&token), Some(activity("Dina", "in_progress")))
        .await;
    app.clock.advance(Duration::minutes(20));
    let (status, body) = app
        .request(Method::POST, &uri, Some(&token), Some(activity("Dina", "open")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"]["opened_handler_entry"].is_null());
    assert!(body["data"]["closed_handler_entry"].is_null());
    // Status is overwritten even when it moves backwards.
    assert_eq!(body["data"]["ticket"]["status"], "open");

    let (_, logs) = app.request(Method::GET, &uri, Some(&token), None).await;
    let logs = logs["data"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    // Newest first
    assert!(logs[0]["created_at"].as_str() > logs[1]["created_at"].as_str());
    assert!(logs[0]["face_photo_url"]
        .as_str()
        .unwrap()
        .starts_with("memory://uploads/"));

    let (_, history) = app
        .request(
            Method::GET,
            &format!("/api/tickets/{}/handlers", id),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(history["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_face_photo_is_mandatory() {
    let app = TestApp::new().await;
    let token = app.login(STAFF).await;
    let id = ticket_id(&app, &token).await;

    let mut body = activity("Dina", "resolved");
    body.as_object_mut().unwrap().remove("face_photo");

    let (status, response) = app
        .request(
            Method::POST,
            &format!("/api/tickets/{}/activities", id),
            Some(&token),
            Some(body),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");

    // Nothing was applied
    let (_, detail) = app
        .request(Method::GET, &format!("/api/tickets/{}", id), Some(&token), None)
        .await;
    assert_eq!(detail["data"]["ticket"]["status"], "open");
    assert!(detail["data"]["activity_logs"].as_array().unwrap().is_empty());
    assert!(detail["data"]["handler_history"].as_array().unwrap().is_empty());
    assert!(app.blobs.is_empty().await);
}

#[tokio::test]
async fn test_optional_photo_is_uploaded_too() {
    let app = TestApp::new().await;
    let token = app.login(STAFF).await;
    let id = ticket_id(&app, &token).await;

    let mut body = activity("Dina", "in_progress");
    body["photo"] = image(b"before and after");

    let (status, response) = app
        .request(
            Method::POST,
            &format!("/api/tickets/{}/activities", id),
            Some(&token),
            Some(body),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(response["data"]["log"]["photo_url"].is_string());
    assert_eq!(app.blobs.len().await, 2);
}

#[tokio::test]
async fn test_upload_outage_is_retried() {
    let app = TestApp::new().await;
    let token = app.login(STAFF).await;
    let id = ticket_id(&app, &token).await;

    app.blobs.fail_next(1);
    let (status, _) = app
        .request(
            Method::POST,
            &format!("/api/tickets/{}/activities", id),
            Some(&token),
            Some(activity("Dina", "in_progress")),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_unknown_ticket_uploads_nothing() {
    let app = TestApp::new().await;
    let token = app.login(STAFF).await;

    let (status, body) = app
        .request(
            Method::POST,
            "/api/tickets/7a1c6f0e-4a43-4d7c-9b47-0f4d3c2f1e10/activities",
            Some(&token),
            Some(activity("Dina", "in_progress")),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(app.blobs.is_empty().await);
}
