//! Admin endpoints: broadcasts, user approval and clone reports.

mod common;

use axum::http::StatusCode;
use common::{
    ADMIN, RecordingTransport, SECOND_ADMIN, Schema, count_rows, create_test_app, default_app,
    insert_user,
};
use guardianship_server::entity::user::UserStatus;
use serde_json::{Value, json};

#[tokio::test]
async fn broadcast_goes_to_admins_users_and_listed_addresses() {
    let app = default_app().await;
    insert_user(&app.db, "u1", "alice@example.org", UserStatus::Approved, 10).await;
    insert_user(&app.db, "u2", "pending@example.org", UserStatus::Pending, 5).await;

    let response = app
        .server
        .post("/api/broadcast-message")
        .json(&json!({
            "title": "Water outage",
            "body": "No water until 18:00",
            "emails": ["carol@example.org", "alice@example.org", ""],
            "adminEmail": ADMIN
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["total"], 4);
    assert_eq!(body["sentCount"], 4);
    assert_eq!(body["failedCount"], 0);

    assert_eq!(
        app.transport.recipients(),
        vec![ADMIN, SECOND_ADMIN, "alice@example.org", "carol@example.org"]
    );
    let (_, message) = &app.transport.attempts()[0];
    assert_eq!(message.subject, "Water outage - GuardianshipApp");
    assert_eq!(count_rows(&app.db, "broadcast_messages").await, 1);
}

#[tokio::test]
async fn broadcast_reports_failures() {
    let app = create_test_app(
        &[ADMIN],
        Schema::default(),
        RecordingTransport::failing_for(&["carol@example.org"]),
    )
    .await;

    let response = app
        .server
        .post("/api/broadcast-message")
        .json(&json!({
            "title": "Drill",
            "body": "Evacuation drill on Saturday",
            "emails": ["carol@example.org"],
            "adminEmail": ADMIN
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["sentCount"], 1);
    assert_eq!(body["failedCount"], 1);
}

#[tokio::test]
async fn unauthorized_broadcast_sends_and_stores_nothing() {
    let app = default_app().await;

    let response = app
        .server
        .post("/api/broadcast-message")
        .json(&json!({
            "title": "Free money",
            "body": "Click here",
            "emails": ["victim@example.org"],
            "adminEmail": "intruder@example.org"
        }))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
    response.assert_json(&json!({ "error": "Not authorized - admin email required" }));
    assert!(app.transport.attempts().is_empty());
    assert_eq!(count_rows(&app.db, "broadcast_messages").await, 0);
}

#[tokio::test]
async fn admin_match_is_case_sensitive() {
    let app = default_app().await;

    let response = app
        .server
        .post("/api/broadcast-message")
        .json(&json!({
            "title": "Hi",
            "body": "Hello",
            "emails": ["carol@example.org"],
            "adminEmail": ADMIN.to_uppercase()
        }))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn broadcast_without_sender_is_forbidden_before_validation() {
    let app = default_app().await;

    let response = app
        .server
        .post("/api/broadcast-message")
        .json(&json!({ "title": "Hi" }))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn broadcast_with_missing_fields_is_rejected() {
    let app = default_app().await;

    for body in [
        json!({ "body": "Hello", "emails": ["a@example.org"], "adminEmail": ADMIN }),
        json!({ "title": "Hi", "emails": ["a@example.org"], "adminEmail": ADMIN }),
        json!({ "title": "Hi", "body": "Hello", "emails": [], "adminEmail": ADMIN }),
        json!({ "title": "  ", "body": "Hello", "emails": ["a@example.org"], "adminEmail": ADMIN }),
    ] {
        let response = app
            .server
            .post("/api/broadcast-message")
            .json(&body)
            .expect_failure()
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
    assert!(app.transport.attempts().is_empty());
    assert_eq!(count_rows(&app.db, "broadcast_messages").await, 0);
}

#[tokio::test]
async fn approving_a_user_makes_them_an_alert_recipient() {
    let app = default_app().await;
    insert_user(&app.db, "u1", "newcomer@example.org", UserStatus::Pending, 1).await;

    let response = app
        .server
        .post("/api/approve-user")
        .json(&json!({ "userId": "u1", "adminEmail": SECOND_ADMIN }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["id"], "u1");
    assert_eq!(body["user"]["status"], "approved");

    app.server
        .post("/api/notify-alert")
        .json(&json!({ "alert": { "name": "Thabo" } }))
        .await
        .assert_status_ok();
    assert_eq!(
        app.transport.recipients(),
        vec![ADMIN, SECOND_ADMIN, "newcomer@example.org"]
    );
}

#[tokio::test]
async fn approve_user_checks_fields_then_admin_then_user() {
    let app = default_app().await;

    let missing = app
        .server
        .post("/api/approve-user")
        .json(&json!({ "userId": "u1" }))
        .expect_failure()
        .await;
    missing.assert_status(StatusCode::BAD_REQUEST);
    missing.assert_json(&json!({ "error": "Missing userId or adminEmail" }));

    let forbidden = app
        .server
        .post("/api/approve-user")
        .json(&json!({ "userId": "u1", "adminEmail": "someone@example.org" }))
        .expect_failure()
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);

    let unknown = app
        .server
        .post("/api/approve-user")
        .json(&json!({ "userId": "nobody", "adminEmail": ADMIN }))
        .expect_failure()
        .await;
    unknown.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn pending_users_are_listed_oldest_first() {
    let app = default_app().await;
    insert_user(&app.db, "late", "late@example.org", UserStatus::Pending, 1).await;
    insert_user(&app.db, "early", "early@example.org", UserStatus::Pending, 60).await;
    insert_user(&app.db, "done", "done@example.org", UserStatus::Approved, 30).await;

    let response = app
        .server
        .post("/api/get-pending-users")
        .json(&json!({ "adminEmail": ADMIN }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    let ids: Vec<&str> = body["users"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["early", "late"]);
    assert_eq!(body["users"][0]["status"], "pending");
}

#[tokio::test]
async fn pending_users_require_an_admin() {
    let app = default_app().await;

    let response = app
        .server
        .post("/api/get-pending-users")
        .json(&json!({}))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pending_users_hide_store_errors() {
    let app = create_test_app(
        &[ADMIN],
        Schema {
            users: false,
            audit: true,
        },
        RecordingTransport::default(),
    )
    .await;

    let response = app
        .server
        .post("/api/get-pending-users")
        .json(&json!({ "adminEmail": ADMIN }))
        .expect_failure()
        .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    response.assert_json(&json!({ "error": "Internal server error" }));
}

#[tokio::test]
async fn clone_report_only_reaches_admins() {
    let app = default_app().await;
    insert_user(&app.db, "u1", "alice@example.org", UserStatus::Approved, 10).await;

    let response = app
        .server
        .post("/api/report-clone")
        .json(&json!({ "domain": "evil.example", "url": "https://evil.example/" }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["emailed"], 2);
    assert_eq!(body["totalTargets"], 2);
    assert_eq!(app.transport.recipients(), vec![ADMIN, SECOND_ADMIN]);
    let (_, message) = &app.transport.attempts()[0];
    assert!(message.text.contains("Domain: evil.example"));
    assert!(message.text.contains("Time: Unknown"));
}
