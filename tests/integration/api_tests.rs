//! Route-level behaviour: public endpoints, handler payloads, validation

use axum::http::StatusCode;
use serde_json::{json, Value};

use crate::common::{ids, new_student_body, AuthAs, TestApp};

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;

    app.get("/api/health", &AuthAs::Anonymous).await.assert_ok();

    let ready = app.get("/api/health/ready", &AuthAs::Anonymous).await;
    ready.assert_ok();
    let body: Value = ready.json();
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new().await;
    let response = app
        .get("/api/timetables", &AuthAs::headers(ids::ADMIN_ID, "ADMIN"))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_creates_student() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/students",
            &AuthAs::bearer(ids::ADMIN_ID, "admin"),
            new_student_body(ids::CLASS_ID),
        )
        .await;

    response.assert_created();
    let body: Value = response.json();
    assert_eq!(body["name"], "Ada");
    assert_eq!(body["requestedBy"], ids::ADMIN_ID);
    assert!(body["id"].as_str().is_some());
}

#[tokio::test]
async fn test_invalid_student_payload_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/students",
            &AuthAs::headers(ids::ADMIN_ID, "ADMIN"),
            json!({"name": "", "surname": "Lovelace", "classId": ids::CLASS_ID}),
        )
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_staff_reports_open_to_hr_role() {
    let app = TestApp::new().await;

    let response = app
        .get("/api/staff/reports", &AuthAs::headers(ids::HR_ID, "hr_manager"))
        .await;
    response.assert_ok();
    let body: Value = response.json();
    assert_eq!(body["requestedBy"], ids::HR_ID);

    app.get("/api/staff/reports", &AuthAs::headers(ids::TEACHER_ID, "TEACHER"))
        .await
        .assert_rejected(StatusCode::FORBIDDEN, "Access denied");
}

#[tokio::test]
async fn test_audit_log_listing_is_admin_only() {
    let app = TestApp::new().await;

    app.get("/api/audit-logs", &AuthAs::headers(ids::ADMIN_ID, "ADMIN"))
        .await
        .assert_ok();

    app.get("/api/audit-logs", &AuthAs::headers(ids::PARENT_ID, "PARENT"))
        .await
        .assert_rejected(StatusCode::FORBIDDEN, "Access denied");
}
