//! Notification API validation behaviour.
//!
//! These tests exercise the request paths that reject before touching
//! the database, so they run against the lazily-connecting test pool.

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{body_json, build_test_app, send_get, send_json};

#[tokio::test]
async fn create_with_invalid_channel_is_rejected() {
    let app = build_test_app();

    let response = send_json(
        app,
        Method::POST,
        "/api/v1/notifications",
        json!({
            "recipient": "+15551234567",
            "channel": "fax",
            "content": "hello"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("channel"));
}

#[tokio::test]
async fn create_with_missing_recipient_is_rejected() {
    let app = build_test_app();

    let response = send_json(
        app,
        Method::POST,
        "/api/v1/notifications",
        json!({
            "recipient": "",
            "channel": "sms",
            "content": "hello"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("recipient"));
}

#[tokio::test]
async fn create_with_oversized_content_is_rejected() {
    let app = build_test_app();

    let response = send_json(
        app,
        Method::POST,
        "/api/v1/notifications",
        json!({
            "recipient": "+15551234567",
            "channel": "sms",
            "content": "x".repeat(641)
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("content"));
}

#[tokio::test]
async fn create_with_past_schedule_is_rejected() {
    let app = build_test_app();

    let response = send_json(
        app,
        Method::POST,
        "/api/v1/notifications",
        json!({
            "recipient": "+15551234567",
            "channel": "sms",
            "content": "hello",
            "scheduled_at": "2020-01-01T00:00:00Z"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().contains("scheduled_at"));
}

#[tokio::test]
async fn batch_above_limit_is_rejected() {
    let app = build_test_app();

    let item = json!({
        "recipient": "+15551234567",
        "channel": "sms",
        "content": "hello"
    });
    let notifications: Vec<serde_json::Value> = (0..1001).map(|_| item.clone()).collect();

    let response = send_json(
        app,
        Method::POST,
        "/api/v1/notifications/batch",
        json!({ "notifications": notifications }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "BATCH_SIZE_EXCEEDED");
}

#[tokio::test]
async fn empty_batch_is_rejected() {
    let app = build_test_app();

    let response = send_json(
        app,
        Method::POST,
        "/api/v1/notifications/batch",
        json!({ "notifications": [] }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn batch_reports_offending_position() {
    let app = build_test_app();

    let response = send_json(
        app,
        Method::POST,
        "/api/v1/notifications/batch",
        json!({ "notifications": [
            { "recipient": "+15551234567", "channel": "sms", "content": "ok" },
            { "recipient": "+15551234567", "channel": "pigeon", "content": "bad" }
        ]}),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert!(body["error"].as_str().unwrap().starts_with("notification 1:"));
}

#[tokio::test]
async fn list_with_invalid_status_filter_is_rejected() {
    let app = build_test_app();

    let response = send_get(app, "/api/v1/notifications?status=exploded").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn queue_metrics_report_all_channels() {
    let app = build_test_app();

    let response = send_get(app, "/metrics/queues").await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    for channel in ["sms", "email", "push"] {
        assert_eq!(body["data"][channel]["depth"], 0);
        assert_eq!(body["data"][channel]["current_rate"], 0);
    }
}
