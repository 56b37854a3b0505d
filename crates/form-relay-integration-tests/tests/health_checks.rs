//! Integration tests for health and metrics endpoints

mod common;

use axum::http::StatusCode;
use common::{body_json, create_app, get, telegram_accepting, test_config};
use tower::ServiceExt;

/// Verify that the health endpoint answers without touching the Bot API.
#[tokio::test]
async fn test_health_endpoint_returns_200() {
    // Arrange
    let telegram = telegram_accepting(1).await;
    let app = create_app(test_config(&telegram));

    // Act
    let response = app.oneshot(get("/health")).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("application/json"));

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert!(body["timestamp"].is_string());
    assert!(telegram.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_metrics_endpoint_is_prometheus_text() {
    let telegram = telegram_accepting(1).await;
    let app = create_app(test_config(&telegram));

    let response = app.oneshot(get("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("# TYPE form_relay_submissions_received_total counter"));
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let telegram = telegram_accepting(1).await;
    let app = create_app(test_config(&telegram));

    let response = app.oneshot(get("/does-not-exist")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
