//! Common test utilities for form-relay integration tests
//!
//! This module provides:
//! - A stub Telegram Bot API built on wiremock
//! - Application wiring with the real [`TelegramClient`]
//! - Request and payload builders

use axum::{
    body::Body,
    http::{Request, Response},
    Router,
};
use form_relay_api::{
    create_router, AppState, BotToken, ServiceConfig, ServiceMetrics, TelegramClient,
};
use form_relay_core::SubmissionRelay;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const BOT_TOKEN: &str = "4242:integration-token";
pub const CHAT_ID: &str = "-1009876543210";
pub const SEND_PATH: &str = "/bot4242:integration-token/sendMessage";

// ============================================================================
// Telegram stub
// ============================================================================

/// Start a Bot API stub that accepts every message with `message_id`.
pub async fn telegram_accepting(message_id: i64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": { "message_id": message_id }
        })))
        .mount(&server)
        .await;
    server
}

/// Start a Bot API stub that rejects every message.
#[allow(dead_code)]
pub async fn telegram_rejecting(status: u16, description: &str) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(SEND_PATH))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "ok": false,
            "error_code": status,
            "description": description
        })))
        .mount(&server)
        .await;
    server
}

/// Bodies of every `sendMessage` call the stub received.
#[allow(dead_code)]
pub async fn sent_messages(server: &MockServer) -> Vec<Value> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| serde_json::from_slice(&request.body).unwrap())
        .collect()
}

// ============================================================================
// Application wiring
// ============================================================================

/// Configuration pointing at `server`, with the production topic map.
pub fn test_config(server: &MockServer) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.telegram.bot_token = BotToken::new(BOT_TOKEN);
    config.telegram.chat_id = CHAT_ID.to_string();
    config.telegram.api_base_url = server.uri();
    config.telegram.timeout_seconds = 5;

    for (category, topic) in [
        ("Academic Relations", 4),
        ("Alumni Relations", 8),
        ("Document Checking", 6),
        ("Partnerships Request", 10),
        ("Partnerships IC", 2),
    ] {
        config
            .routing
            .topics
            .insert(category.to_string(), Some(topic));
    }
    config
}

/// Router wired exactly as the service binary wires it.
pub fn create_app(config: ServiceConfig) -> Router {
    config.validate().unwrap();

    let relay = SubmissionRelay::new(
        config.normalizer(),
        config.routing_table().unwrap(),
        config.composer(),
        Arc::new(TelegramClient::new(&config.telegram).unwrap()),
    );
    let state = AppState::new(config, Arc::new(relay), ServiceMetrics::new().unwrap());
    create_router(state)
}

// ============================================================================
// Request builders
// ============================================================================

/// Envelope the form service sends: metadata plus a `rawRequest` string.
#[allow(dead_code)]
pub fn envelope(raw: Value) -> Value {
    json!({
        "formID": "240000000000001",
        "submissionID": "5900000000000000001",
        "request": { "rawRequest": raw.to_string() }
    })
}

#[allow(dead_code)]
pub fn json_post(body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/jotform")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
