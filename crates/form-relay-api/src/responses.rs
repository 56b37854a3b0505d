//! Response types for the API.

use chrono::{DateTime, Utc};
use form_relay_core::{FallbackReason, RelayOutcome, ServiceCategory, TopicId};
use serde::Serialize;

/// Webhook processing response
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub status: String,
    pub category: Option<ServiceCategory>,
    pub topic_id: Option<TopicId>,
    pub message_id: Option<i64>,

    /// Whether the embedded raw request was unusable
    pub used_fallback: bool,
}

impl From<RelayOutcome> for WebhookResponse {
    fn from(outcome: RelayOutcome) -> Self {
        Self {
            status: "ok".to_string(),
            category: outcome.category,
            topic_id: outcome.topic_id,
            message_id: outcome.message_id,
            used_fallback: outcome
                .fallback
                .is_some_and(|reason| reason != FallbackReason::NoRawRequest),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
