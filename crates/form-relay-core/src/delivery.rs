//! # Chat Delivery
//!
//! Boundary between the pure pipeline and the chat API. Implementations
//! perform a single best-effort send; nothing here retries or queues.

use crate::category::TopicId;
use crate::compose::TextFormat;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Message handed to a [`ChatDelivery`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    pub text: String,
    pub format: TextFormat,

    /// Forum topic to post into; `None` posts to the general thread
    pub topic_id: Option<TopicId>,
}

/// Acknowledgement returned by the chat API.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    /// Identifier the chat API assigned to the sent message
    pub message_id: Option<i64>,
}

/// Delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The request never got a response
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// The chat API answered with an error
    #[error("Chat API error: {status} - {description}")]
    Api { status: u16, description: String },

    /// The chat API answered with something we could not read
    #[error("Invalid response from chat API: {message}")]
    InvalidResponse { message: String },
}

impl DeliveryError {
    /// Whether a later attempt could succeed.
    ///
    /// Informational only; the relay never retries.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse { .. } => false,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network { .. } => "network",
            Self::Timeout { .. } => "timeout",
            Self::Api { .. } => "api",
            Self::InvalidResponse { .. } => "invalid_response",
        }
    }
}

/// Sends composed messages to the destination chat.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatDelivery: Send + Sync {
    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] when the message was not accepted.
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError>;
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
