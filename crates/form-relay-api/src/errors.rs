//! Error types for the HTTP service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use form_relay_core::{DeliveryError, NormalizationError, RelayError, RoutingTableError};
use tracing::{error, warn};

/// Webhook handler errors with HTTP status code mapping
///
/// - `400 Bad Request`: the body is not a usable submission
/// - `502 Bad Gateway`: the chat API did not accept the notification
/// - `500 Internal Server Error`: unexpected server failures
///
/// Nothing is retried on the server side. The form service receives a
/// structured body so the failure is visible in its delivery log.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Body could not be decoded, or is not an object
    ///
    /// Maps to: `400 Bad Request`
    #[error("Malformed submission: {0}")]
    MalformedSubmission(#[from] NormalizationError),

    /// Chat API rejected or never received the notification
    ///
    /// Maps to: `502 Bad Gateway`
    #[error("Delivery failed: {0}")]
    DeliveryFailed(#[from] DeliveryError),

    /// Unexpected internal server error
    ///
    /// Maps to: `500 Internal Server Error`. Details are logged; the client
    /// receives a generic message.
    #[error("Internal server error: {message}")]
    InternalError { message: String },
}

impl From<RelayError> for WebhookHandlerError {
    fn from(error: RelayError) -> Self {
        match error {
            RelayError::Normalization(e) => Self::MalformedSubmission(e),
            RelayError::Delivery(e) => Self::DeliveryFailed(e),
        }
    }
}

impl WebhookHandlerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::MalformedSubmission(_) => StatusCode::BAD_REQUEST,
            Self::DeliveryFailed(_) => StatusCode::BAD_GATEWAY,
            Self::InternalError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            Self::MalformedSubmission(ref e) => {
                warn!(error = %e, "Rejected malformed submission");
                self.to_string()
            }
            // Logged where delivery was attempted
            Self::DeliveryFailed(_) => self.to_string(),
            Self::InternalError { ref message } => {
                // Log detailed error server-side but return generic message to client
                error!(error = %message, "Internal server error occurred");
                "Internal server error occurred".to_string()
            }
        };

        let body = serde_json::json!({
            "status": "error",
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        (status, Json(body)).into_response()
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Failed to initialize metrics: {0}")]
    Metrics(#[from] prometheus::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Invalid routing table: {0}")]
    Routing(#[from] RoutingTableError),
}
