//! # Submission Relay
//!
//! Runs one submission through normalization, category resolution,
//! composition and delivery.

use crate::category::{RoutingTable, ServiceCategory, TopicId};
use crate::compose::{ComposedMessage, MessageComposer};
use crate::delivery::{ChatDelivery, DeliveryError};
use crate::payload::{FallbackReason, NormalizationError, PayloadNormalizer, Submission};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{error, info, instrument};

/// Relay failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Normalization failed: {0}")]
    Normalization(#[from] NormalizationError),

    #[error("Delivery failed: {0}")]
    Delivery(#[from] DeliveryError),
}

/// A submission composed and ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedSubmission {
    pub submission: Submission,
    pub message: ComposedMessage,
}

/// Summary of a delivered submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    pub category: Option<ServiceCategory>,
    pub topic_id: Option<TopicId>,
    pub message_id: Option<i64>,

    /// Set when the embedded raw request could not be used
    pub fallback: Option<FallbackReason>,
}

/// Normalizer, routing table, composer and delivery wired together.
///
/// All parts are immutable after construction, so one relay can serve
/// concurrent requests.
pub struct SubmissionRelay {
    normalizer: PayloadNormalizer,
    routing: RoutingTable,
    composer: MessageComposer,
    delivery: Arc<dyn ChatDelivery>,
}

impl fmt::Debug for SubmissionRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmissionRelay")
            .field("normalizer", &self.normalizer)
            .field("routing", &self.routing)
            .field("composer", &self.composer)
            .finish_non_exhaustive()
    }
}

impl SubmissionRelay {
    pub fn new(
        normalizer: PayloadNormalizer,
        routing: RoutingTable,
        composer: MessageComposer,
        delivery: Arc<dyn ChatDelivery>,
    ) -> Self {
        Self {
            normalizer,
            routing,
            composer,
            delivery,
        }
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    /// Normalize and compose without sending.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizationError`] when `body` is not a JSON object.
    pub fn prepare(&self, body: Value) -> Result<PreparedSubmission, NormalizationError> {
        let submission = self.normalizer.normalize(body)?;
        let routed = self
            .routing
            .resolve(submission.service_raw.as_deref().unwrap_or_default());
        let message = self.composer.compose(&submission, &routed);
        Ok(PreparedSubmission {
            submission,
            message,
        })
    }

    /// Compose and send one submission.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Normalization`] for unusable bodies and
    /// [`RelayError::Delivery`] when the chat API rejects the message.
    pub async fn relay(&self, body: Value) -> Result<RelayOutcome, RelayError> {
        let prepared = self.prepare(body)?;
        Ok(self.deliver(prepared).await?)
    }

    /// Send a prepared submission. Delivery is attempted once.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError`] when the chat API rejects the message.
    #[instrument(skip_all)]
    pub async fn deliver(
        &self,
        prepared: PreparedSubmission,
    ) -> Result<RelayOutcome, DeliveryError> {
        let message = &prepared.message;

        info!(
            service = %prepared.submission.service,
            category = ?message.category,
            topic_id = ?message.topic_id,
            "Composed submission notification"
        );

        let receipt = self
            .delivery
            .send(&message.to_outbound())
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    kind = e.kind(),
                    transient = e.is_transient(),
                    "Delivery failed; submission will not be retried"
                );
                e
            })?;

        Ok(RelayOutcome {
            category: message.category,
            topic_id: message.topic_id,
            message_id: receipt.message_id,
            fallback: prepared.submission.fallback,
        })
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
