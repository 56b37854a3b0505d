//! Metrics collection for the API service.
//!
//! Metrics live in a registry owned by [`ServiceMetrics`] rather than the
//! process-wide default, so several routers can coexist in one process.

use form_relay_core::{DeliveryError, FallbackReason, PreparedSubmission, RelayOutcome};
use prometheus::{IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Service metrics for observability
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    pub submissions_received_total: IntCounter,
    pub submissions_malformed_total: IntCounter,
    pub raw_request_fallbacks_total: IntCounter,
    pub submissions_by_category: IntCounterVec,
    pub deliveries_succeeded_total: IntCounter,
    pub deliveries_failed_total: IntCounterVec,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let submissions_received_total = IntCounter::new(
            "form_relay_submissions_received_total",
            "Webhook submissions received",
        )?;
        let submissions_malformed_total = IntCounter::new(
            "form_relay_submissions_malformed_total",
            "Submissions rejected as malformed",
        )?;
        let raw_request_fallbacks_total = IntCounter::new(
            "form_relay_raw_request_fallbacks_total",
            "Submissions whose embedded raw request could not be used",
        )?;
        let submissions_by_category = IntCounterVec::new(
            Opts::new(
                "form_relay_submissions_by_category_total",
                "Delivered submissions by service category",
            ),
            &["category"],
        )?;
        let deliveries_succeeded_total = IntCounter::new(
            "form_relay_deliveries_succeeded_total",
            "Notifications accepted by the chat API",
        )?;
        let deliveries_failed_total = IntCounterVec::new(
            Opts::new(
                "form_relay_deliveries_failed_total",
                "Notifications not delivered, by failure kind",
            ),
            &["kind"],
        )?;

        registry.register(Box::new(submissions_received_total.clone()))?;
        registry.register(Box::new(submissions_malformed_total.clone()))?;
        registry.register(Box::new(raw_request_fallbacks_total.clone()))?;
        registry.register(Box::new(submissions_by_category.clone()))?;
        registry.register(Box::new(deliveries_succeeded_total.clone()))?;
        registry.register(Box::new(deliveries_failed_total.clone()))?;

        Ok(Arc::new(Self {
            registry,
            submissions_received_total,
            submissions_malformed_total,
            raw_request_fallbacks_total,
            submissions_by_category,
            deliveries_succeeded_total,
            deliveries_failed_total,
        }))
    }

    /// Record a composed submission before it is sent.
    pub fn record_prepared(&self, prepared: &PreparedSubmission) {
        if matches!(
            prepared.submission.fallback,
            Some(FallbackReason::DecodeFailed { .. } | FallbackReason::NotAnObject { .. })
        ) {
            self.raw_request_fallbacks_total.inc();
        }
    }

    /// Record the result of one delivery attempt.
    pub fn record_delivery(&self, result: &Result<RelayOutcome, DeliveryError>) {
        match result {
            Ok(outcome) => {
                self.deliveries_succeeded_total.inc();
                let category = outcome.category.map_or("uncategorized", |c| c.name());
                self.submissions_by_category
                    .with_label_values(&[category])
                    .inc();
            }
            Err(e) => self
                .deliveries_failed_total
                .with_label_values(&[e.kind()])
                .inc(),
        }
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}
