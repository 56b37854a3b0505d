//! Tests for [`SubmissionRelay`].

use super::*;
use crate::category::ServiceCategory;
use crate::compose::{ComposerConfig, TextFormat};
use crate::delivery::{DeliveryReceipt, MockChatDelivery};
use crate::payload::FieldKeys;
use serde_json::json;

fn relay_with(delivery: MockChatDelivery) -> SubmissionRelay {
    SubmissionRelay::new(
        PayloadNormalizer::new(FieldKeys::default()),
        RoutingTable::new().with_topic(ServiceCategory::PartnershipsIc, TopicId::new(2)),
        MessageComposer::new(ComposerConfig::default()),
        Arc::new(delivery),
    )
}

fn partnerships_body() -> Value {
    json!({
        "request": {
            "rawRequest": json!({
                "q3_name": { "first": "Ada", "last": "Lovelace" },
                "q12_serviceTo": "Partnerships IC",
                "q20_selectPartners": ["Alice", "Bob"],
            }).to_string()
        }
    })
}

/// Verify that a submission is composed, routed and sent once.
#[tokio::test]
async fn test_relay_sends_composed_message() {
    let mut delivery = MockChatDelivery::new();
    delivery
        .expect_send()
        .withf(|message| {
            message.topic_id == Some(TopicId::new(2))
                && message.format == TextFormat::Html
                && message.text.contains("👥 Selected: Alice, Bob")
                && message.text.contains("👤 Name: Ada Lovelace")
        })
        .times(1)
        .returning(|_| {
            Ok(DeliveryReceipt {
                message_id: Some(77),
            })
        });

    let outcome = relay_with(delivery).relay(partnerships_body()).await.unwrap();

    assert_eq!(
        outcome,
        RelayOutcome {
            category: Some(ServiceCategory::PartnershipsIc),
            topic_id: Some(TopicId::new(2)),
            message_id: Some(77),
            fallback: None,
        }
    );
}

/// Verify that an invalid raw request still produces a delivery from the top level.
#[tokio::test]
async fn test_relay_falls_back_on_invalid_raw_request() {
    let mut delivery = MockChatDelivery::new();
    delivery
        .expect_send()
        .withf(|message| message.text.contains("📂 Project: Top Level") && message.topic_id.is_none())
        .times(1)
        .returning(|_| Ok(DeliveryReceipt::default()));

    let body = json!({
        "rawRequest": "{\"unterminated\": ",
        "q9_project": "Top Level",
    });

    let outcome = relay_with(delivery).relay(body).await.unwrap();

    assert!(matches!(
        outcome.fallback,
        Some(FallbackReason::DecodeFailed { .. })
    ));
    assert_eq!(outcome.category, None);
}

/// Verify that delivery errors are returned without a second attempt.
#[tokio::test]
async fn test_relay_returns_delivery_error_without_retry() {
    let mut delivery = MockChatDelivery::new();
    delivery.expect_send().times(1).returning(|_| {
        Err(DeliveryError::Api {
            status: 502,
            description: "Bad Gateway".to_string(),
        })
    });

    let result = relay_with(delivery).relay(partnerships_body()).await;

    assert!(matches!(
        result,
        Err(RelayError::Delivery(DeliveryError::Api { status: 502, .. }))
    ));
}

/// Verify that a non-object body never reaches delivery.
#[tokio::test]
async fn test_relay_rejects_non_object_body() {
    let mut delivery = MockChatDelivery::new();
    delivery.expect_send().times(0);

    let result = relay_with(delivery).relay(json!("just a string")).await;

    assert_eq!(
        result.unwrap_err(),
        RelayError::Normalization(NormalizationError::NotAnObject { found: "string" })
    );
}

/// Verify that prepare is pure: the same body yields the same message.
#[test]
fn test_prepare_is_repeatable() {
    let relay = relay_with(MockChatDelivery::new());

    let first = relay.prepare(partnerships_body()).unwrap();
    let second = relay.prepare(partnerships_body()).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.submission.name, "Ada Lovelace");
    assert_eq!(first.message.topic_id, Some(TopicId::new(2)));
}

/// Verify that only the exact submitted string selects a category.
///
/// Padded, list-shaped and composite answers still render in the header
/// but are sent to the general thread without a detail block.
#[tokio::test]
async fn test_category_requires_exact_submitted_string() {
    for service in [
        json!(" Partnerships IC "),
        json!(["Partnerships IC"]),
        json!({ "x": "Partnerships IC" }),
    ] {
        let mut delivery = MockChatDelivery::new();
        delivery
            .expect_send()
            .withf(|message| {
                message.topic_id.is_none()
                    && message.text.contains("🛠 Service: Partnerships IC")
                    && !message.text.contains("🤝")
            })
            .times(1)
            .returning(|_| Ok(DeliveryReceipt::default()));

        let body = json!({
            "q12_serviceTo": service.clone(),
            "q20_selectPartners": ["Alice"],
        });
        let outcome = relay_with(delivery).relay(body).await.unwrap();

        assert_eq!(outcome.category, None, "service {service}");
        assert_eq!(outcome.topic_id, None, "service {service}");
    }
}

/// Verify that delivering a prepared submission keeps its fallback reason.
#[tokio::test]
async fn test_deliver_reports_prepared_fallback() {
    let mut delivery = MockChatDelivery::new();
    delivery
        .expect_send()
        .times(1)
        .returning(|_| Ok(DeliveryReceipt::default()));
    let relay = relay_with(delivery);

    let prepared = relay
        .prepare(json!({ "rawRequest": "[1, 2]", "q12_serviceTo": "Partnerships IC" }))
        .unwrap();
    let outcome = relay.deliver(prepared).await.unwrap();

    assert!(matches!(
        outcome.fallback,
        Some(FallbackReason::NotAnObject { found: "array", .. })
    ));
    assert_eq!(outcome.topic_id, Some(TopicId::new(2)));
}

#[test]
fn test_debug_lists_pipeline_parts() {
    let relay = relay_with(MockChatDelivery::new());

    let debug = format!("{:?}", relay);

    assert!(debug.starts_with("SubmissionRelay"));
    assert!(debug.contains("routing"));
}
