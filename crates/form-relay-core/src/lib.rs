//! # Form Relay Core
//!
//! Core logic for relaying form-service submissions to a chat conversation.
//!
//! This crate turns a loosely structured webhook payload into a single
//! formatted notification plus an optional routing key:
//!
//! 1. [`payload`] unwraps the raw-request envelope and narrows each field
//!    into a [`FieldValue`](payload::FieldValue).
//! 2. [`category`] resolves the declared service category against the
//!    static [`RoutingTable`](category::RoutingTable).
//! 3. [`compose`] renders the header block and the category-specific block.
//! 4. [`relay`] ties the stages together and hands the result to a
//!    [`ChatDelivery`](delivery::ChatDelivery) implementation.
//!
//! Everything except delivery is a pure function of its input and can be
//! tested without network access.
//!
//! ## Usage
//!
//! ```rust
//! use form_relay_core::{
//!     category::{RoutingTable, ServiceCategory, TopicId},
//!     compose::{ComposerConfig, MessageComposer},
//!     payload::{FieldKeys, PayloadNormalizer},
//! };
//! use serde_json::json;
//!
//! let normalizer = PayloadNormalizer::new(FieldKeys::default());
//! let routing = RoutingTable::new().with_topic(ServiceCategory::AlumniRelations, TopicId::new(8));
//! let composer = MessageComposer::new(ComposerConfig::default());
//!
//! let submission = normalizer
//!     .normalize(json!({ "q12_serviceTo": "Alumni Relations" }))
//!     .unwrap();
//! let routed = routing.resolve(submission.service_raw.as_deref().unwrap_or_default());
//! let message = composer.compose(&submission, &routed);
//!
//! assert_eq!(message.topic_id, Some(TopicId::new(8)));
//! ```

pub mod body;
pub mod category;
pub mod compose;
pub mod delivery;
pub mod payload;
pub mod relay;

pub use body::BodyEncoding;
pub use category::{CategoryMatch, RoutingTable, RoutingTableError, ServiceCategory, TopicId};
pub use compose::{ComposedMessage, ComposerConfig, MessageComposer, TextFormat};
pub use delivery::{ChatDelivery, DeliveryError, DeliveryReceipt, OutboundMessage};
pub use payload::{
    FallbackReason, FieldKeys, FieldValue, NormalizationError, PayloadNormalizer, Submission,
    Unwrapped,
};
pub use relay::{PreparedSubmission, RelayError, RelayOutcome, SubmissionRelay};
