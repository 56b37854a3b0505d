//! # Payload Normalization
//!
//! Converts an inbound form-service body into a [`Submission`] with every
//! field narrowed to a display string.
//!
//! Form services are inconsistent about where the answers live. Some
//! deliveries carry the answers at the top level; others embed them as a
//! JSON-encoded string under `request.rawRequest` (or a top-level
//! `rawRequest`). [`PayloadNormalizer::unwrap`] picks the working payload and
//! reports which path was taken as an [`Unwrapped`] value, so a broken
//! envelope degrades to the top-level payload instead of failing the request.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// Placeholder rendered for absent header fields.
pub const HEADER_PLACEHOLDER: &str = "N/A";

/// Key paths searched, in order, for an embedded raw-request string.
pub const DEFAULT_RAW_REQUEST_PATHS: [&str; 2] = ["request.rawRequest", "rawRequest"];

// ============================================================================
// Field values
// ============================================================================

/// A single answer as it appears in the payload.
///
/// The form service sends plain strings for most questions, objects for
/// composite questions (`{"first": "...", "last": "..."}`) and arrays for
/// multi-select and upload questions. Numbers and booleans are kept as text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldValue {
    /// Key absent or `null`
    #[default]
    Missing,
    Text(String),
    List(Vec<String>),
    Composite(BTreeMap<String, String>),
}

impl FieldValue {
    /// Narrow a JSON value into a field value.
    ///
    /// Nested arrays or objects below the first level are dropped; the form
    /// service never produces them for the questions we read.
    pub fn from_json(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::Array(items)) => Self::List(items.iter().filter_map(scalar_text).collect()),
            Some(Value::Object(parts)) => Self::Composite(
                parts
                    .iter()
                    .filter_map(|(key, part)| scalar_text(part).map(|text| (key.clone(), text)))
                    .collect(),
            ),
            Some(scalar) => scalar_text(scalar).map_or(Self::Missing, Self::Text),
        }
    }

    /// Non-blank items, trimmed.
    ///
    /// A text value yields one item, a list yields its entries and a
    /// composite yields its parts in key order.
    pub fn items(&self) -> Vec<String> {
        let raw: Vec<&String> = match self {
            Self::Missing => Vec::new(),
            Self::Text(text) => vec![text],
            Self::List(items) => items.iter().collect(),
            Self::Composite(parts) => parts.values().collect(),
        };

        raw.into_iter()
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// The submitted string exactly as sent, for single text answers only.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether the value carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.items().is_empty()
    }

    /// Display string: items joined with `", "`.
    pub fn to_display(&self) -> String {
        self.items().join(", ")
    }

    /// Display string, or `default` when the value is blank.
    pub fn display_or(&self, default: &str) -> String {
        if self.is_blank() {
            default.to_string()
        } else {
            self.to_display()
        }
    }

    /// Display a person's name.
    ///
    /// Composite names join `first` and `last` with a single space; a flat
    /// string is used as-is. The result is trimmed, so a missing name is the
    /// empty string.
    pub fn to_person_name(&self) -> String {
        match self {
            Self::Composite(parts) => {
                let first = parts.get("first").map(String::as_str).unwrap_or("").trim();
                let last = parts.get("last").map(String::as_str).unwrap_or("").trim();
                format!("{} {}", first, last).trim().to_string()
            }
            Self::Text(text) => text.trim().to_string(),
            Self::List(items) => items
                .iter()
                .map(|item| item.trim())
                .filter(|item| !item.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            Self::Missing => String::new(),
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// JSON type name used in error messages.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Field keys
// ============================================================================

/// Question keys for every field the relay reads.
///
/// Defaults follow the form service's `q<number>_<name>` convention for the
/// request form this relay was built for. Each key may also be a
/// dot-separated path into nested objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldKeys {
    pub name: String,
    pub id_number: String,
    pub department: String,
    pub project: String,
    pub contact_handle: String,
    pub service: String,
    pub alumni_request: String,
    pub document_upload: String,
    pub document_instructions: String,
    pub partner_link: String,
    pub partner_selection: String,
    pub partner_reason: String,
    pub partnership_service: String,
    pub partnership_details: String,
}

impl Default for FieldKeys {
    fn default() -> Self {
        Self {
            name: "q3_name".to_string(),
            id_number: "q7_idNumber".to_string(),
            department: "q57_department57".to_string(),
            project: "q9_project".to_string(),
            contact_handle: "q10_telegramHandle".to_string(),
            service: "q12_serviceTo".to_string(),
            alumni_request: "q14_alumniRequest".to_string(),
            document_upload: "q16_uploadDocument".to_string(),
            document_instructions: "q17_instructions".to_string(),
            partner_link: "q19_partnerLink".to_string(),
            partner_selection: "q20_selectPartners".to_string(),
            partner_reason: "q21_reason".to_string(),
            partnership_service: "q23_serviceType".to_string(),
            partnership_details: "q24_details".to_string(),
        }
    }
}

// ============================================================================
// Unwrapping
// ============================================================================

/// Why the top-level payload was used instead of an embedded raw request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// No raw-request field at any configured path
    NoRawRequest,

    /// The raw-request string was not valid JSON
    DecodeFailed { path: String, message: String },

    /// The raw-request string decoded to something other than an object
    NotAnObject { path: String, found: &'static str },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoRawRequest => write!(f, "no raw request present"),
            Self::DecodeFailed { path, message } => {
                write!(f, "raw request at '{}' could not be decoded: {}", path, message)
            }
            Self::NotAnObject { path, found } => {
                write!(f, "raw request at '{}' decoded to {}, expected object", path, found)
            }
        }
    }
}

/// Working payload chosen by [`PayloadNormalizer::unwrap`].
#[derive(Debug, Clone, PartialEq)]
pub enum Unwrapped {
    /// Answers taken from the raw request found at `path`
    Decoded {
        path: String,
        payload: Map<String, Value>,
    },

    /// Answers taken from the top-level body
    Fallback {
        reason: FallbackReason,
        payload: Map<String, Value>,
    },
}

impl Unwrapped {
    /// The working payload, whichever way it was obtained.
    pub fn payload(&self) -> &Map<String, Value> {
        match self {
            Self::Decoded { payload, .. } | Self::Fallback { payload, .. } => payload,
        }
    }

    pub fn fallback_reason(&self) -> Option<&FallbackReason> {
        match self {
            Self::Decoded { .. } => None,
            Self::Fallback { reason, .. } => Some(reason),
        }
    }
}

/// The body itself cannot serve as a submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizationError {
    #[error("Submission body is not valid JSON: {message}")]
    InvalidJson { message: String },

    #[error("Submission payload must be an object, got {found}")]
    NotAnObject { found: &'static str },
}

// ============================================================================
// Submission
// ============================================================================

/// Normalized answers for one submission.
///
/// Header fields hold [`HEADER_PLACEHOLDER`] when absent; detail fields
/// hold the empty string. The name is always trimmed and may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Submission {
    pub name: String,
    pub id_number: String,
    pub department: String,
    pub project: String,
    pub contact_handle: String,
    pub service: String,

    /// Category answer exactly as submitted; `None` unless it was a single
    /// string. Routing matches on this, never on the display form.
    pub service_raw: Option<String>,

    pub alumni_request: String,
    pub document_uploads: Vec<String>,
    pub document_instructions: String,
    pub partner_link: String,
    pub partner_selection: String,
    pub partner_reason: String,
    pub partnership_service: String,
    pub partnership_details: String,

    /// Set when the embedded raw request could not be used
    pub fallback: Option<FallbackReason>,
}

// ============================================================================
// Normalizer
// ============================================================================

/// Extracts a [`Submission`] from an inbound body.
#[derive(Debug, Clone)]
pub struct PayloadNormalizer {
    keys: FieldKeys,
    raw_request_paths: Vec<String>,
}

impl Default for PayloadNormalizer {
    fn default() -> Self {
        Self::new(FieldKeys::default())
    }
}

impl PayloadNormalizer {
    /// Create a normalizer searching the default raw-request paths.
    pub fn new(keys: FieldKeys) -> Self {
        Self {
            keys,
            raw_request_paths: DEFAULT_RAW_REQUEST_PATHS
                .iter()
                .map(|path| path.to_string())
                .collect(),
        }
    }

    /// Replace the raw-request search paths.
    pub fn with_raw_request_paths(mut self, paths: Vec<String>) -> Self {
        self.raw_request_paths = paths;
        self
    }

    pub fn raw_request_paths(&self) -> &[String] {
        &self.raw_request_paths
    }

    /// Choose the working payload.
    ///
    /// The first configured path holding a string (or an already-decoded
    /// object) wins. Only that candidate is tried; a failed decode falls
    /// back to the top-level body.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizationError::NotAnObject`] when the body itself is
    /// not a JSON object.
    pub fn unwrap(&self, body: Value) -> Result<Unwrapped, NormalizationError> {
        let top_level = match body {
            Value::Object(map) => map,
            other => {
                return Err(NormalizationError::NotAnObject {
                    found: value_kind(&other),
                })
            }
        };

        for path in &self.raw_request_paths {
            match lookup(&top_level, path) {
                Some(Value::String(raw)) => {
                    let decoded = serde_json::from_str::<Value>(raw);
                    let reason = match decoded {
                        Ok(Value::Object(payload)) => {
                            return Ok(Unwrapped::Decoded {
                                path: path.clone(),
                                payload,
                            })
                        }
                        Ok(other) => FallbackReason::NotAnObject {
                            path: path.clone(),
                            found: value_kind(&other),
                        },
                        Err(e) => FallbackReason::DecodeFailed {
                            path: path.clone(),
                            message: e.to_string(),
                        },
                    };
                    return Ok(Unwrapped::Fallback {
                        reason,
                        payload: top_level,
                    });
                }
                Some(Value::Object(payload)) => {
                    return Ok(Unwrapped::Decoded {
                        path: path.clone(),
                        payload: payload.clone(),
                    })
                }
                _ => continue,
            }
        }

        Ok(Unwrapped::Fallback {
            reason: FallbackReason::NoRawRequest,
            payload: top_level,
        })
    }

    /// Unwrap the body and extract every field.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizationError::NotAnObject`] when the body is not a
    /// JSON object. Raw-request decode failures are not errors.
    pub fn normalize(&self, body: Value) -> Result<Submission, NormalizationError> {
        let unwrapped = self.unwrap(body)?;

        match unwrapped.fallback_reason() {
            Some(FallbackReason::NoRawRequest) => {
                debug!("No raw request found; using top-level payload");
            }
            Some(reason) => {
                warn!(reason = %reason, "Falling back to top-level payload");
            }
            None => {}
        }

        let mut submission = self.extract(unwrapped.payload());
        submission.fallback = unwrapped.fallback_reason().cloned();
        Ok(submission)
    }

    /// Read every configured field from a working payload.
    pub fn extract(&self, payload: &Map<String, Value>) -> Submission {
        let keys = &self.keys;
        let field = |key: &str| FieldValue::from_json(lookup(payload, key));
        let header = |key: &str| field(key).display_or(HEADER_PLACEHOLDER);
        let detail = |key: &str| field(key).to_display();

        Submission {
            name: field(&keys.name).to_person_name(),
            id_number: header(&keys.id_number),
            department: header(&keys.department),
            project: header(&keys.project),
            contact_handle: header(&keys.contact_handle),
            service: header(&keys.service),
            service_raw: field(&keys.service).as_text().map(str::to_string),
            alumni_request: detail(&keys.alumni_request),
            document_uploads: field(&keys.document_upload).items(),
            document_instructions: detail(&keys.document_instructions),
            partner_link: detail(&keys.partner_link),
            partner_selection: detail(&keys.partner_selection),
            partner_reason: detail(&keys.partner_reason),
            partnership_service: detail(&keys.partnership_service),
            partnership_details: detail(&keys.partnership_details),
            fallback: None,
        }
    }
}

/// Look up `key` in `payload`, treating it as a dot-separated path when no
/// literal key matches.
///
/// Example: `lookup(&map, "request.rawRequest")` returns `map["request"]["rawRequest"]`.
fn lookup<'a>(payload: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    if let Some(value) = payload.get(key) {
        return Some(value);
    }

    let (head, rest) = key.split_once('.')?;
    rest.split('.')
        .try_fold(payload.get(head)?, |current, segment| current.get(segment))
}

#[cfg(test)]
#[path = "payload_tests.rs"]
mod tests;
