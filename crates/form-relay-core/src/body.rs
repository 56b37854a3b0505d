//! Decoding of inbound request bodies into JSON values.
//!
//! The form service posts either JSON or `application/x-www-form-urlencoded`
//! bodies. Form bodies use bracket keys for composite and multi-select
//! questions, which are expanded here:
//!
//! | Form pair            | Resulting JSON                      |
//! |----------------------|-------------------------------------|
//! | `q3_name[first]=Ada` | `{"q3_name": {"first": "Ada"}}`     |
//! | `q20_pick[]=x`       | `{"q20_pick": ["x"]}`               |
//! | `k=a&k=b`            | `{"k": ["a", "b"]}`                 |

use crate::payload::NormalizationError;
use serde_json::{Map, Value};
use url::form_urlencoded;

/// Wire encoding of an inbound body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEncoding {
    Json,
    Form,
}

impl BodyEncoding {
    /// Pick the encoding from a `Content-Type` header value.
    ///
    /// Anything other than a URL-encoded form is treated as JSON, matching
    /// senders that omit or mislabel the content type.
    pub fn from_content_type(content_type: Option<&str>) -> Self {
        let media_type = content_type
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase());

        match media_type.as_deref() {
            Some("application/x-www-form-urlencoded") => Self::Form,
            _ => Self::Json,
        }
    }

    /// Decode `body` into a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizationError::InvalidJson`] for JSON bodies that do not
    /// parse. Form decoding never fails.
    pub fn decode(self, body: &[u8]) -> Result<Value, NormalizationError> {
        match self {
            Self::Json => {
                serde_json::from_slice(body).map_err(|e| NormalizationError::InvalidJson {
                    message: e.to_string(),
                })
            }
            Self::Form => Ok(decode_form(body)),
        }
    }
}

/// Decode a URL-encoded form body into a JSON object.
pub fn decode_form(body: &[u8]) -> Value {
    let mut root = Map::new();
    for (key, value) in form_urlencoded::parse(body) {
        insert_pair(&mut root, &key, value.into_owned());
    }
    Value::Object(root)
}

fn insert_pair(root: &mut Map<String, Value>, key: &str, value: String) {
    match split_bracket_key(key) {
        Some((base, "")) => {
            let slot = root
                .entry(base.to_string())
                .or_insert_with(|| Value::Array(Vec::new()));
            append(slot, value);
        }
        Some((base, sub_key)) => {
            let slot = root
                .entry(base.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                // A flat value arrived first; the composite wins.
                *slot = Value::Object(Map::new());
            }
            if let Value::Object(parts) = slot {
                parts.insert(sub_key.to_string(), Value::String(value));
            }
        }
        None => match root.get_mut(key) {
            Some(slot) => append(slot, value),
            None => {
                root.insert(key.to_string(), Value::String(value));
            }
        },
    }
}

/// Split `base[sub]` into `("base", "sub")`; `base[]` yields an empty sub key.
fn split_bracket_key(key: &str) -> Option<(&str, &str)> {
    let open = key.find('[')?;
    if open == 0 {
        return None;
    }
    let sub_key = key[open + 1..].strip_suffix(']')?;
    Some((&key[..open], sub_key))
}

fn append(slot: &mut Value, value: String) {
    match slot {
        Value::Array(items) => items.push(Value::String(value)),
        other => {
            let previous = other.take();
            *other = Value::Array(vec![previous, Value::String(value)]);
        }
    }
}

#[cfg(test)]
#[path = "body_tests.rs"]
mod tests;
