//! Tests for inbound body decoding.

use super::*;
use serde_json::json;

/// Verify content type detection, including parameters and case.
#[test]
fn test_encoding_from_content_type() {
    assert_eq!(
        BodyEncoding::from_content_type(Some("application/x-www-form-urlencoded")),
        BodyEncoding::Form
    );
    assert_eq!(
        BodyEncoding::from_content_type(Some("Application/X-WWW-Form-Urlencoded; charset=UTF-8")),
        BodyEncoding::Form
    );
    assert_eq!(
        BodyEncoding::from_content_type(Some("application/json")),
        BodyEncoding::Json
    );
    assert_eq!(BodyEncoding::from_content_type(None), BodyEncoding::Json);
}

/// Verify that JSON bodies are parsed.
#[test]
fn test_json_body_decodes() {
    let value = BodyEncoding::Json
        .decode(br#"{"q9_project":"Atlas"}"#)
        .unwrap();
    assert_eq!(value, json!({ "q9_project": "Atlas" }));
}

/// Verify that malformed JSON is reported as InvalidJson.
#[test]
fn test_malformed_json_is_rejected() {
    let result = BodyEncoding::Json.decode(b"{broken");
    assert!(matches!(result, Err(NormalizationError::InvalidJson { .. })));
}

/// Verify that flat form pairs become string fields.
#[test]
fn test_flat_form_pairs() {
    let value = decode_form(b"q9_project=Analytical+Engine&q10_telegramHandle=%40ada");
    assert_eq!(
        value,
        json!({ "q9_project": "Analytical Engine", "q10_telegramHandle": "@ada" })
    );
}

/// Verify that bracketed sub keys build a composite object.
#[test]
fn test_bracket_sub_keys_build_object() {
    let value = decode_form(b"q3_name%5Bfirst%5D=Ada&q3_name%5Blast%5D=Lovelace");
    assert_eq!(
        value,
        json!({ "q3_name": { "first": "Ada", "last": "Lovelace" } })
    );
}

/// Verify that empty brackets build a list.
#[test]
fn test_empty_brackets_build_list() {
    let value = decode_form(b"q20_selectPartners[]=Alice&q20_selectPartners[]=Bob");
    assert_eq!(value, json!({ "q20_selectPartners": ["Alice", "Bob"] }));
}

/// Verify that a repeated plain key becomes a list.
#[test]
fn test_repeated_key_becomes_list() {
    let value = decode_form(b"tag=a&tag=b&tag=c");
    assert_eq!(value, json!({ "tag": ["a", "b", "c"] }));
}

/// Verify that a rawRequest field survives form decoding as a string.
#[test]
fn test_raw_request_field_kept_as_string() {
    let body = "rawRequest=%7B%22q9_project%22%3A%22Atlas%22%7D&formID=42";
    let value = BodyEncoding::Form.decode(body.as_bytes()).unwrap();
    assert_eq!(value["rawRequest"], json!(r#"{"q9_project":"Atlas"}"#));
    assert_eq!(value["formID"], json!("42"));
}

/// Verify that a key starting with a bracket is kept literally.
#[test]
fn test_leading_bracket_key_is_literal() {
    let value = decode_form(b"%5Bodd%5D=1");
    assert_eq!(value, json!({ "[odd]": "1" }));
}
