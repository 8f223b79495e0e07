//! # Response Envelopes
//!
//! The backend is inconsistent about how it wraps payloads. Every response
//! body passes through this module exactly once, inside the HTTP client, so
//! the rest of the register only ever sees canonical types.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shape                                   unwrap_payload   unwrap_list   │
//! │  ─────                                   ──────────────   ───────────   │
//! │  { ...payload }                          payload          -             │
//! │  [ ...items ]                            -                items         │
//! │  { "data": payload }                     payload          payload[]     │
//! │  { "content": [...], "totalElements" }   -                content       │
//! │  { "data": { "content": [...] } }        -                content       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Strips a `{ "data": ... }` wrapper if there is one.
fn strip_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decodes a single object from a bare or `{data}`-wrapped body.
pub fn unwrap_payload<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    let inner = strip_data(value);
    serde_json::from_value(inner).map_err(|e| ApiError::InvalidResponse(e.to_string()))
}

/// Decodes a list from a bare array, `{data}`, or a paginated `{content}` page.
pub fn unwrap_list<T: DeserializeOwned>(value: Value) -> ApiResult<Vec<T>> {
    let items = match strip_data(value) {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("content") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(ApiError::InvalidResponse(
                    "expected a list or a page with `content`".to_string(),
                ))
            }
        },
        Value::Null => Vec::new(),
        other => {
            return Err(ApiError::InvalidResponse(format!(
                "expected a list, got {}",
                kind(&other)
            )))
        }
    };

    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(|e| ApiError::InvalidResponse(e.to_string())))
        .collect()
}

/// Pulls a human-readable message out of an error body.
///
/// Looks at `message`, `error`, then `errors` (strings or objects carrying
/// `message` / `defaultMessage`), at the top level and under `data`. Short
/// plain-text bodies are used as-is; HTML error pages are ignored.
pub fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(body) {
        Ok(value) => message_in(&value).or_else(|| value.get("data").and_then(message_in)),
        Err(_) if !body.starts_with('<') && body.chars().count() <= 200 => Some(body.to_string()),
        Err(_) => None,
    }
}

/// Collects every message from a list-style `errors` field.
pub fn error_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text_of).collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        Value::Object(map) => map.values().filter_map(text_of).collect(),
        _ => Vec::new(),
    }
}

fn message_in(value: &Value) -> Option<String> {
    for key in ["message", "error"] {
        if let Some(text) = value.get(key).and_then(text_of) {
            return Some(text);
        }
    }
    let errors = error_list(value.get("errors")?);
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("; "))
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(_) => value
            .get("message")
            .or_else(|| value.get("defaultMessage"))
            .and_then(text_of),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
