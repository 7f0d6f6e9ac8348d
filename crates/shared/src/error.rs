use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
    Other,
}

impl ErrorCode {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 | 422 => ErrorCode::BadRequest,
            401 => ErrorCode::Unauthorized,
            403 => ErrorCode::Forbidden,
            404 => ErrorCode::NotFound,
            409 => ErrorCode::Conflict,
            500..=599 => ErrorCode::Internal,
            _ => ErrorCode::Other,
        }
    }
}

/// What the backend put in an error response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ServerErrorBody {
    Message(String),
    Fields(BTreeMap<String, Vec<String>>),
    Empty,
}

impl ServerErrorBody {
    /// Classifies a decoded error body.
    ///
    /// A string `message` (or DRF's `detail`/`error`) wins. A `message` that is
    /// itself an object is treated as serializer field errors, as is a bare
    /// object of `field -> [messages]`.
    pub fn from_json(body: &Value) -> Self {
        let Some(object) = body.as_object() else {
            return match body {
                Value::String(text) if !text.trim().is_empty() => {
                    ServerErrorBody::Message(text.clone())
                }
                _ => ServerErrorBody::Empty,
            };
        };

        for key in ["message", "detail", "error"] {
            match object.get(key) {
                Some(Value::String(text)) if !text.trim().is_empty() => {
                    return ServerErrorBody::Message(text.clone());
                }
                Some(nested @ Value::Object(_)) => {
                    let fields = collect_field_errors(nested);
                    if !fields.is_empty() {
                        return ServerErrorBody::Fields(fields);
                    }
                }
                _ => {}
            }
        }

        let fields = collect_field_errors(body);
        if fields.is_empty() {
            ServerErrorBody::Empty
        } else {
            ServerErrorBody::Fields(fields)
        }
    }

    /// Inline text for the screen; `fallback` is used when the server said nothing useful.
    pub fn display(&self, fallback: &str) -> String {
        match self {
            ServerErrorBody::Message(message) => message.clone(),
            ServerErrorBody::Fields(fields) => fields
                .iter()
                .map(|(field, messages)| format!("{field}: {}", messages.join(", ")))
                .collect::<Vec<_>>()
                .join("\n"),
            ServerErrorBody::Empty => fallback.to_string(),
        }
    }
}

fn collect_field_errors(body: &Value) -> BTreeMap<String, Vec<String>> {
    let mut fields = BTreeMap::new();
    let Some(object) = body.as_object() else {
        return fields;
    };

    for (field, value) in object {
        if field == "status" {
            continue;
        }
        let messages = match value {
            Value::Array(items) => items.iter().map(value_text).collect::<Vec<_>>(),
            Value::Null => continue,
            other => vec![value_text(other)],
        };
        if !messages.is_empty() {
            fields.insert(field.clone(), messages);
        }
    }
    fields
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{code:?} ({status}): {}", .body.display("no details"))]
pub struct ApiError {
    pub code: ErrorCode,
    pub status: u16,
    pub body: ServerErrorBody,
}

impl ApiError {
    pub fn new(status: u16, body: ServerErrorBody) -> Self {
        Self {
            code: ErrorCode::from_status(status),
            status,
            body,
        }
    }

    pub fn from_response(status: u16, body: &Value) -> Self {
        Self::new(status, ServerErrorBody::from_json(body))
    }
}

#[cfg(test)]
#[path = "tests/error_tests.rs"]
mod tests;
