//! Common error types and handling for Leanweb
//!
//! Errors reach the client in one of three shapes: a bare numeric code, a
//! plain message, or a structured object. Each shape resolves to a status and
//! a user-facing message exactly once, at the error-rendering boundary.

use std::fmt;

use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Message shown for errors reported as a bare numeric code
pub const GENERIC_CODE_MESSAGE: &str = "Internal Server Error.";

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Structured error payload.
///
/// `status` selects the HTTP status, `message` the user-facing text.
/// `code` carries upstream error codes (BaaS numeric codes, parser codes).
/// `stack` is diagnostic only and never leaves the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorObject {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_code(mut self, code: impl Into<Value>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Attach an extra field, serialized alongside the known ones
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Status to respond with; absent or zero means 500
    fn resolved_status(&self) -> StatusCode {
        self.status
            .filter(|s| *s != 0)
            .and_then(|s| StatusCode::from_u16(s).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.message.as_deref().filter(|m| !m.is_empty()) {
            Some(message) => f.write_str(message),
            None => {
                let mut object = self.clone();
                object.stack = None;
                write!(f, "{}", object.to_json())
            }
        }
    }
}

/// Common error type for the Leanweb application
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Bare status code, e.g. `Error::Code(404)`
    #[error("Error code {0}")]
    Code(u16),

    /// Client-facing message, always a 400
    #[error("{0}")]
    Message(String),

    #[error("{0}")]
    Structured(ErrorObject),
}

/// Status and message an error resolves to
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub status: StatusCode,
    pub message: String,
}

impl Error {
    /// Structured error with an explicit status
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Error::Structured(
            ErrorObject::new()
                .with_status(status.as_u16())
                .with_message(message),
        )
    }

    pub fn message(message: impl Into<String>) -> Self {
        Error::Message(message.into())
    }

    /// Server fault built from a Rust error; the source chain becomes the stack
    pub fn internal(err: &(dyn std::error::Error + 'static)) -> Self {
        let mut stack = format!("Error: {}", err);
        let mut source = err.source();
        while let Some(cause) = source {
            stack.push_str(&format!("\n    caused by: {}", cause));
            source = cause.source();
        }

        Error::Structured(
            ErrorObject::new()
                .with_message(err.to_string())
                .with_stack(stack),
        )
    }

    /// Classify the error into a status and message
    pub fn resolve(&self) -> Resolved {
        match self {
            Error::Code(code) => Resolved {
                status: StatusCode::from_u16(*code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                message: GENERIC_CODE_MESSAGE.to_string(),
            },
            Error::Message(message) => Resolved {
                status: StatusCode::BAD_REQUEST,
                message: message.clone(),
            },
            Error::Structured(object) => Resolved {
                status: object.resolved_status(),
                message: object.to_string(),
            },
        }
    }

    /// Only 500s are server faults worth operator attention
    pub fn is_server_fault(&self) -> bool {
        self.resolve().status == StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn stack(&self) -> Option<&str> {
        match self {
            Error::Structured(object) => object.stack.as_deref(),
            _ => None,
        }
    }

    /// Text recorded in the operator log: the stack if any, else the raw value
    pub fn fault_report(&self) -> String {
        match self.stack() {
            Some(stack) => stack.to_string(),
            None => self.to_json().to_string(),
        }
    }

    /// Drop diagnostic-only fields before the error leaves the server
    pub fn sanitize(&mut self) {
        if let Error::Structured(object) = self {
            object.stack = None;
        }
    }

    /// Serialized form of the error value
    pub fn to_json(&self) -> Value {
        match self {
            Error::Code(code) => Value::from(*code),
            Error::Message(message) => Value::String(message.clone()),
            Error::Structured(object) => object.to_json(),
        }
    }
}

/// Provisional rendering. The error itself travels in the response
/// extensions so the error-rendering layer can re-render it with request
/// context (XHR or page).
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.resolve().status;

        let mut sanitized = self.clone();
        sanitized.sanitize();

        let mut response = (status, Json(sanitized.to_json())).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

/// Whether the request expects a machine-readable response
pub fn is_xhr(headers: &HeaderMap) -> bool {
    headers
        .get("x-requested-with")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("xmlhttprequest"))
        .unwrap_or(false)
}
