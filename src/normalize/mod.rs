//! Maps transport and HTTP failures onto the single error shape callers see.

mod compat;

use std::fmt;

use reqwest::StatusCode;
use serde_json::{Map, Value};

pub const TRANSPORT_MESSAGE: &str =
    "Unable to reach the server. Check your connection and try again.";
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please log in again.";
pub const SERVER_ERROR_MESSAGE: &str = "Something went wrong on our end. Please try again later.";
pub const TRY_AGAIN_MESSAGE: &str =
    "The server is busy and could not finish your request. Please try again.";
const DECODE_MESSAGE: &str = "The server sent a response that could not be read.";
const ENCODE_MESSAGE: &str = "The request could not be prepared.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No response reached the client.
    Transport,
    /// The session could not be renewed; the user must log in again.
    SessionExpired,
    /// 4xx other than a recoverable 401.
    Client,
    /// 5xx.
    Server,
    /// A success response whose body did not match the expected shape.
    Decode,
    /// The request body could not be serialized; nothing was sent.
    Encode,
}

/// The normalized error every request-time failure is reported as.
#[derive(Debug, Clone)]
pub struct ApiError {
    kind: ErrorKind,
    status: Option<StatusCode>,
    message: String,
    payload: Value,
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// User-safe text.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The backend payload as parsed, for callers that need to branch on it.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn is_session_expired(&self) -> bool {
        self.kind == ErrorKind::SessionExpired
    }

    pub(crate) fn transport(err: &reqwest::Error) -> Self {
        Self {
            kind: ErrorKind::Transport,
            status: None,
            message: TRANSPORT_MESSAGE.to_string(),
            payload: single_field("detail", err.to_string()),
        }
    }

    pub(crate) fn session_expired(reason: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::SessionExpired,
            status: Some(StatusCode::UNAUTHORIZED),
            message: SESSION_EXPIRED_MESSAGE.to_string(),
            payload: single_field("reason", reason),
        }
    }

    pub(crate) fn decode(status: StatusCode, raw: &str) -> Self {
        Self {
            kind: ErrorKind::Decode,
            status: Some(status),
            message: DECODE_MESSAGE.to_string(),
            payload: Value::String(raw.to_string()),
        }
    }

    pub(crate) fn encode(err: &serde_json::Error) -> Self {
        Self {
            kind: ErrorKind::Encode,
            status: None,
            message: ENCODE_MESSAGE.to_string(),
            payload: single_field("detail", err.to_string()),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ApiError {}

/// Builds the [`ApiError`] for a non-success response.
///
/// `body` may be JSON, plain text, or empty. Client-error messages reach the
/// caller verbatim; server errors are replaced with a generic message while
/// the original payload stays available through [`ApiError::payload`].
pub fn normalize(status: StatusCode, body: &str) -> ApiError {
    let payload = parse_payload(body);
    let extracted = extract_message(&payload)
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));

    let message = if !status.is_server_error() {
        extracted
    } else if compat::is_transient_backend_failure(&payload, &extracted) {
        TRY_AGAIN_MESSAGE.to_string()
    } else {
        SERVER_ERROR_MESSAGE.to_string()
    };

    let kind = if status.is_server_error() {
        ErrorKind::Server
    } else {
        ErrorKind::Client
    };

    ApiError {
        kind,
        status: Some(status),
        message,
        payload,
    }
}

fn single_field(name: &str, text: impl Into<String>) -> Value {
    Value::Object(Map::from_iter([(name.to_string(), Value::String(text.into()))]))
}

fn parse_payload(body: &str) -> Value {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Value::Object(Map::new());
    }
    // bare strings and string arrays still yield a message; other scalars
    // fall back to the status text
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value @ Value::Object(_)) => value,
        Ok(value) => Value::Object(Map::from_iter([("message".to_string(), value)])),
        Err(_) => single_field("message", trimmed.to_string()),
    }
}

fn extract_message(payload: &Value) -> Option<String> {
    for field in ["message", "error"] {
        match payload.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.clone()),
            Some(Value::Array(items)) => {
                let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                if !parts.is_empty() {
                    return Some(parts.join(", "));
                }
            }
            _ => {}
        }
    }
    None
}
