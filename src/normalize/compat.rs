//! Compatibility shim for backends that report transient database failures
//! only in free-text messages. A structured `code` field is consulted first.

use serde_json::Value;

const TRANSIENT_CODES: &[&str] = &["TRANSACTION_TIMEOUT", "DATABASE_TIMEOUT", "DB_TIMEOUT"];

const TRANSIENT_PHRASES: &[&str] = &[
    "transaction timeout",
    "transaction already closed",
    "timed out fetching a new connection",
    "can't reach database",
    "connection pool timeout",
];

pub(super) fn is_transient_backend_failure(payload: &Value, message: &str) -> bool {
    if let Some(code) = payload.get("code").and_then(Value::as_str) {
        return TRANSIENT_CODES
            .iter()
            .any(|known| code.eq_ignore_ascii_case(known));
    }
    let lowered = message.to_lowercase();
    TRANSIENT_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}
