//! Response normalization.
//!
//! Converts a raw transport capture into the uniform `ResponseRecord` the
//! rest of the application observes, reformatting JSON bodies along the
//! way.

use super::transport::RawCapture;
use super::types::ResponseRecord;

/// Builds the observable record for a completed exchange.
///
/// The captured body is decoded lossily, then reformatted when it parses
/// as a top-level JSON object or array. Everything else, including JSON
/// scalars and bodies truncated mid-document by the capture cap, passes
/// through unchanged.
pub fn normalize(raw: RawCapture) -> ResponseRecord {
    let text = String::from_utf8_lossy(&raw.body).into_owned();
    let body = match prettify_json(&text) {
        Some(pretty) => pretty,
        None => text,
    };
    ResponseRecord::completed(raw.status, raw.message, body, raw.headers)
}

/// Reformats `text` with 2-space indentation when it is a JSON object or
/// array, strictly parsed.
fn prettify_json(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    if value.is_object() || value.is_array() {
        serde_json::to_string_pretty(&value).ok()
    } else {
        None
    }
}

/// Deepest `source` in an error chain, or empty when the error stands
/// alone. Failure records carry this as their body text.
pub(crate) fn root_cause(err: &(dyn std::error::Error + 'static)) -> String {
    let mut deepest = None;
    let mut next = err.source();
    while let Some(cause) = next {
        deepest = Some(cause);
        next = cause.source();
    }
    deepest.map(|cause| cause.to_string()).unwrap_or_default()
}
