//! The dispatch pipeline.
//!
//! Turns a request form into exactly one `ResponseRecord`: guard the URL,
//! resolve the header rows, hand the rest to the transport, and flatten
//! whatever comes back. Nothing in here returns an error.

use std::sync::Arc;

use url::Url;

use super::response::{normalize, root_cause};
use super::transport::{HeaderMode, Transport, TransportRequest};
use super::types::{HeaderEntry, Method, RequestForm, ResponseRecord};

/// Executes requests against an injected transport.
#[derive(Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Runs one request to completion. Every outcome, including a URL that
    /// never reaches the wire, lands in the returned record.
    pub async fn dispatch(&self, method: Method, form: &RequestForm) -> ResponseRecord {
        let url = match parse_request_url(&form.url) {
            Ok(url) => url,
            Err(record) => {
                tracing::debug!(url = %form.url, message = %record.message, "Rejected URL before dispatch");
                return record;
            }
        };

        let request = TransportRequest {
            method,
            url,
            headers: resolve_header_rows(method, &form.headers),
            body: method.has_body().then(|| form.body.clone()),
            trust_all: form.trust_all,
        };

        tracing::debug!(
            method = %method,
            url = %form.url,
            trust_all = form.trust_all,
            "Dispatching request"
        );

        match self.transport.execute(request).await {
            Ok(raw) => {
                let record = normalize(raw);
                tracing::debug!(code = record.code, success = record.success, "Request completed");
                record
            }
            Err(err) => {
                tracing::warn!(kind = ?err.kind, message = %err.message, "Transport failure");
                ResponseRecord::failure(err.message, err.cause)
            }
        }
    }
}

/// URL guard. Anything the transport cannot fetch over HTTP(S) is rejected
/// here, so a bad URL never costs a network round trip.
fn parse_request_url(raw: &str) -> Result<Url, ResponseRecord> {
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        Ok(url) => Err(ResponseRecord::failure(
            format!("unsupported URL scheme '{}'", url.scheme()),
            String::new(),
        )),
        Err(err) => Err(ResponseRecord::failure(err.to_string(), root_cause(&err))),
    }
}

/// Resolves the form's header rows into the list the transport applies.
///
/// An empty name marks an unused form slot, and the two request paths
/// treat it differently: GET stops at the first one, POST and PUT skip it
/// and keep going. Position 0 is the row that replaces; any later row
/// appends, even when an empty slot pushed it to the front of the
/// surviving rows.
fn resolve_header_rows(method: Method, rows: &[HeaderEntry]) -> Vec<(HeaderEntry, HeaderMode)> {
    let mut resolved = Vec::new();
    for (index, row) in rows.iter().enumerate() {
        if row.name.is_empty() {
            if method == Method::Get {
                break;
            }
            continue;
        }
        let mode = if index == 0 {
            HeaderMode::Replace
        } else {
            HeaderMode::Append
        };
        resolved.push((row.clone(), mode));
    }
    resolved
}
