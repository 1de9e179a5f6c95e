//! HTTP transport seam.
//!
//! The dispatcher talks to the network through the `Transport` trait so
//! tests can substitute a scripted implementation. The real implementation
//! rides on two prebuilt reqwest clients, one with normal certificate
//! validation and one that trusts anything.

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::redirect;
use thiserror::Error;
use url::Url;

use super::response::root_cause;
use super::types::{HeaderEntry, Method};

/// Connect, read, and whole-call timeout applied to every request.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(2);

/// At most this many body bytes are read from a response; the rest of the
/// stream is abandoned.
pub const BODY_CAPTURE_LIMIT: usize = 100_000;

const MAX_REDIRECTS: usize = 20;

/// Content type attached to POST/PUT bodies when the form supplies none.
const DEFAULT_BODY_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// How one header row lands on the outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
    /// Drop any already-applied header of the same name, then set this one.
    Replace,
    /// Append, permitting duplicate names.
    Append,
}

/// A fully resolved request, ready for the wire. The dispatcher has
/// already applied the form's header-row quirks; what remains here is
/// mechanical.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(HeaderEntry, HeaderMode)>,
    /// `None` for methods that send no body.
    pub body: Option<String>,
    pub trust_all: bool,
}

/// Raw result of one exchange, before normalization.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub status: u16,
    /// Canonical reason phrase; empty for codes without one.
    pub message: String,
    pub headers: Vec<HeaderEntry>,
    /// Body bytes, at most `BODY_CAPTURE_LIMIT` of them.
    pub body: Vec<u8>,
}

/// A transport failure flattened to the fields a failure record needs.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
    /// Deepest underlying cause, empty when there is none.
    pub cause: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    Timeout,
    Connect,
    Request,
    Other,
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_request() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        Self {
            kind,
            message: err.to_string(),
            cause: root_cause(&err),
        }
    }
}

/// Trait for transports that perform one HTTP exchange.
///
/// The contract mirrors the blocking `execute` call of the underlying
/// client library: either a raw response comes back or a single error
/// does, within the fixed timeouts.
pub trait Transport: Send + Sync {
    /// Performs the exchange described by `request`.
    fn execute(
        &self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawCapture, TransportError>> + Send + '_>>;
}

/// Default transport over reqwest.
///
/// Both clients are built once up front: request time never pays for
/// client construction, and a bad TLS/runtime environment surfaces at
/// startup instead of on the first dispatch.
pub struct HttpTransport {
    normal: reqwest::Client,
    trusting: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let normal = base_builder().build()?;
        let trusting = base_builder().danger_accept_invalid_certs(true).build()?;
        Ok(Self { normal, trusting })
    }

    /// Creates a new transport wrapped in an `Arc`.
    pub fn arc() -> Result<Arc<Self>, TransportError> {
        Ok(Arc::new(Self::new()?))
    }

    async fn perform(&self, request: TransportRequest) -> Result<RawCapture, TransportError> {
        let headers = build_header_map(&request);
        let client = if request.trust_all {
            &self.trusting
        } else {
            &self.normal
        };

        let mut builder = client
            .request(to_reqwest(request.method), request.url)
            .headers(headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let mut response = builder.send().await?;

        let status = response.status();
        let message = status.canonical_reason().unwrap_or_default().to_string();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                HeaderEntry::new(name.as_str(), String::from_utf8_lossy(value.as_bytes()))
            })
            .collect();

        let mut body: Vec<u8> = Vec::new();
        while body.len() < BODY_CAPTURE_LIMIT {
            match response.chunk().await? {
                Some(chunk) => body.extend_from_slice(&chunk),
                None => break,
            }
        }
        body.truncate(BODY_CAPTURE_LIMIT);

        Ok(RawCapture {
            status: status.as_u16(),
            message,
            headers,
            body,
        })
    }
}

impl Transport for HttpTransport {
    fn execute(
        &self,
        request: TransportRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawCapture, TransportError>> + Send + '_>> {
        Box::pin(self.perform(request))
    }
}

fn base_builder() -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .connect_timeout(CALL_TIMEOUT)
        .read_timeout(CALL_TIMEOUT)
        .timeout(CALL_TIMEOUT)
        .redirect(redirect::Policy::limited(MAX_REDIRECTS))
}

fn to_reqwest(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
    }
}

/// Applies the resolved header rows to an outgoing header map. Rows whose
/// name or value fails header grammar are skipped; a broken row must not
/// take the whole request down with it.
fn build_header_map(request: &TransportRequest) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (entry, mode) in &request.headers {
        let name = match HeaderName::from_str(&entry.name) {
            Ok(name) => name,
            Err(_) => {
                tracing::debug!(name = %entry.name, "Skipping header with invalid name");
                continue;
            }
        };
        let value = match HeaderValue::from_str(&entry.value) {
            Ok(value) => value,
            Err(_) => {
                tracing::debug!(name = %entry.name, "Skipping header with invalid value");
                continue;
            }
        };
        match mode {
            HeaderMode::Replace => {
                map.insert(name, value);
            }
            HeaderMode::Append => {
                map.append(name, value);
            }
        }
    }
    if request.method.has_body() && !map.contains_key(CONTENT_TYPE) {
        map.insert(CONTENT_TYPE, HeaderValue::from_static(DEFAULT_BODY_CONTENT_TYPE));
    }
    map
}

#[cfg(test)]
pub use mock::MockTransport;
