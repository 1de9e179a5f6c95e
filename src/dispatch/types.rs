use serde::{Deserialize, Serialize};
use std::fmt;

/// Methods the workbench can issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    /// Whether requests of this method carry a body on the wire.
    pub fn has_body(self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One header row as edited in the form, and one header as captured from a
/// response. Order matters on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderEntry {
    pub name: String,
    pub value: String,
}

impl HeaderEntry {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Everything the user can type or toggle before pressing a method button.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestForm {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub headers: Vec<HeaderEntry>,
    #[serde(default)]
    pub trust_all: bool,
}

/// Uniform record of one dispatch outcome.
///
/// Failures are not a separate type: a record with code -1 stands in for
/// any URL-parse or transport failure, so observers only ever see state,
/// never errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub success: bool,
    pub code: i32,
    pub message: String,
    pub body: String,
    #[serde(default)]
    pub headers: Vec<HeaderEntry>,
}

impl ResponseRecord {
    /// Record for a completed HTTP exchange. Any status counts as
    /// completed; non-2xx simply leaves the success flag unset.
    pub fn completed(code: u16, message: String, body: String, headers: Vec<HeaderEntry>) -> Self {
        Self {
            success: (200..300).contains(&code),
            code: i32::from(code),
            message,
            body,
            headers,
        }
    }

    /// Synthesized record for a failure that produced no response.
    pub fn failure(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            success: false,
            code: -1,
            message: message.into(),
            body: cause.into(),
            headers: Vec::new(),
        }
    }
}
