//! HTTP request and response descriptors.
//!
//! # Design
//! These types describe one exchange as plain data. `RequestSpec` is built
//! once per invocation and only ever borrowed afterwards; the executor turns
//! it into a fresh wire request on every `execute`, which is what lets the
//! form-based handshake send the same request twice. `ResponseOutcome` owns
//! the fully read body so no connection outlives the call that produced it.

use std::fmt;
use std::str::FromStr;

use crate::error::RestError;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }

    /// Whether requests with this method carry the `Content` parameter.
    pub fn accepts_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        [HttpMethod::Get, HttpMethod::Post, HttpMethod::Put, HttpMethod::Delete]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| RestError::UnsupportedMethod(trimmed.to_string()))
    }
}

/// A fully built outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<String>,
}

impl RequestSpec {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            content_type: None,
        }
    }

    /// Copy of this request with one more header.
    pub fn with_header(&self, name: &str, value: impl Into<String>) -> Self {
        let mut spec = self.clone();
        spec.headers.push((name.to_string(), value.into()));
        spec
    }

    /// First header value matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Status, reason and body of one completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseOutcome {
    pub status: u16,
    pub reason_phrase: String,
    pub body: Option<String>,
    pub content_type: Option<String>,
}

impl ResponseOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
