//! Invocation parameters handed over by the workflow engine.
//!
//! # Design
//! Parameter names are case-sensitive and match what process definitions
//! use (`Url`, `Method`, ...). Values arrive loosely typed, so every accessor
//! here applies the defaulting rule of its parameter: blank strings count as
//! absent, timeouts fall back to 60 seconds when unparsable, and
//! `HandleResponseErrors` follows Java boolean parsing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::RestError;

pub const URL: &str = "Url";
pub const METHOD: &str = "Method";
pub const CONTENT_TYPE: &str = "ContentType";
pub const CONTENT: &str = "Content";
pub const CONNECT_TIMEOUT: &str = "ConnectTimeout";
pub const READ_TIMEOUT: &str = "ReadTimeout";
pub const USERNAME: &str = "Username";
pub const PASSWORD: &str = "Password";
pub const AUTH_URL: &str = "AuthUrl";
pub const AUTH_TYPE: &str = "AuthType";
pub const HANDLE_RESPONSE_ERRORS: &str = "HandleResponseErrors";
pub const RESULT_CLASS: &str = "ResultClass";

/// Milliseconds used for both timeouts when none is configured.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// A single parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Structured(serde_json::Value),
}

impl ParamValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The value as JSON, for handing to a serializer.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Text(s) => serde_json::Value::String(s.clone()),
            ParamValue::Int(i) => serde_json::Value::from(*i),
            ParamValue::Bool(b) => serde_json::Value::Bool(*b),
            ParamValue::Structured(v) => v.clone(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<serde_json::Value> for ParamValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => ParamValue::Text(s),
            other => ParamValue::Structured(other),
        }
    }
}

/// Connect and read timeouts of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect_ms: u64,
    pub read_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect_ms: DEFAULT_TIMEOUT_MS,
            read_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

/// Parameter map of one work item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvocationParameters {
    values: HashMap<String, ParamValue>,
}

impl InvocationParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: impl Into<ParamValue>) {
        self.values.insert(name.to_string(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// A string parameter. Present values of another kind are rejected.
    pub fn text(&self, name: &'static str) -> Result<Option<&str>, RestError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(ParamValue::Text(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(RestError::InvalidParameter {
                name,
                reason: format!("expected a string, got {other:?}"),
            }),
        }
    }

    /// A string parameter with blank values treated as absent.
    pub fn non_blank(&self, name: &'static str) -> Result<Option<&str>, RestError> {
        Ok(self.text(name)?.filter(|s| !s.trim().is_empty()))
    }

    pub fn url(&self) -> Result<&str, RestError> {
        self.text(URL)?.ok_or(RestError::MissingParameter(URL))
    }

    pub fn method(&self) -> Result<Option<&str>, RestError> {
        self.non_blank(METHOD)
    }

    pub fn result_class(&self) -> Result<Option<&str>, RestError> {
        self.non_blank(RESULT_CLASS)
    }

    /// Only a case-insensitive `true` enables throwing on non-2xx responses.
    pub fn handle_response_errors(&self) -> bool {
        match self.values.get(HANDLE_RESPONSE_ERRORS) {
            Some(ParamValue::Bool(b)) => *b,
            Some(ParamValue::Text(s)) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect_ms: self.millis(CONNECT_TIMEOUT).unwrap_or(DEFAULT_TIMEOUT_MS),
            read_ms: self.millis(READ_TIMEOUT).unwrap_or(DEFAULT_TIMEOUT_MS),
        }
    }

    fn millis(&self, name: &str) -> Option<u64> {
        match self.values.get(name)? {
            ParamValue::Int(i) => u64::try_from(*i).ok(),
            ParamValue::Text(s) => s.trim().parse().ok(),
            ParamValue::Structured(v) => v.as_u64(),
            ParamValue::Bool(_) => None,
        }
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for InvocationParameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
