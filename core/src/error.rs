//! Error taxonomy for a single REST invocation.
//!
//! # Design
//! Validation and selection errors (`MissingParameter`, `UnsupportedMethod`,
//! `UnknownAuthenticationType`, ...) are raised before any request leaves the
//! process. `Network` and `Authentication` wrap transport failures and keep
//! the underlying cause as their `source`. `RestService` is the only variant
//! whose use is governed by a policy (`HandleResponseErrors`).

use thiserror::Error;

use crate::http::HttpMethod;

/// Boxed transport cause, kept opaque so executors other than ureq can report
/// their own failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The step of the form-based login handshake that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormStep {
    /// Unauthenticated request that triggers the login.
    Probe,
    /// Credential-bearing form POST to the auth URL.
    Login,
    /// Re-execution of the original request.
    Replay,
}

impl std::fmt::Display for FormStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormStep::Probe => write!(f, "probe"),
            FormStep::Login => write!(f, "login"),
            FormStep::Replay => write!(f, "replay"),
        }
    }
}

/// Errors raised by an invocation.
#[derive(Debug, Error)]
pub enum RestError {
    /// A required parameter (`Url`, `ContentType` for a body, ...) is absent.
    #[error("{0} is a required parameter")]
    MissingParameter(&'static str),

    /// A parameter is present but carries a value of the wrong shape.
    #[error("parameter {name} has an invalid value: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The `Url` parameter is not an absolute URL.
    #[error("invalid url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// HTTP method outside GET, POST, PUT and DELETE.
    #[error("Method {0} is not supported")]
    UnsupportedMethod(String),

    /// No transformer is available for the declared content type.
    #[error("Unable to find transformer for content type '{0}'")]
    UnsupportedContentType(String),

    /// `ResultClass` names a type absent from the result type registry.
    #[error("unknown result type '{0}'")]
    UnknownResultType(String),

    /// Basic or form-based authentication without a username or password.
    #[error("Could not find {0}")]
    MissingCredentials(&'static str),

    /// Form-based authentication without an authentication URL.
    #[error("Could not find authentication url")]
    MissingAuthUrl,

    /// `AuthType` is not one of NONE, BASIC, FORM_BASED.
    #[error("Unknown AuthenticationType {0}")]
    UnknownAuthenticationType(String),

    /// A request body could not be encoded for its content type.
    #[error("Unable to transform request to {content_type}: {reason}")]
    Serialization { content_type: String, reason: String },

    /// A response body could not be decoded into the requested result type.
    #[error("Unable to transform response to '{result_type}': {reason}")]
    Deserialization { result_type: String, reason: String },

    /// A step of the form-based login handshake failed.
    #[error("form-based authentication failed during {step}")]
    Authentication {
        step: FormStep,
        #[source]
        source: Box<RestError>,
    },

    /// Transport-level failure: DNS, refused connection, timeout, I/O.
    #[error("Could not execute request [{method}] {url}")]
    Network {
        method: HttpMethod,
        url: String,
        #[source]
        source: BoxError,
    },

    /// Non-2xx response while `HandleResponseErrors` is enabled.
    #[error("Unsuccessful response from REST server (status: {status}, endpoint: {url}, response: {body})")]
    RestService { status: u16, body: String, url: String },

    /// Handler configuration could not be loaded.
    #[error("invalid handler configuration: {0}")]
    Config(String),
}

impl RestError {
    /// HTTP status carried by a service error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            RestError::RestService { status, .. } => Some(*status),
            _ => None,
        }
    }
}
