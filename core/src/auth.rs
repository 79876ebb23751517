//! Authentication strategies wrapped around request execution.
//!
//! # Design
//! `AuthType` is the configured choice; `ResolvedAuth` is that choice with
//! its credential material already looked up and validated, so a missing
//! username or authentication URL is reported before anything is sent.
//! `execute_with_auth` is the single entry point, dispatching on the closed
//! set of strategies:
//!
//! - `None`: one request, as built.
//! - `Basic`: one request carrying `Authorization: Basic ...` from the start
//!   (preemptive; the server never has to issue a 401 challenge).
//! - `FormBased`: unauthenticated probe, credential form POST to the login
//!   endpoint, then the original request again on the same session.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{FormStep, RestError};
use crate::executor::HttpExecutor;
use crate::http::{HttpMethod, RequestSpec, ResponseOutcome};
use crate::params::{self, InvocationParameters};

/// Form field carrying the username in a login POST.
pub const USERNAME_FIELD: &str = "j_username";
/// Form field carrying the password in a login POST.
pub const PASSWORD_FIELD: &str = "j_password";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Authentication strategy of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AuthType {
    #[default]
    None,
    Basic,
    FormBased,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthType::None => write!(f, "NONE"),
            AuthType::Basic => write!(f, "BASIC"),
            AuthType::FormBased => write!(f, "FORM_BASED"),
        }
    }
}

impl FromStr for AuthType {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(AuthType::None),
            "BASIC" => Ok(AuthType::Basic),
            "FORM_BASED" => Ok(AuthType::FormBased),
            _ => Err(RestError::UnknownAuthenticationType(s.to_string())),
        }
    }
}

impl TryFrom<String> for AuthType {
    type Error = RestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AuthType> for String {
    fn from(value: AuthType) -> Self {
        value.to_string()
    }
}

/// Username and password pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Authorization` header value for HTTP Basic.
    pub fn basic_header(&self) -> String {
        let encoded = STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {encoded}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Handler-level authentication defaults, fixed at construction time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthConfig {
    pub strategy: AuthType,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_url: Option<String>,
}

/// Strategy with its credential material resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedAuth {
    None,
    Basic(Credentials),
    FormBased { credentials: Credentials, auth_url: String },
}

impl AuthConfig {
    /// Combine the handler defaults with the invocation parameters.
    ///
    /// `AuthType` overrides the configured strategy. Username and password
    /// override the defaults only when both are given; `AuthUrl` overrides
    /// on its own.
    pub fn resolve(&self, params: &InvocationParameters) -> Result<ResolvedAuth, RestError> {
        let strategy = match params.non_blank(params::AUTH_TYPE)? {
            Some(name) => name.parse()?,
            None => self.strategy,
        };
        match strategy {
            AuthType::None => Ok(ResolvedAuth::None),
            AuthType::Basic => Ok(ResolvedAuth::Basic(self.credentials(params)?)),
            AuthType::FormBased => {
                let credentials = self.credentials(params)?;
                let auth_url = params
                    .non_blank(params::AUTH_URL)?
                    .or(self.auth_url.as_deref())
                    .ok_or(RestError::MissingAuthUrl)?;
                Ok(ResolvedAuth::FormBased {
                    credentials,
                    auth_url: auth_url.to_string(),
                })
            }
        }
    }

    fn credentials(&self, params: &InvocationParameters) -> Result<Credentials, RestError> {
        let (username, password) = match (params.text(params::USERNAME)?, params.text(params::PASSWORD)?) {
            (Some(u), Some(p)) => (Some(u), Some(p)),
            _ => (self.username.as_deref(), self.password.as_deref()),
        };
        let username = username.ok_or(RestError::MissingCredentials("username"))?;
        let password = password.ok_or(RestError::MissingCredentials("password"))?;
        Ok(Credentials::new(username, password))
    }
}

impl ResolvedAuth {
    pub fn auth_type(&self) -> AuthType {
        match self {
            ResolvedAuth::None => AuthType::None,
            ResolvedAuth::Basic(_) => AuthType::Basic,
            ResolvedAuth::FormBased { .. } => AuthType::FormBased,
        }
    }
}

/// Execute `spec` under the resolved strategy and return the final outcome.
pub fn execute_with_auth(
    executor: &dyn HttpExecutor,
    spec: &RequestSpec,
    auth: &ResolvedAuth,
) -> Result<ResponseOutcome, RestError> {
    match auth {
        ResolvedAuth::None => executor.execute(spec),
        ResolvedAuth::Basic(credentials) => execute_basic(executor, spec, credentials),
        ResolvedAuth::FormBased { credentials, auth_url } => {
            execute_form_based(executor, spec, credentials, auth_url)
        }
    }
}

fn execute_basic(
    executor: &dyn HttpExecutor,
    spec: &RequestSpec,
    credentials: &Credentials,
) -> Result<ResponseOutcome, RestError> {
    if let Ok(target) = url::Url::parse(&spec.url) {
        debug!(
            scheme = target.scheme(),
            host = target.host_str().unwrap_or_default(),
            port = target.port_or_known_default(),
            "sending preemptive basic credentials"
        );
    }
    let authed = spec.with_header("Authorization", credentials.basic_header());
    executor.execute(&authed)
}

fn execute_form_based(
    executor: &dyn HttpExecutor,
    spec: &RequestSpec,
    credentials: &Credentials,
    auth_url: &str,
) -> Result<ResponseOutcome, RestError> {
    let step = |step: FormStep| {
        move |source: RestError| RestError::Authentication {
            step,
            source: Box::new(source),
        }
    };

    // The probe is only there to open the protected session; its outcome is
    // dropped here, releasing everything it held.
    let probe = executor.execute(spec).map_err(step(FormStep::Probe))?;
    if probe.status != 401 {
        warn!(
            status = probe.status,
            url = %spec.url,
            "expected status 401 from form authentication probe, proceeding anyway"
        );
    }
    drop(probe);

    let login = login_request(auth_url, credentials);
    executor.execute(&login).map_err(step(FormStep::Login))?;
    debug!(auth_url, "form login submitted");

    executor.execute(spec).map_err(step(FormStep::Replay))
}

fn login_request(auth_url: &str, credentials: &Credentials) -> RequestSpec {
    let form = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(USERNAME_FIELD, &credentials.username)
        .append_pair(PASSWORD_FIELD, &credentials.password)
        .finish();
    let mut login = RequestSpec::new(HttpMethod::Post, auth_url);
    login.headers.push(("Content-Type".to_string(), FORM_CONTENT_TYPE.to_string()));
    login.content_type = Some(FORM_CONTENT_TYPE.to_string());
    login.body = Some(form.into_bytes());
    login
}
