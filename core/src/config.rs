//! Handler-level configuration.
//!
//! Authentication defaults and the error policy are fixed when the handler
//! is built and never change afterwards. They come from code, from a TOML
//! document, or from `REST_HANDLER_*` environment variables.

use serde::{Deserialize, Serialize};

use crate::auth::{AuthConfig, AuthType};
use crate::error::RestError;

/// What `execute_work_item` does with an invocation error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log the error. A rejected response still completes the work item
    /// with its `Status`; any other failure leaves it uncompleted.
    #[default]
    Log,
    /// Return the error to the caller.
    Throw,
}

impl std::str::FromStr for ErrorPolicy {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "log" => Ok(ErrorPolicy::Log),
            "throw" => Ok(ErrorPolicy::Throw),
            other => Err(RestError::Config(format!("unknown error policy '{other}'"))),
        }
    }
}

/// Serializable handler configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    pub auth_type: AuthType,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_url: Option<String>,
    pub error_policy: ErrorPolicy,
}

impl HandlerConfig {
    /// No authentication.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Preemptive HTTP Basic with the given credentials.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Basic,
            username: Some(username.into()),
            password: Some(password.into()),
            ..Self::default()
        }
    }

    /// Form-based login posting to `auth_url`.
    pub fn form_based(
        username: impl Into<String>,
        password: impl Into<String>,
        auth_url: impl Into<String>,
    ) -> Self {
        Self {
            auth_type: AuthType::FormBased,
            username: Some(username.into()),
            password: Some(password.into()),
            auth_url: Some(auth_url.into()),
            ..Self::default()
        }
    }

    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self, RestError> {
        toml::from_str(text).map_err(|e| RestError::Config(e.to_string()))
    }

    /// Read `REST_HANDLER_AUTH_TYPE`, `REST_HANDLER_USERNAME`,
    /// `REST_HANDLER_PASSWORD`, `REST_HANDLER_AUTH_URL` and
    /// `REST_HANDLER_ERROR_POLICY`. Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, RestError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RestError> {
        let mut config = Self::default();
        if let Some(v) = lookup("REST_HANDLER_AUTH_TYPE") {
            config.auth_type = v.parse()?;
        }
        config.username = lookup("REST_HANDLER_USERNAME");
        config.password = lookup("REST_HANDLER_PASSWORD");
        config.auth_url = lookup("REST_HANDLER_AUTH_URL");
        if let Some(v) = lookup("REST_HANDLER_ERROR_POLICY") {
            config.error_policy = v.parse()?;
        }
        Ok(config)
    }

    pub fn auth(&self) -> AuthConfig {
        AuthConfig {
            strategy: self.auth_type,
            username: self.username.clone(),
            password: self.password.clone(),
            auth_url: self.auth_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn constructors_pick_the_strategy() {
        assert_eq!(HandlerConfig::anonymous().auth_type, AuthType::None);
        assert_eq!(HandlerConfig::basic("u", "p").auth_type, AuthType::Basic);
        let form = HandlerConfig::form_based("u", "p", "http://host/j_security_check");
        assert_eq!(form.auth_type, AuthType::FormBased);
        assert_eq!(form.auth().auth_url.as_deref(), Some("http://host/j_security_check"));
    }

    #[test]
    fn loads_from_toml() {
        let config = HandlerConfig::from_toml_str(
            r#"
            auth_type = "FORM_BASED"
            username = "admin"
            password = "secret"
            auth_url = "http://localhost:8080/j_security_check"
            error_policy = "log"
            "#,
        )
        .unwrap();
        assert_eq!(config.auth_type, AuthType::FormBased);
        assert_eq!(config.username.as_deref(), Some("admin"));
        assert_eq!(config.error_policy, ErrorPolicy::Log);
    }

    #[test]
    fn empty_toml_is_anonymous() {
        assert_eq!(HandlerConfig::from_toml_str("").unwrap(), HandlerConfig::anonymous());
    }

    #[test]
    fn errors_are_logged_by_default() {
        assert_eq!(HandlerConfig::default().error_policy, ErrorPolicy::Log);
        assert_eq!(HandlerConfig::basic("u", "p").error_policy, ErrorPolicy::Log);
    }

    #[test]
    fn toml_auth_type_is_case_insensitive() {
        let config = HandlerConfig::from_toml_str("auth_type = \"basic\"").unwrap();
        assert_eq!(config.auth_type, AuthType::Basic);
        let rendered = toml::to_string(&HandlerConfig::form_based("u", "p", "http://host/login")).unwrap();
        assert!(rendered.contains("auth_type = \"FORM_BASED\""), "{rendered}");
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        let err = HandlerConfig::from_toml_str("auth_type = \"DIGEST\"").unwrap_err();
        assert!(matches!(err, RestError::Config(_)));
    }

    #[test]
    fn reads_environment_style_lookup() {
        let vars: HashMap<&str, &str> = [
            ("REST_HANDLER_AUTH_TYPE", "basic"),
            ("REST_HANDLER_USERNAME", "admin"),
            ("REST_HANDLER_PASSWORD", "secret"),
            ("REST_HANDLER_ERROR_POLICY", "LOG"),
        ]
        .into_iter()
        .collect();
        let config = HandlerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config, HandlerConfig::basic("admin", "secret").with_error_policy(ErrorPolicy::Log));
    }

    #[test]
    fn unknown_env_auth_type_fails() {
        let err = HandlerConfig::from_lookup(|k| (k == "REST_HANDLER_AUTH_TYPE").then(|| "digest".to_string()))
            .unwrap_err();
        assert!(matches!(err, RestError::UnknownAuthenticationType(_)));
    }
}
