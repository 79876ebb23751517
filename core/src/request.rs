//! Translates the invocation parameters into a `RequestSpec`.
//!
//! # Design
//! Building is pure: nothing here touches the network, so every validation
//! failure (unknown method, bad URL, missing content type) is reported
//! before a request could be sent. Retries and redirects are the executor's
//! business, not the builder's.

use tracing::debug;

use crate::content;
use crate::error::RestError;
use crate::http::{HttpMethod, RequestSpec};
use crate::params::{self, InvocationParameters, ParamValue};

/// Build the request for `method` and `url`, taking the body from `params`.
///
/// A missing or blank method means GET. Only POST and PUT attach `Content`;
/// textual content is sent verbatim, anything else is serialized according
/// to `ContentType`.
pub fn build_request(
    method: Option<&str>,
    url: &str,
    params: &InvocationParameters,
) -> Result<RequestSpec, RestError> {
    let method = match method.map(str::trim).filter(|m| !m.is_empty()) {
        Some(m) => m.parse::<HttpMethod>()?,
        None => HttpMethod::Get,
    };
    let parsed = url::Url::parse(url).map_err(|e| RestError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(RestError::InvalidUrl {
            url: url.to_string(),
            reason: "not a hierarchical URL".to_string(),
        });
    }

    let mut spec = RequestSpec::new(method, url);
    if method.accepts_body() {
        if let Some(content) = params.get(params::CONTENT) {
            let content_type = params
                .non_blank(params::CONTENT_TYPE)?
                .ok_or(RestError::MissingParameter(params::CONTENT_TYPE))?;
            let body = match content {
                ParamValue::Text(text) => text.clone().into_bytes(),
                other => content::serialize(&other.to_json(), content_type)?,
            };
            spec.headers.push(("Content-Type".to_string(), content_type.to_string()));
            spec.content_type = Some(content_type.to_string());
            spec.body = Some(body);
        }
    }
    debug!(%method, url, has_body = spec.body.is_some(), "built request");
    Ok(spec)
}
