//! Maps a response onto the work-item completion contract.
//!
//! # Design
//! Success is decided from the status code alone: 2xx succeeds, anything
//! else fails. A failure is either raised as `RestError::RestService` or, in
//! log mode, turned into a descriptive `StatusMsg`; `Status` always carries
//! the numeric code.

use tracing::warn;

use crate::content::{self, ResultTypeRegistry, ResultValue};
use crate::error::RestError;
use crate::http::ResponseOutcome;

pub const STATUS: &str = "Status";
pub const STATUS_MSG: &str = "StatusMsg";
pub const RESULT: &str = "Result";

/// Output of one invocation, handed to the work-item manager.
#[derive(Debug)]
pub struct ResultBundle {
    pub status: u16,
    pub status_msg: String,
    pub result: Option<ResultValue>,
}

impl ResultBundle {
    pub fn result_text(&self) -> Option<&str> {
        self.result.as_ref().and_then(ResultValue::as_text)
    }

    /// The entries as a JSON map keyed `Status`, `StatusMsg` and `Result`.
    /// Typed results are rendered by their type name.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert(STATUS.to_string(), self.status.into());
        map.insert(STATUS_MSG.to_string(), self.status_msg.clone().into());
        match &self.result {
            Some(ResultValue::Text(text)) => {
                map.insert(RESULT.to_string(), text.clone().into());
            }
            Some(ResultValue::Typed(typed)) => {
                map.insert(RESULT.to_string(), typed.type_name().into());
            }
            None => {}
        }
        serde_json::Value::Object(map)
    }
}

/// Everything about the invocation the packager needs besides the outcome.
#[derive(Debug, Clone, Copy)]
pub struct PackagingContext<'a> {
    pub url: &'a str,
    pub result_class: Option<&'a str>,
    pub handle_response_errors: bool,
}

/// Turn `outcome` into a `ResultBundle`, or raise it as a service error.
pub fn package(
    outcome: ResponseOutcome,
    ctx: PackagingContext<'_>,
    registry: &ResultTypeRegistry,
) -> Result<ResultBundle, RestError> {
    let success = outcome.is_success();
    let ResponseOutcome {
        status,
        reason_phrase,
        body,
        content_type,
    } = outcome;
    let url = ctx.url;

    if success {
        let content_type = content_type.filter(|ct| !ct.is_empty());
        let result = match (ctx.result_class, content_type, body) {
            (Some(class), Some(ct), Some(body)) if !class.trim().is_empty() => {
                Some(content::deserialize(&body, &ct, Some(class), registry)?)
            }
            (_, _, body) => body.map(ResultValue::Text),
        };
        return Ok(ResultBundle {
            status,
            status_msg: format!("request to endpoint {url} successfully completed {reason_phrase}"),
            result,
        });
    }

    let body = body.unwrap_or_default();
    if ctx.handle_response_errors {
        return Err(RestError::RestService {
            status,
            body,
            url: url.to_string(),
        });
    }
    warn!(status, url, response = %body, "unsuccessful response from REST server");
    Ok(ResultBundle {
        status,
        status_msg: format!("endpoint {url} could not be reached: {body}"),
        result: None,
    })
}
