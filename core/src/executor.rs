//! Blocking HTTP execution.
//!
//! # Design
//! `HttpExecutor` performs exactly one exchange per `execute` call; the
//! authentication strategy calls it repeatedly when its protocol needs more
//! than one round trip. A `Connector` opens one executor per invocation, and
//! that executor is the invocation's session: the ureq implementation keeps
//! a cookie store on its agent so a form login carries over to the replayed
//! request, and drops the agent (and its pooled connections) when the
//! invocation ends.
//!
//! Responses are read completely into memory before `execute` returns, so no
//! connection is ever held by a caller. Bodies are decoded from the charset
//! declared in `Content-Type`; bytes that still do not form UTF-8 are
//! replaced rather than failing an exchange that already completed.

use std::time::Duration;

use tracing::debug;
use ureq::http::header::CONTENT_TYPE;
use ureq::{Agent, RequestBuilder};

use crate::error::RestError;
use crate::http::{HttpMethod, RequestSpec, ResponseOutcome};
use crate::params::Timeouts;

/// Performs one HTTP exchange.
pub trait HttpExecutor {
    fn execute(&self, request: &RequestSpec) -> Result<ResponseOutcome, RestError>;
}

/// Opens a per-invocation executor session.
pub trait Connector: Send + Sync {
    fn connect(&self, timeouts: Timeouts) -> Box<dyn HttpExecutor>;
}

/// Production connector backed by `ureq`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqConnector;

impl Connector for UreqConnector {
    fn connect(&self, timeouts: Timeouts) -> Box<dyn HttpExecutor> {
        Box::new(UreqExecutor::new(timeouts))
    }
}

/// A ureq agent configured for one invocation.
///
/// Non-2xx statuses are returned as data rather than errors, leaving their
/// interpretation to the result packager.
pub struct UreqExecutor {
    agent: Agent,
}

impl UreqExecutor {
    pub fn new(timeouts: Timeouts) -> Self {
        let read = timeout(timeouts.read_ms);
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(timeout(timeouts.connect_ms))
            .timeout_send_request(read)
            .timeout_send_body(read)
            .timeout_recv_response(read)
            .timeout_recv_body(read)
            .build()
            .new_agent();
        Self { agent }
    }
}

/// Zero means no timeout.
fn timeout(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl HttpExecutor for UreqExecutor {
    fn execute(&self, request: &RequestSpec) -> Result<ResponseOutcome, RestError> {
        let network = |e: ureq::Error| RestError::Network {
            method: request.method,
            url: request.url.clone(),
            source: Box::new(e),
        };
        let url = request.url.as_str();
        debug!(method = %request.method, url, "executing request");

        // Content-Type travels in `headers`, so bodies are sent as raw bytes.
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), &request.headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(url), &request.headers).call(),
            (HttpMethod::Post, Some(body)) => with_headers(self.agent.post(url), &request.headers).send(body),
            (HttpMethod::Post, None) => with_headers(self.agent.post(url), &request.headers).send_empty(),
            (HttpMethod::Put, Some(body)) => with_headers(self.agent.put(url), &request.headers).send(body),
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), &request.headers).send_empty(),
        };
        let mut response = result.map_err(network)?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .lossy_utf8(true)
            .read_to_string()
            .map_err(network)?;
        debug!(method = %request.method, url, status = status.as_u16(), "received response");

        Ok(ResponseOutcome {
            status: status.as_u16(),
            reason_phrase: status.canonical_reason().unwrap_or_default().to_string(),
            body: (!body.is_empty()).then_some(body),
            content_type,
        })
    }
}
