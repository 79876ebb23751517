//! REST endpoints for exercising the invocation engine over real HTTP.
//!
//! # Design
//! Three areas: `/api/*` is open, `/basic/*` wants an `Authorization: Basic`
//! header, and `/form/*` wants a session cookie obtained by posting
//! `j_username`/`j_password` to `/form/j_security_check`. Every request is
//! recorded (method, path, auth-related headers, body) before routing so
//! tests can assert on how many requests were sent and what they carried.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    extract::{Request, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE, WWW_AUTHENTICATE},
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Form, Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_USERNAME: &str = "admin";
pub const DEFAULT_PASSWORD: &str = "secret";
pub const SESSION_COOKIE: &str = "JSESSIONID";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
    pub age: u32,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub j_username: String,
    pub j_password: String,
}

/// One request as the server received it.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub cookie: Option<String>,
    pub body: String,
}

struct Inner {
    username: String,
    password: String,
    sessions: RwLock<HashSet<String>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// Credentials, open sessions and the request log, shared by all handlers.
#[derive(Clone)]
pub struct ServerState {
    inner: Arc<Inner>,
}

impl ServerState {
    pub fn new(username: &str, password: &str) -> Self {
        Self {
            inner: Arc::new(Inner {
                username: username.to_string(),
                password: password.to_string(),
                sessions: RwLock::new(HashSet::new()),
                requests: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.log().clone()
    }

    /// Requests received for `path`, in arrival order.
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.log().iter().filter(|r| r.path == path).cloned().collect()
    }

    pub fn clear(&self) {
        self.log().clear();
    }

    fn log(&self) -> MutexGuard<'_, Vec<RecordedRequest>> {
        // A panicking handler must not hide the log from the test that caused it.
        self.inner.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn basic_authorized(&self, headers: &HeaderMap) -> bool {
        let Some(encoded) = header_str(headers, AUTHORIZATION.as_str()).and_then(|v| v.strip_prefix("Basic ")) else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(encoded.trim()) else {
            return false;
        };
        let expected = format!("{}:{}", self.inner.username, self.inner.password);
        decoded == expected.as_bytes()
    }

    async fn has_session(&self, headers: &HeaderMap) -> bool {
        let Some(session) = header_str(headers, COOKIE.as_str()).and_then(session_id) else {
            return false;
        };
        self.inner.sessions.read().await.contains(session)
    }
}

impl Default for ServerState {
    fn default() -> Self {
        Self::new(DEFAULT_USERNAME, DEFAULT_PASSWORD)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn session_id(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

pub fn app() -> Router {
    app_with_state(ServerState::default())
}

pub fn app_with_state(state: ServerState) -> Router {
    Router::new()
        .route("/api/ping", get(ping))
        .route("/api/echo", any(echo))
        .route("/api/person", get(person_json))
        .route("/api/person.xml", get(person_xml))
        .route("/api/fail", get(fail))
        .route("/api/slow", get(slow))
        .route("/api/latin1", get(latin1))
        .route("/basic/resource", any(basic_resource))
        .route("/form/resource", any(form_resource))
        .route("/form/j_security_check", post(login))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(state.clone(), record))
        .with_state(state)
}

pub async fn serve(listener: TcpListener, state: ServerState) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "mock REST server listening");
    }
    axum::serve(listener, app_with_state(state)).await
}

async fn record(State(state): State<ServerState>, request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let Ok(bytes) = to_bytes(body, usize::MAX).await else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        path: parts.uri.path().to_string(),
        authorization: header_str(&parts.headers, AUTHORIZATION.as_str()).map(str::to_string),
        content_type: header_str(&parts.headers, CONTENT_TYPE.as_str()).map(str::to_string),
        cookie: header_str(&parts.headers, COOKIE.as_str()).map(str::to_string),
        body: String::from_utf8_lossy(&bytes).into_owned(),
    };
    debug!(method = %recorded.method, path = %recorded.path, "request received");
    state.log().push(recorded);
    next.run(Request::from_parts(parts, Body::from(bytes))).await
}

async fn ping() -> &'static str {
    "ok"
}

async fn echo(headers: HeaderMap, body: String) -> Response {
    let content_type = headers
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static("text/plain"));
    ([(CONTENT_TYPE, content_type)], body).into_response()
}

fn ann() -> Person {
    Person {
        name: "Ann".to_string(),
        age: 31,
    }
}

async fn person_json() -> Json<Person> {
    Json(ann())
}

async fn person_xml() -> Response {
    let person = ann();
    let xml = format!("<person><name>{}</name><age>{}</age></person>", person.name, person.age);
    ([(CONTENT_TYPE, "application/xml")], xml).into_response()
}

async fn fail() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_millis(1500)).await;
    "slow"
}

/// "café" encoded as ISO-8859-1.
async fn latin1() -> Response {
    (
        [(CONTENT_TYPE, "text/plain; charset=ISO-8859-1")],
        vec![0x63u8, 0x61, 0x66, 0xe9],
    )
        .into_response()
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "no such resource")
}

async fn basic_resource(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    if state.basic_authorized(&headers) {
        (StatusCode::OK, "basic ok").into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(WWW_AUTHENTICATE, "Basic realm=\"mock\"")],
            "authentication required",
        )
            .into_response()
    }
}

async fn form_resource(State(state): State<ServerState>, headers: HeaderMap) -> Response {
    if state.has_session(&headers).await {
        (StatusCode::OK, "form ok").into_response()
    } else {
        (StatusCode::UNAUTHORIZED, "login required").into_response()
    }
}

async fn login(State(state): State<ServerState>, Form(form): Form<LoginForm>) -> Response {
    if form.j_username != state.inner.username || form.j_password != state.inner.password {
        return (StatusCode::FORBIDDEN, "invalid credentials").into_response();
    }
    let session = Uuid::new_v4().to_string();
    state.inner.sessions.write().await.insert(session.clone());
    let cookie = format!("{SESSION_COOKIE}={session}; Path=/; HttpOnly");
    ([(SET_COOKIE, cookie)], "logged in").into_response()
}
