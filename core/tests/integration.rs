//! End-to-end invocations against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port in a background thread, then
//! drives `RestWorkItemHandler` over real HTTP with the ureq executor. The
//! server's request log is the oracle for how many requests each
//! authentication strategy sends and which headers they carry.

use std::cell::RefCell;

use mock_server::ServerState;
use rest_core::{
    params, ErrorPolicy, FormStep, HandlerConfig, InvocationParameters, RestError, RestWorkItemHandler,
    ResultBundle, ResultTypeRegistry, WorkItem, WorkItemManager,
};
use serde::Deserialize;
use serde_json::json;

/// Start the mock server on a random port and return its base URL and state.
fn start_server() -> (String, ServerState) {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let state = ServerState::default();
    let server_state = state.clone();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::serve(listener, server_state).await
        })
        .unwrap();
    });

    (format!("http://{addr}"), state)
}

fn params_for(url: String) -> InvocationParameters {
    InvocationParameters::new().with(params::URL, url)
}

#[derive(Default)]
struct RecordingManager {
    completed: RefCell<Vec<(u64, ResultBundle)>>,
}

impl WorkItemManager for RecordingManager {
    fn complete_work_item(&self, id: u64, results: ResultBundle) {
        self.completed.borrow_mut().push((id, results));
    }

    fn abort_work_item(&self, _id: u64) {}
}

#[derive(Debug, Deserialize, PartialEq)]
struct Person {
    name: String,
    age: u32,
}

#[test]
fn anonymous_get_returns_body_text() {
    let (base, server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let params = params_for(format!("{base}/api/ping"))
        .with(params::METHOD, "GET")
        .with(params::AUTH_TYPE, "NONE");

    let bundle = handler.invoke(&params).unwrap();
    assert_eq!(bundle.status, 200);
    assert_eq!(bundle.result_text(), Some("ok"));
    assert!(bundle.status_msg.contains("successfully completed"));
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn not_found_in_log_mode_reports_status() {
    let (base, _server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let bundle = handler.invoke(&params_for(format!("{base}/api/missing"))).unwrap();

    assert_eq!(bundle.status, 404);
    assert!(bundle.result.is_none());
    assert!(bundle.status_msg.contains("could not be reached"));
    assert!(bundle.status_msg.contains("no such resource"));
}

#[test]
fn not_found_with_handle_response_errors_raises() {
    let (base, _server) = start_server();
    let url = format!("{base}/api/missing");
    let handler = RestWorkItemHandler::anonymous();
    let params = params_for(url.clone()).with(params::HANDLE_RESPONSE_ERRORS, "true");

    match handler.invoke(&params).unwrap_err() {
        RestError::RestService { status, body, url: failed } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such resource");
            assert_eq!(failed, url);
        }
        other => panic!("expected service error, got {other:?}"),
    }
}

#[test]
fn post_json_content_is_sent_as_json() {
    let (base, server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let params = params_for(format!("{base}/api/echo"))
        .with(params::METHOD, "POST")
        .with(params::CONTENT_TYPE, "application/json")
        .with(params::CONTENT, json!({"a": 1}));

    let bundle = handler.invoke(&params).unwrap();
    assert_eq!(bundle.status, 200);
    assert_eq!(bundle.result_text(), Some(r#"{"a":1}"#));

    let sent = server.requests_to("/api/echo");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, "POST");
    assert_eq!(sent[0].body, r#"{"a":1}"#);
    assert_eq!(sent[0].content_type.as_deref(), Some("application/json"));
}

#[test]
fn put_xml_content_is_marshalled() {
    let (base, server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let params = params_for(format!("{base}/api/echo"))
        .with(params::METHOD, "PUT")
        .with(params::CONTENT_TYPE, "application/xml")
        .with(params::CONTENT, json!({"person": {"name": "Ann"}}));

    handler.invoke(&params).unwrap();
    let sent = server.requests_to("/api/echo");
    assert_eq!(sent[0].method, "PUT");
    assert_eq!(sent[0].body, "<person><name>Ann</name></person>");
}

#[test]
fn delete_ignores_content() {
    let (base, server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let params = params_for(format!("{base}/api/echo"))
        .with(params::METHOD, "DELETE")
        .with(params::CONTENT_TYPE, "application/json")
        .with(params::CONTENT, json!({"a": 1}));

    handler.invoke(&params).unwrap();
    let sent = server.requests_to("/api/echo");
    assert_eq!(sent[0].method, "DELETE");
    assert!(sent[0].body.is_empty());
}

#[test]
fn result_class_deserializes_json_and_xml() {
    let (base, _server) = start_server();
    let handler =
        RestWorkItemHandler::anonymous().with_registry(ResultTypeRegistry::new().with::<Person>("person"));
    let expected = Person { name: "Ann".into(), age: 31 };

    for path in ["/api/person", "/api/person.xml"] {
        let params = params_for(format!("{base}{path}")).with(params::RESULT_CLASS, "person");
        let bundle = handler.invoke(&params).unwrap();
        let result = bundle.result.expect("result present");
        assert_eq!(result.downcast_ref::<Person>(), Some(&expected), "{path}");
    }
}

#[test]
fn basic_auth_is_preemptive() {
    let (base, server) = start_server();
    let handler = RestWorkItemHandler::basic("admin", "secret");
    let bundle = handler.invoke(&params_for(format!("{base}/basic/resource"))).unwrap();

    assert_eq!(bundle.status, 200);
    assert_eq!(bundle.result_text(), Some("basic ok"));
    let sent = server.requests();
    assert_eq!(sent.len(), 1, "no 401 round trip expected");
    assert_eq!(sent[0].authorization.as_deref(), Some("Basic YWRtaW46c2VjcmV0"));
}

#[test]
fn basic_auth_with_per_call_credentials() {
    let (base, server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let params = params_for(format!("{base}/basic/resource"))
        .with(params::AUTH_TYPE, "BASIC")
        .with(params::USERNAME, "admin")
        .with(params::PASSWORD, "wrong");

    let bundle = handler.invoke(&params).unwrap();
    assert_eq!(bundle.status, 401);
    assert_eq!(server.requests().len(), 1);
}

#[test]
fn basic_auth_without_credentials_sends_nothing() {
    let (base, server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let params = params_for(format!("{base}/basic/resource")).with(params::AUTH_TYPE, "BASIC");

    let err = handler.invoke(&params).unwrap_err();
    assert!(matches!(err, RestError::MissingCredentials("username")));
    assert!(server.requests().is_empty());
}

#[test]
fn form_based_login_replays_request_with_session() {
    let (base, server) = start_server();
    let handler = RestWorkItemHandler::form_based("admin", "secret", format!("{base}/form/j_security_check"));
    let bundle = handler.invoke(&params_for(format!("{base}/form/resource"))).unwrap();

    assert_eq!(bundle.status, 200);
    assert_eq!(bundle.result_text(), Some("form ok"));

    let sent = server.requests();
    let paths: Vec<&str> = sent.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, ["/form/resource", "/form/j_security_check", "/form/resource"]);
    assert_eq!(sent[1].method, "POST");
    assert_eq!(sent[1].body, "j_username=admin&j_password=secret");
    assert!(sent[0].cookie.is_none());
    assert!(sent[2].cookie.as_deref().unwrap_or_default().contains("JSESSIONID="));
}

#[test]
fn form_based_proceeds_when_probe_succeeds() {
    let (base, server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let params = params_for(format!("{base}/api/ping"))
        .with(params::AUTH_TYPE, "FORM_BASED")
        .with(params::USERNAME, "admin")
        .with(params::PASSWORD, "secret")
        .with(params::AUTH_URL, format!("{base}/form/j_security_check"));

    let bundle = handler.invoke(&params).unwrap();
    assert_eq!(bundle.status, 200);
    assert_eq!(server.requests().len(), 3);
}

#[test]
fn form_based_login_endpoint_down_is_authentication_error() {
    let (base, _server) = start_server();
    let closed_port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let handler = RestWorkItemHandler::form_based(
        "admin",
        "secret",
        format!("http://127.0.0.1:{closed_port}/j_security_check"),
    );

    let err = handler.invoke(&params_for(format!("{base}/form/resource"))).unwrap_err();
    assert!(matches!(err, RestError::Authentication { step: FormStep::Login, .. }));
}

#[test]
fn read_timeout_is_a_network_error() {
    let (base, _server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let params = params_for(format!("{base}/api/slow")).with(params::READ_TIMEOUT, "200");

    let err = handler.invoke(&params).unwrap_err();
    assert!(matches!(err, RestError::Network { .. }), "got {err:?}");
}

#[test]
fn work_item_is_completed_with_results() {
    let (base, _server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let manager = RecordingManager::default();
    let item = WorkItem::new(42, "Rest", params_for(format!("{base}/api/ping")));

    handler.execute_work_item(&item, &manager).unwrap();
    let completed = manager.completed.borrow();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].0, 42);
    assert_eq!(
        completed[0].1.to_json()["Status"],
        json!(200),
    );
}

#[test]
fn work_item_rejected_in_log_mode_completes_with_status() {
    let (base, _server) = start_server();
    let handler = RestWorkItemHandler::new(HandlerConfig::anonymous().with_error_policy(ErrorPolicy::Log));
    let manager = RecordingManager::default();
    let params = params_for(format!("{base}/api/fail")).with(params::HANDLE_RESPONSE_ERRORS, "true");
    let item = WorkItem::new(3, "Rest", params);

    handler.execute_work_item(&item, &manager).unwrap();
    let completed = manager.completed.borrow();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].0, 3);
    assert_eq!(completed[0].1.status, 500);
    assert!(completed[0].1.result.is_none());
}

#[test]
fn work_item_rejected_in_throw_mode_is_returned() {
    let (base, _server) = start_server();
    let handler = RestWorkItemHandler::new(HandlerConfig::anonymous().with_error_policy(ErrorPolicy::Throw));
    let manager = RecordingManager::default();
    let params = params_for(format!("{base}/api/fail")).with(params::HANDLE_RESPONSE_ERRORS, "true");
    let item = WorkItem::new(4, "Rest", params);

    let err = handler.execute_work_item(&item, &manager).unwrap_err();
    assert!(matches!(err, RestError::RestService { status: 500, .. }));
    assert!(manager.completed.borrow().is_empty());
}

#[test]
fn latin1_body_is_decoded_from_declared_charset() {
    let (base, _server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let bundle = handler.invoke(&params_for(format!("{base}/api/latin1"))).unwrap();

    assert_eq!(bundle.status, 200);
    assert_eq!(bundle.result_text(), Some("café"));
}

#[test]
fn zero_timeouts_mean_no_limit() {
    let (base, _server) = start_server();
    let handler = RestWorkItemHandler::anonymous();
    let params = params_for(format!("{base}/api/ping"))
        .with(params::CONNECT_TIMEOUT, "0")
        .with(params::READ_TIMEOUT, "0");

    let bundle = handler.invoke(&params).unwrap();
    assert_eq!(bundle.status, 200);
    assert_eq!(bundle.result_text(), Some("ok"));
}
