//! Live round-trips against the mock server.
//!
//! # Design
//! Starts the mock server on a random port, then sends real requests through
//! `UreqTransport` in both completion styles. Validates that building,
//! transport wiring and response resolution work end-to-end.

use std::net::SocketAddr;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::executor::block_on;
use mock_server::Echo;
use request_core::{
    ErrorPayload, HttpClient, HttpMethod, Request, RequestConfig, RequestError, RequestState,
    ResponseBody, UreqTransport,
};
use serde_json::json;

fn start_server() -> SocketAddr {
    let _ = env_logger::builder().is_test(true).try_init();

    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn echo_of(body: ResponseBody) -> Echo {
    let value = body.as_json().cloned().expect("echo responds with JSON");
    serde_json::from_value(value).unwrap()
}

#[test]
fn get_sends_query_and_parses_json() {
    let addr = start_server();
    let client = HttpClient::new(&format!("http://{addr}"));

    let config = client.get("/echo").field("id", 5).field("name", "a b");
    let future = Request::future(config, UreqTransport::new());
    let echo = echo_of(block_on(future).unwrap());

    assert_eq!(echo.method, "GET");
    assert_eq!(echo.query.as_deref(), Some("id=5&name=a%20b"));
    assert!(echo.body.is_empty());
}

#[test]
fn post_json_body_round_trips() {
    let addr = start_server();
    let config = RequestConfig::new(format!("http://{addr}/echo"))
        .method(HttpMethod::Post)
        .header("Content-Type", "application/json")
        .header("X-Trace", "t-1")
        .data(&json!({"title": "Buy milk", "done": false}));

    let echo = echo_of(block_on(Request::future(config, UreqTransport::new())).unwrap());

    assert_eq!(echo.method, "POST");
    assert_eq!(echo.content_type.as_deref(), Some("application/json"));
    assert_eq!(echo.headers, vec![("x-trace".to_string(), "t-1".to_string())]);
    let sent: serde_json::Value = serde_json::from_str(&echo.body).unwrap();
    assert_eq!(sent, json!({"title": "Buy milk", "done": false}));
}

#[test]
fn put_form_body_is_urlencoded() {
    let addr = start_server();
    let client = HttpClient::new(&format!("http://{addr}"));
    let config = client
        .put("echo")
        .header("Content-Type", "application/x-www-form-urlencoded")
        .field("name", "Ann Lee")
        .field("role", "a&b");

    let echo = echo_of(block_on(Request::future(config, UreqTransport::new())).unwrap());

    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.query, None);
    assert_eq!(echo.body, "name=Ann%20Lee&role=a%26b");
}

#[test]
fn delete_sends_query_not_body() {
    let addr = start_server();
    let client = HttpClient::new(&format!("http://{addr}"));
    let config = client
        .delete("/echo")
        .header("Content-Type", "application/json")
        .field("id", 9);

    let echo = echo_of(block_on(Request::future(config, UreqTransport::new())).unwrap());

    assert_eq!(echo.method, "DELETE");
    assert_eq!(echo.query.as_deref(), Some("id=9"));
    assert!(echo.body.is_empty());
}

#[test]
fn text_response_is_delivered_raw() {
    let addr = start_server();
    let (tx, rx) = mpsc::channel();
    let err_tx = tx.clone();

    let _request = Request::with_callbacks(
        RequestConfig::new("/text").base_url(format!("http://{addr}")),
        UreqTransport::new(),
        move |body| tx.send(Ok(body)).unwrap(),
        move |err| err_tx.send(Err(err)).unwrap(),
    );

    let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(outcome, Ok(ResponseBody::Text("hello from mock-server".to_string())));
    assert!(rx.recv_timeout(Duration::from_millis(200)).is_err(), "settled twice");
}

#[test]
fn broken_json_goes_to_error_callback() {
    let addr = start_server();
    let (tx, rx) = mpsc::channel();
    let err_tx = tx.clone();

    let request = Request::with_callbacks(
        RequestConfig::new(format!("http://{addr}/broken-json")),
        UreqTransport::new(),
        move |body| tx.send(Ok(body)).unwrap(),
        move |err| err_tx.send(Err(err)).unwrap(),
    );

    let outcome = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(matches!(outcome, Err(RequestError::InvalidJson(_))));
    assert_eq!(request.state(), RequestState::Failed);
}

#[test]
fn failure_status_is_a_transport_error() {
    let addr = start_server();
    let outcome = block_on(Request::future(
        RequestConfig::new(format!("http://{addr}/status/500")),
        UreqTransport::new(),
    ));

    let payload = match outcome {
        Err(RequestError::Transport(ErrorPayload::Structured(payload))) => payload,
        other => panic!("expected structured transport error, got {other:?}"),
    };
    assert_eq!(payload["code"], 500);
}

#[test]
fn refused_connection_is_a_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let outcome = block_on(Request::future(
        RequestConfig::new(format!("http://127.0.0.1:{port}/echo")),
        UreqTransport::new(),
    ));

    assert!(matches!(outcome, Err(RequestError::Transport(ErrorPayload::Text(_)))));
}

#[test]
fn timeout_is_a_transport_error() {
    let addr = start_server();
    let config = RequestConfig::new(format!("http://{addr}/slow/2000")).timeout(Duration::from_millis(200));

    let outcome = block_on(Request::future(config, UreqTransport::new()));

    assert!(matches!(outcome, Err(RequestError::Transport(ErrorPayload::Text(_)))));
}

#[test]
fn upload_progress_precedes_success() {
    let addr = start_server();
    let events = Arc::new(Mutex::new(Vec::new()));
    let progress_events = events.clone();

    let config = RequestConfig::new(format!("http://{addr}/echo"))
        .method(HttpMethod::Post)
        .header("Content-Type", "application/json")
        .field("a", 1)
        .on_progress(move |fraction| progress_events.lock().unwrap().push(fraction));
    let outcome = block_on(Request::future(config, UreqTransport::new()));

    assert!(outcome.is_ok());
    assert_eq!(*events.lock().unwrap(), vec![1.0]);
}

#[test]
fn abort_wins_over_late_response() {
    let addr = start_server();
    let mut future = Request::future(
        RequestConfig::new(format!("http://{addr}/slow/300")),
        UreqTransport::new(),
    );
    future.abort();

    assert_eq!(block_on(&mut future), Err(RequestError::Cancelled));
    std::thread::sleep(Duration::from_millis(500));
    assert_eq!(future.state(), RequestState::Failed);
}

#[test]
fn pass_through_fields_without_content_type_go_out_as_a_form() {
    let addr = start_server();
    let config = RequestConfig::new(format!("http://{addr}/echo"))
        .method(HttpMethod::Post)
        .field("file", "raw bytes")
        .field("n", 1);

    let echo = echo_of(block_on(Request::future(config, UreqTransport::new())).unwrap());

    assert_eq!(echo.content_type.as_deref(), Some("application/x-www-form-urlencoded"));
    assert_eq!(echo.body, "file=raw+bytes&n=1");
}

#[test]
fn pass_through_fields_as_multipart() {
    let addr = start_server();
    let config = RequestConfig::new(format!("http://{addr}/echo"))
        .method(HttpMethod::Post)
        .header("Content-Type", "multipart/form-data")
        .field("file", "raw bytes")
        .field("n", 1);

    let echo = echo_of(block_on(Request::future(config, UreqTransport::new())).unwrap());

    let content_type = echo.content_type.unwrap();
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .expect("multipart content type carries its boundary");
    assert!(echo
        .body
        .contains("Content-Disposition: form-data; name=\"file\"\r\n\r\nraw bytes\r\n"));
    assert!(echo
        .body
        .contains("Content-Disposition: form-data; name=\"n\"\r\n\r\n1\r\n"));
    assert!(echo.body.ends_with(&format!("--{boundary}--\r\n")));
}

#[test]
fn pass_through_fields_with_unsupported_content_type_fail() {
    let addr = start_server();
    let config = RequestConfig::new(format!("http://{addr}/echo"))
        .method(HttpMethod::Put)
        .header("Content-Type", "text/plain")
        .field("a", 1);

    let outcome = block_on(Request::future(config, UreqTransport::new()));

    match outcome {
        Err(RequestError::Transport(ErrorPayload::Text(msg))) => {
            assert_eq!(msg, "unsupported pass-through content type: text/plain")
        }
        other => panic!("expected unsupported content type error, got {other:?}"),
    }
}
