//! End-to-end dispatch tests against a live in-process upstream.
//!
//! Starts a small axum server on an ephemeral port and drives the real
//! reqwest transport at it, covering what the scripted transport cannot:
//! header grammar on the wire, timeouts, refused connections, and the
//! body capture cap.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::http::{header, HeaderMap};
use axum::response::IntoResponse;
use axum::routing::{any, get};
use axum::{Json, Router};
use serde_json::Value;

use http_workbench::dispatch::{
    Dispatcher, HeaderEntry, HttpTransport, Method, RequestForm, BODY_CAPTURE_LIMIT,
};
use http_workbench::{PrefsStore, Workbench};

const JSON_BODY: &str = r#"{"name":"workbench","tags":["first","second"],"count":2}"#;

async fn json_doc() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/json")], JSON_BODY)
}

async fn plain_text() -> &'static str {
    "hello"
}

async fn slow() -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "late"
}

/// Reflects the received request headers back as a JSON object, so a test
/// can see exactly what the transport put on the wire.
async fn echo_headers(headers: HeaderMap) -> Json<Value> {
    let map = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                Value::String(String::from_utf8_lossy(value.as_bytes()).into_owned()),
            )
        })
        .collect();
    Json(Value::Object(map))
}

async fn big() -> Vec<u8> {
    vec![b'a'; 3 * BODY_CAPTURE_LIMIT]
}

/// Starts the upstream on an ephemeral port and returns its address. The
/// server lives on the test's runtime and dies with it.
async fn upstream() -> SocketAddr {
    let app = Router::new()
        .route("/json", get(json_doc))
        .route("/text", get(plain_text))
        .route("/slow", get(slow))
        .route("/echo-headers", any(echo_headers))
        .route("/big", get(big));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn dispatcher() -> Dispatcher {
    Dispatcher::new(HttpTransport::arc().expect("transport should build"))
}

fn form(url: String) -> RequestForm {
    RequestForm {
        url,
        ..RequestForm::default()
    }
}

#[tokio::test]
async fn json_bodies_come_back_pretty_printed() {
    let addr = upstream().await;

    let record = dispatcher()
        .dispatch(Method::Get, &form(format!("http://{addr}/json")))
        .await;

    assert!(record.success);
    assert_eq!(record.code, 200);
    assert_eq!(record.message, "OK");
    let expected =
        serde_json::to_string_pretty(&serde_json::from_str::<Value>(JSON_BODY).unwrap()).unwrap();
    assert_eq!(record.body, expected);
    assert!(record.body.contains("\n  \"name\""));
    assert!(record.headers.iter().any(|h| h.name == "content-type"));
}

#[tokio::test]
async fn plain_text_passes_through_unchanged() {
    let addr = upstream().await;

    let record = dispatcher()
        .dispatch(Method::Get, &form(format!("http://{addr}/text")))
        .await;

    assert!(record.success);
    assert_eq!(record.code, 200);
    assert_eq!(record.body, "hello");
}

#[tokio::test]
async fn a_missing_route_is_a_completed_record() {
    let addr = upstream().await;

    let record = dispatcher()
        .dispatch(Method::Get, &form(format!("http://{addr}/missing")))
        .await;

    assert!(!record.success);
    assert_eq!(record.code, 404);
    assert_eq!(record.message, "Not Found");
}

#[tokio::test]
async fn a_refused_connection_yields_a_failure_record() {
    // Bind and immediately release a port; dialing it gets a reset, not a
    // timeout.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let record = dispatcher()
        .dispatch(Method::Get, &form(format!("http://{addr}/")))
        .await;

    assert!(!record.success);
    assert_eq!(record.code, -1);
    assert!(!record.message.is_empty());
    assert!(record.headers.is_empty());
}

#[tokio::test]
async fn a_slow_upstream_times_out() {
    let addr = upstream().await;

    let started = Instant::now();
    let record = dispatcher()
        .dispatch(Method::Get, &form(format!("http://{addr}/slow")))
        .await;
    let elapsed = started.elapsed();

    assert!(!record.success);
    assert_eq!(record.code, -1);
    // The whole-call timeout fires at two seconds, well before the
    // upstream's five-second response.
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(4));
}

#[tokio::test]
async fn an_empty_header_row_blocks_the_rest_for_get_only() {
    let addr = upstream().await;
    let mut blocked = form(format!("http://{addr}/echo-headers"));
    blocked.headers = vec![HeaderEntry::new("", ""), HeaderEntry::new("x-probe", "1")];

    let record = dispatcher().dispatch(Method::Get, &blocked).await;
    let echoed: Value = serde_json::from_str(&record.body).unwrap();
    assert!(echoed.get("x-probe").is_none());
    assert!(echoed.get("content-type").is_none());

    let record = dispatcher().dispatch(Method::Post, &blocked).await;
    let echoed: Value = serde_json::from_str(&record.body).unwrap();
    assert_eq!(echoed["x-probe"], "1");
    // A body-carrying request with no content-type row gets the JSON
    // default.
    assert_eq!(echoed["content-type"], "application/json; charset=utf-8");
}

#[tokio::test]
async fn oversized_bodies_are_capped_at_the_capture_limit() {
    let addr = upstream().await;

    let record = dispatcher()
        .dispatch(Method::Get, &form(format!("http://{addr}/big")))
        .await;

    assert!(record.success);
    assert_eq!(record.body.len(), BODY_CAPTURE_LIMIT);
    assert!(record.body.bytes().all(|b| b == b'a'));
}

#[tokio::test]
async fn the_workbench_settles_a_real_exchange() {
    let addr = upstream().await;
    let workbench = Workbench::new(
        HttpTransport::arc().expect("transport should build"),
        PrefsStore::open_in_memory().unwrap(),
    );
    let mut rx = workbench.subscribe();

    workbench.dispatch(Method::Get, form(format!("http://{addr}/text")));

    let state = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            rx.changed().await.unwrap();
            let state = rx.borrow_and_update().clone();
            if !state.in_flight {
                return state;
            }
        }
    })
    .await
    .expect("session never settled");

    assert_eq!(state.response.unwrap().body, "hello");
    assert!(state.back_available);
}
