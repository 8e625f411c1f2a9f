//! Fake registration, exactly-once delivery and cancellation, checked
//! against an in-memory transport that counts its calls.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use networking_core::{
    json, DirectoryBundle, FakeBody, FakeError, FakeResponse, HttpMethod, HttpRequest, HttpResponse,
    MemoryBundle, NetworkError, Networking, NetworkingConfig, ParsingError, Request, Response,
    ResponseKind, TaskCategory, Transport, TransportError,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

const BASE_URL: &str = "http://localhost:3000";

/// Answers every request with a fixed status and body, or never answers.
#[derive(Debug)]
struct ScriptedTransport {
    calls: AtomicUsize,
    status: u16,
    body: Vec<u8>,
    stall: bool,
}

impl ScriptedTransport {
    fn answering(status: u16, body: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            status,
            body: body.to_vec(),
            stall: false,
        })
    }

    fn stalling() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            status: 200,
            body: Vec::new(),
            stall: true,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.stall {
            std::future::pending::<()>().await;
        }
        tokio::task::yield_now().await;
        Ok(HttpResponse {
            status: self.status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: self.body.clone(),
        })
    }
}

fn client(transport: Arc<ScriptedTransport>) -> Networking {
    Networking::builder(NetworkingConfig::new(BASE_URL))
        .transport(transport)
        .build()
        .unwrap()
}

fn get(path: &str) -> Request {
    Request::new(HttpMethod::Get, path)
}

// ---------------------------------------------------------------------------
// Fake responses
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fake_get_users_success() {
    let transport = ScriptedTransport::answering(200, b"{}");
    let networking = client(transport.clone());
    networking.fake_get("/users", json!({"id": 1}), 200);

    let response = networking.send(get("/users")).await;

    let Response::SuccessJson { meta, json } = response else {
        panic!("expected SuccessJson");
    };
    assert_eq!(json.mapping(), json!({"id": 1}).as_object().cloned().unwrap());
    assert_eq!(meta.status, Some(200));
    assert!(meta.headers.is_empty());
    assert_eq!(meta.url, "http://localhost:3000/users");
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn fake_get_users_not_found() {
    let transport = ScriptedTransport::answering(200, b"{}");
    let networking = client(transport.clone());
    networking.fake_get("/users", Value::Null, 404);

    let response = networking.send(get("/users")).await;

    assert!(!response.is_success());
    assert_eq!(response.error().and_then(NetworkError::status_code), Some(404));
    assert_eq!(response.status_code(), Some(404));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn fake_status_in_range_is_success_with_payload() {
    for status in [200, 201, 204, 299] {
        let transport = ScriptedTransport::answering(500, b"");
        let networking = client(transport.clone());
        let payload = json!([{"id": 1}, {"id": 2}]);
        networking.fake(HttpMethod::Post, "/users", FakeBody::json(payload.clone()), status);

        let response = networking
            .send(Request::new(HttpMethod::Post, "/users"))
            .await;

        assert!(response.is_success(), "status {status}");
        assert_eq!(
            Value::from(
                response
                    .sequence()
                    .into_iter()
                    .map(Value::Object)
                    .collect::<Vec<_>>()
            ),
            payload,
            "status {status}"
        );
        assert_eq!(transport.calls(), 0);
    }
}

#[tokio::test]
async fn fake_status_out_of_range_is_failure_with_status() {
    for status in [100, 199, 300, 401, 500, 503] {
        let transport = ScriptedTransport::answering(200, b"{}");
        let networking = client(transport.clone());
        networking.fake_get("/users", json!({"error": "nope"}), status);

        let response = networking.send(get("/users")).await;

        let Response::FailureJson { error, json, .. } = response else {
            panic!("expected FailureJson for {status}");
        };
        assert_eq!(error, NetworkError::Status { status });
        assert_eq!(json.mapping()["error"], "nope");
        assert_eq!(transport.calls(), 0);
    }
}

#[tokio::test]
async fn later_fake_overwrites_earlier() {
    let networking = client(ScriptedTransport::answering(200, b"{}"));
    networking.fake_get("/users", json!({"id": 1}), 200);
    networking.fake_get("/users", json!({"id": 2}), 200);

    let response = networking.send(get("/users")).await;

    assert_eq!(response.mapping()["id"], 2);
}

#[tokio::test]
async fn fake_matches_verb_and_normalized_path() {
    let transport = ScriptedTransport::answering(200, br#"{"live":true}"#);
    let networking = client(transport.clone());
    networking.fake_get("users/", json!({"id": 1}), 200);

    let faked = networking.send(get("/users")).await;
    assert_eq!(faked.mapping()["id"], 1);

    let live = networking
        .send(Request::new(HttpMethod::Delete, "/users"))
        .await;
    assert_eq!(live.mapping()["live"], true);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn fakes_are_per_client() {
    let transport = ScriptedTransport::answering(200, br#"{"live":true}"#);
    let faked = client(transport.clone());
    let live = client(transport.clone());
    faked.fake_get("/users", json!({"id": 1}), 200);

    assert_eq!(faked.send(get("/users")).await.mapping()["id"], 1);
    assert_eq!(live.send(get("/users")).await.mapping()["live"], true);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn remove_all_fakes_restores_live_requests() {
    let transport = ScriptedTransport::answering(200, br#"{"live":true}"#);
    let networking = client(transport.clone());
    networking.fake_get("/users", json!({"id": 1}), 200);
    networking.fake_post("/users", json!({"id": 1}), 201);
    networking.remove_all_fakes();

    let response = networking.send(get("/users")).await;
    assert_eq!(response.mapping()["live"], true);
}

#[tokio::test]
async fn fake_with_headers() {
    let networking = client(ScriptedTransport::answering(200, b"{}"));
    networking.fake_response(
        HttpMethod::Get,
        "/users",
        FakeResponse::new(FakeBody::json(json!({"id": 1})), 200).header("ETag", "abc"),
    );

    let response = networking.send(get("/users")).await;
    assert_eq!(response.header("etag"), Some("abc"));
}

#[tokio::test]
async fn fake_image_download_decodes() {
    let networking = client(ScriptedTransport::answering(200, b"{}"));
    let png = mock_server::sample_png().unwrap();
    networking.fake_image_download("/logo.png", png.clone(), 200);

    let response = networking
        .send(get("/logo.png").kind(ResponseKind::Image))
        .await;

    let image = response.image().expect("expected SuccessImage");
    assert_eq!((image.width, image.height), (2, 2));
    assert_eq!(response.data(), png.as_slice());
}

// ---------------------------------------------------------------------------
// File fakes
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_fake_file_fails_at_dispatch() {
    let bundle = Arc::new(MemoryBundle::new());
    let networking = client(ScriptedTransport::answering(200, b"{}"));
    networking.fake_get_file("/users", "users.json", bundle.clone());

    let response = networking.send(get("/users")).await;
    assert!(matches!(
        response.error(),
        Some(NetworkError::Fake(FakeError::FileNotFound { name })) if name == "users.json"
    ));

    bundle.insert("users.json", br#"[{"id":1},{"id":2}]"#.to_vec());
    let response = networking.send(get("/users")).await;
    assert_eq!(response.sequence().len(), 2);
}

#[tokio::test]
async fn file_fake_reflects_bundle_at_request_time() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("user.json");
    std::fs::write(&path, br#"{"id":1}"#).unwrap();

    let networking = client(ScriptedTransport::answering(200, b"{}"));
    networking.fake_get_file("/user", "user.json", Arc::new(DirectoryBundle::new(dir.path())));

    std::fs::write(&path, br#"{"id":2}"#).unwrap();
    let response = networking.send(get("/user")).await;
    assert_eq!(response.mapping()["id"], 2);
}

#[tokio::test]
async fn file_fake_with_invalid_json_is_parsing_failure() {
    let bundle = Arc::new(MemoryBundle::new());
    bundle.insert("broken.json", b"{not json".to_vec());
    let networking = client(ScriptedTransport::answering(200, b"{}"));
    networking.fake_get_file("/broken", "broken.json", bundle);

    let response = networking.send(get("/broken")).await;
    assert!(matches!(
        response.error(),
        Some(NetworkError::Parsing(ParsingError::Malformed(_)))
    ));
}

// ---------------------------------------------------------------------------
// Live classification through the transport
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unparseable_live_json_is_failure_not_absent() {
    let transport = ScriptedTransport::answering(200, b"<html></html>");
    let networking = client(transport.clone());

    let response = networking.send(get("/page")).await;

    assert!(matches!(
        response,
        Response::FailureJson {
            error: NetworkError::Parsing(_),
            ..
        }
    ));
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn empty_live_body_is_absent_json() {
    let networking = client(ScriptedTransport::answering(204, b""));

    let response = networking.send(get("/empty")).await;

    let Response::SuccessJson { json, .. } = response else {
        panic!("expected SuccessJson");
    };
    assert!(json.is_none());
}

#[tokio::test]
async fn data_kind_ignores_json_validity() {
    let networking = client(ScriptedTransport::answering(200, b"<html></html>"));

    let response = networking.send(get("/page").kind(ResponseKind::Data)).await;

    let Response::SuccessData { data, .. } = response else {
        panic!("expected SuccessData");
    };
    assert_eq!(data, b"<html></html>");
}

// ---------------------------------------------------------------------------
// Identifiers, exactly-once delivery and cancellation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn identifier_is_available_before_completion() {
    let networking = client(ScriptedTransport::answering(200, b"{}"));
    networking.fake_get("/users", json!({"id": 1}), 200);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let id = networking.get("/users", None, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    // The request task has not run yet.
    assert!(networking.is_in_flight(&id));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    assert!(networking.cancel(&id));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!networking.is_in_flight(&id));

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn completion_waits_for_request_to_return() {
    use std::sync::atomic::AtomicBool;

    let networking = client(ScriptedTransport::answering(200, b"{}"));
    networking.fake_get("/users", json!({"id": 1}), 200);
    let early = Arc::new(AtomicUsize::new(0));
    let mut receivers = Vec::new();

    for _ in 0..500 {
        let returned = Arc::new(AtomicBool::new(false));
        let seen = returned.clone();
        let early = early.clone();
        let (tx, rx) = oneshot::channel();
        networking.get("/users", None, move |_| {
            if !seen.load(Ordering::SeqCst) {
                early.fetch_add(1, Ordering::SeqCst);
            }
            let _ = tx.send(());
        });
        returned.store(true, Ordering::SeqCst);
        receivers.push(rx);
    }

    for rx in receivers {
        rx.await.unwrap();
    }
    assert_eq!(early.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn cancel_by_path_ignores_query_parameters() {
    let networking = client(ScriptedTransport::stalling());

    let pending = networking.send(get("/users?page=2"));
    assert_eq!(networking.cancel_get("/users"), 1);
    assert!(pending.await.error().is_some_and(NetworkError::is_cancellation));

    let pending = networking.send(get("/users?page=3#top"));
    let url = networking.url_for("/users").unwrap();
    assert_eq!(
        networking.cancel_request(TaskCategory::Data, HttpMethod::Get, url.as_str()),
        1
    );
    assert!(pending.await.error().is_some_and(NetworkError::is_cancellation));
    assert_eq!(networking.in_flight_count(), 0);
}

#[tokio::test]
async fn cancel_by_path_delivers_one_cancellation() {
    let transport = ScriptedTransport::stalling();
    let networking = client(transport.clone());
    let calls = Arc::new(AtomicUsize::new(0));

    let (tx, rx) = oneshot::channel();
    let counter = calls.clone();
    networking.get("/slow", None, move |response| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(response);
    });
    tokio::task::yield_now().await;

    assert_eq!(networking.cancel_get("/slow"), 1);
    let response = rx.await.unwrap();
    assert!(matches!(
        response,
        Response::FailureJson {
            error: NetworkError::Cancelled(_),
            ..
        }
    ));

    assert_eq!(networking.cancel_get("/slow"), 0);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(networking.in_flight_count(), 0);
}

#[tokio::test]
async fn cancel_after_completion_is_noop() {
    let networking = client(ScriptedTransport::answering(200, br#"{"id":1}"#));
    let calls = Arc::new(AtomicUsize::new(0));

    let (tx, rx) = oneshot::channel();
    let counter = calls.clone();
    let id = networking.get("/users", None, move |response| {
        counter.fetch_add(1, Ordering::SeqCst);
        let _ = tx.send(response);
    });
    let response = rx.await.unwrap();
    assert!(response.is_success());

    assert_eq!(networking.cancel_get("/users"), 0);
    assert!(!networking.cancel(&id));
    assert_eq!(networking.cancel_all_requests(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancel_only_matches_verb_and_url() {
    let networking = client(ScriptedTransport::stalling());

    let get_pending = networking.send(get("/slow"));
    let post_pending = networking.send(Request::new(HttpMethod::Post, "/slow"));
    let other_pending = networking.send(get("/other"));
    tokio::task::yield_now().await;

    assert_eq!(networking.cancel_post("/slow"), 1);
    assert!(post_pending.await.error().is_some_and(NetworkError::is_cancellation));
    assert_eq!(networking.in_flight_count(), 2);

    assert_eq!(networking.cancel_all_requests(), 2);
    assert!(get_pending.await.error().is_some_and(NetworkError::is_cancellation));
    assert!(other_pending.await.error().is_some_and(NetworkError::is_cancellation));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancellation_racing_completion_delivers_exactly_once() {
    let networking = client(ScriptedTransport::answering(200, br#"{"id":1}"#));
    let calls = Arc::new(AtomicUsize::new(0));
    let mut receivers = Vec::new();

    for _ in 0..200 {
        let (tx, rx) = oneshot::channel();
        let counter = calls.clone();
        networking.get("/users", None, move |response| {
            counter.fetch_add(1, Ordering::SeqCst);
            let _ = tx.send(response);
        });
        receivers.push(rx);
    }
    networking.cancel_get("/users");

    for rx in receivers {
        let response = rx.await.unwrap();
        if !response.error().is_some_and(NetworkError::is_cancellation) {
            assert_eq!(response.mapping()["id"], 1);
        }
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 200);
    assert_eq!(networking.in_flight_count(), 0);
}

// ---------------------------------------------------------------------------
// Payload codec
// ---------------------------------------------------------------------------

#[test]
fn serialize_of_parse_round_trips() {
    let inputs: [&[u8]; 4] = [
        br#"{"id":1,"name":"Elvis","tags":["a","b"]}"#,
        br#"{ "nested": { "deep": [1, 2, {"x": null}] } }"#,
        br#"[{"id":1},{"id":2,"active":false}]"#,
        br#"[]"#,
    ];

    for input in inputs {
        let parsed = json::parse(input).unwrap();
        let structure: Value = serde_json::from_slice(input).unwrap();
        let bytes = json::serialize(&structure).unwrap();
        assert_eq!(json::parse(&bytes).unwrap(), parsed);
        assert_eq!(serde_json::from_slice::<Value>(&bytes).unwrap(), structure);
    }
}
