//! E2E tests for the /generate flow over a real listener.

use std::sync::Arc;

use palaver_core::Turn;
use palaver_engine::{CompletionEngine, EngineError, StubEngine};
use palaver_gateway::{build_routes, AppState, ChatSettings};
use tokio::net::TcpListener;

async fn spawn_gateway(
    engine: Option<Arc<dyn CompletionEngine>>,
) -> (std::net::SocketAddr, AppState, tokio::task::JoinHandle<()>) {
    let state = AppState::new(engine, ChatSettings::default(), "static".into());
    let app = build_routes(state.clone());
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve gateway app");
    });

    (addr, state, handle)
}

#[tokio::test]
#[ignore = "starts network listeners"]
async fn generate_round_trip_updates_history() {
    let stub = StubEngine::new();
    stub.enqueue(Ok("Hi there".to_string()));
    let (addr, state, server_handle) = spawn_gateway(Some(Arc::new(stub))).await;

    let http = reqwest::Client::new();
    let response = http
        .post(format!("http://{addr}/generate"))
        .json(&serde_json::json!({"prompt": "Hello"}))
        .send()
        .await
        .expect("generate request");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["response"], "Hi there");

    assert_eq!(
        state.history.snapshot().await,
        vec![Turn::user("Hello"), Turn::assistant("Hi there")]
    );

    server_handle.abort();
}

#[tokio::test]
#[ignore = "starts network listeners"]
async fn generate_failure_leaves_history_empty() {
    let stub = StubEngine::new();
    stub.enqueue(Err(EngineError::NotReady("gone".to_string())));
    let (addr, state, server_handle) = spawn_gateway(Some(Arc::new(stub))).await;

    let http = reqwest::Client::new();
    let response = http
        .post(format!("http://{addr}/generate"))
        .json(&serde_json::json!({"prompt": "Hello"}))
        .send()
        .await
        .expect("generate request");

    assert_eq!(response.status(), 500);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert!(body["detail"].is_string());
    assert!(state.history.is_empty().await);

    server_handle.abort();
}

#[tokio::test]
#[ignore = "starts network listeners"]
async fn engineless_gateway_reports_unavailable() {
    let (addr, state, server_handle) = spawn_gateway(None).await;

    let http = reqwest::Client::new();
    let response = http
        .post(format!("http://{addr}/generate"))
        .json(&serde_json::json!({"prompt": "Hello"}))
        .send()
        .await
        .expect("generate request");

    assert_eq!(response.status(), 503);
    assert!(state.history.is_empty().await);

    server_handle.abort();
}
