//! HTTP provider tests against an in-process stub of the proxy API.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use vetline_agent::{
    AgentConfig, AgentController, AgentProvider, HttpAgentProvider, ProviderError, RetryPolicy,
};

#[derive(Default)]
struct StubState {
    create_calls: AtomicU32,
    cleanup_calls: AtomicU32,
    /// Number of leading create calls answered with 409.
    conflicts: u32,
}

async fn start_handler(State(state): State<Arc<StubState>>) -> (StatusCode, Json<Value>) {
    let call = state.create_calls.fetch_add(1, Ordering::SeqCst);
    if call < state.conflicts {
        (
            StatusCode::CONFLICT,
            Json(json!({"error": "agent already exists for channel"})),
        )
    } else {
        (StatusCode::OK, Json(json!({"agent_id": "agent-http-1"})))
    }
}

async fn cleanup_handler(State(state): State<Arc<StubState>>) -> Json<Value> {
    state.cleanup_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({"cleaned": true, "agent_id": "stale-1"}))
}

async fn leave_handler() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn status_handler() -> Json<Value> {
    Json(json!({"agent_id": "agent-http-1", "state": "RUNNING"}))
}

async fn spawn_stub(conflicts: u32) -> (String, Arc<StubState>) {
    let state = Arc::new(StubState {
        conflicts,
        ..Default::default()
    });
    let app = Router::new()
        .route("/api/convo-ai/start", post(start_handler))
        .route("/api/convo-ai/cleanup/{channel}", post(cleanup_handler))
        .route("/api/convo-ai/agents/{id}/leave", post(leave_handler))
        .route("/api/convo-ai/agents/{id}/status", get(status_handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}"), state)
}

fn config() -> AgentConfig {
    AgentConfig::new("triage-http", "tok", vec![42], "hello", "ask in order")
}

#[tokio::test]
async fn create_maps_conflict_and_success() {
    let (base, _state) = spawn_stub(1).await;
    let provider = HttpAgentProvider::new(reqwest::Client::new(), &base);

    assert!(matches!(
        provider.create(&config()).await,
        Err(ProviderError::Conflict)
    ));
    assert_eq!(provider.create(&config()).await.unwrap(), "agent-http-1");
}

#[tokio::test]
async fn controller_recovers_from_one_conflict_over_http() {
    let (base, state) = spawn_stub(1).await;
    let provider = Arc::new(HttpAgentProvider::new(reqwest::Client::new(), &base));
    let controller = AgentController::new(provider).with_retry(RetryPolicy {
        max_attempts: 2,
        backoff: std::time::Duration::from_millis(10),
    });

    let handle = controller.start(&config()).await.unwrap();
    assert_eq!(handle, "agent-http-1");
    assert_eq!(state.cleanup_calls.load(Ordering::SeqCst), 1);
    assert_eq!(state.create_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn status_and_leave_round_trip() {
    let (base, _state) = spawn_stub(0).await;
    let provider = HttpAgentProvider::new(reqwest::Client::new(), &base);

    let agent_id = provider.create(&config()).await.unwrap();
    let status = provider.status(&agent_id).await.unwrap();
    assert_eq!(status.state, "RUNNING");
    provider.leave(&agent_id).await.unwrap();

    let outcome = provider.cleanup_channel("triage-http").await.unwrap();
    assert!(outcome.cleaned);
}
