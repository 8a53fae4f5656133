//! Vetline proxy server.
//!
//! The thin trusted intermediary between the browser client and the vendor
//! services: it holds the signing certificate and vendor keys, mints scoped
//! join tokens, proxies hosted-agent lifecycle calls, and runs the triage
//! analysis. It keeps no durable state; the per-channel agent registry is
//! in-memory bookkeeping for conflict cleanup.

pub mod api_analyze;
pub mod api_config;
pub mod api_convo;
pub mod api_token;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tower_http::cors::{Any, CorsLayer};
use vetline_token::TokenBroker;

/// Maximum request body size (256 KiB). Transcripts and agent configs are
/// small; anything bigger is malformed.
const MAX_REQUEST_BODY_BYTES: usize = 256 * 1024;

/// Application state shared across all request handlers.
pub struct AppState {
    /// Loaded configuration, secrets included.
    pub config: config::Config,
    /// Join-token mint/verify.
    pub broker: TokenBroker,
    /// Shared HTTP client for vendor calls.
    pub http: reqwest::Client,
    /// Active hosted agents, channel id -> agent handle.
    ///
    /// Uses `std::sync::RwLock` intentionally: all lock acquisitions are
    /// brief HashMap operations that never span `.await` points.
    pub active_agents: RwLock<HashMap<String, String>>,
}

impl AppState {
    pub fn new(config: config::Config) -> Self {
        let broker = TokenBroker::new(
            config.provider.app_id.clone(),
            config.provider.app_certificate.clone(),
        );
        Self {
            config,
            broker,
            http: reqwest::Client::new(),
            active_agents: RwLock::new(HashMap::new()),
        }
    }
}

/// Health check handler.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router with all routes.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/config", get(api_config::get_config_handler))
        .route("/api/token", get(api_token::mint_token_handler))
        .route("/api/convo-ai/start", post(api_convo::start_agent_handler))
        .route(
            "/api/convo-ai/agents/{agentId}/leave",
            post(api_convo::leave_agent_handler),
        )
        .route(
            "/api/convo-ai/agents/{agentId}/status",
            get(api_convo::agent_status_handler),
        )
        .route(
            "/api/convo-ai/cleanup/{channel}",
            post(api_convo::cleanup_channel_handler),
        )
        .route(
            "/api/analyze-triage",
            post(api_analyze::analyze_triage_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(state))
}
