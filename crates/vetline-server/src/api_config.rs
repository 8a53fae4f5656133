//! Client bootstrap configuration endpoint.
//!
//! Returns only what the browser client needs to start a session. Secrets
//! (certificate, REST secret, LLM key) stay server-side; the client learns
//! whether dependent features are configured, never the keys themselves.

use axum::{http::StatusCode, Extension, Json};
use serde_json::{json, Value};
use std::sync::Arc;
use vetline_types::AGENT_UID;

use crate::AppState;

/// `GET /config`
pub async fn get_config_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let provider = &state.config.provider;
    if provider.app_id.is_empty() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "provider app id is not configured"})),
        ));
    }

    Ok(Json(json!({
        "appId": provider.app_id,
        "agentUid": AGENT_UID,
        "tokenTtlSecs": state.broker.ttl_secs(),
        "agentConfigured": !provider.rest_key.is_empty(),
        "analysisConfigured": !state.config.llm.api_key.is_empty(),
        "llmModel": state.config.llm.model,
    })))
}
