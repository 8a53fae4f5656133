//! Hosted conversational-agent lifecycle proxy.
//!
//! The client never talks to the agent vendor directly; these handlers
//! forward lifecycle calls with the server-held REST credentials and keep a
//! channel -> agent-handle registry so stale agents can be cleaned up after
//! a start conflict.

use axum::extract::Path;
use axum::{http::StatusCode, Extension, Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::AppState;

type ApiError = (StatusCode, Json<Value>);

fn vendor_unavailable(e: reqwest::Error) -> ApiError {
    tracing::warn!(error = %e, "agent vendor request failed");
    (
        StatusCode::BAD_GATEWAY,
        Json(json!({"error": "agent vendor unreachable"})),
    )
}

fn require_rest_credentials(state: &AppState) -> Result<(), ApiError> {
    if state.config.provider.rest_key.is_empty() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "agent REST credentials are not configured"})),
        ));
    }
    Ok(())
}

async fn read_vendor_json(resp: reqwest::Response) -> (StatusCode, Value) {
    let status =
        StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let body = resp.json::<Value>().await.unwrap_or(Value::Null);
    (status, body)
}

/// `POST /api/convo-ai/start`
///
/// Forwards the agent configuration to the vendor. A vendor 409 (an agent
/// already occupies the channel) passes through as 409 so the client's
/// controller can run its cleanup-and-retry cycle.
pub async fn start_agent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    require_rest_credentials(&state)?;

    let channel = body
        .get("channel")
        .and_then(Value::as_str)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": "missing channel in agent config"})),
            )
        })?
        .to_string();

    let provider = &state.config.provider;
    let resp = state
        .http
        .post(format!("{}/agents", provider.convo_base_url))
        .basic_auth(&provider.rest_key, Some(&provider.rest_secret))
        .json(&body)
        .send()
        .await
        .map_err(vendor_unavailable)?;

    let (status, vendor_body) = read_vendor_json(resp).await;
    if status == StatusCode::CONFLICT {
        tracing::info!(channel = %channel, "agent start conflict reported by vendor");
        return Err((status, Json(vendor_body)));
    }
    if !status.is_success() {
        tracing::warn!(channel = %channel, %status, "agent start rejected by vendor");
        return Err((StatusCode::BAD_GATEWAY, Json(vendor_body)));
    }

    let agent_id = vendor_body
        .get("agent_id")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "vendor response missing agent_id"})),
            )
        })?
        .to_string();

    state
        .active_agents
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .insert(channel.clone(), agent_id.clone());
    tracing::info!(channel = %channel, agent_id = %agent_id, "hosted agent started");

    Ok(Json(vendor_body))
}

/// `POST /api/convo-ai/agents/{agentId}/leave`
pub async fn leave_agent_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_rest_credentials(&state)?;

    let provider = &state.config.provider;
    let resp = state
        .http
        .post(format!("{}/agents/{agent_id}/leave", provider.convo_base_url))
        .basic_auth(&provider.rest_key, Some(&provider.rest_secret))
        .send()
        .await
        .map_err(vendor_unavailable)?;

    let (status, vendor_body) = read_vendor_json(resp).await;
    if !status.is_success() {
        return Err((StatusCode::BAD_GATEWAY, Json(vendor_body)));
    }

    state
        .active_agents
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .retain(|_, handle| handle != &agent_id);
    tracing::info!(agent_id = %agent_id, "hosted agent left");

    Ok(Json(json!({"status": "ok"})))
}

/// `GET /api/convo-ai/agents/{agentId}/status`
pub async fn agent_status_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(agent_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_rest_credentials(&state)?;

    let provider = &state.config.provider;
    let resp = state
        .http
        .get(format!("{}/agents/{agent_id}", provider.convo_base_url))
        .basic_auth(&provider.rest_key, Some(&provider.rest_secret))
        .send()
        .await
        .map_err(vendor_unavailable)?;

    let (status, vendor_body) = read_vendor_json(resp).await;
    if !status.is_success() {
        return Err((StatusCode::BAD_GATEWAY, Json(vendor_body)));
    }
    Ok(Json(vendor_body))
}

/// `POST /api/convo-ai/cleanup/{channel}`
///
/// Best-effort teardown of whatever agent this server last started on the
/// channel. Always answers 200; `cleaned` reports whether anything was
/// there to remove.
pub async fn cleanup_channel_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(channel): Path<String>,
) -> Result<Json<Value>, ApiError> {
    require_rest_credentials(&state)?;

    let agent_id = state
        .active_agents
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .remove(&channel);

    let Some(agent_id) = agent_id else {
        return Ok(Json(json!({"cleaned": false})));
    };

    let provider = &state.config.provider;
    let result = state
        .http
        .post(format!("{}/agents/{agent_id}/leave", provider.convo_base_url))
        .basic_auth(&provider.rest_key, Some(&provider.rest_secret))
        .send()
        .await;

    // Cleanup is best-effort: the registry entry is already gone, and a
    // vendor failure here must not block the caller's retry.
    if let Err(e) = result {
        tracing::warn!(channel = %channel, agent_id = %agent_id, error = %e,
            "stale agent leave failed during cleanup");
    }

    tracing::info!(channel = %channel, agent_id = %agent_id, "stale agent cleaned up");
    Ok(Json(json!({"cleaned": true, "agent_id": agent_id})))
}
