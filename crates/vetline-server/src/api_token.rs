//! Join-token minting endpoint.

use axum::extract::Query;
use axum::{http::StatusCode, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use vetline_token::TokenError;
use vetline_types::ParticipantRole;

use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenQuery {
    channel_name: String,
    uid: u32,
    role: String,
}

/// `GET /api/token?channelName=...&uid=...&role=...`
pub async fn mint_token_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<TokenQuery>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let role = ParticipantRole::parse(&params.role).ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("unknown role '{}'", params.role)})),
        )
    })?;

    let token = state
        .broker
        .mint(&params.channel_name, params.uid, role)
        .map_err(|e| {
            let status = match e {
                TokenError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
                TokenError::CredentialUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!(channel = %params.channel_name, error = %e, "token mint rejected");
            (status, Json(json!({"error": e.to_string()})))
        })?;

    Ok(Json(json!({
        "token": token,
        "appId": state.config.provider.app_id,
        "channelName": params.channel_name,
        "uid": params.uid,
        "role": role.as_str(),
        "expiresIn": state.broker.ttl_secs(),
    })))
}
