//! Triage analysis endpoint.
//!
//! Takes the full ordered transcript, asks the LLM vendor for a structured
//! summary, and validates the result before returning it. A malformed or
//! failed vendor response is a 502; the client substitutes its own
//! deterministic fallback, so this endpoint never invents one.

use axum::{http::StatusCode, Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use vetline_summary::parse_summary;
use vetline_types::{SubjectProfile, TriageSummary};

use crate::AppState;

type ApiError = (StatusCode, Json<Value>);

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    subject: Option<SubjectProfile>,
    responses: Vec<ResponseItem>,
}

#[derive(Debug, Deserialize)]
struct ResponseItem {
    ordinal: u32,
    question: String,
    answer: String,
}

const SYSTEM_PROMPT: &str = "You are a veterinary triage analyst. Given a pet owner's answers \
to a fixed intake questionnaire, respond with ONLY a JSON object with these fields: \
\"urgency\" (one of \"high\", \"medium\", \"low\"), \"reasoning\" (string), \
\"findings\" (array of strings), \"recommendations\" (array of strings), \
\"follow_ups\" (array of strings), and \"spoken_digest\" (2-3 spoken sentences for the owner). \
An answer of \"[no response]\" means the owner did not answer that question.";

fn build_user_prompt(req: &AnalyzeRequest) -> String {
    let mut out = String::new();
    if let Some(subject) = &req.subject {
        out.push_str(&format!(
            "Patient: {} ({}{})\n",
            subject.name,
            subject.species,
            subject
                .age_years
                .map(|a| format!(", {a} years old"))
                .unwrap_or_default(),
        ));
    }
    out.push_str("Intake answers:\n");
    for item in &req.responses {
        out.push_str(&format!(
            "{}. Q: {}\n   A: {}\n",
            item.ordinal, item.question, item.answer
        ));
    }
    out
}

/// `POST /api/analyze-triage`
pub async fn analyze_triage_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<TriageSummary>, ApiError> {
    if req.responses.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "responses must be non-empty"})),
        ));
    }

    let llm = &state.config.llm;
    if llm.api_key.is_empty() {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "LLM credentials are not configured"})),
        ));
    }

    let request_body = json!({
        "model": llm.model,
        "messages": [
            {"role": "system", "content": SYSTEM_PROMPT},
            {"role": "user", "content": build_user_prompt(&req)},
        ],
        "temperature": 0.2,
    });

    let resp = state
        .http
        .post(format!("{}/chat/completions", llm.base_url))
        .bearer_auth(&llm.api_key)
        .json(&request_body)
        .send()
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "LLM vendor request failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "analysis vendor unreachable"})),
            )
        })?;

    let status = resp.status();
    let body: Value = resp.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        tracing::warn!(%status, "LLM vendor rejected analysis request");
        return Err((
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": "analysis vendor error"})),
        ));
    }

    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| {
            (
                StatusCode::BAD_GATEWAY,
                Json(json!({"error": "vendor response missing content"})),
            )
        })?;

    let summary = parse_summary(content).map_err(|e| {
        tracing::warn!(error = %e, "LLM returned an unusable summary");
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({"error": "vendor returned an unusable summary"})),
        )
    })?;

    tracing::info!(urgency = summary.urgency.as_str(), "triage analysis completed");
    Ok(Json(summary))
}
