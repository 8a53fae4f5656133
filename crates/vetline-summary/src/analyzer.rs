//! Triage analysis over the completed intake transcript.
//!
//! The analyzer sees the full ordered turn list, timeout sentinels included;
//! an unanswered question is itself a signal. Callers never handle analysis
//! failure: [`generate_summary`](crate::generate_summary) absorbs every error
//! into the deterministic fallback.

use crate::error::SummaryError;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use vetline_types::{IntakeTurn, SubjectProfile, TriageSummary};

/// HTTP request timeout for the analysis call.
const ANALYZE_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait TriageAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        subject: &SubjectProfile,
        turns: &[IntakeTurn],
    ) -> Result<TriageSummary, SummaryError>;
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    subject: &'a SubjectProfile,
    responses: Vec<ResponseItem<'a>>,
}

#[derive(Debug, Serialize)]
struct ResponseItem<'a> {
    ordinal: u32,
    question: &'a str,
    answer: &'a str,
}

/// Analyzer that posts the transcript to the backend's analysis endpoint.
#[derive(Debug, Clone)]
pub struct HttpAnalyzer {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAnalyzer {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(ANALYZE_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TriageAnalyzer for HttpAnalyzer {
    async fn analyze(
        &self,
        subject: &SubjectProfile,
        turns: &[IntakeTurn],
    ) -> Result<TriageSummary, SummaryError> {
        let body = AnalyzeRequest {
            subject,
            responses: turns
                .iter()
                .map(|t| ResponseItem {
                    ordinal: t.ordinal,
                    question: t.prompt.as_str(),
                    answer: t.response.as_str(),
                })
                .collect(),
        };

        let resp = self
            .http
            .post(format!("{}/api/analyze-triage", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| SummaryError::Http(e.to_string()))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| SummaryError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(SummaryError::Http(format!(
                "analysis endpoint returned {status}"
            )));
        }

        parse_summary(&text)
    }
}

/// Parses an analysis payload into a validated summary.
///
/// Model-backed services sometimes wrap the JSON object in markdown code
/// fences or prose; the parse extracts the outermost JSON object before
/// deserializing.
pub fn parse_summary(text: &str) -> Result<TriageSummary, SummaryError> {
    let json = extract_json_object(text)
        .ok_or_else(|| SummaryError::BadResponse("no JSON object in response".to_string()))?;
    let summary: TriageSummary =
        serde_json::from_str(json).map_err(|e| SummaryError::BadResponse(e.to_string()))?;
    if summary.spoken_digest.trim().is_empty() {
        return Err(SummaryError::BadResponse(
            "summary has an empty spoken digest".to_string(),
        ));
    }
    Ok(summary)
}

/// Slices the outermost `{...}` span from a possibly fenced or prose-wrapped
/// payload. Returns `None` when no braced span exists.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use vetline_types::Urgency;

    const VALID: &str = r#"{
        "urgency": "high",
        "reasoning": "labored breathing in a senior dog",
        "findings": ["breathing difficulty"],
        "recommendations": ["seek emergency care"],
        "follow_ups": [],
        "spoken_digest": "Based on your answers, please seek emergency care now."
    }"#;

    #[test]
    fn parses_a_plain_json_summary() {
        let summary = parse_summary(VALID).unwrap();
        assert_eq!(summary.urgency, Urgency::High);
        assert_eq!(summary.findings.len(), 1);
    }

    #[test]
    fn strips_markdown_fences_before_parsing() {
        let fenced = format!("```json\n{VALID}\n```");
        let summary = parse_summary(&fenced).unwrap();
        assert_eq!(summary.urgency, Urgency::High);
    }

    #[test]
    fn rejects_prose_with_no_json() {
        let err = parse_summary("The pet seems fine, urgency low.").unwrap_err();
        assert!(matches!(err, SummaryError::BadResponse(_)));
    }

    #[test]
    fn rejects_unknown_urgency_labels() {
        let bad = r#"{"urgency": "critical", "reasoning": "x", "spoken_digest": "y"}"#;
        assert!(parse_summary(bad).is_err());
    }

    #[test]
    fn rejects_empty_spoken_digest() {
        let bad = r#"{"urgency": "low", "reasoning": "x", "spoken_digest": "  "}"#;
        assert!(parse_summary(bad).is_err());
    }

    #[test]
    fn extracts_the_outermost_object() {
        let wrapped = "Here you go: {\"a\": {\"b\": 1}} thanks";
        assert_eq!(extract_json_object(wrapped), Some("{\"a\": {\"b\": 1}}"));
        assert_eq!(extract_json_object("no braces"), None);
    }
}
