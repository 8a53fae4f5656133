//! Triage summary: the urgency-classified outcome of a completed intake.

use serde::{Deserialize, Serialize};

/// Coarse severity classification attached to a completed triage summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    High,
    Medium,
    Low,
}

impl Urgency {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Parses a vendor-reported urgency label, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Derived analysis of the full ordered set of intake turns.
///
/// Produced exactly once per completed session; recomputed only if
/// explicitly regenerated, never silently overwritten. `urgency` is always
/// set — analysis failure yields the deterministic fallback, never an unset
/// field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageSummary {
    pub urgency: Urgency,
    pub reasoning: String,
    #[serde(default)]
    pub findings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub follow_ups: Vec<String>,
    /// The only field rendered through speech; kept to 2-3 sentences.
    pub spoken_digest: String,
}

impl TriageSummary {
    /// The deterministic summary used when the analysis step is unavailable.
    ///
    /// Always Medium urgency with a non-empty reason; reaching the end of an
    /// intake session must always yield a summary.
    pub fn fallback() -> Self {
        Self {
            urgency: Urgency::Medium,
            reasoning: "Automated triage analysis was unavailable for this session."
                .to_string(),
            findings: Vec::new(),
            recommendations: vec![
                "Contact your veterinary clinic directly to review these answers.".to_string(),
            ],
            follow_ups: Vec::new(),
            spoken_digest: "I couldn't complete the automated review of your answers. \
                            Please contact your veterinary clinic directly so they can \
                            advise you."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urgency_parse_is_case_insensitive() {
        assert_eq!(Urgency::parse("HIGH"), Some(Urgency::High));
        assert_eq!(Urgency::parse(" medium "), Some(Urgency::Medium));
        assert_eq!(Urgency::parse("Low"), Some(Urgency::Low));
        assert_eq!(Urgency::parse("critical"), None);
    }

    #[test]
    fn fallback_is_medium_with_reason() {
        let fb = TriageSummary::fallback();
        assert_eq!(fb.urgency, Urgency::Medium);
        assert!(!fb.reasoning.is_empty());
        assert!(!fb.recommendations.is_empty());
        assert!(!fb.spoken_digest.is_empty());
    }

    #[test]
    fn summary_deserializes_with_missing_lists() {
        let json = r#"{
            "urgency": "high",
            "reasoning": "labored breathing reported",
            "spoken_digest": "Please see a vet now."
        }"#;
        let parsed: TriageSummary = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.urgency, Urgency::High);
        assert!(parsed.findings.is_empty());
    }
}
