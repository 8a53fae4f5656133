//! Post-call triage summarization.
//!
//! A completed session always ends with a summary: either the analyzer's
//! validated output or the deterministic fallback. There is no error path
//! out of this crate's top-level entry point.

pub mod analyzer;
mod error;

pub use analyzer::{extract_json_object, parse_summary, HttpAnalyzer, TriageAnalyzer};
pub use error::SummaryError;

use vetline_types::{IntakeTurn, SubjectProfile, TriageSummary};

/// Runs analysis over the completed transcript. Infallible: any analyzer
/// failure is logged and replaced by [`TriageSummary::fallback`], with the
/// returned flag marking the substitution.
pub async fn generate_summary(
    analyzer: &dyn TriageAnalyzer,
    subject: &SubjectProfile,
    turns: &[IntakeTurn],
) -> (TriageSummary, bool) {
    match analyzer.analyze(subject, turns).await {
        Ok(summary) => (summary, false),
        Err(e) => {
            tracing::warn!(error = %e, "triage analysis failed, using fallback summary");
            (TriageSummary::fallback(), true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingAnalyzer;

    #[async_trait]
    impl TriageAnalyzer for FailingAnalyzer {
        async fn analyze(
            &self,
            _subject: &SubjectProfile,
            _turns: &[IntakeTurn],
        ) -> Result<TriageSummary, SummaryError> {
            Err(SummaryError::Http("connection refused".to_string()))
        }
    }

    fn subject() -> SubjectProfile {
        SubjectProfile {
            name: "Biscuit".to_string(),
            species: "dog".to_string(),
            age_years: Some(4),
        }
    }

    #[tokio::test]
    async fn analyzer_failure_yields_the_fallback_verbatim() {
        let (summary, is_fallback) =
            generate_summary(&FailingAnalyzer, &subject(), &[]).await;
        assert!(is_fallback);
        assert_eq!(summary, TriageSummary::fallback());
    }
}
