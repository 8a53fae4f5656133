//! Intake turn: one fixed-ordinal question/response pair.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response text recorded when no answer arrives within a turn's listening
/// window. A timed-out question still produces a turn, never a gap.
pub const NO_RESPONSE_SENTINEL: &str = "[no response]";

/// One question/answer pair of the triage protocol.
///
/// Immutable once captured. `ordinal` is 1..N, strictly increasing with no
/// gaps, and defines presentation order — it is never reordered based on
/// response content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntakeTurn {
    pub ordinal: u32,
    /// The exact text spoken to the subject's owner.
    pub prompt: String,
    /// Raw captured answer text, or [`NO_RESPONSE_SENTINEL`] on timeout.
    pub response: String,
    pub captured_at: DateTime<Utc>,
}

impl IntakeTurn {
    /// Captures a turn with the current timestamp.
    pub fn captured(ordinal: u32, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            ordinal,
            prompt: prompt.into(),
            response: response.into(),
            captured_at: Utc::now(),
        }
    }

    /// Captures a turn whose listening window expired without an answer.
    pub fn timed_out(ordinal: u32, prompt: impl Into<String>) -> Self {
        Self::captured(ordinal, prompt, NO_RESPONSE_SENTINEL)
    }

    /// True when this turn holds the timeout sentinel instead of an answer.
    pub fn is_timeout(&self) -> bool {
        self.response == NO_RESPONSE_SENTINEL
    }
}
