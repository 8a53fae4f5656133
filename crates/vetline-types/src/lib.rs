//! Shared types, error definitions, and constants for the Vetline platform.
//!
//! This crate provides the foundational types used across all Vetline crates:
//! the session state machine states, the subject (pet) profile, intake turns,
//! the triage summary, and participant identity conventions.
//!
//! No crate in the workspace depends on anything *except* `vetline-types` for
//! cross-cutting type definitions. This keeps the dependency graph clean and
//! prevents circular dependencies.

use serde::{Deserialize, Serialize};

mod intake;
mod session;
mod summary;

pub use intake::{IntakeTurn, NO_RESPONSE_SENTINEL};
pub use session::{Session, SessionRecord, SessionState, SubjectProfile, TransitionError};
pub use summary::{TriageSummary, Urgency};

/// Reserved numeric participant identity for the AI triage agent.
///
/// Must differ from every human identity in a channel. Human callers use
/// either a caller-supplied positive uid or [`AUTO_ASSIGN_UID`].
pub const AGENT_UID: u32 = 10001;

/// Participant identity value meaning "let the transport assign one".
///
/// Permitted only for the human caller, never for the agent.
pub const AUTO_ASSIGN_UID: u32 = 0;

/// Role a participant requests when joining a channel.
///
/// Part of the scope triple `(channel, uid, role)` a join token is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    /// May publish local media and subscribe to remote media.
    Publisher,
    /// May only subscribe to remote media.
    Subscriber,
}

impl ParticipantRole {
    /// Returns the wire label for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Publisher => "publisher",
            Self::Subscriber => "subscriber",
        }
    }

    /// Parses a wire label into a role. Returns `None` for unknown labels.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "publisher" => Some(Self::Publisher),
            "subscriber" => Some(Self::Subscriber),
            _ => None,
        }
    }
}

/// Kinds of media a participant can publish into a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Audio => "audio",
            Self::Video => "video",
        }
    }
}
