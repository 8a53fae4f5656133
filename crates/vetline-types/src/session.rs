//! Session state machine states and the session record.
//!
//! A [`Session`] is the unit of a single triage call. Its `state` field moves
//! strictly forward through [`SessionState`]; the only mutator is
//! [`Session::transition`], which consults the transition table in
//! [`SessionState::can_transition_to`]. Collaborator code gets read-only
//! views — nothing else writes session fields.

use crate::intake::IntakeTurn;
use crate::summary::TriageSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle states of a triage call session.
///
/// Transitions are strictly forward except `Failed`, which is reachable from
/// any non-terminal state. `Ending → Ended` is the only path to final
/// cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Configuring,
    Joining,
    Publishing,
    StartingAgent,
    Active,
    Ending,
    Ended,
    Failed,
}

impl SessionState {
    /// Returns true when no further transitions are possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ended | Self::Failed)
    }

    /// Returns true when the session is tearing down or already done.
    ///
    /// Participant and media callbacks arriving in these states are no-ops.
    pub fn is_ending_or_terminal(self) -> bool {
        matches!(self, Self::Ending | Self::Ended | Self::Failed)
    }

    /// The single source of truth for allowed transitions.
    pub fn can_transition_to(self, to: SessionState) -> bool {
        use SessionState::*;
        match (self, to) {
            // Failed is reachable from any non-terminal state.
            (from, Failed) => !from.is_terminal(),
            // Ending is reachable from any non-terminal, non-ending state.
            (from, Ending) => !from.is_ending_or_terminal(),
            (Idle, Configuring)
            | (Configuring, Joining)
            | (Joining, Publishing)
            | (Publishing, StartingAgent)
            | (StartingAgent, Active)
            | (Ending, Ended) => true,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Configuring => "configuring",
            Self::Joining => "joining",
            Self::Publishing => "publishing",
            Self::StartingAgent => "starting_agent",
            Self::Active => "active",
            Self::Ending => "ending",
            Self::Ended => "ended",
            Self::Failed => "failed",
        }
    }
}

/// A transition rejected by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid session transition: {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: SessionState,
    pub to: SessionState,
}

/// Profile data about the conversation's subject (the pet).
///
/// Immutable for the lifetime of the session, supplied at creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectProfile {
    /// The pet's name.
    pub name: String,
    /// Species or category ("dog", "cat", ...).
    pub species: String,
    /// Age in years, if known.
    pub age_years: Option<u32>,
}

/// The unit of a single triage call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Stable channel identifier shared by every collaborator.
    pub channel_id: String,
    /// Numeric identity of the human caller (0 = auto-assign at join).
    pub local_uid: u32,
    /// Numeric identity reserved for the AI agent.
    pub agent_uid: u32,
    /// Opaque handle of the running hosted agent; empty when none is active.
    pub agent_handle: Option<String>,
    pub state: SessionState,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub subject: SubjectProfile,
}

impl Session {
    /// Creates a new session in `Idle` for the given channel and subject.
    pub fn new(channel_id: impl Into<String>, local_uid: u32, subject: SubjectProfile) -> Self {
        Self {
            channel_id: channel_id.into(),
            local_uid,
            agent_uid: crate::AGENT_UID,
            agent_handle: None,
            state: SessionState::Idle,
            started_at: None,
            ended_at: None,
            subject,
        }
    }

    /// Applies a state transition, rejecting anything the table forbids.
    ///
    /// `started_at` is stamped on entering `Active`; `ended_at` on entering
    /// a terminal state. Duration is always derived from these two, never
    /// stored independently.
    pub fn transition(&mut self, to: SessionState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(to) {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        self.state = to;
        match to {
            SessionState::Active => {
                if self.started_at.is_none() {
                    self.started_at = Some(Utc::now());
                }
            }
            SessionState::Ended | SessionState::Failed => {
                if self.ended_at.is_none() {
                    self.ended_at = Some(Utc::now());
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Derived call duration, available once both timestamps exist.
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.ended_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// The persisted, finalized view of a completed session.
///
/// Produced exactly once by the finalizer and written to durable storage for
/// the summary-display surface. Owns its turns and summary; they are
/// persisted and destroyed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Stable record id (UUID v4).
    pub id: String,
    pub channel_id: String,
    pub subject: SubjectProfile,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Derived duration in seconds at finalization time.
    pub duration_secs: Option<i64>,
    pub turns: Vec<IntakeTurn>,
    pub summary: TriageSummary,
    /// True when the summary is the deterministic local fallback rather
    /// than a vendor analysis result.
    pub summary_is_fallback: bool,
}
