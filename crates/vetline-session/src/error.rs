use thiserror::Error;
use vetline_types::TransitionError;

#[derive(Debug, Error)]
pub enum SessionError {
    /// The transport rejected the join for token reasons. Distinct from a
    /// generic join failure so the caller can choose to re-mint a token.
    #[error("join rejected: credential invalid")]
    CredentialInvalid,

    /// Any other transport-level join failure.
    #[error("channel join failed: {0}")]
    JoinFailed(String),

    /// Camera/microphone permission or device failure. Fatal to start.
    #[error("media access denied: {0}")]
    MediaAccessDenied(String),

    /// Publishing an acquired track to the transport failed.
    #[error("media publish failed: {0}")]
    PublishFailed(String),

    /// The state machine rejected the requested step.
    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    /// An operation that requires a live transport connection ran without one.
    #[error("session is not joined to a channel")]
    NotJoined,
}
