use thiserror::Error;
use vetline_agent::AgentError;
use vetline_session::SessionError;

#[derive(Debug, Error)]
pub enum CallError {
    /// Config or token fetch failed. Fatal to session start, never retried
    /// automatically.
    #[error("configuration unavailable: {0}")]
    ConfigUnavailable(String),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    /// The finalizer had already run when the orchestrator reached it.
    #[error("session was already finalized")]
    AlreadyFinalized,
}
