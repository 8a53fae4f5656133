use crate::provider::ProviderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AgentError {
    /// Agent creation failed after the bounded conflict-recovery cycle.
    /// Terminal: the caller must not retry further.
    #[error("agent start failed: {0}")]
    StartFailed(String),

    /// The provider call itself failed for non-conflict reasons.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
