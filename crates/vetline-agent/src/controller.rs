//! Agent lifecycle control with bounded conflict recovery.

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::provider::{AgentProvider, AgentStatus, ProviderError};
use crate::retry::RetryPolicy;
use std::sync::Arc;

/// Starts, monitors, and stops hosted agents through an [`AgentProvider`].
pub struct AgentController {
    provider: Arc<dyn AgentProvider>,
    retry: RetryPolicy,
}

impl AgentController {
    pub fn new(provider: Arc<dyn AgentProvider>) -> Self {
        Self {
            provider,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Creates a hosted agent for the configured channel and returns its
    /// handle.
    ///
    /// Conflict handling: if creation fails because an agent already exists
    /// for the channel, the controller (a) best-effort stops whatever agent
    /// is registered for that channel, (b) waits the policy backoff so
    /// upstream teardown can propagate, and (c) retries creation exactly
    /// once. A second conflict (or any retry failure) is surfaced as a
    /// terminal [`AgentError::StartFailed`] — no unbounded retry loop.
    ///
    /// The handle is returned only for the finally successful creation;
    /// a conflicting earlier agent's handle is never handed to the caller.
    pub async fn start(&self, config: &AgentConfig) -> Result<String, AgentError> {
        let mut attempt = 1u32;
        loop {
            match self.provider.create(config).await {
                Ok(agent_id) => {
                    tracing::info!(
                        channel = %config.channel,
                        agent_id = %agent_id,
                        attempt,
                        "hosted agent started"
                    );
                    return Ok(agent_id);
                }
                Err(ProviderError::Conflict) if self.retry.allows_retry_after(attempt) => {
                    tracing::warn!(
                        channel = %config.channel,
                        attempt,
                        "agent start conflict, attempting cleanup and retry"
                    );
                    match self.provider.cleanup_channel(&config.channel).await {
                        Ok(outcome) => tracing::info!(
                            channel = %config.channel,
                            cleaned = outcome.cleaned,
                            stale_agent = outcome.agent_id.as_deref().unwrap_or("<none>"),
                            "stale agent cleanup completed"
                        ),
                        Err(e) => tracing::warn!(
                            channel = %config.channel,
                            error = %e,
                            "stale agent cleanup failed, retrying create anyway"
                        ),
                    }
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                Err(ProviderError::Conflict) => {
                    return Err(AgentError::StartFailed(format!(
                        "channel {} still occupied after {} attempts",
                        config.channel, attempt
                    )));
                }
                Err(other) => {
                    return Err(AgentError::StartFailed(other.to_string()));
                }
            }
        }
    }

    /// Stops the agent with the given handle.
    ///
    /// Failures are logged and returned, but callers in teardown paths treat
    /// them as best-effort — a stop failure never blocks further cleanup.
    pub async fn stop(&self, agent_id: &str) -> Result<(), AgentError> {
        match self.provider.leave(agent_id).await {
            Ok(()) => {
                tracing::info!(agent_id, "hosted agent stopped");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(agent_id, error = %e, "hosted agent stop failed");
                Err(e.into())
            }
        }
    }

    pub async fn status(&self, agent_id: &str) -> Result<AgentStatus, AgentError> {
        Ok(self.provider.status(agent_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CleanupOutcome;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted provider: pops one create outcome per call.
    #[derive(Default)]
    struct ScriptedProvider {
        create_outcomes: Mutex<VecDeque<Result<String, ProviderError>>>,
        cleanups: AtomicU32,
        leaves: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn with_creates(outcomes: Vec<Result<String, ProviderError>>) -> Arc<Self> {
            Arc::new(Self {
                create_outcomes: Mutex::new(outcomes.into()),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl AgentProvider for ScriptedProvider {
        async fn create(&self, _config: &AgentConfig) -> Result<String, ProviderError> {
            self.create_outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ProviderError::Http("script exhausted".to_string())))
        }

        async fn leave(&self, agent_id: &str) -> Result<(), ProviderError> {
            self.leaves.lock().unwrap().push(agent_id.to_string());
            Ok(())
        }

        async fn status(&self, agent_id: &str) -> Result<AgentStatus, ProviderError> {
            Ok(AgentStatus {
                agent_id: agent_id.to_string(),
                state: "RUNNING".to_string(),
            })
        }

        async fn cleanup_channel(&self, _channel: &str) -> Result<CleanupOutcome, ProviderError> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            Ok(CleanupOutcome {
                cleaned: true,
                agent_id: Some("stale-agent".to_string()),
            })
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 2,
            backoff: Duration::from_millis(5),
        }
    }

    fn config() -> AgentConfig {
        AgentConfig::new("triage-1", "tok", vec![42], "hello", "ask in order")
    }

    #[tokio::test]
    async fn clean_start_returns_handle_without_cleanup() {
        let provider = ScriptedProvider::with_creates(vec![Ok("agent-1".to_string())]);
        let controller = AgentController::new(provider.clone()).with_retry(fast_retry());

        let handle = controller.start(&config()).await.unwrap();
        assert_eq!(handle, "agent-1");
        assert_eq!(provider.cleanups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn conflict_triggers_exactly_one_cleanup_and_retry() {
        let provider = ScriptedProvider::with_creates(vec![
            Err(ProviderError::Conflict),
            Ok("agent-2".to_string()),
        ]);
        let controller = AgentController::new(provider.clone()).with_retry(fast_retry());

        let handle = controller.start(&config()).await.unwrap();
        // Only the final successful handle is ever surfaced.
        assert_eq!(handle, "agent-2");
        assert_eq!(provider.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_conflict_is_terminal_start_failure() {
        let provider = ScriptedProvider::with_creates(vec![
            Err(ProviderError::Conflict),
            Err(ProviderError::Conflict),
        ]);
        let controller = AgentController::new(provider.clone()).with_retry(fast_retry());

        let err = controller.start(&config()).await.unwrap_err();
        assert!(matches!(err, AgentError::StartFailed(_)));
        // One cleanup cycle, not two: the bound held.
        assert_eq!(provider.cleanups.load(Ordering::SeqCst), 1);
        assert!(provider.create_outcomes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_conflict_failure_is_terminal_without_retry() {
        let provider = ScriptedProvider::with_creates(vec![Err(ProviderError::Http(
            "connection refused".to_string(),
        ))]);
        let controller = AgentController::new(provider.clone()).with_retry(fast_retry());

        let err = controller.start(&config()).await.unwrap_err();
        assert!(matches!(err, AgentError::StartFailed(_)));
        assert_eq!(provider.cleanups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_forwards_to_provider() {
        let provider = ScriptedProvider::with_creates(vec![]);
        let controller = AgentController::new(provider.clone());

        controller.stop("agent-9").await.unwrap();
        assert_eq!(provider.leaves.lock().unwrap().as_slice(), ["agent-9"]);
    }
}
