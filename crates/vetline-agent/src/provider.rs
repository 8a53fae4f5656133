//! The hosted-agent provider boundary.

use crate::config::AgentConfig;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Another agent already occupies the channel. A distinct, named
    /// outcome: recoverable via cleanup + one retry, never plain duplication.
    #[error("an agent already exists for this channel")]
    Conflict,

    /// Transport-level failure reaching the provider.
    #[error("provider request failed: {0}")]
    Http(String),

    /// The provider answered with an unexpected status or body.
    #[error("provider returned an unusable response: {0}")]
    BadResponse(String),
}

/// Reported state of a running hosted agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub agent_id: String,
    /// Provider-defined state label ("RUNNING", "STOPPED", ...).
    pub state: String,
}

/// Result of a best-effort stale-agent cleanup for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupOutcome {
    pub cleaned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

/// Remote operations on the conversational-agent service.
#[async_trait]
pub trait AgentProvider: Send + Sync {
    /// Creates an agent; returns the opaque handle required to stop it.
    async fn create(&self, config: &AgentConfig) -> Result<String, ProviderError>;

    /// Stops the agent identified by `agent_id`.
    async fn leave(&self, agent_id: &str) -> Result<(), ProviderError>;

    async fn status(&self, agent_id: &str) -> Result<AgentStatus, ProviderError>;

    /// Best-effort teardown of whatever agent is registered for `channel`.
    async fn cleanup_channel(&self, channel: &str) -> Result<CleanupOutcome, ProviderError>;
}

#[derive(Debug, Deserialize)]
struct CreateAgentResponse {
    agent_id: String,
}

/// HTTP implementation speaking to the vetline server proxy.
#[derive(Debug, Clone)]
pub struct HttpAgentProvider {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAgentProvider {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl AgentProvider for HttpAgentProvider {
    async fn create(&self, config: &AgentConfig) -> Result<String, ProviderError> {
        let resp = self
            .http
            .post(self.url("/api/convo-ai/start"))
            .json(config)
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        match resp.status() {
            reqwest::StatusCode::CONFLICT => Err(ProviderError::Conflict),
            status if status.is_success() => {
                let body: CreateAgentResponse = resp
                    .json()
                    .await
                    .map_err(|e| ProviderError::BadResponse(e.to_string()))?;
                Ok(body.agent_id)
            }
            status => Err(ProviderError::BadResponse(format!(
                "agent create returned {status}"
            ))),
        }
    }

    async fn leave(&self, agent_id: &str) -> Result<(), ProviderError> {
        let resp = self
            .http
            .post(self.url(&format!("/api/convo-ai/agents/{agent_id}/leave")))
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::BadResponse(format!(
                "agent leave returned {}",
                resp.status()
            )))
        }
    }

    async fn status(&self, agent_id: &str) -> Result<AgentStatus, ProviderError> {
        let resp = self
            .http
            .get(self.url(&format!("/api/convo-ai/agents/{agent_id}/status")))
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ProviderError::BadResponse(format!(
                "agent status returned {}",
                resp.status()
            )));
        }
        resp.json()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))
    }

    async fn cleanup_channel(&self, channel: &str) -> Result<CleanupOutcome, ProviderError> {
        let resp = self
            .http
            .post(self.url(&format!("/api/convo-ai/cleanup/{channel}")))
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(ProviderError::BadResponse(format!(
                "cleanup returned {}",
                resp.status()
            )));
        }
        resp.json()
            .await
            .map_err(|e| ProviderError::BadResponse(e.to_string()))
    }
}
