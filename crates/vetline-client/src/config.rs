//! Client bootstrap: fetching non-secret configuration and scoped join
//! tokens from the trusted proxy.
//!
//! The proxy holds every secret; the client only ever sees the app id and
//! minted tokens. A failed fetch here is fatal to session start.

use crate::error::CallError;
use async_trait::async_trait;
use serde::Deserialize;
use vetline_types::ParticipantRole;

/// Non-secret connection parameters served by `GET /config`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    pub app_id: String,
    /// Participant identity reserved for the hosted agent.
    pub agent_uid: u32,
    pub token_ttl_secs: u64,
    #[serde(default)]
    pub agent_configured: bool,
    #[serde(default)]
    pub analysis_configured: bool,
}

/// Where the orchestrator gets its bootstrap config and join tokens.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn bootstrap(&self) -> Result<ClientConfig, CallError>;

    async fn join_token(
        &self,
        channel: &str,
        uid: u32,
        role: ParticipantRole,
    ) -> Result<String, CallError>;
}

/// Credential source backed by the proxy's HTTP endpoints.
#[derive(Debug, Clone)]
pub struct HttpCredentialSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCredentialSource {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[async_trait]
impl CredentialSource for HttpCredentialSource {
    async fn bootstrap(&self) -> Result<ClientConfig, CallError> {
        let resp = self
            .http
            .get(format!("{}/config", self.base_url))
            .send()
            .await
            .map_err(|e| CallError::ConfigUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CallError::ConfigUnavailable(format!(
                "config endpoint returned {}",
                resp.status()
            )));
        }
        resp.json::<ClientConfig>()
            .await
            .map_err(|e| CallError::ConfigUnavailable(e.to_string()))
    }

    async fn join_token(
        &self,
        channel: &str,
        uid: u32,
        role: ParticipantRole,
    ) -> Result<String, CallError> {
        let resp = self
            .http
            .get(format!("{}/api/token", self.base_url))
            .query(&[
                ("channelName", channel),
                ("uid", &uid.to_string()),
                ("role", role.as_str()),
            ])
            .send()
            .await
            .map_err(|e| CallError::ConfigUnavailable(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(CallError::ConfigUnavailable(format!(
                "token endpoint returned {}",
                resp.status()
            )));
        }
        let body: TokenResponse = resp
            .json()
            .await
            .map_err(|e| CallError::ConfigUnavailable(e.to_string()))?;
        Ok(body.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_parses_the_proxy_payload() {
        let parsed: ClientConfig = serde_json::from_str(
            r#"{
                "appId": "app-1",
                "agentUid": 10001,
                "tokenTtlSecs": 3600,
                "agentConfigured": true,
                "analysisConfigured": false,
                "llmModel": "gpt-4o-mini"
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.app_id, "app-1");
        assert_eq!(parsed.agent_uid, 10001);
        assert!(parsed.agent_configured);
        assert!(!parsed.analysis_configured);
    }
}
