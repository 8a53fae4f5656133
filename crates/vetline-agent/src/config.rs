//! Provider-agnostic hosted agent configuration.

use serde::{Deserialize, Serialize};

/// Seconds of total inactivity after which the agent may end itself.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u32 = 120;

/// Seconds of silence after which the agent prompts the caller to continue
/// rather than ending the turn.
pub const DEFAULT_SILENCE_TIMEOUT_SECS: u32 = 15;

/// Speech recognition settings for the hosted pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AsrConfig {
    /// BCP-47 language tag, e.g. "en-US".
    pub language: String,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            language: "en-US".to_string(),
        }
    }
}

/// Text-to-speech voice parameters for the hosted pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TtsParams {
    pub voice: String,
    /// Speech speed multiplier (1.0 is normal).
    pub speed: f32,
    /// Output volume, 0.0 to 1.0.
    pub volume: f32,
}

impl Default for TtsParams {
    fn default() -> Self {
        Self {
            voice: "en-US-standard-b".to_string(),
            speed: 1.0,
            volume: 1.0,
        }
    }
}

/// What the agent does when it detects no caller speech for a while.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SilencePolicy {
    pub timeout_secs: u32,
    /// Spoken when the timeout elapses, instead of ending the turn.
    pub reprompt: String,
}

impl Default for SilencePolicy {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_SILENCE_TIMEOUT_SECS,
            reprompt: "Are you still there? Take your time — I'm listening.".to_string(),
        }
    }
}

/// Everything the provider needs to run one triage agent on one channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub channel: String,
    /// The agent's own participant identity (never auto-assigned).
    pub agent_uid: u32,
    /// Join token scoped to (channel, agent_uid, publisher).
    pub agent_token: String,
    /// Human participant uids the agent subscribes to.
    pub remote_uids: Vec<u32>,
    /// Seconds of inactivity after which the agent may end itself.
    pub idle_timeout_secs: u32,
    /// Spoken immediately on join.
    pub greeting: String,
    /// Structured instruction constraining the agent's turn-taking; built
    /// from the subject profile and the fixed question list.
    pub system_instruction: String,
    pub asr: AsrConfig,
    pub tts: TtsParams,
    pub silence: SilencePolicy,
}

impl AgentConfig {
    pub fn new(
        channel: impl Into<String>,
        agent_token: impl Into<String>,
        remote_uids: Vec<u32>,
        greeting: impl Into<String>,
        system_instruction: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            agent_uid: vetline_types::AGENT_UID,
            agent_token: agent_token.into(),
            remote_uids,
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            greeting: greeting.into(),
            system_instruction: system_instruction.into(),
            asr: AsrConfig::default(),
            tts: TtsParams::default(),
            silence: SilencePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_design_targets() {
        let cfg = AgentConfig::new("triage-1", "tok", vec![42], "hello", "ask in order");
        assert_eq!(cfg.agent_uid, vetline_types::AGENT_UID);
        assert_eq!(cfg.idle_timeout_secs, 120);
        assert_eq!(cfg.silence.timeout_secs, 15);
        assert!(!cfg.silence.reprompt.is_empty());
    }
}
