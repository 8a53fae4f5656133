//! Hosted conversational agent lifecycle.
//!
//! Starts, monitors, and stops the server-managed AI agent bound to a triage
//! channel. The vendor is reached only through the [`AgentProvider`] trait;
//! the controller owns conflict recovery (one cleanup+retry cycle, bounded
//! by an explicit [`RetryPolicy`]) and best-effort stop semantics.

mod config;
mod controller;
mod error;
mod provider;
mod retry;

pub use config::{AgentConfig, AsrConfig, SilencePolicy, TtsParams, DEFAULT_IDLE_TIMEOUT_SECS};
pub use controller::AgentController;
pub use error::AgentError;
pub use provider::{AgentProvider, AgentStatus, CleanupOutcome, HttpAgentProvider, ProviderError};
pub use retry::RetryPolicy;
