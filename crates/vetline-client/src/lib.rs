//! The Vetline call client.
//!
//! Ties the session state machine, agent controller, intake protocol,
//! summarizer, and store together into one orchestrated triage call against
//! the trusted proxy.

pub mod config;
mod error;
pub mod finalizer;
pub mod orchestrator;

pub use config::{ClientConfig, CredentialSource, HttpCredentialSource};
pub use error::CallError;
pub use finalizer::Finalizer;
pub use orchestrator::CallOrchestrator;
