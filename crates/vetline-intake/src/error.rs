use thiserror::Error;

#[derive(Debug, Error)]
pub enum IntakeError {
    /// The voice output path failed to render a prompt. Logged by the
    /// sequencer and never fatal to the intake loop.
    #[error("voice output failed: {0}")]
    Voice(String),
}
