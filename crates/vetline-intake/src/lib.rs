//! The fixed-question triage intake protocol.
//!
//! Five questions, always in the same order, each answered (or recorded as
//! unanswered with the timeout sentinel) before the next is asked. The
//! protocol can be driven by the vendor-hosted agent or by the local
//! sequencer; both routes converge on the same ordered [`IntakeTurn`] list.
//!
//! [`IntakeTurn`]: vetline_types::IntakeTurn

pub mod driver;
pub mod endpoint;
mod error;
pub mod instruction;
pub mod questions;
pub mod sequencer;

pub use driver::{driver_for, HostedDriver, IntakeDriver, IntakeMode, LocalDriver};
pub use endpoint::{EndpointConfig, EnergyEndpointer, ListenOutcome};
pub use error::IntakeError;
pub use instruction::{build_greeting, build_system_instruction};
pub use questions::{Question, CLOSING_LINE, INTAKE_QUESTIONS};
pub use sequencer::{QuestionSequencer, VoiceIo};
