//! The fixed triage question protocol.
//!
//! Five questions, asked in ordinal order, never reordered or skipped based
//! on response content. After the final question the assistant speaks only
//! the closing line — analysis belongs to the summarization step, never to
//! the spoken protocol.

/// One fixed question of the intake protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Question {
    /// 1-based position; defines presentation order.
    pub ordinal: u32,
    /// The exact text spoken to the caller.
    pub prompt: &'static str,
    /// Short acknowledgment spoken after the response is captured.
    pub ack: &'static str,
}

/// The reference protocol, in presentation order.
pub const INTAKE_QUESTIONS: [Question; 5] = [
    Question {
        ordinal: 1,
        prompt: "To start, could you tell me your pet's name and breed?",
        ack: "Thank you.",
    },
    Question {
        ordinal: 2,
        prompt: "Has your pet been spayed or neutered?",
        ack: "Got it.",
    },
    Question {
        ordinal: 3,
        prompt: "Does your pet have any chronic conditions I should know about?",
        ack: "Noted, thank you.",
    },
    Question {
        ordinal: 4,
        prompt: "Is your pet currently on any medications?",
        ack: "Okay.",
    },
    Question {
        ordinal: 5,
        prompt: "Finally, what is the problem that prompted your call today?",
        ack: "Thank you for walking me through that.",
    },
];

/// Spoken once after question 5 — the assistant's only permitted closing.
pub const CLOSING_LINE: &str =
    "That's everything I need. A veterinary professional will review your answers; \
     please hold on while I prepare a short summary.";
