//! System instruction and greeting for the vendor-hosted agent.
//!
//! In hosted mode the vendor agent owns turn timing; the fixed-question
//! structure is embedded as an instruction constraining its turn-taking.

use crate::questions::{CLOSING_LINE, INTAKE_QUESTIONS};
use vetline_types::SubjectProfile;

/// Builds the structured instruction that pins the hosted agent to the
/// fixed protocol: ask the five questions in order, acknowledge briefly,
/// never reorder, never give clinical analysis.
pub fn build_system_instruction(subject: &SubjectProfile) -> String {
    let mut out = String::new();
    out.push_str(
        "You are a veterinary triage intake assistant on a voice call with a pet owner.\n",
    );
    out.push_str(&format!(
        "The call concerns {name}, a {species}{age}.\n",
        name = subject.name,
        species = subject.species,
        age = subject
            .age_years
            .map(|a| format!(", {a} years old"))
            .unwrap_or_default(),
    ));
    out.push_str(
        "Ask the following questions one at a time, in exactly this order. \
         Never skip, reorder, or rephrase a question based on the caller's answers. \
         After each answer, give only a brief acknowledgment and move to the next \
         question.\n",
    );
    for q in INTAKE_QUESTIONS {
        out.push_str(&format!("{}. {}\n", q.ordinal, q.prompt));
    }
    out.push_str(&format!(
        "After question {} has been answered, say only: \"{}\" \
         Do not ask follow-up questions. Do not provide medical advice, diagnosis, \
         or urgency assessment yourself under any circumstances.\n",
        INTAKE_QUESTIONS.len(),
        CLOSING_LINE,
    ));
    out
}

/// The greeting the agent speaks immediately on joining the channel.
pub fn build_greeting(subject: &SubjectProfile) -> String {
    format!(
        "Hello! I'm the triage assistant for your call about {}. \
         I'll ask you five quick questions so our veterinary team can help. \
         Let's begin.",
        subject.name
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> SubjectProfile {
        SubjectProfile {
            name: "Biscuit".to_string(),
            species: "dog".to_string(),
            age_years: Some(4),
        }
    }

    #[test]
    fn instruction_lists_every_question_in_order() {
        let text = build_system_instruction(&subject());
        let mut last_pos = 0;
        for q in INTAKE_QUESTIONS {
            let pos = text.find(q.prompt).expect("prompt should appear");
            assert!(pos > last_pos, "questions must appear in ordinal order");
            last_pos = pos;
        }
        assert!(text.contains(CLOSING_LINE));
        assert!(text.contains("Biscuit"));
    }

    #[test]
    fn instruction_forbids_freelance_advice() {
        let text = build_system_instruction(&subject());
        assert!(text.contains("Do not provide medical advice"));
        assert!(text.contains("Do not ask follow-up questions"));
    }

    #[test]
    fn greeting_names_the_subject() {
        assert!(build_greeting(&subject()).contains("Biscuit"));
    }

    #[test]
    fn instruction_handles_unknown_age() {
        let mut s = subject();
        s.age_years = None;
        let text = build_system_instruction(&s);
        assert!(text.contains("a dog.\n"));
    }
}
