//! The local question sequencer.
//!
//! A single-threaded, cooperative loop over the fixed question list: speak
//! the prompt, hold a bounded listening window, capture whatever response
//! arrived (or the timeout sentinel), acknowledge, advance. The loop never
//! reorders or skips a question based on response content; it stops early
//! only when the session state watch reports `Ending` or `Failed`, and
//! cancellation short-circuits the current window immediately.

use crate::endpoint::{EndpointConfig, EnergyEndpointer, ListenOutcome};
use crate::error::IntakeError;
use crate::questions::{CLOSING_LINE, INTAKE_QUESTIONS};
use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use vetline_types::{IntakeTurn, SessionState};

/// The local voice path the sequencer speaks and listens through.
///
/// Implementations bridge to the channel's audio: TTS playback for output,
/// live transcription plus input energy levels for capture.
#[async_trait]
pub trait VoiceIo: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), IntakeError>;

    /// Completed caller utterances, in arrival order.
    fn transcripts(&self) -> broadcast::Receiver<String>;

    /// Live input energy samples at the endpointing poll cadence.
    fn energy_levels(&self) -> broadcast::Receiver<f32>;
}

pub struct QuestionSequencer {
    endpoint: EndpointConfig,
}

impl Default for QuestionSequencer {
    fn default() -> Self {
        Self::new(EndpointConfig::default())
    }
}

impl QuestionSequencer {
    pub fn new(endpoint: EndpointConfig) -> Self {
        Self { endpoint }
    }

    /// Runs the fixed protocol to completion or early cancellation,
    /// returning the turns captured so far in strict ordinal order.
    pub async fn run(
        &self,
        io: &dyn VoiceIo,
        mut cancel: watch::Receiver<SessionState>,
    ) -> Vec<IntakeTurn> {
        let mut turns = Vec::with_capacity(INTAKE_QUESTIONS.len());

        for question in INTAKE_QUESTIONS {
            if cancel.borrow().is_ending_or_terminal() {
                break;
            }

            if let Err(e) = io.speak(question.prompt).await {
                tracing::warn!(ordinal = question.ordinal, error = %e, "prompt playback failed");
            }

            let (response, outcome) = self.listen(io, &mut cancel).await;
            if outcome == ListenOutcome::Cancelled {
                tracing::info!(
                    ordinal = question.ordinal,
                    "intake cancelled mid-question"
                );
                break;
            }

            let turn = match response {
                Some(text) => IntakeTurn::captured(question.ordinal, question.prompt, text),
                None => IntakeTurn::timed_out(question.ordinal, question.prompt),
            };
            tracing::debug!(
                ordinal = turn.ordinal,
                timed_out = turn.is_timeout(),
                "intake turn captured"
            );
            turns.push(turn);

            if let Err(e) = io.speak(question.ack).await {
                tracing::warn!(ordinal = question.ordinal, error = %e, "ack playback failed");
            }
        }

        // After the final turn: a closing line only. Follow-up questions and
        // clinical analysis are out of bounds for the spoken protocol.
        if turns.len() == INTAKE_QUESTIONS.len() {
            if let Err(e) = io.speak(CLOSING_LINE).await {
                tracing::warn!(error = %e, "closing line playback failed");
            }
        }

        turns
    }

    /// One bounded listening window.
    ///
    /// Resolves on (in priority order) session cancellation, the absolute
    /// window timeout, or energy endpointing declaring the utterance done.
    /// Transcript fragments arriving during the window are joined into the
    /// response.
    async fn listen(
        &self,
        io: &dyn VoiceIo,
        cancel: &mut watch::Receiver<SessionState>,
    ) -> (Option<String>, ListenOutcome) {
        let mut transcripts = io.transcripts();
        let mut levels = io.energy_levels();
        let mut endpointer = EnergyEndpointer::new(self.endpoint);
        let deadline = tokio::time::Instant::now() + self.endpoint.max_wait;
        let mut fragments: Vec<String> = Vec::new();
        let mut transcripts_open = true;
        let mut levels_open = true;

        let outcome = loop {
            if cancel.borrow().is_ending_or_terminal() {
                break ListenOutcome::Cancelled;
            }

            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || cancel.borrow_and_update().is_ending_or_terminal() {
                        break ListenOutcome::Cancelled;
                    }
                }
                _ = tokio::time::sleep_until(deadline) => {
                    break ListenOutcome::TimedOut;
                }
                text = transcripts.recv(), if transcripts_open => {
                    match text {
                        Ok(text) => fragments.push(text),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "transcript stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => transcripts_open = false,
                    }
                }
                level = levels.recv(), if levels_open => {
                    match level {
                        Ok(level) => {
                            if endpointer.observe(level) {
                                break ListenOutcome::Completed;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "energy stream lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => levels_open = false,
                    }
                }
            }
        };

        let response = if fragments.is_empty() {
            None
        } else {
            Some(fragments.join(" "))
        };
        (response, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use vetline_types::NO_RESPONSE_SENTINEL;

    /// Scripted voice path: each prompt consumes one scripted answer;
    /// `None` simulates a silent caller for that turn.
    struct ScriptedVoice {
        answers: Mutex<VecDeque<Option<&'static str>>>,
        spoken: Mutex<Vec<String>>,
        transcript_tx: broadcast::Sender<String>,
        level_tx: broadcast::Sender<f32>,
    }

    impl ScriptedVoice {
        fn new(answers: Vec<Option<&'static str>>) -> Arc<Self> {
            let (transcript_tx, _) = broadcast::channel(64);
            let (level_tx, _) = broadcast::channel(256);
            Arc::new(Self {
                answers: Mutex::new(answers.into()),
                spoken: Mutex::new(Vec::new()),
                transcript_tx,
                level_tx,
            })
        }

        fn spoken(&self) -> Vec<String> {
            self.spoken.lock().unwrap().clone()
        }

        fn is_prompt(text: &str) -> bool {
            INTAKE_QUESTIONS.iter().any(|q| q.prompt == text)
        }
    }

    #[async_trait]
    impl VoiceIo for ScriptedVoice {
        async fn speak(&self, text: &str) -> Result<(), IntakeError> {
            self.spoken.lock().unwrap().push(text.to_string());
            if Self::is_prompt(text) {
                let answer = self.answers.lock().unwrap().pop_front().flatten();
                if let Some(answer) = answer {
                    let transcript_tx = self.transcript_tx.clone();
                    let level_tx = self.level_tx.clone();
                    let answer = answer.to_string();
                    tokio::spawn(async move {
                        // Give the listening window a moment to subscribe.
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        // Voice burst, the transcript, then sustained silence.
                        for _ in 0..3 {
                            let _ = level_tx.send(0.9);
                            tokio::time::sleep(Duration::from_millis(2)).await;
                        }
                        let _ = transcript_tx.send(answer);
                        for _ in 0..20 {
                            let _ = level_tx.send(0.0);
                            tokio::time::sleep(Duration::from_millis(2)).await;
                        }
                    });
                }
            }
            Ok(())
        }

        fn transcripts(&self) -> broadcast::Receiver<String> {
            self.transcript_tx.subscribe()
        }

        fn energy_levels(&self) -> broadcast::Receiver<f32> {
            self.level_tx.subscribe()
        }
    }

    fn test_endpoint() -> EndpointConfig {
        EndpointConfig {
            energy_threshold: 0.5,
            silence_hold: Duration::from_millis(20),
            max_wait: Duration::from_millis(250),
            poll_interval: Duration::from_millis(2),
        }
    }

    fn active_watch() -> (watch::Sender<SessionState>, watch::Receiver<SessionState>) {
        watch::channel(SessionState::Active)
    }

    #[tokio::test]
    async fn all_answered_turns_are_captured_in_order() {
        let voice = ScriptedVoice::new(vec![
            Some("Biscuit, a beagle"),
            Some("yes, neutered"),
            Some("no chronic conditions"),
            Some("just a flea preventative"),
            Some("he has been limping since yesterday"),
        ]);
        let sequencer = QuestionSequencer::new(test_endpoint());
        let (_tx, rx) = active_watch();

        let turns = sequencer.run(voice.as_ref(), rx).await;

        assert_eq!(turns.len(), 5);
        for (i, turn) in turns.iter().enumerate() {
            assert_eq!(turn.ordinal, i as u32 + 1);
            assert!(!turn.is_timeout());
        }
        assert_eq!(turns[0].response, "Biscuit, a beagle");

        // The closing line was spoken, and nothing after it.
        let spoken = voice.spoken();
        assert_eq!(spoken.last().map(String::as_str), Some(CLOSING_LINE));
    }

    #[tokio::test]
    async fn silent_turn_produces_sentinel_not_gap() {
        let voice = ScriptedVoice::new(vec![
            Some("Biscuit, a beagle"),
            None, // caller says nothing for question 2
            Some("no"),
            Some("no"),
            Some("vomiting twice today"),
        ]);
        let sequencer = QuestionSequencer::new(test_endpoint());
        let (_tx, rx) = active_watch();

        let turns = sequencer.run(voice.as_ref(), rx).await;

        assert_eq!(turns.len(), 5);
        assert_eq!(turns[1].response, NO_RESPONSE_SENTINEL);
        assert!(turns[1].is_timeout());
        // Ordinals stay gapless around the timeout.
        let ordinals: Vec<u32> = turns.iter().map(|t| t.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn cancellation_short_circuits_the_current_window() {
        let voice = ScriptedVoice::new(vec![Some("Biscuit"), None, None, None, None]);
        let sequencer = QuestionSequencer::new(EndpointConfig {
            max_wait: Duration::from_secs(30),
            ..test_endpoint()
        });
        let (tx, rx) = active_watch();

        let handle = {
            let voice = voice.clone();
            tokio::spawn(async move { sequencer.run(voice.as_ref(), rx).await })
        };

        // Let question 1 complete, then end the session during question 2's
        // listening window; the 30s window must not run out.
        tokio::time::sleep(Duration::from_millis(120)).await;
        tx.send(SessionState::Ending).unwrap();

        let turns = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("cancellation must short-circuit the window")
            .unwrap();

        assert!(turns.len() < 5);
        // No closing line after an early stop.
        assert!(!voice.spoken().iter().any(|s| s == CLOSING_LINE));
    }

    #[tokio::test]
    async fn questions_are_never_reordered_or_skipped() {
        let voice = ScriptedVoice::new(vec![
            Some("it's about my cat"),
            Some("I don't know"),
            Some("kidney disease"),
            Some("none"),
            Some("not eating for two days"),
        ]);
        let sequencer = QuestionSequencer::new(test_endpoint());
        let (_tx, rx) = active_watch();

        sequencer.run(voice.as_ref(), rx).await;

        let spoken = voice.spoken();
        let prompt_positions: Vec<usize> = INTAKE_QUESTIONS
            .iter()
            .map(|q| spoken.iter().position(|s| s == q.prompt).unwrap())
            .collect();
        let mut sorted = prompt_positions.clone();
        sorted.sort_unstable();
        assert_eq!(prompt_positions, sorted, "prompts must be spoken in order");
    }
}
