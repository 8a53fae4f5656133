//! The intake-driver seam.
//!
//! Hosted turn-taking (the vendor agent owns timing, constrained by the
//! system instruction) and the locally timed sequencer are two
//! implementations of one capability, selected by configuration. Both
//! produce the same ordered turn list.

use crate::endpoint::EndpointConfig;
use crate::instruction::{build_greeting, build_system_instruction};
use crate::questions::INTAKE_QUESTIONS;
use crate::sequencer::{QuestionSequencer, VoiceIo};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use vetline_types::{IntakeTurn, SessionState, SubjectProfile};

/// Which implementation drives the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntakeMode {
    /// The vendor-hosted agent owns turn timing.
    #[default]
    Hosted,
    /// The local sequencer speaks and times every turn itself.
    Local,
}

/// Drives the fixed question protocol and returns the captured turns.
#[async_trait]
pub trait IntakeDriver: Send + Sync {
    /// Instruction text for the hosted agent, when one is used alongside.
    fn system_instruction(&self, subject: &SubjectProfile) -> String {
        build_system_instruction(subject)
    }

    /// Greeting the agent speaks on join.
    fn greeting(&self, subject: &SubjectProfile) -> String {
        build_greeting(subject)
    }

    /// Runs the protocol until completion or session cancellation.
    async fn drive(&self, cancel: watch::Receiver<SessionState>) -> Vec<IntakeTurn>;
}

/// Builds the driver selected by `mode`.
///
/// Hosted mode consumes the remote transcript stream; local mode owns the
/// voice path through `io`. The caller supplies both so the mode can come
/// straight from configuration.
pub fn driver_for(
    mode: IntakeMode,
    transcripts: broadcast::Sender<String>,
    io: Arc<dyn VoiceIo>,
    endpoint: EndpointConfig,
) -> Arc<dyn IntakeDriver> {
    match mode {
        IntakeMode::Hosted => Arc::new(HostedDriver::new(transcripts)),
        IntakeMode::Local => Arc::new(LocalDriver::new(io, endpoint)),
    }
}

/// Local fallback: the sequencer owns prompts and listening windows.
pub struct LocalDriver {
    io: Arc<dyn VoiceIo>,
    sequencer: QuestionSequencer,
}

impl LocalDriver {
    pub fn new(io: Arc<dyn VoiceIo>, endpoint: EndpointConfig) -> Self {
        Self {
            io,
            sequencer: QuestionSequencer::new(endpoint),
        }
    }
}

#[async_trait]
impl IntakeDriver for LocalDriver {
    async fn drive(&self, cancel: watch::Receiver<SessionState>) -> Vec<IntakeTurn> {
        self.sequencer.run(self.io.as_ref(), cancel).await
    }
}

/// Hosted mode: the agent asks the questions; this driver only pairs the
/// arriving caller transcripts with ordinals, in order.
pub struct HostedDriver {
    transcripts: broadcast::Sender<String>,
    /// How long to wait for each answer before recording the sentinel.
    per_turn_wait: Duration,
}

/// Default per-answer wait in hosted mode: the agent's own silence policy
/// re-prompts at 15s, so the local cap sits above one re-prompt cycle.
const DEFAULT_HOSTED_TURN_WAIT: Duration = Duration::from_secs(45);

impl HostedDriver {
    pub fn new(transcripts: broadcast::Sender<String>) -> Self {
        Self {
            transcripts,
            per_turn_wait: DEFAULT_HOSTED_TURN_WAIT,
        }
    }

    pub fn with_per_turn_wait(mut self, per_turn_wait: Duration) -> Self {
        self.per_turn_wait = per_turn_wait;
        self
    }
}

#[async_trait]
impl IntakeDriver for HostedDriver {
    async fn drive(&self, mut cancel: watch::Receiver<SessionState>) -> Vec<IntakeTurn> {
        let mut rx = self.transcripts.subscribe();
        let mut turns = Vec::with_capacity(INTAKE_QUESTIONS.len());

        for question in INTAKE_QUESTIONS {
            if cancel.borrow().is_ending_or_terminal() {
                break;
            }

            let deadline = tokio::time::Instant::now() + self.per_turn_wait;
            let turn = loop {
                tokio::select! {
                    changed = cancel.changed() => {
                        if changed.is_err()
                            || cancel.borrow_and_update().is_ending_or_terminal()
                        {
                            break None;
                        }
                    }
                    _ = tokio::time::sleep_until(deadline) => {
                        break Some(IntakeTurn::timed_out(question.ordinal, question.prompt));
                    }
                    text = rx.recv() => {
                        match text {
                            Ok(text) => {
                                break Some(IntakeTurn::captured(
                                    question.ordinal,
                                    question.prompt,
                                    text,
                                ));
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "hosted transcript stream lagged");
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                break Some(IntakeTurn::timed_out(
                                    question.ordinal,
                                    question.prompt,
                                ));
                            }
                        }
                    }
                }
            };

            match turn {
                Some(turn) => turns.push(turn),
                None => break, // cancelled mid-turn
            }
        }

        turns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IntakeError;
    use std::sync::Mutex;
    use vetline_types::NO_RESPONSE_SENTINEL;

    /// Voice path whose caller never answers; records everything spoken.
    struct SilentVoice {
        spoken: Mutex<Vec<String>>,
        transcript_tx: broadcast::Sender<String>,
        level_tx: broadcast::Sender<f32>,
    }

    impl SilentVoice {
        fn new() -> Arc<Self> {
            let (transcript_tx, _) = broadcast::channel(16);
            let (level_tx, _) = broadcast::channel(16);
            Arc::new(Self {
                spoken: Mutex::new(Vec::new()),
                transcript_tx,
                level_tx,
            })
        }
    }

    #[async_trait]
    impl crate::sequencer::VoiceIo for SilentVoice {
        async fn speak(&self, text: &str) -> Result<(), IntakeError> {
            self.spoken.lock().unwrap().push(text.to_string());
            Ok(())
        }

        fn transcripts(&self) -> broadcast::Receiver<String> {
            self.transcript_tx.subscribe()
        }

        fn energy_levels(&self) -> broadcast::Receiver<f32> {
            self.level_tx.subscribe()
        }
    }

    fn subject() -> SubjectProfile {
        SubjectProfile {
            name: "Mochi".to_string(),
            species: "cat".to_string(),
            age_years: None,
        }
    }

    #[tokio::test]
    async fn hosted_driver_pairs_transcripts_with_ordinals() {
        let (tx, _) = broadcast::channel(16);
        let driver =
            HostedDriver::new(tx.clone()).with_per_turn_wait(Duration::from_millis(200));
        let (_state_tx, state_rx) = watch::channel(SessionState::Active);

        let handle = tokio::spawn(async move { driver.drive(state_rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        for answer in ["Mochi, tabby", "spayed", "none", "none", "sneezing a lot"] {
            tx.send(answer.to_string()).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let turns = handle.await.unwrap();
        assert_eq!(turns.len(), 5);
        assert_eq!(turns[0].response, "Mochi, tabby");
        assert_eq!(turns[4].ordinal, 5);
    }

    #[tokio::test]
    async fn hosted_driver_records_sentinel_on_per_turn_timeout() {
        let (tx, _) = broadcast::channel(16);
        let driver = HostedDriver::new(tx.clone()).with_per_turn_wait(Duration::from_millis(40));
        let (_state_tx, state_rx) = watch::channel(SessionState::Active);

        let handle = tokio::spawn(async move { driver.drive(state_rx).await });

        tokio::time::sleep(Duration::from_millis(15)).await;
        tx.send("Mochi, tabby".to_string()).unwrap();
        // Answer nothing further; remaining turns time out.

        let turns = handle.await.unwrap();
        assert_eq!(turns.len(), 5);
        assert!(!turns[0].is_timeout());
        for turn in &turns[1..] {
            assert_eq!(turn.response, NO_RESPONSE_SENTINEL);
        }
    }

    #[tokio::test]
    async fn hosted_driver_stops_on_cancellation() {
        let (tx, _) = broadcast::channel(16);
        let driver = HostedDriver::new(tx.clone()).with_per_turn_wait(Duration::from_secs(30));
        let (state_tx, state_rx) = watch::channel(SessionState::Active);

        let handle = tokio::spawn(async move { driver.drive(state_rx).await });

        tokio::time::sleep(Duration::from_millis(15)).await;
        tx.send("Mochi, tabby".to_string()).unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        state_tx.send(SessionState::Ending).unwrap();

        let turns = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("cancellation must short-circuit the hosted wait")
            .unwrap();
        assert_eq!(turns.len(), 1);
    }

    #[tokio::test]
    async fn local_mode_selects_the_sequencer() {
        let voice = SilentVoice::new();
        let (tx, _) = broadcast::channel(16);
        let endpoint = EndpointConfig {
            max_wait: Duration::from_millis(30),
            ..EndpointConfig::default()
        };
        let driver = driver_for(IntakeMode::Local, tx, voice.clone(), endpoint);
        let (_state_tx, state_rx) = watch::channel(SessionState::Active);

        let turns = driver.drive(state_rx).await;

        // The sequencer spoke every prompt; the silent caller timed out each.
        assert_eq!(turns.len(), 5);
        assert!(turns.iter().all(IntakeTurn::is_timeout));
        let spoken = voice.spoken.lock().unwrap().clone();
        for question in INTAKE_QUESTIONS {
            assert!(spoken.iter().any(|s| s == question.prompt));
        }
    }

    #[tokio::test]
    async fn hosted_mode_selects_the_transcript_pairing() {
        let voice = SilentVoice::new();
        let (tx, _) = broadcast::channel(16);
        let driver = driver_for(
            IntakeMode::Hosted,
            tx.clone(),
            voice.clone(),
            EndpointConfig::default(),
        );
        let (_state_tx, state_rx) = watch::channel(SessionState::Active);

        let handle = tokio::spawn(async move { driver.drive(state_rx).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        for answer in ["Mochi, tabby", "spayed", "none", "none", "sneezing"] {
            tx.send(answer.to_string()).unwrap();
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let turns = handle.await.unwrap();
        assert_eq!(turns.len(), 5);
        // Hosted mode never drives the local voice path.
        assert!(voice.spoken.lock().unwrap().is_empty());
    }

    #[test]
    fn driver_instruction_defaults_come_from_the_protocol() {
        let (tx, _) = broadcast::channel(1);
        let driver = HostedDriver::new(tx);
        let text = driver.system_instruction(&subject());
        assert!(text.contains("Mochi"));
        assert!(text.contains(INTAKE_QUESTIONS[4].prompt));
        assert!(driver.greeting(&subject()).contains("Mochi"));
    }
}
