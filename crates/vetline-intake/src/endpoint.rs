//! End-of-utterance estimation from input energy levels.
//!
//! Used when no hosted voice-activity detection is available: a response is
//! complete after at least one detected voice burst followed by a sustained
//! low-energy period, or after an absolute timeout regardless of burst
//! detection, whichever comes first. This prevents both premature cutoffs
//! and indefinite hangs on silence.

use std::time::Duration;

/// Tuning for the local listening window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointConfig {
    /// RMS energy at or above which a sample counts as voice.
    pub energy_threshold: f32,
    /// Sustained low-energy period after a burst that ends the utterance.
    pub silence_hold: Duration,
    /// Absolute cap on the listening window.
    pub max_wait: Duration,
    /// Energy sampling cadence.
    pub poll_interval: Duration,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            energy_threshold: 0.05,
            silence_hold: Duration::from_secs(5),
            max_wait: Duration::from_secs(15),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// How a listening window resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenOutcome {
    /// A voice burst was followed by the configured silence hold.
    Completed,
    /// The absolute window elapsed.
    TimedOut,
    /// The session began ending; the window was short-circuited.
    Cancelled,
}

/// Incremental endpointing state, fed one energy observation per poll tick.
#[derive(Debug)]
pub struct EnergyEndpointer {
    config: EndpointConfig,
    heard_voice: bool,
    quiet: Duration,
}

impl EnergyEndpointer {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            config,
            heard_voice: false,
            quiet: Duration::ZERO,
        }
    }

    pub fn heard_voice(&self) -> bool {
        self.heard_voice
    }

    /// Feeds one energy sample; returns true when the utterance is complete.
    pub fn observe(&mut self, level: f32) -> bool {
        if level >= self.config.energy_threshold {
            self.heard_voice = true;
            self.quiet = Duration::ZERO;
            false
        } else {
            self.tick()
        }
    }

    /// Advances one poll interval with no sample (silence on the wire).
    /// Returns true when the utterance is complete.
    pub fn tick(&mut self) -> bool {
        if !self.heard_voice {
            // Silence before any burst never completes the utterance; only
            // the absolute timeout ends an all-silent window.
            return false;
        }
        self.quiet += self.config.poll_interval;
        self.quiet >= self.config.silence_hold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EndpointConfig {
        EndpointConfig {
            energy_threshold: 0.5,
            silence_hold: Duration::from_millis(300),
            max_wait: Duration::from_secs(15),
            poll_interval: Duration::from_millis(100),
        }
    }

    #[test]
    fn burst_then_sustained_silence_completes() {
        let mut ep = EnergyEndpointer::new(config());
        assert!(!ep.observe(0.9));
        assert!(!ep.observe(0.8));
        assert!(!ep.observe(0.1)); // 100ms quiet
        assert!(!ep.observe(0.0)); // 200ms quiet
        assert!(ep.observe(0.0)); // 300ms quiet -> complete
    }

    #[test]
    fn silence_without_burst_never_completes() {
        let mut ep = EnergyEndpointer::new(config());
        for _ in 0..100 {
            assert!(!ep.observe(0.0));
        }
        assert!(!ep.heard_voice());
    }

    #[test]
    fn speech_resets_the_silence_hold() {
        let mut ep = EnergyEndpointer::new(config());
        assert!(!ep.observe(0.9));
        assert!(!ep.observe(0.0)); // 100ms quiet
        assert!(!ep.observe(0.0)); // 200ms quiet
        assert!(!ep.observe(0.9)); // speech again, hold resets
        assert!(!ep.observe(0.0));
        assert!(!ep.observe(0.0));
        assert!(ep.observe(0.0));
    }
}
