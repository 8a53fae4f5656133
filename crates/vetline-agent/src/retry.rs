//! Explicit bounded retry policy for agent creation.
//!
//! The bound lives in data rather than control flow so it is visible and
//! testable: two attempts total, with a fixed backoff between them to let
//! upstream teardown propagate.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never unbounded.
    pub max_attempts: u32,
    /// Fixed delay before each retry.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// True when attempt number `attempt` (1-based) may be followed by another.
    pub fn allows_retry_after(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}
