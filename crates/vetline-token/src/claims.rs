//! Signed token claims.

use serde::{Deserialize, Serialize};
use vetline_types::ParticipantRole;

/// The claims carried inside a join token.
///
/// A token grants access to exactly the `(channel, uid, role)` triple it
/// was minted for, between `issued_at` and `expires_at` (Unix seconds).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Provider application id the token belongs to.
    pub app_id: String,
    pub channel: String,
    pub uid: u32,
    pub role: ParticipantRole,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl TokenClaims {
    /// Remaining validity in seconds relative to `now` (Unix seconds).
    /// Negative when already expired.
    pub fn remaining_secs(&self, now: i64) -> i64 {
        self.expires_at - now
    }
}
