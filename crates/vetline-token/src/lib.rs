//! Short-lived, scoped channel join credentials.
//!
//! The broker mints tokens bound to exactly one `(channel, uid, role)`
//! triple, signed with the provider app certificate via HMAC-SHA256 and
//! valid for a bounded lifetime (default one hour). A missing signing
//! secret is [`TokenError::CredentialUnavailable`] — fatal to session
//! start, never retried automatically.

mod broker;
mod claims;
mod error;

pub use broker::{TokenBroker, DEFAULT_TOKEN_TTL_SECS};
pub use claims::TokenClaims;
pub use error::TokenError;
