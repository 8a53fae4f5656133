use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Upstream signing is impossible (missing app certificate).
    /// Fatal to session start; not retried.
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),

    /// The mint request itself is malformed (empty channel, bad role).
    #[error("invalid token request: {0}")]
    InvalidRequest(String),

    /// The token is not structurally a vetline token.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The signature does not match the claims.
    #[error("token signature mismatch")]
    SignatureMismatch,

    /// The token's scope does not cover the requested triple.
    #[error("token scope mismatch: {0}")]
    ScopeMismatch(String),

    /// The token has expired (beyond skew tolerance).
    #[error("token expired at {0}")]
    Expired(i64),
}
