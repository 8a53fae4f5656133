//! Token minting and verification.

use crate::claims::TokenClaims;
use crate::error::TokenError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;
use vetline_types::ParticipantRole;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime in seconds (1 hour).
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;

/// Clock skew tolerated when checking expiry, in seconds.
const EXPIRY_SKEW_SECS: i64 = 30;

/// Mints and verifies scoped channel join tokens.
///
/// Token wire format: `base64url(claims_json) "." base64url(hmac_sha256)`.
#[derive(Clone)]
pub struct TokenBroker {
    app_id: String,
    app_certificate: String,
    ttl_secs: u64,
}

impl fmt::Debug for TokenBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBroker")
            .field("app_id", &self.app_id)
            .field("app_certificate", &"[REDACTED]")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl TokenBroker {
    pub fn new(app_id: impl Into<String>, app_certificate: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            app_certificate: app_certificate.into(),
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    /// Overrides the default token lifetime.
    pub fn with_ttl_secs(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Mints a credential scoped to exactly `(channel, uid, role)`.
    ///
    /// # Errors
    ///
    /// `CredentialUnavailable` when no signing certificate is configured;
    /// `InvalidRequest` for an empty channel id.
    pub fn mint(
        &self,
        channel: &str,
        uid: u32,
        role: ParticipantRole,
    ) -> Result<String, TokenError> {
        if channel.is_empty() {
            return Err(TokenError::InvalidRequest(
                "channel id must be non-empty".to_string(),
            ));
        }
        if self.app_certificate.is_empty() {
            return Err(TokenError::CredentialUnavailable(
                "no app certificate configured for token signing".to_string(),
            ));
        }

        let now = chrono::Utc::now().timestamp();
        let claims = TokenClaims {
            app_id: self.app_id.clone(),
            channel: channel.to_string(),
            uid,
            role,
            issued_at: now,
            expires_at: now + self.ttl_secs as i64,
        };

        let payload = serde_json::to_vec(&claims)
            .map_err(|e| TokenError::CredentialUnavailable(format!("claims encoding: {e}")))?;
        let sig = self.sign(&payload)?;

        tracing::debug!(channel, uid, role = role.as_str(), "minted join token");

        Ok(format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(sig)
        ))
    }

    /// Verifies a token's signature and expiry and returns its claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let (payload_b64, sig_b64) = token
            .split_once('.')
            .ok_or_else(|| TokenError::Malformed("missing signature separator".to_string()))?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|e| TokenError::Malformed(format!("payload base64: {e}")))?;
        let sig = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|e| TokenError::Malformed(format!("signature base64: {e}")))?;

        let mut mac = HmacSha256::new_from_slice(self.app_certificate.as_bytes())
            .map_err(|e| TokenError::CredentialUnavailable(format!("hmac init: {e}")))?;
        mac.update(&payload);
        mac.verify_slice(&sig)
            .map_err(|_| TokenError::SignatureMismatch)?;

        let claims: TokenClaims = serde_json::from_slice(&payload)
            .map_err(|e| TokenError::Malformed(format!("claims json: {e}")))?;

        let now = chrono::Utc::now().timestamp();
        if claims.expires_at + EXPIRY_SKEW_SECS < now {
            return Err(TokenError::Expired(claims.expires_at));
        }

        Ok(claims)
    }

    /// Verifies a token and checks it covers the given scope triple.
    pub fn verify_scope(
        &self,
        token: &str,
        channel: &str,
        uid: u32,
        role: ParticipantRole,
    ) -> Result<TokenClaims, TokenError> {
        let claims = self.verify(token)?;
        if claims.channel != channel || claims.uid != uid || claims.role != role {
            return Err(TokenError::ScopeMismatch(format!(
                "token is for ({}, {}, {}), not ({}, {}, {})",
                claims.channel,
                claims.uid,
                claims.role.as_str(),
                channel,
                uid,
                role.as_str()
            )));
        }
        Ok(claims)
    }

    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>, TokenError> {
        let mut mac = HmacSha256::new_from_slice(self.app_certificate.as_bytes())
            .map_err(|e| TokenError::CredentialUnavailable(format!("hmac init: {e}")))?;
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }
}
