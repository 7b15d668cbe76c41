//! Webhook signature verification.
//!
//! The gateway signs every webhook with HMAC-SHA256 over
//! `timestamp ‖ "." ‖ raw body` using a shared secret, and sends the
//! hex-encoded digest and the timestamp in separate headers. Verification
//! fails closed: any malformed, stale, or mismatching input is rejected
//! before the payload is parsed.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::EngineError;

type HmacSha256 = Hmac<Sha256>;

/// Verifies webhook signatures against the shared gateway secret.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_secs: i64,
}

impl WebhookVerifier {
    /// Creates a verifier.
    ///
    /// `tolerance_secs` bounds how old (or how far in the future) a webhook
    /// timestamp may be; anything outside the window is rejected to stop
    /// replays of captured deliveries.
    #[must_use]
    pub fn new(secret: impl Into<String>, tolerance_secs: i64) -> Self {
        Self {
            secret: secret.into(),
            tolerance_secs,
        }
    }

    /// Verifies a webhook delivery.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidSignature`] when the secret is not
    /// configured, the timestamp is not a unix-seconds integer, the
    /// timestamp is outside the freshness window, the signature is not
    /// valid hex, or the digest does not match.
    pub fn verify(
        &self,
        timestamp: &str,
        raw_body: &[u8],
        signature_hex: &str,
    ) -> Result<(), EngineError> {
        if self.secret.is_empty() {
            return Err(EngineError::InvalidSignature);
        }

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| EngineError::InvalidSignature)?;
        let age = Utc::now().timestamp() - ts;
        if age.abs() > self.tolerance_secs {
            return Err(EngineError::InvalidSignature);
        }

        let expected = hex::decode(signature_hex).map_err(|_| EngineError::InvalidSignature)?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| EngineError::InvalidSignature)?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(raw_body);
        // Constant-time comparison.
        mac.verify_slice(&expected)
            .map_err(|_| EngineError::InvalidSignature)
    }

    /// Computes the hex signature for a payload, as the gateway would.
    ///
    /// Used by tests and by local tooling that simulates gateway
    /// deliveries.
    #[must_use]
    pub fn sign(&self, timestamp: &str, raw_body: &[u8]) -> String {
        let Ok(mut mac) = HmacSha256::new_from_slice(self.secret.as_bytes()) else {
            // HMAC accepts keys of any length.
            return String::new();
        };
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(raw_body);
        hex::encode(mac.finalize().into_bytes())
    }
}
