//! Webhook secrets and the digests stored in their place.
//!
//! A secret is shown to the integrator once. Only an HMAC-SHA256 tag keyed
//! by the secret over the webhook id is persisted, and verification
//! recomputes the tag from the supplied value.

use super::WebhookId;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use std::fmt;

/// Number of alphanumeric characters in a generated secret.
pub const SECRET_LENGTH: usize = 48;

type HmacSha256 = Hmac<Sha256>;

/// Plaintext webhook secret, returned exactly once at creation.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookSecret(String);

impl WebhookSecret {
    /// Generates a secret from the thread-local CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        let secret: String = rand::rng()
            .sample_iter(&rand::distr::Alphanumeric)
            .take(SECRET_LENGTH)
            .map(char::from)
            .collect();
        Self(secret)
    }

    /// Returns the plaintext for handing to the integrator.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Derives the digest stored for `webhook_id`.
    #[must_use]
    pub fn digest_for(&self, webhook_id: WebhookId) -> SecretDigest {
        // An empty digest never verifies.
        let bytes = mac(self.0.as_bytes(), webhook_id)
            .map(|tag| tag.finalize().into_bytes().to_vec())
            .unwrap_or_default();
        SecretDigest(bytes)
    }
}

impl fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WebhookSecret(***)")
    }
}

/// Stored HMAC tag standing in for a webhook secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretDigest(Vec<u8>);

impl SecretDigest {
    /// Wraps digest bytes loaded from storage.
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the raw digest bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Checks a supplied secret in constant time.
    #[must_use]
    pub fn verify(&self, webhook_id: WebhookId, supplied: &str) -> bool {
        mac(supplied.as_bytes(), webhook_id)
            .is_some_and(|tag| tag.verify_slice(&self.0).is_ok())
    }
}

fn mac(key: &[u8], webhook_id: WebhookId) -> Option<HmacSha256> {
    let mut state = HmacSha256::new_from_slice(key).ok()?;
    state.update(webhook_id.as_ref().as_bytes());
    Some(state)
}
