//! Per-request masking secrets and the cache that holds them.
//!
//! Secrets are generated once per `(privacy_request, strategy, secret_type)`
//! and reused for every value masked within that request, which is what
//! makes deterministic strategies idempotent across node retries. The
//! cache is an explicit collaborator handle, never ambient state.

use lethe_types::PrivacyRequestId;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use tracing::debug;

/// Number of characters in a generated text secret.
const TEXT_SECRET_LEN: usize = 32;

/// Number of bytes in a generated key secret.
const BYTE_SECRET_LEN: usize = 32;

/// The role a secret plays within its strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecretType {
    Key,
    Salt,
    KeyHmac,
    SaltHmac,
}

impl fmt::Display for SecretType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SecretType::Key => "key",
            SecretType::Salt => "salt",
            SecretType::KeyHmac => "key_hmac",
            SecretType::SaltHmac => "salt_hmac",
        };
        f.write_str(name)
    }
}

/// An opaque generated secret value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretValue {
    Text(String),
    Bytes(Vec<u8>),
}

impl SecretValue {
    /// Generates a random alphanumeric text secret.
    #[must_use]
    pub fn generate_text() -> Self {
        let text: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TEXT_SECRET_LEN)
            .map(char::from)
            .collect();
        Self::Text(text)
    }

    /// Generates a random byte-string secret sized for an AES-256 key.
    #[must_use]
    pub fn generate_bytes() -> Self {
        let mut bytes = vec![0u8; BYTE_SECRET_LEN];
        rand::thread_rng().fill(bytes.as_mut_slice());
        Self::Bytes(bytes)
    }

    /// The text form, if this is a text secret.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bytes(_) => None,
        }
    }

    /// The raw bytes, if this is a byte secret.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Text(_) => None,
            Self::Bytes(bytes) => Some(bytes),
        }
    }
}

/// Cache key for one secret: request, strategy, and secret role.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecretCacheKey {
    pub privacy_request_id: PrivacyRequestId,
    pub strategy: String,
    pub secret_type: SecretType,
}

impl SecretCacheKey {
    #[must_use]
    pub fn new(
        privacy_request_id: PrivacyRequestId,
        strategy: impl Into<String>,
        secret_type: SecretType,
    ) -> Self {
        Self {
            privacy_request_id,
            strategy: strategy.into(),
            secret_type,
        }
    }
}

impl fmt::Display for SecretCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-masking-secret-{}-{}",
            self.privacy_request_id, self.strategy, self.secret_type
        )
    }
}

/// One secret ready to be placed in the cache.
#[derive(Debug, Clone)]
pub struct MaskingSecret {
    pub key: SecretCacheKey,
    pub value: SecretValue,
}

/// Shared per-request secret store.
///
/// Implementations must give `get_or_set_with_expiry` single-writer-per-key
/// semantics: when several workers race on a vacant key, exactly one
/// candidate wins and every caller observes that winner.
pub trait SecretCache: Send + Sync {
    fn get(&self, key: &SecretCacheKey) -> Option<SecretValue>;

    fn set_with_expiry(&self, key: SecretCacheKey, value: SecretValue);

    fn get_or_set_with_expiry(&self, key: SecretCacheKey, candidate: SecretValue) -> SecretValue {
        if let Some(existing) = self.get(&key) {
            return existing;
        }
        self.set_with_expiry(key, candidate.clone());
        candidate
    }
}

/// Process-local secret cache.
#[derive(Debug, Default)]
pub struct InMemorySecretCache {
    entries: RwLock<HashMap<SecretCacheKey, SecretValue>>,
}

impl InMemorySecretCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached secrets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretCache for InMemorySecretCache {
    fn get(&self, key: &SecretCacheKey) -> Option<SecretValue> {
        self.entries.read().unwrap().get(key).cloned()
    }

    fn set_with_expiry(&self, key: SecretCacheKey, value: SecretValue) {
        self.entries.write().unwrap().insert(key, value);
    }

    fn get_or_set_with_expiry(&self, key: SecretCacheKey, candidate: SecretValue) -> SecretValue {
        let mut entries = self.entries.write().unwrap();
        entries.entry(key).or_insert(candidate).clone()
    }
}

/// Fetches the secret for `(privacy_request, strategy, secret_type)`,
/// creating and caching it on first use.
///
/// Without a privacy request the secret is generated fresh and not
/// cached; standalone masking is explicitly non-deterministic.
pub fn get_or_generate_secret(
    cache: &dyn SecretCache,
    privacy_request_id: Option<&PrivacyRequestId>,
    strategy: &str,
    secret_type: SecretType,
    generate: fn() -> SecretValue,
) -> SecretValue {
    let Some(request_id) = privacy_request_id else {
        return generate();
    };
    let key = SecretCacheKey::new(*request_id, strategy, secret_type);
    let value = cache.get_or_set_with_expiry(key, generate());
    debug!(%request_id, strategy, %secret_type, "masking secret resolved");
    value
}
