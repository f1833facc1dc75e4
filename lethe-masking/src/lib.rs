//! Masking strategies and per-request secret management for Lethe.
//!
//! Erasure never deletes rows; it rewrites targeted field values
//! through a named [`MaskingStrategy`]. Strategies are looked up from a
//! static registry by the name a policy rule carries, configured from
//! the rule's JSON options, and handed an explicit [`SecretCache`] so
//! that deterministic strategies reproduce identical output across
//! retries of the same privacy request.

mod registry;
mod secret;
mod strategies;
mod strategy;

pub use registry::{STRATEGY_NAMES, cache_masking_secrets, strategy_from_spec};
pub use secret::{
    InMemorySecretCache, MaskingSecret, SecretCache, SecretCacheKey, SecretType, SecretValue,
    get_or_generate_secret,
};
pub use strategies::{
    AES_ENCRYPT, AesEncrypt, AesMode, HASH, HMAC, Hash, HashAlgorithm, HmacMasking, NULL_REWRITE,
    NullRewrite, RANDOM_STRING_REWRITE, RandomStringRewrite, STRING_REWRITE, StringRewrite,
};
pub use strategy::{FormatPreservation, MaskingContext, MaskingStrategy, mask_one};

/// Result type alias using the crate's error type.
pub type MaskingResult<T> = std::result::Result<T, MaskingError>;

/// Errors raised while configuring or applying masking strategies.
#[derive(Debug, thiserror::Error)]
pub enum MaskingError {
    #[error("unknown masking strategy {0:?}")]
    UnknownStrategy(String),

    #[error("invalid configuration for strategy {strategy:?}: {source}")]
    InvalidConfiguration {
        strategy: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("secret {secret_type} unavailable for strategy {strategy:?}")]
    SecretUnavailable {
        strategy: &'static str,
        secret_type: SecretType,
    },

    #[error("strategy {0:?} broke the one-in one-out masking contract")]
    StrategyContract(String),

    #[error("cryptographic failure: {0}")]
    Crypto(String),
}
