//! Strategy lookup by registry name.

use crate::secret::SecretCache;
use crate::strategies::{
    AES_ENCRYPT, AesEncrypt, HASH, HMAC, Hash, HmacMasking, NULL_REWRITE, NullRewrite,
    RANDOM_STRING_REWRITE, RandomStringRewrite, STRING_REWRITE, StringRewrite,
};
use crate::strategy::MaskingStrategy;
use crate::{MaskingError, MaskingResult};
use lethe_policy::{MaskingSpec, Policy};
use lethe_types::{ActionType, PrivacyRequestId};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Every registered strategy name, in registry order.
pub const STRATEGY_NAMES: [&str; 6] = [
    NULL_REWRITE,
    STRING_REWRITE,
    RANDOM_STRING_REWRITE,
    HASH,
    HMAC,
    AES_ENCRYPT,
];

/// Builds the strategy named by a rule's masking spec.
pub fn strategy_from_spec(spec: &MaskingSpec) -> MaskingResult<Box<dyn MaskingStrategy>> {
    match spec.strategy.as_str() {
        NULL_REWRITE => Ok(Box::new(NullRewrite)),
        STRING_REWRITE => Ok(Box::new(configured::<StringRewrite>(spec)?)),
        RANDOM_STRING_REWRITE => Ok(Box::new(configured::<RandomStringRewrite>(spec)?)),
        HASH => Ok(Box::new(configured::<Hash>(spec)?)),
        HMAC => Ok(Box::new(configured::<HmacMasking>(spec)?)),
        AES_ENCRYPT => Ok(Box::new(configured::<AesEncrypt>(spec)?)),
        other => Err(MaskingError::UnknownStrategy(other.to_string())),
    }
}

/// Generates and caches the secrets every erasure rule of `policy`
/// will need, without disturbing secrets already cached for this
/// request. Returns how many secrets are now in place.
pub fn cache_masking_secrets(
    cache: &dyn SecretCache,
    policy: &Policy,
    privacy_request_id: &PrivacyRequestId,
) -> MaskingResult<usize> {
    let mut cached = 0;
    for rule in policy.rules_for(ActionType::Erasure) {
        let Some(spec) = &rule.masking_strategy else {
            continue;
        };
        let strategy = strategy_from_spec(spec)?;
        for secret in strategy.generate_secrets(privacy_request_id) {
            cache.get_or_set_with_expiry(secret.key, secret.value);
            cached += 1;
        }
    }
    debug!(%privacy_request_id, policy = %policy.key, cached, "masking secrets primed");
    Ok(cached)
}

fn configured<S: DeserializeOwned>(spec: &MaskingSpec) -> MaskingResult<S> {
    serde_json::from_value(Value::Object(spec.configuration.clone())).map_err(|source| {
        MaskingError::InvalidConfiguration {
            strategy: spec.strategy.clone(),
            source,
        }
    })
}
