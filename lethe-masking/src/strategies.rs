//! The built-in masking strategies.
//!
//! `null_rewrite` and `string_rewrite` need no secrets. `hash`, `hmac`,
//! and `aes_encrypt` are deterministic within one privacy request
//! through cached secrets. `random_string_rewrite` is explicitly
//! non-deterministic: every call draws fresh randomness.

use crate::secret::{
    MaskingSecret, SecretCacheKey, SecretType, SecretValue, get_or_generate_secret,
};
use crate::strategy::{
    FormatPreservation, MaskingContext, MaskingStrategy, preserve, value_as_string,
};
use crate::{MaskingError, MaskingResult};
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hmac::{Hmac, Mac};
use lethe_types::PrivacyRequestId;
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256, Sha512};

pub const NULL_REWRITE: &str = "null_rewrite";
pub const STRING_REWRITE: &str = "string_rewrite";
pub const RANDOM_STRING_REWRITE: &str = "random_string_rewrite";
pub const HASH: &str = "hash";
pub const HMAC: &str = "hmac";
pub const AES_ENCRYPT: &str = "aes_encrypt";

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Digest choice shared by the hash and hmac strategies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-512")]
    Sha512,
}

// ── null_rewrite ──────────────────────────────────────────────────

/// Replaces every value with null.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRewrite;

impl MaskingStrategy for NullRewrite {
    fn name(&self) -> &'static str {
        NULL_REWRITE
    }

    fn mask(&self, values: &[Value], _ctx: &MaskingContext<'_>) -> MaskingResult<Vec<Value>> {
        Ok(values.iter().map(|_| Value::Null).collect())
    }

    fn data_type_supported(&self, _data_type: Option<&str>) -> bool {
        true
    }
}

// ── string_rewrite ────────────────────────────────────────────────

/// Replaces every non-null value with a configured constant.
#[derive(Debug, Clone, Deserialize)]
pub struct StringRewrite {
    pub rewrite_value: String,
    #[serde(default)]
    pub format_preservation: Option<FormatPreservation>,
}

impl StringRewrite {
    #[must_use]
    pub fn new(rewrite_value: impl Into<String>) -> Self {
        Self {
            rewrite_value: rewrite_value.into(),
            format_preservation: None,
        }
    }
}

impl MaskingStrategy for StringRewrite {
    fn name(&self) -> &'static str {
        STRING_REWRITE
    }

    fn mask(&self, values: &[Value], _ctx: &MaskingContext<'_>) -> MaskingResult<Vec<Value>> {
        Ok(values
            .iter()
            .map(|value| {
                if value.is_null() {
                    Value::Null
                } else {
                    Value::String(preserve(
                        self.format_preservation.as_ref(),
                        self.rewrite_value.clone(),
                    ))
                }
            })
            .collect())
    }
}

// ── random_string_rewrite ─────────────────────────────────────────

fn default_random_length() -> usize {
    30
}

/// Replaces every non-null value with a fresh random string.
#[derive(Debug, Clone, Deserialize)]
pub struct RandomStringRewrite {
    #[serde(default = "default_random_length")]
    pub length: usize,
    #[serde(default)]
    pub format_preservation: Option<FormatPreservation>,
}

impl Default for RandomStringRewrite {
    fn default() -> Self {
        Self {
            length: default_random_length(),
            format_preservation: None,
        }
    }
}

impl MaskingStrategy for RandomStringRewrite {
    fn name(&self) -> &'static str {
        RANDOM_STRING_REWRITE
    }

    fn mask(&self, values: &[Value], _ctx: &MaskingContext<'_>) -> MaskingResult<Vec<Value>> {
        Ok(values
            .iter()
            .map(|value| {
                if value.is_null() {
                    Value::Null
                } else {
                    let random: String = rand::thread_rng()
                        .sample_iter(&Alphanumeric)
                        .take(self.length)
                        .map(char::from)
                        .collect();
                    Value::String(preserve(self.format_preservation.as_ref(), random))
                }
            })
            .collect())
    }
}

// ── hash ──────────────────────────────────────────────────────────

/// Replaces every non-null value with the hex digest of the value
/// concatenated with a per-request salt.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Hash {
    #[serde(default)]
    pub algorithm: HashAlgorithm,
    #[serde(default)]
    pub format_preservation: Option<FormatPreservation>,
}

impl Hash {
    fn digest(&self, value: &str, salt: &str) -> String {
        let salted = format!("{value}{salt}");
        match self.algorithm {
            HashAlgorithm::Sha256 => hex::encode(Sha256::digest(salted.as_bytes())),
            HashAlgorithm::Sha512 => hex::encode(Sha512::digest(salted.as_bytes())),
        }
    }
}

impl MaskingStrategy for Hash {
    fn name(&self) -> &'static str {
        HASH
    }

    fn mask(&self, values: &[Value], ctx: &MaskingContext<'_>) -> MaskingResult<Vec<Value>> {
        let salt = text_secret(ctx, HASH, SecretType::Salt)?;
        Ok(values
            .iter()
            .map(|value| match value_as_string(value) {
                Some(text) => Value::String(preserve(
                    self.format_preservation.as_ref(),
                    self.digest(&text, &salt),
                )),
                None => Value::Null,
            })
            .collect())
    }

    fn generate_secrets(&self, privacy_request_id: &PrivacyRequestId) -> Vec<MaskingSecret> {
        vec![MaskingSecret {
            key: SecretCacheKey::new(*privacy_request_id, HASH, SecretType::Salt),
            value: SecretValue::generate_text(),
        }]
    }
}

// ── hmac ──────────────────────────────────────────────────────────

/// Replaces every non-null value with an HMAC hex digest of the value
/// concatenated with a per-request salt, under a per-request key.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HmacMasking {
    #[serde(default)]
    pub algorithm: HashAlgorithm,
    #[serde(default)]
    pub format_preservation: Option<FormatPreservation>,
}

impl MaskingStrategy for HmacMasking {
    fn name(&self) -> &'static str {
        HMAC
    }

    fn mask(&self, values: &[Value], ctx: &MaskingContext<'_>) -> MaskingResult<Vec<Value>> {
        let key = text_secret(ctx, HMAC, SecretType::Key)?;
        let salt = text_secret(ctx, HMAC, SecretType::Salt)?;
        values
            .iter()
            .map(|value| match value_as_string(value) {
                Some(text) => {
                    let digest = hmac_hex(self.algorithm, &key, &format!("{text}{salt}"))?;
                    Ok(Value::String(preserve(
                        self.format_preservation.as_ref(),
                        digest,
                    )))
                }
                None => Ok(Value::Null),
            })
            .collect()
    }

    fn generate_secrets(&self, privacy_request_id: &PrivacyRequestId) -> Vec<MaskingSecret> {
        vec![
            MaskingSecret {
                key: SecretCacheKey::new(*privacy_request_id, HMAC, SecretType::Key),
                value: SecretValue::generate_text(),
            },
            MaskingSecret {
                key: SecretCacheKey::new(*privacy_request_id, HMAC, SecretType::Salt),
                value: SecretValue::generate_text(),
            },
        ]
    }
}

// ── aes_encrypt ───────────────────────────────────────────────────

/// Block cipher mode; GCM is the only supported value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AesMode {
    #[default]
    Gcm,
}

/// Replaces every non-null value with its AES-256-GCM encryption under
/// a per-request key.
///
/// The nonce is the leading 12 bytes of an HMAC-SHA256 digest of the
/// value under separate per-request hmac secrets, so re-masking the
/// same value within one request reproduces the same ciphertext. The
/// nonce doubles as associated data and the output is the base64 of
/// the ciphertext-plus-tag.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AesEncrypt {
    #[serde(default)]
    pub mode: AesMode,
    #[serde(default)]
    pub format_preservation: Option<FormatPreservation>,
}

impl MaskingStrategy for AesEncrypt {
    fn name(&self) -> &'static str {
        AES_ENCRYPT
    }

    fn mask(&self, values: &[Value], ctx: &MaskingContext<'_>) -> MaskingResult<Vec<Value>> {
        let key = byte_secret(ctx, AES_ENCRYPT, SecretType::Key)?;
        let key_hmac = text_secret(ctx, AES_ENCRYPT, SecretType::KeyHmac)?;
        let salt_hmac = text_secret(ctx, AES_ENCRYPT, SecretType::SaltHmac)?;
        let cipher = Aes256Gcm::new_from_slice(&key)
            .map_err(|err| MaskingError::Crypto(format!("aes key rejected: {err}")))?;

        values
            .iter()
            .map(|value| match value_as_string(value) {
                Some(text) => {
                    let digest =
                        hmac_raw(HashAlgorithm::Sha256, &key_hmac, &format!("{text}{salt_hmac}"))?;
                    let nonce_bytes = &digest[..NONCE_LEN];
                    let nonce = Nonce::from_slice(nonce_bytes);
                    let ciphertext = cipher
                        .encrypt(
                            nonce,
                            Payload {
                                msg: text.as_bytes(),
                                aad: nonce_bytes,
                            },
                        )
                        .map_err(|err| MaskingError::Crypto(format!("aes-gcm encrypt: {err}")))?;
                    Ok(Value::String(preserve(
                        self.format_preservation.as_ref(),
                        BASE64.encode(ciphertext),
                    )))
                }
                None => Ok(Value::Null),
            })
            .collect()
    }

    fn generate_secrets(&self, privacy_request_id: &PrivacyRequestId) -> Vec<MaskingSecret> {
        vec![
            MaskingSecret {
                key: SecretCacheKey::new(*privacy_request_id, AES_ENCRYPT, SecretType::Key),
                value: SecretValue::generate_bytes(),
            },
            MaskingSecret {
                key: SecretCacheKey::new(*privacy_request_id, AES_ENCRYPT, SecretType::KeyHmac),
                value: SecretValue::generate_text(),
            },
            MaskingSecret {
                key: SecretCacheKey::new(*privacy_request_id, AES_ENCRYPT, SecretType::SaltHmac),
                value: SecretValue::generate_text(),
            },
        ]
    }
}

// ── Secret plumbing ───────────────────────────────────────────────

fn text_secret(
    ctx: &MaskingContext<'_>,
    strategy: &'static str,
    secret_type: SecretType,
) -> MaskingResult<String> {
    get_or_generate_secret(
        ctx.secrets,
        ctx.privacy_request_id,
        strategy,
        secret_type,
        SecretValue::generate_text,
    )
    .as_text()
    .map(str::to_string)
    .ok_or(MaskingError::SecretUnavailable {
        strategy,
        secret_type,
    })
}

fn byte_secret(
    ctx: &MaskingContext<'_>,
    strategy: &'static str,
    secret_type: SecretType,
) -> MaskingResult<Vec<u8>> {
    get_or_generate_secret(
        ctx.secrets,
        ctx.privacy_request_id,
        strategy,
        secret_type,
        SecretValue::generate_bytes,
    )
    .as_bytes()
    .map(<[u8]>::to_vec)
    .ok_or(MaskingError::SecretUnavailable {
        strategy,
        secret_type,
    })
}

fn hmac_hex(algorithm: HashAlgorithm, key: &str, message: &str) -> MaskingResult<String> {
    hmac_raw(algorithm, key, message).map(hex::encode)
}

fn hmac_raw(algorithm: HashAlgorithm, key: &str, message: &str) -> MaskingResult<Vec<u8>> {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(key.as_bytes())
                .map_err(|err| MaskingError::Crypto(format!("hmac key rejected: {err}")))?;
            mac.update(message.as_bytes());
            Ok(mac.finalize().into_bytes().to_vec())
        }
        HashAlgorithm::Sha512 => {
            let mut mac = <Hmac<Sha512> as Mac>::new_from_slice(key.as_bytes())
                .map_err(|err| MaskingError::Crypto(format!("hmac key rejected: {err}")))?;
            mac.update(message.as_bytes());
            Ok(mac.finalize().into_bytes().to_vec())
        }
    }
}
