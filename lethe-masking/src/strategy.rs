//! The masking strategy capability surface.

use crate::secret::{MaskingSecret, SecretCache};
use crate::{MaskingError, MaskingResult};
use lethe_types::PrivacyRequestId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request-scoped collaborators a strategy may need at mask time.
///
/// The secret cache is handed in explicitly on every call; strategies
/// never reach for shared state on their own.
#[derive(Clone, Copy)]
pub struct MaskingContext<'a> {
    pub privacy_request_id: Option<&'a PrivacyRequestId>,
    pub secrets: &'a dyn SecretCache,
}

impl<'a> MaskingContext<'a> {
    #[must_use]
    pub fn new(
        privacy_request_id: Option<&'a PrivacyRequestId>,
        secrets: &'a dyn SecretCache,
    ) -> Self {
        Self {
            privacy_request_id,
            secrets,
        }
    }
}

/// A pluggable transformation from field values to masked values.
///
/// Deterministic strategies resolve their secrets through the context's
/// cache exactly once per `(privacy_request, strategy, secret_type)`, so
/// masking the same value twice within one request yields the same
/// output. Null inputs always mask to null.
pub trait MaskingStrategy: std::fmt::Debug + Send + Sync {
    /// Registry name of this strategy.
    fn name(&self) -> &'static str;

    /// Masks each input value in order.
    fn mask(&self, values: &[Value], ctx: &MaskingContext<'_>) -> MaskingResult<Vec<Value>>;

    /// The secrets this strategy wants cached before a request runs.
    fn generate_secrets(&self, privacy_request_id: &PrivacyRequestId) -> Vec<MaskingSecret> {
        let _ = privacy_request_id;
        Vec::new()
    }

    /// Whether a field of the declared type can be masked by this
    /// strategy. Untyped fields pass; their raw value is used as-is.
    fn data_type_supported(&self, data_type: Option<&str>) -> bool {
        matches!(data_type, None | Some("string"))
    }
}

/// Masks a single value, preserving the one-in one-out contract.
pub fn mask_one(
    strategy: &dyn MaskingStrategy,
    value: &Value,
    ctx: &MaskingContext<'_>,
) -> MaskingResult<Value> {
    let mut masked = strategy.mask(std::slice::from_ref(value), ctx)?;
    masked
        .pop()
        .ok_or_else(|| MaskingError::StrategyContract(strategy.name().to_string()))
}

/// Renders a value to the string form the digest strategies operate on.
pub(crate) fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

/// Reshapes a masked value to resemble the original's structure by
/// re-attaching a fixed suffix, e.g. `@masked.example.com`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormatPreservation {
    pub suffix: String,
}

impl FormatPreservation {
    #[must_use]
    pub fn format(&self, masked: String) -> String {
        format!("{masked}{}", self.suffix)
    }
}

/// Applies optional format preservation to a masked string.
pub(crate) fn preserve(format: Option<&FormatPreservation>, masked: String) -> String {
    match format {
        Some(preservation) => preservation.format(masked),
        None => masked,
    }
}
