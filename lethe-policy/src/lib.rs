//! Policy model for Lethe.
//!
//! A [`Policy`] groups [`Rule`]s; each rule pairs an action type with a
//! set of data-category [`Target`]s and, for erasure rules, the named
//! masking strategy to apply. Rules are declarative inputs: resolution
//! onto concrete collection fields happens in the query planner, which
//! consumes rules strictly in their declaration order.

mod category;
mod policy;

pub use category::DataCategory;
pub use policy::{MaskingSpec, Policy, Rule, Target};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, PolicyError>;

/// Errors raised while validating a policy.
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("erasure rule {0:?} has no masking strategy")]
    MissingMaskingStrategy(String),

    #[error("rule {0:?} has no targets")]
    EmptyTargets(String),

    #[error("duplicate rule key {0:?}")]
    DuplicateRule(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
