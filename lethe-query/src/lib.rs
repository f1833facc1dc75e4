//! Query planning for Lethe: turning traversal nodes plus policies
//! into concrete read and update statements.
//!
//! One planner exists per backing-store family. Both share a
//! [`QueryConfig`] core that answers every schema- and seed-derived
//! question, so the family planners only decide textual form: the
//! relational planner renders parameterized SQL, the document planner
//! renders filter documents. Reads select every declared field and
//! filter on seeded paths; updates rewrite rule-targeted fields through
//! the policy's masking strategies and key on the collection's primary
//! key.

mod config;
mod document;
mod relational;
mod rows;

pub use config::QueryConfig;
pub use document::{DocumentQuery, DocumentUpdate, MongoQueryConfig};
pub use relational::{SqlQuery, SqlQueryConfig, SqlUpdate};
pub use rows::{
    CandidateValues, Row, filter_nonempty, indexed_values_at, merge_rows, value_at, values_at,
};

/// Result type alias using the crate's error type.
pub type QueryResult<T> = std::result::Result<T, QueryError>;

/// Errors raised while planning queries or updates.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("erasure rule {0:?} has no masking strategy")]
    RuleWithoutStrategy(String),

    #[error("masking error: {0}")]
    Masking(#[from] lethe_masking::MaskingError),
}
