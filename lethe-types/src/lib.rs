//! Core type definitions for Lethe.
//!
//! This crate defines the fundamental, connector-agnostic types used
//! throughout the request-fulfillment engine:
//! - Privacy request and execution log identifiers (UUID v7)
//! - Seed identity data supplied by the data subject
//! - Request / per-collection execution statuses and action types
//!
//! Everything store-specific (datasets, query plans, masking strategies)
//! belongs in the downstream crates, not here.

mod identity;
mod ids;
mod request;
mod status;

pub use identity::Identity;
pub use ids::{ExecutionLogId, PrivacyRequestId};
pub use request::{AffectedField, ExecutionLogEntry, PrivacyRequest};
pub use status::{ActionType, ExecutionLogStatus, PrivacyRequestStatus};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unknown action type: {0}")]
    UnknownActionType(String),
}
