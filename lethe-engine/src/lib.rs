//! Request execution for Lethe: connectors, scheduling, and the audit
//! trail.
//!
//! The planner crates decide what to read and what to mask; this crate
//! decides when, against what, and what happened. [`RequestRunner`]
//! walks a traversal plan wave by wave over a bounded worker pool,
//! [`Connector`] is the seam to each backing store, and
//! [`ExecutionState`] keeps the at-most-once dispatch ledger plus the
//! per-collection audit trail.

mod connector;
mod memory;
mod runner;
mod state;

pub use connector::{Connector, ConnectorError, ConnectorResult, ConnectorSet};
pub use memory::{InMemoryDocumentConnector, InMemoryRelationalConnector};
pub use runner::{EngineConfig, RequestRunner};
pub use state::ExecutionState;

use lethe_schema::CollectionAddress;

/// Result type alias for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Fatal problems running a request. Per-collection operational
/// failures retry and land in the audit trail instead.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A planned dataset has no registered connector.
    #[error("no connector registered for dataset {0:?}")]
    MissingConnector(String),

    /// The traversal plan could not be built.
    #[error(transparent)]
    Traversal(#[from] lethe_graph::TraversalError),

    /// Masking secrets could not be primed for the request.
    #[error(transparent)]
    Masking(#[from] lethe_masking::MaskingError),

    /// A collection flagged as blocking failed after all retries.
    #[error("blocking collection {collection} failed: {message}")]
    BlockingCollectionFailed {
        collection: CollectionAddress,
        message: String,
    },

    /// A worker task aborted instead of returning an outcome.
    #[error("worker task aborted: {0}")]
    Worker(String),
}
