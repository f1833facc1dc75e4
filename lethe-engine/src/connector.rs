//! The connector seam: planned reads and masking writes against one
//! backing store.
//!
//! Query and update generation is pure CPU; the connector call is the
//! only suspension point in a node's execution, so a store failure can
//! never corrupt traversal state. Every [`ConnectorError`] is retryable
//! at the node level.

use async_trait::async_trait;
use lethe_graph::TraversalNode;
use lethe_masking::MaskingContext;
use lethe_policy::Policy;
use lethe_query::{CandidateValues, QueryError, Row};
use lethe_schema::Collection;
use std::collections::HashMap;
use std::sync::Arc;

/// Result type alias for connector operations.
pub type ConnectorResult<T> = std::result::Result<T, ConnectorError>;

/// Operational failure while executing against a backing store.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// The store has no collection by this name.
    #[error("collection {0:?} not found in store")]
    MissingCollection(String),

    /// The store could not be reached or refused the operation.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Update generation failed for a row.
    #[error(transparent)]
    Query(#[from] QueryError),
}

/// One backing store, addressed per collection.
///
/// `retrieve_data` runs the access path for one traversal node: build a
/// read plan from the filtered candidate values and return the matching
/// rows. `mask_data` runs the erasure path: derive one update per row
/// from the policy's erasure rules and apply it, returning how many
/// stored rows changed. Implementations decide the concrete plan shape
/// (SQL text, document filter) for their family.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Reads the rows matching `input` from `collection`.
    async fn retrieve_data(
        &self,
        node: &TraversalNode,
        collection: &Collection,
        input: &CandidateValues,
    ) -> ConnectorResult<Vec<Row>>;

    /// Masks the policy-targeted fields of `rows` in place. Returns the
    /// number of stored rows that changed.
    async fn mask_data(
        &self,
        node: &TraversalNode,
        collection: &Collection,
        policy: &Policy,
        ctx: &MaskingContext<'_>,
        rows: &[Row],
    ) -> ConnectorResult<usize>;
}

/// Connectors registered by dataset key.
///
/// Every dataset a traversal plans to visit must have a connector here;
/// the runner checks the full plan up front so a missing registration
/// fails before any query is issued.
#[derive(Clone, Default)]
pub struct ConnectorSet {
    by_dataset: HashMap<String, Arc<dyn Connector>>,
}

impl ConnectorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `connector` for `dataset_key`, replacing any previous
    /// registration.
    #[must_use]
    pub fn with_connector(
        mut self,
        dataset_key: impl Into<String>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        self.by_dataset.insert(dataset_key.into(), connector);
        self
    }

    /// The connector serving `dataset_key`, if registered.
    #[must_use]
    pub fn get(&self, dataset_key: &str) -> Option<Arc<dyn Connector>> {
        self.by_dataset.get(dataset_key).cloned()
    }
}
