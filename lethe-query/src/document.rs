//! Filter-document generation for document stores.

use crate::QueryResult;
use crate::config::QueryConfig;
use crate::rows::{CandidateValues, Row};
use lethe_graph::TraversalNode;
use lethe_masking::MaskingContext;
use lethe_policy::Policy;
use lethe_schema::Collection;
use serde_json::{Map, Value, json};
use tracing::warn;

/// A find over one document collection: filter plus projection.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub filter: Map<String, Value>,
    /// Every declared field path projected to `1`.
    pub projection: Map<String, Value>,
}

/// An update over one document collection: filter plus `$set` document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentUpdate {
    pub filter: Map<String, Value>,
    pub update: Map<String, Value>,
}

/// Planner for document collections.
#[derive(Debug, Clone, Copy)]
pub struct MongoQueryConfig<'a> {
    config: QueryConfig<'a>,
}

impl<'a> MongoQueryConfig<'a> {
    #[must_use]
    pub fn new(node: &'a TraversalNode, collection: &'a Collection) -> Self {
        Self {
            config: QueryConfig::new(node, collection),
        }
    }

    /// The shared planner core.
    #[must_use]
    pub fn core(&self) -> &QueryConfig<'a> {
        &self.config
    }

    /// Renders the find for this node, or `None` when no candidate
    /// value survives type filtering.
    ///
    /// Single-valued entries filter by direct equality; multi-valued
    /// entries render `{"$in": [...]}`. Nested paths use dot notation.
    #[must_use]
    pub fn generate_query(&self, candidates: &CandidateValues) -> Option<DocumentQuery> {
        let filtered = self.config.typed_filtered_values(candidates);
        if filtered.is_empty() {
            warn!(
                collection = %self.config.collection().name,
                "not enough data to generate a valid query"
            );
            return None;
        }

        let mut filter = Map::new();
        for (path, mut values) in filtered {
            let predicate = if values.len() == 1 {
                values.remove(0)
            } else {
                json!({ "$in": values })
            };
            filter.insert(path.to_string(), predicate);
        }
        let projection = self
            .config
            .field_map()
            .into_iter()
            .map(|(path, _)| (path.to_string(), json!(1)))
            .collect();
        Some(DocumentQuery { filter, projection })
    }

    /// Renders the masking update for one row, or `None` when no rule
    /// targets any of its fields or the row carries no primary key.
    ///
    /// The filter carries every primary-key value; the update is a
    /// single `$set` keyed by concrete dotted paths, array elements
    /// addressed by index.
    pub fn generate_update_stmt(
        &self,
        row: &Row,
        policy: &Policy,
        ctx: &MaskingContext<'_>,
    ) -> QueryResult<Option<DocumentUpdate>> {
        let value_map = self.config.masked_value_map(row, policy, ctx)?;
        if value_map.is_empty() {
            warn!(
                collection = %self.config.collection().name,
                "no fields to mask on this row, update skipped"
            );
            return Ok(None);
        }
        let keys = self.config.primary_key_values(row);
        if keys.is_empty() {
            warn!(
                collection = %self.config.collection().name,
                "row carries no primary key value, update skipped"
            );
            return Ok(None);
        }

        let filter = keys
            .into_iter()
            .map(|(path, value)| (path.to_string(), value))
            .collect();
        let set_document: Map<String, Value> = value_map.into_iter().collect();
        let mut update = Map::new();
        update.insert("$set".to_string(), Value::Object(set_document));
        Ok(Some(DocumentUpdate { filter, update }))
    }
}
