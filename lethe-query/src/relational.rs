//! Text query generation for relational SQL stores.

use crate::QueryResult;
use crate::config::QueryConfig;
use crate::rows::{CandidateValues, Row};
use lethe_graph::TraversalNode;
use lethe_masking::MaskingContext;
use lethe_policy::Policy;
use lethe_schema::Collection;
use serde_json::Value;
use std::fmt;
use tracing::warn;

/// A parameterized `SELECT` with named `:name` binds.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    pub text: String,
    /// Bind values per placeholder; multi-valued entries belong to `IN`
    /// predicates.
    pub params: Vec<(String, Vec<Value>)>,
}

impl fmt::Display for SqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A parameterized `UPDATE` with named `:name` binds.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlUpdate {
    pub text: String,
    pub params: Vec<(String, Value)>,
}

impl fmt::Display for SqlUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// Planner for relational collections.
#[derive(Debug, Clone, Copy)]
pub struct SqlQueryConfig<'a> {
    config: QueryConfig<'a>,
}

impl<'a> SqlQueryConfig<'a> {
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

    /// Renders the read for this node, or `None` when no candidate
    /// value survives type filtering.
    ///
    /// Columns follow field declaration order; predicates follow
    /// `query_field_paths` order, `OR`-joined, rendering `IN` for
    /// multi-valued entries.
    #[must_use]
    pub fn generate_query(&self, candidates: &CandidateValues) -> Option<SqlQuery> {
        let filtered = self.config.typed_filtered_values(candidates);
        if filtered.is_empty() {
            warn!(
                collection = %self.config.collection().name,
                "not enough data to generate a valid query"
            );
            return None;
        }

        let columns = self
            .config
            .field_map()
            .iter()
            .map(|(path, _)| path.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let predicates = filtered
            .iter()
            .map(|(path, values)| {
                if values.len() == 1 {
                    format!("{path} = :{path}")
                } else {
                    format!("{path} IN :{path}")
                }
            })
            .collect::<Vec<_>>()
            .join(" OR ");
        let text = format!(
            "SELECT {columns} FROM {} WHERE {predicates}",
            self.config.collection().name
        );
        let params = filtered
            .into_iter()
            .map(|(path, values)| (path.to_string(), values))
            .collect();
        Some(SqlQuery { text, params })
    }

    /// Renders the masking update for one row, or `None` when no rule
    /// targets any of its fields or the row carries no primary key.
    ///
    /// Assignments are comma-joined without spaces; primary-key
    /// predicates come last, `AND`-joined for composite keys.
    pub fn generate_update_stmt(
        &self,
        row: &Row,
        policy: &Policy,
        ctx: &MaskingContext<'_>,
    ) -> QueryResult<Option<SqlUpdate>> {
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

        let assignments = value_map
            .iter()
            .map(|(name, _)| format!("{name} = :{name}"))
            .collect::<Vec<_>>()
            .join(",");
        let predicates = keys
            .iter()
            .map(|(path, _)| format!("{path} = :{path}"))
            .collect::<Vec<_>>()
            .join(" AND ");
        let text = format!(
            "UPDATE {} SET {assignments} WHERE {predicates}",
            self.config.collection().name
        );
        let mut params = value_map;
        params.extend(keys.into_iter().map(|(path, value)| (path.to_string(), value)));
        Ok(Some(SqlUpdate { text, params }))
    }
}
