//! In-memory connectors executing generated plans against seeded rows.
//!
//! These back the test suites and let callers embed the engine without a
//! live store. Each holds rows keyed by collection name and interprets
//! the bound plan the same way its real counterpart would: `OR`-joined
//! membership filters on reads, keyed writes on masking updates.

use crate::connector::{Connector, ConnectorError, ConnectorResult};
use async_trait::async_trait;
use lethe_graph::TraversalNode;
use lethe_masking::MaskingContext;
use lethe_policy::Policy;
use lethe_query::{CandidateValues, MongoQueryConfig, Row, SqlQueryConfig, values_at};
use lethe_schema::{Collection, FieldPath};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;
use tracing::debug;

// ── Relational ───────────────────────────────────────────────────────

/// A relational store over flat rows, one table per collection.
#[derive(Default)]
pub struct InMemoryRelationalConnector {
    tables: Mutex<HashMap<String, Vec<Row>>>,
}

impl InMemoryRelationalConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a table with fixture rows.
    #[must_use]
    pub fn with_table(self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.tables.lock().unwrap().insert(name.into(), rows);
        self
    }

    /// Snapshot of a table's current rows, for assertions.
    #[must_use]
    pub fn rows(&self, name: &str) -> Vec<Row> {
        self.tables.lock().unwrap().get(name).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Connector for InMemoryRelationalConnector {
    async fn retrieve_data(
        &self,
        node: &TraversalNode,
        collection: &Collection,
        input: &CandidateValues,
    ) -> ConnectorResult<Vec<Row>> {
        let config = SqlQueryConfig::new(node, collection);
        let Some(query) = config.generate_query(input) else {
            return Ok(Vec::new());
        };
        debug!(collection = %node.address(), query = %query, "executing read");

        let tables = self.tables.lock().unwrap();
        let rows = tables
            .get(collection.name.as_str())
            .ok_or_else(|| ConnectorError::MissingCollection(collection.name.clone()))?;
        let matched = rows
            .iter()
            .filter(|row| {
                query.params.iter().any(|(column, values)| {
                    row.get(column.as_str()).is_some_and(|held| values.contains(held))
                })
            })
            .cloned()
            .collect();
        Ok(matched)
    }

    async fn mask_data(
        &self,
        node: &TraversalNode,
        collection: &Collection,
        policy: &Policy,
        ctx: &MaskingContext<'_>,
        rows: &[Row],
    ) -> ConnectorResult<usize> {
        let config = SqlQueryConfig::new(node, collection);
        let mut planned = Vec::new();
        for row in rows {
            if let Some(update) = config.generate_update_stmt(row, policy, ctx)? {
                debug!(collection = %node.address(), update = %update, "executing update");
                planned.push(split_update_params(collection, update.params));
            }
        }
        if planned.is_empty() {
            return Ok(0);
        }

        let mut tables = self.tables.lock().unwrap();
        let stored = tables
            .get_mut(collection.name.as_str())
            .ok_or_else(|| ConnectorError::MissingCollection(collection.name.clone()))?;
        let mut affected = 0;
        for (assignments, predicate) in &planned {
            for stored_row in stored.iter_mut() {
                let matched = predicate.iter().all(|(column, value)| {
                    stored_row.get(column.as_str()).is_some_and(|held| held == value)
                });
                if matched {
                    for (column, value) in assignments {
                        stored_row.insert(column.clone(), value.clone());
                    }
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }
}

/// Splits bound update parameters into assignments and the primary-key
/// predicate. The generator renders predicate binds last, one per
/// primary-key value present in the row, so the trailing run of
/// pk-named parameters is the predicate.
fn split_update_params(
    collection: &Collection,
    mut params: Vec<(String, Value)>,
) -> (Vec<(String, Value)>, Vec<(String, Value)>) {
    let pk_names: BTreeSet<String> = collection
        .primary_key_paths()
        .iter()
        .map(ToString::to_string)
        .collect();
    let mut predicate = Vec::new();
    while predicate.len() < pk_names.len()
        && params.last().is_some_and(|(column, _)| pk_names.contains(column))
    {
        if let Some(pair) = params.pop() {
            predicate.push(pair);
        }
    }
    predicate.reverse();
    (params, predicate)
}

// ── Document ─────────────────────────────────────────────────────────

/// A document store over nested rows, one collection per name.
#[derive(Default)]
pub struct InMemoryDocumentConnector {
    collections: Mutex<HashMap<String, Vec<Row>>>,
}

impl InMemoryDocumentConnector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a collection with fixture documents.
    #[must_use]
    pub fn with_collection(self, name: impl Into<String>, rows: Vec<Row>) -> Self {
        self.collections.lock().unwrap().insert(name.into(), rows);
        self
    }

    /// Snapshot of a collection's current documents, for assertions.
    #[must_use]
    pub fn rows(&self, name: &str) -> Vec<Row> {
        self.collections.lock().unwrap().get(name).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Connector for InMemoryDocumentConnector {
    async fn retrieve_data(
        &self,
        node: &TraversalNode,
        collection: &Collection,
        input: &CandidateValues,
    ) -> ConnectorResult<Vec<Row>> {
        let config = MongoQueryConfig::new(node, collection);
        let Some(query) = config.generate_query(input) else {
            return Ok(Vec::new());
        };
        debug!(collection = %node.address(), "executing document read");

        let collections = self.collections.lock().unwrap();
        let rows = collections
            .get(collection.name.as_str())
            .ok_or_else(|| ConnectorError::MissingCollection(collection.name.clone()))?;
        // Stored documents carry only declared fields, so the projection
        // is not re-applied here.
        let matched = rows
            .iter()
            .filter(|row| document_matches(row, &query.filter))
            .cloned()
            .collect();
        Ok(matched)
    }

    async fn mask_data(
        &self,
        node: &TraversalNode,
        collection: &Collection,
        policy: &Policy,
        ctx: &MaskingContext<'_>,
        rows: &[Row],
    ) -> ConnectorResult<usize> {
        let config = MongoQueryConfig::new(node, collection);
        let mut planned = Vec::new();
        for row in rows {
            if let Some(update) = config.generate_update_stmt(row, policy, ctx)? {
                planned.push(update);
            }
        }
        if planned.is_empty() {
            return Ok(0);
        }

        let mut collections = self.collections.lock().unwrap();
        let stored = collections
            .get_mut(collection.name.as_str())
            .ok_or_else(|| ConnectorError::MissingCollection(collection.name.clone()))?;
        let mut affected = 0;
        for update in &planned {
            let Some(Value::Object(assignments)) = update.update.get("$set") else {
                continue;
            };
            for stored_row in stored.iter_mut() {
                if document_matches(stored_row, &update.filter) {
                    for (path, value) in assignments {
                        let segments: Vec<&str> = path.split('.').collect();
                        write_path(stored_row, &segments, value.clone());
                    }
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }
}

/// Whether `row` satisfies every condition in `filter`. Values nested
/// under arrays match if any element does, mirroring document-store
/// dotted-path semantics.
fn document_matches(row: &Row, filter: &serde_json::Map<String, Value>) -> bool {
    filter.iter().all(|(path, condition)| {
        let present = values_at(row, &FieldPath::from(path.as_str()));
        condition_matches(condition, &present)
    })
}

fn condition_matches(condition: &Value, present: &[Value]) -> bool {
    match condition.as_object().and_then(|object| object.get("$in")) {
        Some(Value::Array(options)) => present.iter().any(|value| options.contains(value)),
        _ => present.contains(condition),
    }
}

/// Writes `value` at a concrete dotted path, numeric segments indexing
/// into arrays. Paths derive from the row being updated, so a missing
/// slot only occurs on foreign input; such writes are dropped.
fn write_path(row: &mut Row, segments: &[&str], value: Value) {
    let [head, rest @ ..] = segments else {
        return;
    };
    if rest.is_empty() {
        row.insert((*head).to_string(), value);
    } else if let Some(slot) = row.get_mut(*head) {
        write_value_path(slot, rest, value);
    }
}

fn write_value_path(slot: &mut Value, segments: &[&str], value: Value) {
    let [head, rest @ ..] = segments else {
        return;
    };
    match slot {
        Value::Array(items) => {
            if let Some(item) = head.parse::<usize>().ok().and_then(|index| items.get_mut(index)) {
                if rest.is_empty() {
                    *item = value;
                } else {
                    write_value_path(item, rest, value);
                }
            }
        }
        Value::Object(map) => {
            if rest.is_empty() {
                map.insert((*head).to_string(), value);
            } else if let Some(next) = map.get_mut(*head) {
                write_value_path(next, rest, value);
            }
        }
        _ => {}
    }
}
