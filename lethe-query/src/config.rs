//! Planner core shared by every connector family.

use crate::rows::{self, CandidateValues, Row};
use crate::{QueryError, QueryResult};
use lethe_graph::TraversalNode;
use lethe_masking::{MaskingContext, strategy_from_spec};
use lethe_policy::{DataCategory, Policy, Rule};
use lethe_schema::{Collection, Field, FieldPath};
use lethe_types::ActionType;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// Planning view of one traversal node joined with its collection
/// schema.
///
/// The node knows which fields are seeded this run; the collection
/// knows declaration order, declared types, and category tags. Every
/// planner question is answered from those two, so the per-family
/// planners stay purely textual.
#[derive(Debug, Clone, Copy)]
pub struct QueryConfig<'a> {
    node: &'a TraversalNode,
    collection: &'a Collection,
}

impl<'a> QueryConfig<'a> {
    #[must_use]
    pub fn new(node: &'a TraversalNode, collection: &'a Collection) -> Self {
        Self { node, collection }
    }

    #[must_use]
    pub fn node(&self) -> &'a TraversalNode {
        self.node
    }

    #[must_use]
    pub fn collection(&self) -> &'a Collection {
        self.collection
    }

    /// Flattened `(path, field)` schema view in declaration order,
    /// nested paths included.
    #[must_use]
    pub fn field_map(&self) -> Vec<(FieldPath, &'a Field)> {
        self.collection.field_map()
    }

    /// The field paths eligible to filter on, in declaration order:
    /// exactly the paths seeded on the node this run.
    #[must_use]
    pub fn query_field_paths(&self) -> Vec<FieldPath> {
        let seeded: BTreeSet<&FieldPath> = self.node.seeded_paths().collect();
        self.field_map()
            .into_iter()
            .map(|(path, _)| path)
            .filter(|path| seeded.contains(path))
            .collect()
    }

    /// Coerces candidate values to each query field's declared type and
    /// drops entries that end up absent or empty.
    ///
    /// Output order follows [`Self::query_field_paths`], never the
    /// input map, so generated queries are byte-stable.
    #[must_use]
    pub fn typed_filtered_values(&self, candidates: &CandidateValues) -> Vec<(FieldPath, Vec<Value>)> {
        self.query_field_paths()
            .into_iter()
            .filter_map(|path| {
                let values = candidates.get(&path.to_string())?;
                let field = self.collection.field(&path)?;
                let typed: Vec<Value> = values.iter().filter_map(|value| field.cast(value)).collect();
                (!typed.is_empty()).then_some((path, typed))
            })
            .collect()
    }

    /// For each rule participating in `action_type`, the declaration-
    /// ordered paths of fields whose category tags the rule covers.
    #[must_use]
    pub fn rule_target_paths<'p>(
        &self,
        policy: &'p Policy,
        action_type: ActionType,
    ) -> Vec<(&'p Rule, Vec<FieldPath>)> {
        policy
            .rules_for(action_type)
            .map(|rule| {
                let paths = self
                    .field_map()
                    .into_iter()
                    .filter(|(_, field)| {
                        let tags: Vec<DataCategory> = field
                            .data_categories
                            .iter()
                            .map(|tag| DataCategory::from(tag.as_str()))
                            .collect();
                        rule.matches_tags(&tags)
                    })
                    .map(|(path, _)| path)
                    .collect();
                (rule, paths)
            })
            .collect()
    }

    /// Resolves the winning erasure rule per targeted field path and
    /// masks the row's current values, yielding `(concrete path,
    /// masked value)` assignments in field declaration order.
    ///
    /// Overlapping rules resolve to the later-declared one. Fields
    /// whose declared type the winning strategy cannot mask are skipped
    /// with a warning; masked strings longer than the field's declared
    /// length are truncated to it.
    pub fn masked_value_map(
        &self,
        row: &Row,
        policy: &Policy,
        ctx: &MaskingContext<'_>,
    ) -> QueryResult<Vec<(String, Value)>> {
        let mut winners: BTreeMap<FieldPath, &Rule> = BTreeMap::new();
        for (rule, paths) in self.rule_target_paths(policy, ActionType::Erasure) {
            for path in paths {
                winners.insert(path, rule);
            }
        }

        let mut assignments = Vec::new();
        for (path, field) in self.field_map() {
            let Some(rule) = winners.get(&path) else {
                continue;
            };
            let spec = rule
                .masking_strategy
                .as_ref()
                .ok_or_else(|| QueryError::RuleWithoutStrategy(rule.key.clone()))?;
            let strategy = strategy_from_spec(spec)?;
            let declared_type = field.data_type.map(|data_type| data_type.name());
            if !strategy.data_type_supported(declared_type) {
                warn!(
                    collection = %self.collection.name,
                    field = %path,
                    strategy = strategy.name(),
                    "declared type unsupported by masking strategy, field skipped"
                );
                continue;
            }

            let occurrences = rows::indexed_values_at(row, &path);
            if occurrences.is_empty() {
                continue;
            }
            let current: Vec<Value> = occurrences.iter().map(|(_, value)| value.clone()).collect();
            let masked = strategy.mask(&current, ctx)?;
            for ((concrete_path, _), masked_value) in occurrences.into_iter().zip(masked) {
                assignments.push((concrete_path, truncate_to_length(masked_value, field.length)));
            }
        }
        Ok(assignments)
    }

    /// `(path, value)` for each primary-key field holding a non-null
    /// value in the row, in declaration order.
    #[must_use]
    pub fn primary_key_values(&self, row: &Row) -> Vec<(FieldPath, Value)> {
        self.collection
            .primary_key_paths()
            .into_iter()
            .filter_map(|path| {
                let value = rows::value_at(row, &path)?.clone();
                (!value.is_null()).then_some((path, value))
            })
            .collect()
    }
}

/// Truncation applies to the masked output, never the input value.
fn truncate_to_length(masked: Value, length: Option<usize>) -> Value {
    match (masked, length) {
        (Value::String(text), Some(length)) if text.chars().count() > length => {
            Value::String(text.chars().take(length).collect())
        }
        (masked, _) => masked,
    }
}
