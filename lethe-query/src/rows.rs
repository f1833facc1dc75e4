//! Row-shape helpers shared by the planners and the engine.

use lethe_schema::FieldPath;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One result row: a JSON object, flat for relational stores and
/// nested for document stores.
pub type Row = Map<String, Value>;

/// Candidate filter values accumulated for a node, keyed by dotted
/// field path.
pub type CandidateValues = HashMap<String, Vec<Value>>;

/// Merges `overlay` into `base`; overlay values win on key overlap.
#[must_use]
pub fn merge_rows(mut base: Row, overlay: Row) -> Row {
    for (key, value) in overlay {
        base.insert(key, value);
    }
    base
}

/// Drops entries whose value list is empty.
#[must_use]
pub fn filter_nonempty(candidates: CandidateValues) -> CandidateValues {
    candidates
        .into_iter()
        .filter(|(_, values)| !values.is_empty())
        .collect()
}

/// The single value at `path`, descending nested objects only.
///
/// Arrays and absent segments yield `None`; primary keys and flat
/// relational fields are the intended callers.
#[must_use]
pub fn value_at<'a>(row: &'a Row, path: &FieldPath) -> Option<&'a Value> {
    let mut current = row.get(path.first())?;
    for segment in &path.segments()[1..] {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Every non-null leaf value found at `path`, flattening any arrays
/// crossed on the way, in document order. Seed propagation to child
/// collections reads parent results through this.
#[must_use]
pub fn values_at(row: &Row, path: &FieldPath) -> Vec<Value> {
    let Some(first) = row.get(path.first()) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    collect_values(first, &path.segments()[1..], &mut out);
    out
}

fn collect_values(value: &Value, rest: &[String], out: &mut Vec<Value>) {
    match value {
        Value::Array(items) => {
            for item in items {
                collect_values(item, rest, out);
            }
        }
        Value::Object(fields) => {
            if let Some(segment) = rest.first() {
                if let Some(next) = fields.get(segment) {
                    collect_values(next, &rest[1..], out);
                }
            }
        }
        Value::Null => {}
        scalar => {
            if rest.is_empty() {
                out.push(scalar.clone());
            }
        }
    }
}

/// `(concrete dotted path, value)` pairs for every occurrence of
/// `path` in the row, numbering array elements as they are crossed,
/// e.g. `contacts.1.phone`.
///
/// Null occurrences are kept so masking can overwrite them in place;
/// scalars reached before `path` is exhausted are dropped.
#[must_use]
pub fn indexed_values_at(row: &Row, path: &FieldPath) -> Vec<(String, Value)> {
    let Some(first) = row.get(path.first()) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    collect_indexed(first, &path.segments()[1..], path.first().to_string(), &mut out);
    out
}

fn collect_indexed(value: &Value, rest: &[String], prefix: String, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                collect_indexed(item, rest, format!("{prefix}.{index}"), out);
            }
        }
        Value::Object(fields) => {
            if let Some(segment) = rest.first() {
                if let Some(next) = fields.get(segment) {
                    collect_indexed(next, &rest[1..], format!("{prefix}.{segment}"), out);
                }
            }
        }
        leaf => {
            if rest.is_empty() {
                out.push((prefix, leaf.clone()));
            }
        }
    }
}
