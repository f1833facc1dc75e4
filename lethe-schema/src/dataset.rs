//! Datasets: the top-level unit of declarative store description.

use crate::address::valid_key_chars;
use crate::{Collection, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named set of collections describing one store (or one logical slice
/// of one).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DatasetSpec", into = "DatasetSpec")]
pub struct Dataset {
    /// Key, unique across all loaded datasets.
    pub key: String,

    /// Keys of datasets that must be fully visited before any collection
    /// of this one runs.
    pub after: BTreeSet<String>,

    /// Collections in declaration order.
    pub collections: Vec<Collection>,
}

impl Dataset {
    /// Builds a dataset from its collections.
    #[must_use]
    pub fn new(key: impl Into<String>, collections: Vec<Collection>) -> Self {
        Self {
            key: key.into(),
            after: BTreeSet::new(),
            collections,
        }
    }

    /// Adds an explicit dataset-level ordering constraint.
    #[must_use]
    pub fn with_after(mut self, dataset_key: impl Into<String>) -> Self {
        self.after.insert(dataset_key.into());
        self
    }

    /// Looks up a collection by name.
    #[must_use]
    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name == name)
    }
}

// ── Serde form ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DatasetSpec {
    key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    after: Vec<String>,
    collections: Vec<Collection>,
}

impl TryFrom<DatasetSpec> for Dataset {
    type Error = SchemaError;

    fn try_from(spec: DatasetSpec) -> Result<Self, Self::Error> {
        if !valid_key_chars(&spec.key) {
            return Err(SchemaError::InvalidKey(spec.key));
        }
        for entry in &spec.after {
            if !valid_key_chars(entry) {
                return Err(SchemaError::InvalidKey(entry.clone()));
            }
        }
        Ok(Self {
            key: spec.key,
            after: spec.after.into_iter().collect(),
            collections: spec.collections,
        })
    }
}

impl From<Dataset> for DatasetSpec {
    fn from(dataset: Dataset) -> Self {
        Self {
            key: dataset.key,
            after: dataset.after.into_iter().collect(),
            collections: dataset.collections,
        }
    }
}
