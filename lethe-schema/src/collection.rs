//! Collections: named, ordered sets of fields.

use crate::address::valid_key_chars;
use crate::{CollectionAddress, Field, FieldPath, FieldReference, SchemaError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One collection (table, document collection, endpoint resource) within a
/// dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CollectionSpec", into = "CollectionSpec")]
pub struct Collection {
    /// Name, unique within the owning dataset.
    pub name: String,

    /// Fields in declaration order.
    pub fields: Vec<Field>,

    /// Collections that must be fully visited before this one, independent
    /// of data dependencies.
    pub after: BTreeSet<CollectionAddress>,
}

impl Collection {
    /// Builds a collection from its fields.
    #[must_use]
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
            after: BTreeSet::new(),
        }
    }

    /// Adds an explicit ordering constraint.
    #[must_use]
    pub fn with_after(mut self, address: CollectionAddress) -> Self {
        self.after.insert(address);
        self
    }

    /// Flattened `(path, field)` view of the schema in declaration order,
    /// including intermediate object paths.
    #[must_use]
    pub fn field_map(&self) -> Vec<(FieldPath, &Field)> {
        let mut out = Vec::new();
        for field in &self.fields {
            field.flatten_into(None, &mut out);
        }
        out
    }

    /// Looks up the field at `path`, descending into nested objects.
    #[must_use]
    pub fn field(&self, path: &FieldPath) -> Option<&Field> {
        let mut fields = self.fields.as_slice();
        let mut found = None;
        for segment in path.segments() {
            found = fields.iter().find(|f| f.name == *segment);
            fields = found.and_then(Field::nested_fields).unwrap_or(&[]);
        }
        found
    }

    /// Paths of every field flagged as (part of) the primary key, in
    /// declaration order.
    #[must_use]
    pub fn primary_key_paths(&self) -> Vec<FieldPath> {
        self.field_map()
            .into_iter()
            .filter(|(_, field)| field.primary_key)
            .map(|(path, _)| path)
            .collect()
    }

    /// `(path, identity_key)` pairs for fields bound to seed identities.
    #[must_use]
    pub fn identity_paths(&self) -> Vec<(FieldPath, &str)> {
        self.field_map()
            .into_iter()
            .filter_map(|(path, field)| {
                field.identity.as_deref().map(|identity| (path, identity))
            })
            .collect()
    }

    /// `(path, reference)` pairs for every declared reference, in
    /// declaration order.
    #[must_use]
    pub fn references(&self) -> Vec<(FieldPath, &FieldReference)> {
        self.field_map()
            .into_iter()
            .flat_map(|(path, field)| {
                field
                    .references
                    .iter()
                    .map(move |reference| (path.clone(), reference))
            })
            .collect()
    }
}

// ── Serde form ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CollectionSpec {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    after: Vec<String>,
    fields: Vec<Field>,
}

impl TryFrom<CollectionSpec> for Collection {
    type Error = SchemaError;

    fn try_from(spec: CollectionSpec) -> Result<Self, Self::Error> {
        if !valid_key_chars(&spec.name) {
            return Err(SchemaError::InvalidKey(spec.name));
        }
        let after = spec
            .after
            .iter()
            .map(|entry| CollectionAddress::from_dotted(entry))
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self {
            name: spec.name,
            fields: spec.fields,
            after,
        })
    }
}

impl From<Collection> for CollectionSpec {
    fn from(collection: Collection) -> Self {
        Self {
            name: collection.name,
            after: collection
                .after
                .iter()
                .map(|a| format!("{}.{}", a.dataset, a.collection))
                .collect(),
            fields: collection.fields,
        }
    }
}
