//! Address types naming collections and fields across datasets.
//!
//! A [`CollectionAddress`] renders as `dataset:collection`; a
//! [`FieldAddress`] as `dataset:collection:field.path`. The dotted form
//! `dataset.collection` appears only in declarative *after* ordering and
//! cross-dataset references, and is validated on parse.

use crate::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use std::fmt;

pub(crate) fn valid_key_chars(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}

/// A dotted path to a field within one collection, e.g. `workshop.count`.
///
/// Scalar top-level fields have a single segment; nested object (and
/// object-array element) fields add one segment per level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Builds a path from its segments.
    #[must_use]
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a dotted string, e.g. `"backup_identities.ssn"`.
    #[must_use]
    pub fn from_dotted(path: &str) -> Self {
        Self::new(path.split('.'))
    }

    /// Returns a new path with `segment` prepended.
    #[must_use]
    pub fn prepended(&self, segment: impl Into<String>) -> Self {
        let mut segments = vec![segment.into()];
        segments.extend(self.segments.iter().cloned());
        Self { segments }
    }

    /// Returns a new path with `segment` appended.
    #[must_use]
    pub fn appended(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// The path's segments, outermost first.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The first segment, i.e. the top-level field name.
    #[must_use]
    pub fn first(&self) -> &str {
        self.segments.first().map_or("", String::as_str)
    }

    /// The final segment.
    #[must_use]
    pub fn last(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Whether the path descends into a nested field.
    #[must_use]
    pub fn is_nested(&self) -> bool {
        self.segments.len() > 1
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl TryFrom<String> for FieldPath {
    type Error = SchemaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if s.is_empty() {
            return Err(SchemaError::InvalidKey(s));
        }
        Ok(Self::from_dotted(&s))
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        Self::from_dotted(path)
    }
}

/// Globally unique name of one collection: `(dataset_key, collection_name)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CollectionAddress {
    pub dataset: String,
    pub collection: String,
}

impl CollectionAddress {
    /// Builds an address from its parts.
    #[must_use]
    pub fn new(dataset: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            collection: collection.into(),
        }
    }

    /// Parses the colon form `dataset:collection`.
    pub fn from_string(s: &str) -> SchemaResult<Self> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [dataset, collection] if !dataset.is_empty() && !collection.is_empty() => {
                Ok(Self::new(*dataset, *collection))
            }
            _ => Err(SchemaError::InvalidAddress(s.to_string())),
        }
    }

    /// Parses the dotted form `dataset_key.collection_name` used by *after*
    /// declarations and dataset references.
    ///
    /// Exactly two non-empty segments are required, and only characters in
    /// `[A-Za-z0-9._]` are permitted anywhere in the string.
    pub fn from_dotted(s: &str) -> SchemaResult<Self> {
        if !valid_key_chars(s) {
            return Err(SchemaError::InvalidKey(s.to_string()));
        }
        match s.split('.').collect::<Vec<_>>().as_slice() {
            [dataset, collection] if !dataset.is_empty() && !collection.is_empty() => {
                Ok(Self::new(*dataset, *collection))
            }
            _ => Err(SchemaError::InvalidCollectionReference(s.to_string())),
        }
    }

    /// Address of `field_path` within this collection.
    #[must_use]
    pub fn field_address(&self, field_path: FieldPath) -> FieldAddress {
        FieldAddress {
            collection_address: self.clone(),
            field_path,
        }
    }
}

impl fmt::Display for CollectionAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dataset, self.collection)
    }
}

/// Globally unique name of one field: a collection address plus a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldAddress {
    pub collection_address: CollectionAddress,
    pub field_path: FieldPath,
}

impl FieldAddress {
    /// Builds an address from its parts.
    #[must_use]
    pub fn new(
        dataset: impl Into<String>,
        collection: impl Into<String>,
        field_path: impl Into<FieldPath>,
    ) -> Self {
        Self {
            collection_address: CollectionAddress::new(dataset, collection),
            field_path: field_path.into(),
        }
    }

    /// The address of the owning collection.
    #[must_use]
    pub fn collection_address(&self) -> &CollectionAddress {
        &self.collection_address
    }
}

impl fmt::Display for FieldAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.collection_address, self.field_path)
    }
}
