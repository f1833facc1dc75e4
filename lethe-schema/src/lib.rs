//! Dataset, collection and field model for Lethe.
//!
//! Datasets are declarative descriptions of the stores a privacy request
//! must visit: each dataset is a named set of collections, each collection
//! a named set of fields, and fields may reference fields in other
//! collections. This crate defines that model, the address types that name
//! its parts, and the declared-data-type coercion used when values flow
//! across collection boundaries.
//!
//! Graph construction and traversal over these types live in `lethe-graph`.

mod address;
mod collection;
mod data_type;
mod dataset;
mod field;

pub use address::{CollectionAddress, FieldAddress, FieldPath};
pub use collection::Collection;
pub use data_type::DataType;
pub use dataset::Dataset;
pub use field::{EdgeDirection, Field, FieldReference, FieldVariant};

/// Result type alias using the crate's error type.
pub type SchemaResult<T> = std::result::Result<T, SchemaError>;

/// Errors raised while parsing or validating the dataset model.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// A key contains characters outside `[A-Za-z0-9._]`.
    #[error("invalid key {0:?}: keys must only contain alphanumeric characters, '.' or '_'")]
    InvalidKey(String),

    /// A collection reference is not of the form `dataset_key.collection_name`.
    #[error(
        "invalid collection reference {0:?}: must be specified in the form 'dataset_key.collection_name'"
    )]
    InvalidCollectionReference(String),

    /// A collection address string is not of the form `dataset:collection`.
    #[error("invalid collection address {0:?}: expected 'dataset:collection'")]
    InvalidAddress(String),

    /// A field reference is not of the form `collection.field`.
    #[error("invalid field reference {0:?}: must be specified in the form 'collection.field'")]
    InvalidFieldReference(String),

    /// A declared data type is not one of the supported names.
    #[error("unknown data type {0:?}")]
    UnknownDataType(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
