//! Field model: scalars, nested objects, arrays and cross-collection
//! references.

use crate::{DataType, FieldAddress, FieldPath, SchemaError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of a reference edge this field sits on.
///
/// `From` means values flow out of this field toward the referenced one;
/// `To` means this field receives values from it. An unspecified direction
/// lets the edge carry values either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeDirection {
    From,
    To,
}

impl fmt::Display for EdgeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::From => write!(f, "from"),
            Self::To => write!(f, "to"),
        }
    }
}

/// A declared reference from one field to a field in another collection.
///
/// `field` is a dotted `collection.field[.subfield]` path relative to
/// `dataset`; it is resolved against the loaded datasets at graph build
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReference {
    pub dataset: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<EdgeDirection>,
}

impl FieldReference {
    /// Builds a reference to `field` (dotted `collection.field` path)
    /// within `dataset`.
    #[must_use]
    pub fn new(
        dataset: impl Into<String>,
        field: impl Into<String>,
        direction: Option<EdgeDirection>,
    ) -> Self {
        Self {
            dataset: dataset.into(),
            field: field.into(),
            direction,
        }
    }

    /// Resolves the referenced field's address, validating the dotted form.
    pub fn target_address(&self) -> Result<FieldAddress, SchemaError> {
        if !self.field.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
            || self.field.is_empty()
        {
            return Err(SchemaError::InvalidKey(self.field.clone()));
        }
        let segments: Vec<&str> = self.field.split('.').collect();
        if segments.len() < 2 || segments.iter().any(|s| s.is_empty()) {
            return Err(SchemaError::InvalidFieldReference(self.field.clone()));
        }
        Ok(FieldAddress::new(
            self.dataset.clone(),
            segments[0],
            FieldPath::new(segments[1..].iter().copied()),
        ))
    }
}

/// Structural variant of a field.
///
/// Attributes shared by every variant (categories, references, declared
/// type, …) live on [`Field`] rather than inside this enum so the JSON
/// representation stays flat: `{"name": "x", "data_type": "string[]"}`
/// instead of a nested tagged object.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldVariant {
    /// A single leaf value.
    Scalar,
    /// A nested document with named sub-fields.
    Object { fields: Vec<Field> },
    /// A homogeneous list; elements are scalars or objects, never arrays.
    Array { element: Box<FieldVariant> },
}

impl FieldVariant {
    /// Sub-fields of an object (or object-array element), if any.
    #[must_use]
    pub fn nested_fields(&self) -> Option<&[Field]> {
        match self {
            Self::Object { fields } => Some(fields),
            Self::Array { element } => element.nested_fields(),
            Self::Scalar => None,
        }
    }

    /// Whether this variant is an array.
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, Self::Array { .. })
    }
}

/// One field of a collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FieldSpec", into = "FieldSpec")]
pub struct Field {
    /// Name within the enclosing collection or object.
    pub name: String,

    /// Hierarchical data category tags, e.g. `user.provided.identifiable.name`.
    pub data_categories: Vec<String>,

    /// Whether this field participates in the collection's primary key.
    pub primary_key: bool,

    /// Seed identity key this field matches directly (e.g. `email`).
    /// Meaningful on scalar fields only.
    pub identity: Option<String>,

    /// Declared references to fields in other collections.
    pub references: Vec<FieldReference>,

    /// Declared element data type, if any. Untyped fields pass candidate
    /// values through uncoerced.
    pub data_type: Option<DataType>,

    /// Maximum length; masked values longer than this are truncated.
    pub length: Option<usize>,

    /// Structural variant.
    pub variant: FieldVariant,
}

impl Field {
    fn bare(name: impl Into<String>, variant: FieldVariant) -> Self {
        Self {
            name: name.into(),
            data_categories: Vec::new(),
            primary_key: false,
            identity: None,
            references: Vec::new(),
            data_type: None,
            length: None,
            variant,
        }
    }

    /// Shorthand for a scalar field.
    #[must_use]
    pub fn scalar(name: impl Into<String>) -> Self {
        Self::bare(name, FieldVariant::Scalar)
    }

    /// Shorthand for a nested object field.
    #[must_use]
    pub fn object(name: impl Into<String>, fields: Vec<Field>) -> Self {
        let mut field = Self::bare(name, FieldVariant::Object { fields });
        field.data_type = Some(DataType::Object);
        field
    }

    /// Shorthand for an array of scalars.
    #[must_use]
    pub fn scalar_array(name: impl Into<String>) -> Self {
        Self::bare(
            name,
            FieldVariant::Array {
                element: Box::new(FieldVariant::Scalar),
            },
        )
    }

    /// Shorthand for an array of objects.
    #[must_use]
    pub fn object_array(name: impl Into<String>, fields: Vec<Field>) -> Self {
        let mut field = Self::bare(
            name,
            FieldVariant::Array {
                element: Box::new(FieldVariant::Object { fields }),
            },
        );
        field.data_type = Some(DataType::Object);
        field
    }

    /// Tags the field with data categories.
    #[must_use]
    pub fn with_data_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the field as (part of) the collection's primary key.
    #[must_use]
    pub fn with_primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Binds the field to a seed identity key.
    #[must_use]
    pub fn with_identity(mut self, identity_key: impl Into<String>) -> Self {
        self.identity = Some(identity_key.into());
        self
    }

    /// Adds a reference to a field in another collection.
    #[must_use]
    pub fn with_reference(mut self, reference: FieldReference) -> Self {
        self.references.push(reference);
        self
    }

    /// Declares the field's element data type.
    #[must_use]
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Declares the field's maximum length.
    #[must_use]
    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    /// Coerces `value` to this field's declared type. Untyped fields pass
    /// the value through unchanged.
    #[must_use]
    pub fn cast(&self, value: &serde_json::Value) -> Option<serde_json::Value> {
        match self.data_type {
            Some(data_type) => data_type.coerce(value),
            None => (!value.is_null()).then(|| value.clone()),
        }
    }

    /// Sub-fields, for object and object-array fields.
    #[must_use]
    pub fn nested_fields(&self) -> Option<&[Field]> {
        self.variant.nested_fields()
    }

    /// Appends `(path, field)` pairs for this field and every nested field,
    /// in declaration order, prefixed by `prefix`.
    pub(crate) fn flatten_into<'a>(
        &'a self,
        prefix: Option<&FieldPath>,
        out: &mut Vec<(FieldPath, &'a Field)>,
    ) {
        let path = match prefix {
            Some(prefix) => prefix.appended(self.name.clone()),
            None => FieldPath::new([self.name.clone()]),
        };
        out.push((path.clone(), self));
        if let Some(fields) = self.nested_fields() {
            for nested in fields {
                nested.flatten_into(Some(&path), out);
            }
        }
    }
}

// ── Serde form ────────────────────────────────────────────────────

/// Wire shape of a field declaration: flat attributes, `data_type` as a
/// string (`"string"`, `"object_id[]"`, …) and nested object fields under
/// `fields`.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FieldSpec {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    data_categories: Vec<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    identity: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    references: Vec<FieldReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    length: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    fields: Vec<Field>,
}

impl TryFrom<FieldSpec> for Field {
    type Error = SchemaError;

    fn try_from(spec: FieldSpec) -> Result<Self, Self::Error> {
        let declared = spec
            .data_type
            .as_deref()
            .map(DataType::parse)
            .transpose()?;
        let (data_type, is_array) = match declared {
            Some((data_type, is_array)) => (Some(data_type), is_array),
            None => (None, false),
        };

        let has_nested = !spec.fields.is_empty();
        let element = if has_nested || data_type == Some(DataType::Object) {
            FieldVariant::Object { fields: spec.fields }
        } else {
            FieldVariant::Scalar
        };
        let variant = if is_array {
            FieldVariant::Array {
                element: Box::new(element),
            }
        } else {
            element
        };

        Ok(Self {
            name: spec.name,
            data_categories: spec.data_categories,
            primary_key: spec.primary_key,
            identity: spec.identity,
            references: spec.references,
            data_type: if has_nested && data_type.is_none() {
                Some(DataType::Object)
            } else {
                data_type
            },
            length: spec.length,
            variant,
        })
    }
}

impl From<Field> for FieldSpec {
    fn from(field: Field) -> Self {
        let is_array = field.variant.is_array();
        let data_type = field.data_type.map(|data_type| {
            if is_array {
                format!("{}[]", data_type.name())
            } else {
                data_type.name().to_string()
            }
        });
        let fields = match field.variant {
            FieldVariant::Object { fields } => fields,
            FieldVariant::Array { element } => match *element {
                FieldVariant::Object { fields } => fields,
                _ => Vec::new(),
            },
            FieldVariant::Scalar => Vec::new(),
        };
        Self {
            name: field.name,
            data_categories: field.data_categories,
            primary_key: field.primary_key,
            identity: field.identity,
            references: field.references,
            data_type,
            length: field.length,
            fields,
        }
    }
}
