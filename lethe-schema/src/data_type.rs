//! Declared field data types and value coercion.
//!
//! Values arriving at a field (seed identities, or rows read from a parent
//! collection in a possibly different store) are coerced to the field's
//! declared type before being used in a filter. Coercion is total and
//! silent: a value that cannot be represented in the target type yields
//! `None` and is dropped from the candidate set rather than failing the
//! request.

use crate::{SchemaError, SchemaResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// The declared type of a scalar or element value.
///
/// Array-ness (`string[]`, `object[]`, …) is carried by the field variant,
/// not here, so coercion stays element-wise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Integer,
    Float,
    Boolean,
    ObjectId,
    Object,
}

impl DataType {
    /// Parses a declared type name, e.g. `"string"` or `"object_id[]"`.
    ///
    /// Returns the element type and whether the declaration was an array.
    pub fn parse(name: &str) -> SchemaResult<(Self, bool)> {
        let (base, is_array) = match name.strip_suffix("[]") {
            Some(base) => (base, true),
            None => (name, false),
        };
        let data_type = match base {
            "string" => Self::String,
            "integer" => Self::Integer,
            "float" => Self::Float,
            "boolean" => Self::Boolean,
            "object_id" => Self::ObjectId,
            "object" => Self::Object,
            _ => return Err(SchemaError::UnknownDataType(name.to_string())),
        };
        Ok((data_type, is_array))
    }

    /// The declared name of this type.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::ObjectId => "object_id",
            Self::Object => "object",
        }
    }

    /// Coerces `value` into this type, or `None` if it cannot be
    /// represented.
    ///
    /// Null never coerces: absent data stays absent.
    #[must_use]
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        if value.is_null() {
            return None;
        }
        match self {
            Self::String => coerce_string(value),
            Self::Integer => coerce_integer(value),
            Self::Float => coerce_float(value),
            Self::Boolean => coerce_boolean(value),
            Self::ObjectId => coerce_object_id(value),
            Self::Object => value.is_object().then(|| value.clone()),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

fn coerce_string(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) => Some(Value::String(s.clone())),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

fn coerce_integer(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(Value::from(i))
            } else {
                n.as_f64().map(|f| Value::from(f as i64))
            }
        }
        Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
        Value::Bool(b) => Some(Value::from(i64::from(*b))),
        _ => None,
    }
}

// Non-finite floats have no JSON representation and are dropped.
fn coerce_float(value: &Value) -> Option<Value> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()).map(Value::from),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::from),
        Value::Bool(b) => Some(Value::from(f64::from(u8::from(*b)))),
        _ => None,
    }
}

fn coerce_boolean(value: &Value) -> Option<Value> {
    match value {
        Value::Bool(b) => Some(Value::Bool(*b)),
        Value::String(s) => match s.as_str() {
            "True" | "true" => Some(Value::Bool(true)),
            "False" | "false" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

// Document-store object ids are kept as their 24-hex-digit string form.
fn coerce_object_id(value: &Value) -> Option<Value> {
    match value {
        Value::String(s) if s.len() == 24 && s.chars().all(|c| c.is_ascii_hexdigit()) => {
            Some(Value::String(s.clone()))
        }
        _ => None,
    }
}
