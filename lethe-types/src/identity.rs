//! Seed identity data supplied by (or verified for) the data subject.
//!
//! An [`Identity`] is the set of values traversal starts from: each entry
//! maps an identity key (e.g. `email`) to the subject's value for it.
//! Keys are ordered so traversal seeding is deterministic.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Seed identity values keyed by identity name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(BTreeMap<String, Value>);

impl Identity {
    /// Creates an empty identity.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the subject's email address.
    #[must_use]
    pub fn with_email(self, email: impl Into<String>) -> Self {
        self.with_value("email", Value::String(email.into()))
    }

    /// Sets the subject's phone number.
    #[must_use]
    pub fn with_phone_number(self, phone: impl Into<String>) -> Self {
        self.with_value("phone_number", Value::String(phone.into()))
    }

    /// Sets an arbitrary identity value under `key`.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    /// Returns the value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether no identity values are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of identity values present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates identity entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Identity {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
