use serde::{Deserialize, Serialize};
use std::fmt;

/// A hierarchical data-category tag, e.g. `user.provided.identifiable.contact.email`.
///
/// Categories form a taxonomy through their dotted segments: a category
/// is an ancestor of every category it prefixes segment-wise. Rule
/// targets match fields tagged with the target category itself or any
/// descendant of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataCategory(String);

impl DataCategory {
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// The full dotted tag.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `candidate` is this category or one of its descendants.
    ///
    /// Matching is segment-wise: `user.provided` matches
    /// `user.provided.identifiable` but not `user.provided_extra`.
    #[must_use]
    pub fn matches(&self, candidate: &DataCategory) -> bool {
        if self.0 == candidate.0 {
            return true;
        }
        candidate
            .0
            .strip_prefix(&self.0)
            .is_some_and(|rest| rest.starts_with('.'))
    }

    /// Whether any tag in `tags` falls under this category.
    #[must_use]
    pub fn matches_any<'a, I>(&self, tags: I) -> bool
    where
        I: IntoIterator<Item = &'a DataCategory>,
    {
        tags.into_iter().any(|tag| self.matches(tag))
    }

    /// The parent category, if this is not a taxonomy root.
    #[must_use]
    pub fn parent(&self) -> Option<DataCategory> {
        self.0
            .rsplit_once('.')
            .map(|(prefix, _)| DataCategory(prefix.to_string()))
    }
}

impl From<&str> for DataCategory {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for DataCategory {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
