//! Status vocabularies for privacy requests and their audit trail.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a whole privacy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyRequestStatus {
    /// Accepted but not yet dispatched.
    Pending,
    /// Currently being executed.
    InProcessing,
    /// Waiting on external input (e.g. manual approval).
    Paused,
    /// Every reachable collection finished.
    Complete,
    /// At least one blocking collection failed after retries.
    Error,
}

impl PrivacyRequestStatus {
    /// Whether the request has reached a final state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Status of one collection's execution within a request.
///
/// Unreached collections (a parent returned no rows) are recorded as
/// `Skipped` so the audit trail covers the whole graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionLogStatus {
    Pending,
    InProcessing,
    Retrying,
    Complete,
    Skipped,
    Error,
}

impl ExecutionLogStatus {
    /// Whether this entry will receive no further transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Skipped | Self::Error)
    }
}

/// The action a request (and each rule within its policy) performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Retrieve the data subject's rows.
    Access,
    /// Mask policy-targeted fields in place.
    Erasure,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Erasure => write!(f, "erasure"),
        }
    }
}

impl FromStr for ActionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "access" => Ok(Self::Access),
            "erasure" => Ok(Self::Erasure),
            other => Err(Error::UnknownActionType(other.to_string())),
        }
    }
}
