//! Privacy request metadata and the per-collection audit trail.
//!
//! A [`PrivacyRequest`] is the unit of work: one data subject, one policy,
//! one action. [`ExecutionLogEntry`] records what happened at each
//! collection while the request ran — the caller persists these however it
//! likes; the engine only produces them.

use crate::{ActionType, ExecutionLogId, ExecutionLogStatus, Identity, PrivacyRequestId, PrivacyRequestStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One data-subject request (access or erasure).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyRequest {
    /// Unique identifier for this request.
    pub id: PrivacyRequestId,

    /// Caller-assigned correlation id, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,

    /// Seed identity values for traversal.
    pub identity: Identity,

    /// Current lifecycle status.
    pub status: PrivacyRequestStatus,

    /// When the request was received.
    pub requested_at: DateTime<Utc>,
}

impl PrivacyRequest {
    /// Creates a new pending request for the given identity.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            id: PrivacyRequestId::new(),
            external_id: None,
            identity,
            status: PrivacyRequestStatus::Pending,
            requested_at: Utc::now(),
        }
    }

    /// Attaches a caller-assigned correlation id.
    #[must_use]
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }
}

/// A field touched by an erasure, as recorded in the audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffectedField {
    /// Fully-qualified path, `dataset:collection:field.path`.
    pub path: String,
    /// The field's name within its collection.
    pub field_name: String,
    /// Data category tags carried by the field.
    pub data_categories: Vec<String>,
}

/// One audit-trail entry: what happened at one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLogEntry {
    /// Unique identifier for this entry.
    pub id: ExecutionLogId,

    /// The request this entry belongs to.
    pub privacy_request_id: PrivacyRequestId,

    /// Dataset key of the collection executed.
    pub dataset_name: String,

    /// Name of the collection executed.
    pub collection_name: String,

    /// Fields affected by the action, if any.
    #[serde(default)]
    pub fields_affected: Vec<AffectedField>,

    /// Operator-facing detail, e.g. the connector error on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// The action this entry describes.
    pub action_type: ActionType,

    /// Outcome (or in-flight state) for this collection.
    pub status: ExecutionLogStatus,

    /// When this entry was recorded.
    pub updated_at: DateTime<Utc>,
}

impl ExecutionLogEntry {
    /// Creates a new entry for `collection` within `dataset`.
    #[must_use]
    pub fn new(
        privacy_request_id: PrivacyRequestId,
        dataset_name: impl Into<String>,
        collection_name: impl Into<String>,
        action_type: ActionType,
        status: ExecutionLogStatus,
    ) -> Self {
        Self {
            id: ExecutionLogId::new(),
            privacy_request_id,
            dataset_name: dataset_name.into(),
            collection_name: collection_name.into(),
            fields_affected: Vec::new(),
            message: None,
            action_type,
            status,
            updated_at: Utc::now(),
        }
    }

    /// Attaches an operator-facing message.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attaches the affected-field list.
    #[must_use]
    pub fn with_fields_affected(mut self, fields: Vec<AffectedField>) -> Self {
        self.fields_affected = fields;
        self
    }
}
