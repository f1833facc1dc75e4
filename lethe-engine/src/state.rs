//! Per-request execution bookkeeping and the audit trail.

use lethe_schema::CollectionAddress;
use lethe_types::{
    ActionType, AffectedField, ExecutionLogEntry, ExecutionLogStatus, PrivacyRequestId,
    PrivacyRequestStatus,
};
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;

type DispatchKey = (PrivacyRequestId, CollectionAddress, ActionType);

/// Dispatch ledger plus the append-only audit log for every request an
/// engine instance has run.
///
/// Dispatch is at-most-once per (request, collection, action): a key
/// already claimed as `InProcessing` or finished as `Complete` cannot be
/// claimed again, so resubmitting a request never double-executes a
/// collection. The log keeps one entry per transition, in the order the
/// transitions happened.
#[derive(Default)]
pub struct ExecutionState {
    statuses: Mutex<HashMap<DispatchKey, ExecutionLogStatus>>,
    log: Mutex<Vec<ExecutionLogEntry>>,
}

impl ExecutionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims a collection for dispatch. Returns `false` when the
    /// collection is already in flight or done for this request and
    /// action; the caller must not run it again.
    pub fn begin(
        &self,
        request_id: PrivacyRequestId,
        address: &CollectionAddress,
        action_type: ActionType,
    ) -> bool {
        let key = (request_id, address.clone(), action_type);
        let mut statuses = self.statuses.lock().unwrap();
        if matches!(
            statuses.get(&key),
            Some(ExecutionLogStatus::InProcessing | ExecutionLogStatus::Complete)
        ) {
            debug!(collection = %address, %action_type, "already dispatched; not re-dispatched");
            return false;
        }
        statuses.insert(key, ExecutionLogStatus::InProcessing);
        drop(statuses);
        self.append(ExecutionLogEntry::new(
            request_id,
            address.dataset.clone(),
            address.collection.clone(),
            action_type,
            ExecutionLogStatus::InProcessing,
        ));
        true
    }

    /// Records a retry attempt. The collection stays claimed.
    pub fn record_retrying(
        &self,
        request_id: PrivacyRequestId,
        address: &CollectionAddress,
        action_type: ActionType,
        message: impl Into<String>,
    ) {
        self.transition(request_id, address, action_type, ExecutionLogStatus::Retrying);
        self.append(
            ExecutionLogEntry::new(
                request_id,
                address.dataset.clone(),
                address.collection.clone(),
                action_type,
                ExecutionLogStatus::Retrying,
            )
            .with_message(message),
        );
    }

    /// Records successful completion, with the fields the action touched.
    pub fn record_complete(
        &self,
        request_id: PrivacyRequestId,
        address: &CollectionAddress,
        action_type: ActionType,
        fields_affected: Vec<AffectedField>,
        message: impl Into<String>,
    ) {
        self.transition(request_id, address, action_type, ExecutionLogStatus::Complete);
        self.append(
            ExecutionLogEntry::new(
                request_id,
                address.dataset.clone(),
                address.collection.clone(),
                action_type,
                ExecutionLogStatus::Complete,
            )
            .with_fields_affected(fields_affected)
            .with_message(message),
        );
    }

    /// Records terminal failure after retries were exhausted.
    pub fn record_error(
        &self,
        request_id: PrivacyRequestId,
        address: &CollectionAddress,
        action_type: ActionType,
        message: impl Into<String>,
    ) {
        self.transition(request_id, address, action_type, ExecutionLogStatus::Error);
        self.append(
            ExecutionLogEntry::new(
                request_id,
                address.dataset.clone(),
                address.collection.clone(),
                action_type,
                ExecutionLogStatus::Error,
            )
            .with_message(message),
        );
    }

    /// Records a collection that issued no queries: unreachable from the
    /// seeds, starved by an empty parent, or halted by a failed ancestor.
    pub fn record_skipped(
        &self,
        request_id: PrivacyRequestId,
        address: &CollectionAddress,
        action_type: ActionType,
        message: impl Into<String>,
    ) {
        self.transition(request_id, address, action_type, ExecutionLogStatus::Skipped);
        self.append(
            ExecutionLogEntry::new(
                request_id,
                address.dataset.clone(),
                address.collection.clone(),
                action_type,
                ExecutionLogStatus::Skipped,
            )
            .with_message(message),
        );
    }

    /// Latest recorded status for one collection, if any.
    #[must_use]
    pub fn status(
        &self,
        request_id: PrivacyRequestId,
        address: &CollectionAddress,
        action_type: ActionType,
    ) -> Option<ExecutionLogStatus> {
        let key = (request_id, address.clone(), action_type);
        self.statuses.lock().unwrap().get(&key).copied()
    }

    /// Every audit entry recorded for one request, oldest first.
    #[must_use]
    pub fn log_for(&self, request_id: PrivacyRequestId) -> Vec<ExecutionLogEntry> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.privacy_request_id == request_id)
            .cloned()
            .collect()
    }

    /// Overall outcome for one request: `Error` once any collection
    /// failed terminally, `Complete` otherwise.
    #[must_use]
    pub fn request_status(&self, request_id: PrivacyRequestId) -> PrivacyRequestStatus {
        let statuses = self.statuses.lock().unwrap();
        let failed = statuses
            .iter()
            .any(|((id, _, _), status)| *id == request_id && *status == ExecutionLogStatus::Error);
        if failed {
            PrivacyRequestStatus::Error
        } else {
            PrivacyRequestStatus::Complete
        }
    }

    fn transition(
        &self,
        request_id: PrivacyRequestId,
        address: &CollectionAddress,
        action_type: ActionType,
        status: ExecutionLogStatus,
    ) {
        let key = (request_id, address.clone(), action_type);
        self.statuses.lock().unwrap().insert(key, status);
    }

    fn append(&self, entry: ExecutionLogEntry) {
        self.log.lock().unwrap().push(entry);
    }
}
