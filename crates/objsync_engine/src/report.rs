//! Aggregate outcome of an apply batch.

use objsync_model::{Operation, RecordId, SyncChange, SyncError};
use serde::{Deserialize, Serialize};

/// Successes and failures of one apply batch.
///
/// The batch is not transactional: changes listed here were applied even
/// when `errors` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Changes applied (or planned, in dry-run mode).
    pub changes: Vec<SyncChange>,
    /// Per-node failures.
    pub errors: Vec<SyncError>,
    /// Nodes deliberately left alone (stubs, existing records with updates off).
    pub skipped: Vec<RecordId>,
    /// True if the batch stopped early on cancellation.
    pub cancelled: bool,
    /// True if nothing was written.
    pub dry_run: bool,
}

impl SyncReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if every attempted node succeeded and the batch ran to the end.
    pub fn is_success(&self) -> bool {
        self.errors.is_empty() && !self.cancelled
    }

    /// Number of create changes.
    pub fn created(&self) -> usize {
        self.count(Operation::Create)
    }

    /// Number of update changes.
    pub fn updated(&self) -> usize {
        self.count(Operation::Update)
    }

    /// Number of delete changes.
    pub fn deleted(&self) -> usize {
        self.count(Operation::Delete)
    }

    /// Returns the change recorded for `id`, if any.
    pub fn change_for(&self, id: &RecordId) -> Option<&SyncChange> {
        self.changes.iter().find(|c| c.id == *id)
    }

    /// Returns the error recorded for `id`, if any.
    pub fn error_for(&self, id: &RecordId) -> Option<&SyncError> {
        self.errors.iter().find(|e| e.id.as_ref() == Some(id))
    }

    /// One-line summary.
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} created, {} updated, {} deleted, {} skipped, {} failed",
            self.created(),
            self.updated(),
            self.deleted(),
            self.skipped.len(),
            self.errors.len()
        );
        if self.dry_run {
            line.push_str(" (dry run)");
        }
        if self.cancelled {
            line.push_str(" (cancelled)");
        }
        line
    }

    /// Appends another report's entries.
    pub fn merge(&mut self, other: SyncReport) {
        self.changes.extend(other.changes);
        self.errors.extend(other.errors);
        self.skipped.extend(other.skipped);
        self.cancelled |= other.cancelled;
        self.dry_run |= other.dry_run;
    }

    fn count(&self, operation: Operation) -> usize {
        self.changes
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }
}
