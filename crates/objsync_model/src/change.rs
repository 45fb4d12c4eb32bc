//! Records of work performed (or attempted) against the target store.

use crate::id::{Kind, RecordId};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The three apply verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    /// A record was created in the target.
    Create,
    /// An existing target record had properties copied onto it.
    Update,
    /// A target record was deleted.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Create => f.write_str("create"),
            Operation::Update => f.write_str("update"),
            Operation::Delete => f.write_str("delete"),
        }
    }
}

/// A successful change applied to the target store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncChange {
    /// What was done.
    pub operation: Operation,
    /// Kind of the affected record.
    pub kind: Kind,
    /// ID of the affected record.
    pub id: RecordId,
    /// Free-form details (seed value, copied property count, parent, ...).
    pub details: BTreeMap<String, Value>,
}

impl SyncChange {
    /// Creates a change with no details.
    pub fn new(operation: Operation, kind: Kind, id: RecordId) -> Self {
        Self {
            operation,
            kind,
            id,
            details: BTreeMap::new(),
        }
    }

    /// Adds a detail entry.
    #[must_use]
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for SyncChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.operation, self.kind, self.id)
    }
}

/// A failed step of the apply phase.
///
/// Recorded per node; the batch continues after a `SyncError`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncError {
    /// The verb that failed.
    pub operation: Operation,
    /// The record involved, when known.
    pub id: Option<RecordId>,
    /// Human-readable failure description.
    pub message: String,
}

impl SyncError {
    /// Creates a sync error.
    pub fn new(operation: Operation, id: Option<RecordId>, message: impl Into<String>) -> Self {
        Self {
            operation,
            id,
            message: message.into(),
        }
    }
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{} {id} failed: {}", self.operation, self.message),
            None => write!(f, "{} failed: {}", self.operation, self.message),
        }
    }
}
