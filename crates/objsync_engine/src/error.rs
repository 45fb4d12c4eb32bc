//! Error types for the sync engine.

use objsync_model::{AccessorError, Kind, RecordId, StoreError};
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while resolving or applying a sync.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The target store rejects mutations.
    #[error("target store is not writable")]
    NotWritable,

    /// No accessor or relationship entry is registered for a kind.
    #[error("unknown record kind: {0}")]
    UnknownKind(Kind),

    /// The root record of a resolution could not be read.
    #[error("root record {id} could not be read: {message}")]
    RootUnreadable {
        /// Root record ID.
        id: RecordId,
        /// Failure description.
        message: String,
    },

    /// The accessor's create call failed.
    #[error("failed to create {kind}: {message}")]
    CreationFailed {
        /// Kind being created.
        kind: Kind,
        /// Failure description.
        message: String,
    },

    /// Copying properties onto an existing record failed.
    #[error("failed to update {id}: {message}")]
    UpdateFailed {
        /// Target record ID.
        id: RecordId,
        /// Failure description.
        message: String,
    },

    /// The accessor's delete call failed.
    #[error("failed to delete {id}: {message}")]
    DeletionFailed {
        /// Target record ID.
        id: RecordId,
        /// Failure description.
        message: String,
    },

    /// Deletion refused because other records still refer to the target.
    #[error("refusing to delete {id}: referenced by {} record(s)", referrers.len())]
    DeleteBlocked {
        /// Target record ID.
        id: RecordId,
        /// Records referring to the target.
        referrers: Vec<RecordId>,
    },

    /// A cycle prevents a total order over the graph.
    #[error("dependency cycle among {} record(s)", ids.len())]
    CycleDetected {
        /// Records that could not be ordered.
        ids: Vec<RecordId>,
    },

    /// The operation was cancelled.
    #[error("sync cancelled")]
    Cancelled,

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Accessor error.
    #[error("accessor error: {0}")]
    Accessor(#[from] AccessorError),
}

impl EngineError {
    /// Creates a `CreationFailed` error.
    pub fn creation_failed(kind: &Kind, message: impl Into<String>) -> Self {
        Self::CreationFailed {
            kind: kind.clone(),
            message: message.into(),
        }
    }

    /// Creates a `DeletionFailed` error.
    pub fn deletion_failed(id: RecordId, message: impl Into<String>) -> Self {
        Self::DeletionFailed {
            id,
            message: message.into(),
        }
    }

    /// Returns true if this error is fatal for the node it occurred on.
    ///
    /// Fatal errors are never retried; the apply phase records them and
    /// moves on to the next node.
    pub fn is_fatal(&self) -> bool {
        match self {
            EngineError::CreationFailed { .. }
            | EngineError::DeletionFailed { .. }
            | EngineError::DeleteBlocked { .. }
            | EngineError::NotWritable
            | EngineError::UnknownKind(_)
            | EngineError::RootUnreadable { .. }
            | EngineError::Cancelled => true,
            EngineError::Store(StoreError::Unavailable(_)) => false,
            EngineError::Accessor(AccessorError::Store(StoreError::Unavailable(_))) => false,
            EngineError::UpdateFailed { .. }
            | EngineError::CycleDetected { .. }
            | EngineError::Store(_)
            | EngineError::Accessor(_) => false,
        }
    }

    /// Returns true if this is a precondition error raised before any mutation.
    pub fn is_precondition(&self) -> bool {
        matches!(self, EngineError::NotWritable | EngineError::UnknownKind(_))
    }
}
