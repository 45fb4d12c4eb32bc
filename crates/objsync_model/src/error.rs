//! Error types for store and accessor collaborators.

use crate::id::{Kind, RecordId};
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type for accessor operations.
pub type AccessorResult<T> = Result<T, AccessorError>;

/// Errors reported by a record store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached or read.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A write was attempted on a read-only store.
    #[error("store is not writable")]
    NotWritable,

    /// The record does not exist.
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Stored data could not be interpreted.
    #[error("store corrupted: {0}")]
    Corrupted(String),
}

/// Errors reported by a per-kind accessor.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccessorError {
    /// The accessor has no getter/setter for this property.
    ///
    /// Partial overlap between accessor capability sets is normal; the
    /// engine skips such properties instead of failing.
    #[error("property {property} not supported on {kind}")]
    NotSupported {
        /// Accessor kind.
        kind: Kind,
        /// Requested property.
        property: String,
    },

    /// The accessor call itself failed.
    #[error("{0}")]
    Failed(String),

    /// The underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AccessorError {
    /// Creates a `NotSupported` error.
    pub fn not_supported(kind: &Kind, property: impl Into<String>) -> Self {
        Self::NotSupported {
            kind: kind.clone(),
            property: property.into(),
        }
    }

    /// Creates a `Failed` error.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Returns true if this is the "not supported" condition.
    pub fn is_not_supported(&self) -> bool {
        matches!(self, AccessorError::NotSupported { .. })
    }
}
