//! Record store contract.

use crate::error::StoreResult;
use crate::id::RecordId;
use crate::record::Record;
use std::sync::Arc;

/// A structured-object store, used as either the sync source or target.
///
/// The sync engine never implements storage; it only orchestrates calls to
/// a store. Each call is assumed to be individually atomic. Mutations are
/// performed through per-kind [`Accessor`](crate::Accessor)s bound to the
/// store, not through this trait.
///
/// # Invariants
///
/// - `exists(id)` is true iff `get_by_id(id)` returns `Some`
/// - A record returned by `get_by_id` carries a payload
pub trait RecordStore {
    /// Returns true if a record with this ID exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    fn exists(&self, id: &RecordId) -> StoreResult<bool>;

    /// Reads a record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried. A missing record is
    /// `Ok(None)`, not an error.
    fn get_by_id(&self, id: &RecordId) -> StoreResult<Option<Record>>;

    /// Returns true if the store accepts mutations.
    fn is_writable(&self) -> bool;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn exists(&self, id: &RecordId) -> StoreResult<bool> {
        (**self).exists(id)
    }

    fn get_by_id(&self, id: &RecordId) -> StoreResult<Option<Record>> {
        (**self).get_by_id(id)
    }

    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Arc<S> {
    fn exists(&self, id: &RecordId) -> StoreResult<bool> {
        (**self).exists(id)
    }

    fn get_by_id(&self, id: &RecordId) -> StoreResult<Option<Record>> {
        (**self).get_by_id(id)
    }

    fn is_writable(&self) -> bool {
        (**self).is_writable()
    }
}
