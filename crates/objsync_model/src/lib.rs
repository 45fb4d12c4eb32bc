//! # objsync Model
//!
//! Record model and collaborator contracts for cross-store object sync.
//!
//! This crate provides:
//! - `RecordId` and `Kind` identifiers
//! - `Record`, `Value` and typed `Edge`s
//! - `SyncChange` / `SyncError` report records
//! - The `RecordStore` and `Accessor` traits implemented by stores
//!
//! This is a pure model crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod accessor;
mod change;
mod error;
mod id;
mod record;
mod store;
mod value;

pub use accessor::{Accessor, PropertySet, DEFAULT_SEED_PROPERTY};
pub use change::{Operation, SyncChange, SyncError};
pub use error::{AccessorError, AccessorResult, StoreError, StoreResult};
pub use id::{Kind, RecordId};
pub use record::{Edge, EdgeKind, Record};
pub use store::RecordStore;
pub use value::{Fields, Value};
