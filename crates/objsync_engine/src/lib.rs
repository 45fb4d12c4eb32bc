//! # objsync Engine
//!
//! Dependency resolution and apply engine for cross-store object sync.
//!
//! This crate provides:
//! - `DependencyGraph`, a typed graph of records with topological ordering
//!   and cycle detection
//! - `ExistenceCache`, memoized "is this already in the target?" checks
//! - `DependencyResolver`, which walks owned children and references on the
//!   source store
//! - `MergeOperations`, which creates, updates and deletes records in the
//!   target through per-kind accessors
//!
//! ## Architecture
//!
//! Syncing a record is a two-phase operation:
//! 1. **Resolve**: starting from a root record, collect everything the target
//!    needs (owned children, referenced records missing from the target)
//!    into a `DependencyGraph`
//! 2. **Apply**: walk the graph owners-first and create or update each node
//!    in the target, collecting a `SyncReport`
//!
//! ## Key Invariants
//!
//! - Records are copied with their source ID
//! - Records already in the target are never recreated
//! - Stub nodes are never written
//! - Apply is not transactional; partial progress is reported, not rolled back

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod cancel;
mod config;
mod error;
mod graph;
mod merge;
mod registry;
mod report;
mod resolver;
mod schema;

pub use cache::ExistenceCache;
pub use cancel::CancellationToken;
pub use config::{ApplyConfig, DeletePolicy, DependencyConfig};
pub use error::{EngineError, EngineResult};
pub use graph::{DependencyGraph, GraphStats, TopologicalOrder};
pub use merge::MergeOperations;
pub use registry::AccessorRegistry;
pub use report::SyncReport;
pub use resolver::{reachable_kinds, resolve, DependencyResolver};
pub use schema::{Multiplicity, Relationship, RelationshipRegistry, RelationshipTable};
