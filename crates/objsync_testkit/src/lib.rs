//! # objsync Testkit
//!
//! Test utilities for objsync.
//!
//! This crate provides:
//! - `MemoryStore`, an in-memory record store with call counters,
//!   failure switches and JSON snapshots
//! - `FieldAccessor`, a configurable accessor over a `MemoryStore`, and
//!   the lexicon accessor set
//! - `LexiconBuilder` fixtures
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust,ignore
//! use objsync_testkit::prelude::*;
//!
//! #[test]
//! fn test_with_lexicon() {
//!     let (source, root) = LexiconBuilder::new().entry_with_senses("dog", "dog", 2);
//!     let target = MemoryStore::new();
//!     // ... resolve and apply
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod accessor;
pub mod fixtures;
pub mod generators;
pub mod store;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::accessor::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_test_logging;
    pub use crate::store::*;
}

pub use accessor::*;
pub use fixtures::*;
pub use generators::*;
pub use store::*;

use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber, once per process.
///
/// The level comes from `RUST_LOG` and defaults to `warn`.
pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
