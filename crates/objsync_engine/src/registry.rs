//! Accessor lookup by kind.

use crate::error::{EngineError, EngineResult};
use objsync_model::{Accessor, Kind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// The per-kind accessors bound to one store.
#[derive(Clone, Default)]
pub struct AccessorRegistry {
    accessors: HashMap<Kind, Arc<dyn Accessor>>,
}

impl AccessorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an accessor under its own kind, replacing any previous one.
    pub fn register(&mut self, accessor: Arc<dyn Accessor>) {
        self.accessors.insert(accessor.kind().clone(), accessor);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, accessor: Arc<dyn Accessor>) -> Self {
        self.register(accessor);
        self
    }

    /// Looks up the accessor for `kind`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKind` if none is registered.
    pub fn get(&self, kind: &Kind) -> EngineResult<&dyn Accessor> {
        self.accessors
            .get(kind)
            .map(|a| a.as_ref())
            .ok_or_else(|| EngineError::UnknownKind(kind.clone()))
    }

    /// Returns true if an accessor is registered for `kind`.
    pub fn contains(&self, kind: &Kind) -> bool {
        self.accessors.contains_key(kind)
    }

    /// Registered kinds.
    pub fn kinds(&self) -> impl Iterator<Item = &Kind> {
        self.accessors.keys()
    }

    /// Number of registered accessors.
    pub fn len(&self) -> usize {
        self.accessors.len()
    }

    /// Returns true if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.accessors.is_empty()
    }
}

impl FromIterator<Arc<dyn Accessor>> for AccessorRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Accessor>>>(iter: I) -> Self {
        let mut registry = AccessorRegistry::new();
        for accessor in iter {
            registry.register(accessor);
        }
        registry
    }
}

impl fmt::Debug for AccessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.accessors.keys().map(Kind::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("AccessorRegistry").field("kinds", &kinds).finish()
    }
}
