//! Per-kind accessor contract and capability declarations.

use crate::error::AccessorResult;
use crate::id::{Kind, RecordId};
use crate::record::Record;
use crate::value::{Fields, Value};

/// Default name of the property used to seed a newly created record.
pub const DEFAULT_SEED_PROPERTY: &str = "Form";

/// The explicit set of property names an accessor can read and write.
///
/// Accessors declare their capabilities up front so the engine can ask
/// `supports(name)` instead of probing for optional getters at call time.
/// Declaration order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    names: Vec<String>,
}

impl PropertySet {
    /// Creates an empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a property name. Duplicates are ignored.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>) -> Self {
        self.insert(name);
        self
    }

    /// Adds a property name. Returns false if it was already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.supports(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    /// Returns true if the property is in the set.
    pub fn supports(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Iterates property names in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Returns the number of properties.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for PropertySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = PropertySet::new();
        for name in iter {
            set.insert(name);
        }
        set
    }
}

/// Strategy object exposing create/read/update/delete for one record kind.
///
/// An accessor is bound to one store: the engine uses a source-side
/// accessor to read a record and a target-side accessor of the same kind to
/// write its copy.
pub trait Accessor {
    /// The kind this accessor handles.
    fn kind(&self) -> &Kind;

    /// Properties this accessor can get and set.
    fn capabilities(&self) -> &PropertySet;

    /// Property whose value seeds `create` (typically the form or name).
    fn seed_property(&self) -> &str {
        DEFAULT_SEED_PROPERTY
    }

    /// Returns true if `create` needs an owning parent (e.g. a form owned
    /// by an entry).
    fn requires_parent(&self) -> bool {
        false
    }

    /// Creates a record in this accessor's store.
    ///
    /// `id` is the identifier the new record should carry, so that source
    /// and target copies stay correlated. `parent` is only passed for kinds
    /// that [require](Accessor::requires_parent) one.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be created.
    fn create(&self, id: RecordId, parent: Option<&Record>, seed: &Value)
        -> AccessorResult<Record>;

    /// Returns the syncable properties of a record with their current values.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be read.
    fn syncable_properties(&self, record: &Record) -> AccessorResult<Fields>;

    /// Reads one property.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` for properties outside [`capabilities`](Accessor::capabilities).
    fn get_property(&self, record: &Record, name: &str) -> AccessorResult<Value>;

    /// Writes one property.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` for properties outside [`capabilities`](Accessor::capabilities).
    fn set_property(&self, record: &Record, name: &str, value: Value) -> AccessorResult<()>;

    /// Deletes a record (and, per store semantics, everything it owns).
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn delete(&self, record: &Record) -> AccessorResult<()>;

    /// Returns the records that reference `record`, or `None` if this
    /// accessor does not support referring-object lookup.
    fn referring_objects(&self, _record: &Record) -> Option<AccessorResult<Vec<Record>>> {
        None
    }
}

impl<A: Accessor + ?Sized> Accessor for std::sync::Arc<A> {
    fn kind(&self) -> &Kind {
        (**self).kind()
    }

    fn capabilities(&self) -> &PropertySet {
        (**self).capabilities()
    }

    fn seed_property(&self) -> &str {
        (**self).seed_property()
    }

    fn requires_parent(&self) -> bool {
        (**self).requires_parent()
    }

    fn create(
        &self,
        id: RecordId,
        parent: Option<&Record>,
        seed: &Value,
    ) -> AccessorResult<Record> {
        (**self).create(id, parent, seed)
    }

    fn syncable_properties(&self, record: &Record) -> AccessorResult<Fields> {
        (**self).syncable_properties(record)
    }

    fn get_property(&self, record: &Record, name: &str) -> AccessorResult<Value> {
        (**self).get_property(record, name)
    }

    fn set_property(&self, record: &Record, name: &str, value: Value) -> AccessorResult<()> {
        (**self).set_property(record, name, value)
    }

    fn delete(&self, record: &Record) -> AccessorResult<()> {
        (**self).delete(record)
    }

    fn referring_objects(&self, record: &Record) -> Option<AccessorResult<Vec<Record>>> {
        (**self).referring_objects(record)
    }
}
