//! Records and the edges between them.

use crate::id::{Kind, RecordId};
use crate::value::{Fields, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A reference to a single object in a store.
///
/// A record either carries a payload (a snapshot of its properties as read
/// from the store that produced it) or is a *stub*, known only by ID and
/// kind. The sync engine never mutates a record it read from the source
/// store; writes to the target go through the kind's accessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    kind: Kind,
    payload: Option<Fields>,
}

impl Record {
    /// Creates a record with a payload.
    pub fn new(id: RecordId, kind: impl Into<Kind>, fields: Fields) -> Self {
        Self {
            id,
            kind: kind.into(),
            payload: Some(fields),
        }
    }

    /// Creates a stub record (ID and kind only).
    pub fn stub(id: RecordId, kind: impl Into<Kind>) -> Self {
        Self {
            id,
            kind: kind.into(),
            payload: None,
        }
    }

    /// Sets a field, turning a stub into a record with a payload.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload
            .get_or_insert_with(Fields::new)
            .insert(name.into(), value.into());
        self
    }

    /// Returns the record ID.
    #[inline]
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Returns the record kind.
    #[inline]
    pub fn kind(&self) -> &Kind {
        &self.kind
    }

    /// Returns the payload, or `None` for a stub.
    pub fn payload(&self) -> Option<&Fields> {
        self.payload.as_ref()
    }

    /// Consumes the record and returns its payload.
    pub fn into_payload(self) -> Option<Fields> {
        self.payload
    }

    /// Returns true if this record has no payload.
    pub fn is_stub(&self) -> bool {
        self.payload.is_none()
    }

    /// Returns a field value from the payload.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.as_ref().and_then(|fields| fields.get(name))
    }

    /// Returns the record IDs held by a reference-valued field.
    ///
    /// Missing fields, stubs and non-reference values yield an empty list.
    pub fn referenced_ids(&self, property: &str) -> Vec<RecordId> {
        self.field(property)
            .map(Value::referenced_ids)
            .unwrap_or_default()
    }
}

/// The two relationship kinds between records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EdgeKind {
    /// `from` exists only as a child of `to`; deleting `to` deletes `from`.
    Ownership,
    /// `from` points at `to` without controlling its lifetime.
    Reference,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Ownership => f.write_str("OWNERSHIP"),
            EdgeKind::Reference => f.write_str("REFERENCE"),
        }
    }
}

/// A directed, typed relationship between two records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    /// Source of the edge (the child for ownership, the referrer for references).
    pub from: RecordId,
    /// Destination of the edge (the owner, or the referenced record).
    pub to: RecordId,
    /// Relationship kind.
    pub kind: EdgeKind,
}

impl Edge {
    /// Creates an edge.
    pub fn new(from: RecordId, to: RecordId, kind: EdgeKind) -> Self {
        Self { from, to, kind }
    }

    /// Creates an ownership edge `child -> owner`.
    pub fn ownership(child: RecordId, owner: RecordId) -> Self {
        Self::new(child, owner, EdgeKind::Ownership)
    }

    /// Creates a reference edge `referrer -> referenced`.
    pub fn reference(referrer: RecordId, referenced: RecordId) -> Self {
        Self::new(referrer, referenced, EdgeKind::Reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_and_payload() {
        let id = RecordId::named("entry#1");
        let stub = Record::stub(id, "LexEntry");
        assert!(stub.is_stub());
        assert!(stub.field("LexemeForm").is_none());

        let full = stub.with_field("CitationForm", "kuphika");
        assert!(!full.is_stub());
        assert_eq!(full.field("CitationForm"), Some(&Value::from("kuphika")));
        assert_eq!(full.kind(), &Kind::from("LexEntry"));
    }

    #[test]
    fn referenced_ids_from_fields() {
        let s1 = RecordId::named("sense#1");
        let s2 = RecordId::named("sense#2");
        let form = RecordId::named("form#1");

        let entry = Record::stub(RecordId::named("entry#1"), "LexEntry")
            .with_field("Senses", vec![s1, s2])
            .with_field("LexemeForm", form)
            .with_field("CitationForm", "kuphika");

        assert_eq!(entry.referenced_ids("Senses"), vec![s1, s2]);
        assert_eq!(entry.referenced_ids("LexemeForm"), vec![form]);
        assert!(entry.referenced_ids("CitationForm").is_empty());
        assert!(entry.referenced_ids("Missing").is_empty());
    }

    #[test]
    fn edge_constructors() {
        let child = RecordId::named("form#1");
        let owner = RecordId::named("entry#1");

        let e = Edge::ownership(child, owner);
        assert_eq!(e.from, child);
        assert_eq!(e.to, owner);
        assert_eq!(e.kind, EdgeKind::Ownership);
        assert_ne!(e, Edge::reference(child, owner));
        assert_eq!(EdgeKind::Reference.to_string(), "REFERENCE");
    }
}
