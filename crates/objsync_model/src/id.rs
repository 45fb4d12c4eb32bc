//! Record identifiers and kind tags.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// A globally unique, immutable record identifier.
///
/// Identifiers are shared between the source and target stores: a record
/// copied into the target keeps the identifier it had in the source, which
/// is what makes existence checks across stores meaningful.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    /// Creates a new random record ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a record ID from a UUID.
    #[inline]
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Creates a deterministic record ID derived from a name.
    ///
    /// The same name always yields the same ID, which keeps fixtures and
    /// test scenarios readable (`RecordId::named("entry#1")`).
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }

    /// Parses a record ID from its hyphenated UUID form.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RecordId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The kind tag of a record (`LexEntry`, `LexSense`, `MoForm`, ...).
///
/// The kind selects both the accessor used to read and write the record and
/// the rows of the relationship tables that describe its owned children and
/// outgoing references.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Kind(String);

impl Kind {
    /// Placeholder kind for graph nodes created implicitly by an edge
    /// whose endpoint was never added as an object.
    pub const UNRESOLVED: &'static str = "<unresolved>";

    /// Creates a kind tag.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the unresolved placeholder kind.
    pub fn unresolved() -> Self {
        Self(Self::UNRESOLVED.to_string())
    }

    /// Returns true if this is the unresolved placeholder kind.
    pub fn is_unresolved(&self) -> bool {
        self.0 == Self::UNRESOLVED
    }

    /// Returns the kind name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Kind {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for Kind {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for Kind {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Kind {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Kind {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Kind {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl fmt::Debug for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kind({})", self.0)
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn named_ids_are_deterministic() {
        assert_eq!(RecordId::named("entry#1"), RecordId::named("entry#1"));
        assert_ne!(RecordId::named("entry#1"), RecordId::named("entry#2"));
    }

    #[test]
    fn random_ids_are_unique() {
        assert_ne!(RecordId::new(), RecordId::new());
    }

    #[test]
    fn parse_display_agree() {
        let id = RecordId::named("sense#7");
        assert_eq!(RecordId::parse(&id.to_string()), Some(id));
        assert_eq!(RecordId::parse("not-a-uuid"), None);
    }

    #[test]
    fn kind_lookup_by_str() {
        let mut map = HashMap::new();
        map.insert(Kind::from("LexEntry"), 1);
        assert_eq!(map.get("LexEntry"), Some(&1));
        assert!(Kind::unresolved().is_unresolved());
        assert!(!Kind::from("LexEntry").is_unresolved());
    }

    #[test]
    fn serializes_transparently() {
        let kind = Kind::from("MoForm");
        assert_eq!(serde_json::to_string(&kind).unwrap(), "\"MoForm\"");

        let id = RecordId::named("form#1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
