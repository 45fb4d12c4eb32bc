//! Ownership and reference tables for the record model.
//!
//! The resolver has no schema introspection: which properties own children
//! and which point at independent records is declared here, per kind, and
//! must be kept in step with the record model by hand.

use objsync_model::Kind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a relationship property holds one record or many.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Multiplicity {
    /// Atomic property (`Value::Ref`).
    Single,
    /// Collection or sequence property (`Value::RefSeq`).
    Many,
}

/// One row of a relationship table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    /// Property on the declaring kind that holds the related IDs.
    pub property: String,
    /// Kind of the related records.
    pub target_kind: Kind,
    /// Single or many.
    pub multiplicity: Multiplicity,
}

impl Relationship {
    /// Creates a relationship row.
    pub fn new(
        property: impl Into<String>,
        target_kind: impl Into<Kind>,
        multiplicity: Multiplicity,
    ) -> Self {
        Self {
            property: property.into(),
            target_kind: target_kind.into(),
            multiplicity,
        }
    }
}

/// Maps each kind to an ordered list of relationship rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipTable {
    rows: HashMap<Kind, Vec<Relationship>>,
}

impl RelationshipTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a single-valued relationship.
    #[must_use]
    pub fn single(self, kind: &str, property: &str, target_kind: &str) -> Self {
        self.with(kind, Relationship::new(property, target_kind, Multiplicity::Single))
    }

    /// Declares a multi-valued relationship.
    #[must_use]
    pub fn many(self, kind: &str, property: &str, target_kind: &str) -> Self {
        self.with(kind, Relationship::new(property, target_kind, Multiplicity::Many))
    }

    /// Appends a row for `kind`.
    #[must_use]
    pub fn with(mut self, kind: impl Into<Kind>, relationship: Relationship) -> Self {
        self.insert(kind, relationship);
        self
    }

    /// Appends a row for `kind`.
    pub fn insert(&mut self, kind: impl Into<Kind>, relationship: Relationship) {
        self.rows.entry(kind.into()).or_default().push(relationship);
    }

    /// Returns the rows for `kind` (empty for undeclared kinds).
    pub fn get(&self, kind: &Kind) -> &[Relationship] {
        self.rows.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Returns true if any rows are declared for `kind`.
    pub fn contains(&self, kind: &Kind) -> bool {
        self.rows.contains_key(kind)
    }

    /// Iterates the declared kinds.
    pub fn kinds(&self) -> impl Iterator<Item = &Kind> {
        self.rows.keys()
    }

    /// Total number of rows.
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    /// Returns true if no rows are declared.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The pair of tables the resolver walks: ownership and reference.
///
/// Injected into the resolver so it can be swapped per object-model version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipRegistry {
    /// Owning properties per kind.
    pub ownership: RelationshipTable,
    /// Referencing properties per kind.
    pub references: RelationshipTable,
}

impl RelationshipRegistry {
    /// Creates a registry from explicit tables.
    pub fn new(ownership: RelationshipTable, references: RelationshipTable) -> Self {
        Self {
            ownership,
            references,
        }
    }

    /// Owned-child rows for `kind`.
    pub fn owned(&self, kind: &Kind) -> &[Relationship] {
        self.ownership.get(kind)
    }

    /// Reference rows for `kind`.
    pub fn referenced(&self, kind: &Kind) -> &[Relationship] {
        self.references.get(kind)
    }

    /// Tables for the built-in lexical model.
    pub fn lexicon() -> Self {
        let ownership = RelationshipTable::new()
            .single("LexEntry", "LexemeForm", "MoForm")
            .many("LexEntry", "AlternateForms", "MoForm")
            .many("LexEntry", "Senses", "LexSense")
            .many("LexEntry", "Pronunciations", "LexPronunciation")
            .many("LexEntry", "Etymology", "LexEtymology")
            .many("LexSense", "Senses", "LexSense")
            .many("LexSense", "Examples", "LexExampleSentence")
            .many("LexSense", "Pictures", "CmPicture")
            .many("LexExampleSentence", "Translations", "CmTranslation")
            .many("CmPossibilityList", "Possibilities", "CmPossibility")
            .many("CmPossibility", "SubPossibilities", "CmPossibility")
            .many("PartOfSpeech", "SubPossibilities", "PartOfSpeech");

        let references = RelationshipTable::new()
            .many("LexEntry", "MainEntriesOrSenses", "LexEntry")
            .single("LexSense", "PartOfSpeech", "PartOfSpeech")
            .many("LexSense", "SemanticDomains", "CmSemanticDomain")
            .many("LexSense", "UsageTypes", "CmPossibility")
            .single("MoForm", "MorphType", "MoMorphType")
            .many("CmSemanticDomain", "RelatedDomains", "CmSemanticDomain");

        Self::new(ownership, references)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_keep_declaration_order() {
        let registry = RelationshipRegistry::lexicon();
        let rows = registry.owned(&Kind::from("LexEntry"));
        let props: Vec<_> = rows.iter().map(|r| r.property.as_str()).collect();
        assert_eq!(
            props,
            vec!["LexemeForm", "AlternateForms", "Senses", "Pronunciations", "Etymology"]
        );
        assert_eq!(rows[0].multiplicity, Multiplicity::Single);
        assert_eq!(rows[2].target_kind, Kind::from("LexSense"));
    }

    #[test]
    fn undeclared_kinds_are_empty() {
        let registry = RelationshipRegistry::lexicon();
        assert!(registry.owned(&Kind::from("MoForm")).is_empty());
        assert!(registry.referenced(&Kind::from("CmTranslation")).is_empty());
        assert!(!registry.ownership.contains(&Kind::from("MoForm")));
    }

    #[test]
    fn custom_tables() {
        let ownership = RelationshipTable::new().many("Folder", "Children", "Folder");
        let references = RelationshipTable::new().single("Folder", "Icon", "Image");
        let registry = RelationshipRegistry::new(ownership, references);

        assert_eq!(registry.ownership.len(), 1);
        assert_eq!(registry.referenced(&Kind::from("Folder"))[0].property, "Icon");
        assert!(RelationshipTable::new().is_empty());
    }
}
