//! Lexicon fixtures.
//!
//! Record IDs are derived from names with [`record_id`], so tests can refer
//! to records by the name they were built with.

use crate::store::MemoryStore;
use objsync_model::{Kind, Record, RecordId, Value};

/// Deterministic ID for a fixture name.
pub fn record_id(name: &str) -> RecordId {
    RecordId::named(name)
}

/// Builds a lexicon in a [`MemoryStore`].
///
/// # Example
///
/// ```rust,ignore
/// let store = LexiconBuilder::new()
///     .part_of_speech("noun", "Noun")
///     .entry("dog", "dog")
///     .sense("dog", "dog/1", "canine")
///     .set_part_of_speech("dog/1", "noun")
///     .build();
/// ```
pub struct LexiconBuilder {
    store: MemoryStore,
}

impl LexiconBuilder {
    /// Starts an empty lexicon.
    pub fn new() -> Self {
        Self {
            store: MemoryStore::new(),
        }
    }

    /// Adds a part of speech.
    pub fn part_of_speech(self, name: &str, label: &str) -> Self {
        self.store.insert(
            Record::stub(record_id(name), "PartOfSpeech")
                .with_field("Name", label)
                .with_field("Abbreviation", label.chars().take(3).collect::<String>()),
        );
        self
    }

    /// Adds a semantic domain.
    pub fn semantic_domain(self, name: &str, label: &str) -> Self {
        self.store
            .insert(Record::stub(record_id(name), "CmSemanticDomain").with_field("Name", label));
        self
    }

    /// Adds an entry and its lexeme form (named `"{name}/form"`).
    pub fn entry(self, name: &str, form: &str) -> Self {
        let form_id = record_id(&format!("{name}/form"));
        self.store
            .insert(Record::stub(form_id, "MoForm").with_field("Form", form));
        self.store.insert(
            Record::stub(record_id(name), "LexEntry")
                .with_field("CitationForm", form)
                .with_field("LexemeForm", form_id),
        );
        self
    }

    /// Adds a sense to an entry.
    pub fn sense(self, entry: &str, name: &str, gloss: &str) -> Self {
        self.store.insert(
            Record::stub(record_id(name), "LexSense")
                .with_field("Gloss", Value::multi_text([("en", gloss)])),
        );
        self.append(entry, "Senses", name)
    }

    /// Points a sense at a part of speech.
    pub fn set_part_of_speech(self, sense: &str, pos: &str) -> Self {
        self.set(sense, "PartOfSpeech", Value::Ref(record_id(pos)))
    }

    /// Adds a semantic domain to a sense.
    pub fn add_semantic_domain(self, sense: &str, domain: &str) -> Self {
        self.append(sense, "SemanticDomains", domain)
    }

    /// Records `main` as a main entry of `entry`.
    pub fn cross_reference(self, entry: &str, main: &str) -> Self {
        self.append(entry, "MainEntriesOrSenses", main)
    }

    /// Adds a possibility list.
    pub fn possibility_list(self, name: &str, label: &str) -> Self {
        self.store
            .insert(Record::stub(record_id(name), "CmPossibilityList").with_field("Name", label));
        self
    }

    /// Adds a possibility under a list or under another possibility.
    pub fn possibility(self, owner: &str, name: &str, label: &str) -> Self {
        let property = match self.store.get(&record_id(owner)) {
            Some(record) if record.kind() == &Kind::from("CmPossibilityList") => "Possibilities",
            _ => "SubPossibilities",
        };
        self.store
            .insert(Record::stub(record_id(name), "CmPossibility").with_field("Name", label));
        self.append(owner, property, name)
    }

    /// Adds a usage type to a sense.
    pub fn add_usage_type(self, sense: &str, possibility: &str) -> Self {
        self.append(sense, "UsageTypes", possibility)
    }

    /// Adds an example sentence to a sense.
    pub fn example(self, sense: &str, name: &str, text: &str) -> Self {
        self.store
            .insert(Record::stub(record_id(name), "LexExampleSentence").with_field("Example", text));
        self.append(sense, "Examples", name)
    }

    /// The store being built.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Finishes and returns the store.
    pub fn build(self) -> MemoryStore {
        self.store
    }

    /// An entry with `senses` senses named `"{name}/sense{i}"`.
    pub fn entry_with_senses(self, name: &str, form: &str, senses: usize) -> (MemoryStore, RecordId) {
        let mut builder = self.entry(name, form);
        for i in 1..=senses {
            builder = builder.sense(name, &format!("{name}/sense{i}"), &format!("{form} {i}"));
        }
        (builder.build(), record_id(name))
    }

    fn set(self, owner: &str, property: &str, value: Value) -> Self {
        let record = self
            .store
            .get(&record_id(owner))
            .unwrap_or_else(|| panic!("fixture record {owner} not built yet"));
        self.store.insert(record.with_field(property, value));
        self
    }

    fn append(self, owner: &str, property: &str, target: &str) -> Self {
        let record = self
            .store
            .get(&record_id(owner))
            .unwrap_or_else(|| panic!("fixture record {owner} not built yet"));
        let mut ids = record.referenced_ids(property);
        ids.push(record_id(target));
        self.store.insert(record.with_field(property, ids));
        self
    }
}

impl Default for LexiconBuilder {
    fn default() -> Self {
        Self::new()
    }
}
