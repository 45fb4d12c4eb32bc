//! Property-based test generators using proptest.

use crate::fixtures::{record_id, LexiconBuilder};
use crate::store::MemoryStore;
use objsync_model::{Record, RecordId, Value};
use proptest::prelude::*;

/// The shape of a randomly generated lexicon.
#[derive(Debug, Clone)]
pub struct LexiconShape {
    /// Number of parts of speech.
    pub categories: usize,
    /// Per entry, per sense: the part of speech index, if any.
    pub senses: Vec<Vec<Option<usize>>>,
    /// `(entry, main entry)` cross-references, by entry index.
    pub cross_refs: Vec<(usize, usize)>,
}

impl LexiconShape {
    /// Name of entry `i`.
    pub fn entry_name(i: usize) -> String {
        format!("entry{i}")
    }

    /// ID of entry `i`.
    pub fn entry_id(i: usize) -> RecordId {
        record_id(&Self::entry_name(i))
    }

    /// Total number of records the shape builds.
    pub fn record_count(&self) -> usize {
        let senses: usize = self.senses.iter().map(Vec::len).sum();
        self.categories + self.senses.len() * 2 + senses
    }

    /// Builds the lexicon. Returns the store and the entry IDs.
    pub fn build(&self) -> (MemoryStore, Vec<RecordId>) {
        let mut builder = LexiconBuilder::new();
        for c in 0..self.categories {
            builder = builder.part_of_speech(&format!("pos{c}"), &format!("Category {c}"));
        }
        for (e, senses) in self.senses.iter().enumerate() {
            let entry = Self::entry_name(e);
            builder = builder.entry(&entry, &format!("form{e}"));
            for (s, category) in senses.iter().enumerate() {
                let sense = format!("{entry}/sense{s}");
                builder = builder.sense(&entry, &sense, &format!("gloss {e}.{s}"));
                if let Some(c) = category {
                    builder = builder.set_part_of_speech(&sense, &format!("pos{c}"));
                }
            }
        }
        for (from, to) in &self.cross_refs {
            builder = builder.cross_reference(&Self::entry_name(*from), &Self::entry_name(*to));
        }
        let ids = (0..self.senses.len()).map(Self::entry_id).collect();
        (builder.build(), ids)
    }
}

/// Strategy for lexicons of 1-5 entries with up to 4 senses each.
///
/// Cross-references may form cycles and self-references.
pub fn lexicon_shape_strategy() -> impl Strategy<Value = LexiconShape> {
    (0usize..4, 1usize..6).prop_flat_map(|(categories, entries)| {
        let category = if categories == 0 {
            Just(None).boxed()
        } else {
            prop::option::of(0..categories).boxed()
        };
        (
            prop::collection::vec(prop::collection::vec(category, 0..4), entries),
            prop::collection::vec((0..entries, 0..entries), 0..4),
        )
            .prop_map(move |(senses, cross_refs)| LexiconShape {
                categories,
                senses,
                cross_refs,
            })
    })
}

/// Strategy for record IDs.
pub fn record_id_strategy() -> impl Strategy<Value = RecordId> {
    any::<u128>().prop_map(|n| RecordId::from_uuid(uuid::Uuid::from_u128(n)))
}

/// Strategy for a standalone part of speech with a random name.
pub fn leaf_record_strategy() -> impl Strategy<Value = Record> {
    (
        record_id_strategy(),
        prop::string::string_regex("[a-z]{1,12}").expect("Invalid regex"),
    )
        .prop_map(|(id, name)| {
            Record::stub(id, "PartOfSpeech").with_field("Name", Value::from(name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn shapes_build_expected_record_count(shape in lexicon_shape_strategy()) {
            let (store, entries) = shape.build();
            prop_assert_eq!(store.len(), shape.record_count());
            prop_assert_eq!(entries.len(), shape.senses.len());
        }

        #[test]
        fn leaf_records_have_payload(record in leaf_record_strategy()) {
            prop_assert!(!record.is_stub());
            prop_assert!(record.field("Name").is_some());
        }
    }
}
