//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use objsync_engine::DependencyGraph;
use objsync_model::{EdgeKind, Record, RecordId};
use objsync_testkit::{record_id, LexiconBuilder, MemoryStore};

/// Name of entry `i` in a generated lexicon.
pub fn entry_name(i: usize) -> String {
    format!("entry{i}")
}

/// A lexicon of `entries` entries with `senses` senses each.
///
/// Every sense points at one of `categories` parts of speech, and each entry
/// cross-references the next one, so references fan out across the whole
/// lexicon from any root.
pub fn wide_lexicon(entries: usize, senses: usize, categories: usize) -> MemoryStore {
    let mut builder = LexiconBuilder::new();
    for c in 0..categories.max(1) {
        builder = builder.part_of_speech(&format!("pos{c}"), &format!("Category {c}"));
    }
    for e in 0..entries {
        let entry = entry_name(e);
        builder = builder.entry(&entry, &format!("form{e}"));
        for s in 0..senses {
            let sense = format!("{entry}/sense{s}");
            builder = builder
                .sense(&entry, &sense, &format!("gloss {e}.{s}"))
                .set_part_of_speech(&sense, &format!("pos{}", (e + s) % categories.max(1)));
        }
    }
    for e in 1..entries {
        builder = builder.cross_reference(&entry_name(e - 1), &entry_name(e));
    }
    builder.build()
}

/// ID of entry `i`.
pub fn entry_id(i: usize) -> RecordId {
    record_id(&entry_name(i))
}

/// A synthetic graph: `owners` owners with `children` children each. Every
/// child and every owner references the next owner, so the owners form one
/// reference ring.
pub fn synthetic_graph(owners: usize, children: usize) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for o in 0..owners {
        let owner = record_id(&format!("owner{o}"));
        let next = record_id(&format!("owner{}", (o + 1) % owners));
        graph.add_object(Record::stub(owner, "LexEntry").with_field("CitationForm", "x"));
        graph.add_dependency(owner, next, EdgeKind::Reference);
        for c in 0..children {
            let child = record_id(&format!("owner{o}/child{c}"));
            graph.add_object(Record::stub(child, "LexSense").with_field("Gloss", "y"));
            graph.add_dependency(child, owner, EdgeKind::Ownership);
            graph.add_dependency(child, next, EdgeKind::Reference);
        }
    }
    graph
}
