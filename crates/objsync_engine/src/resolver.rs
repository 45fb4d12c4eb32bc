//! Dependency resolution over the source store.
//!
//! Given a root record, the resolver walks owned children and outgoing
//! references on the **source** store and records everything that must
//! exist in the target for the root to be copied faithfully.
//!
//! ## Algorithm
//!
//! A single depth-first pass, memoized by a visited set:
//!
//! 1. A record already visited is skipped. This is the only cycle guard;
//!    `allow_cycles` does not change it.
//! 2. The record is added to the graph with its payload.
//! 3. With `skip_existing`, a record already present in the target is not
//!    descended into.
//! 4. Owned children (ownership table) are walked while the ownership depth
//!    is below `max_owned_depth`. Reference depth is carried unchanged.
//! 5. References (reference table) are walked while the reference depth is
//!    below `max_reference_depth`. Targets already in the target store become
//!    stubs; others are fetched from the source and walked with the
//!    reference depth incremented and the ownership depth reset to zero.
//!
//! Non-root records that are missing or unreadable degrade to stub nodes;
//! only a failure to read the root is an error.

use crate::cache::ExistenceCache;
use crate::cancel::CancellationToken;
use crate::config::DependencyConfig;
use crate::error::{EngineError, EngineResult};
use crate::graph::DependencyGraph;
use crate::schema::RelationshipRegistry;
use objsync_model::{EdgeKind, Kind, Record, RecordId, RecordStore};
use std::collections::HashSet;
use tracing::{debug, trace, warn};

/// Builds a [`DependencyGraph`] for a root record.
///
/// One resolver instance is not meant to be shared between threads; create
/// one per concurrent resolution.
pub struct DependencyResolver<'a, S: ?Sized, T: ?Sized> {
    source: &'a S,
    target: &'a T,
    registry: &'a RelationshipRegistry,
    cache: ExistenceCache,
    visited: HashSet<RecordId>,
    cancel: CancellationToken,
}

#[derive(Debug, Clone, Copy)]
struct Depth {
    owned: u32,
    reference: u32,
}

impl<'a, S, T> DependencyResolver<'a, S, T>
where
    S: RecordStore + ?Sized,
    T: RecordStore + ?Sized,
{
    /// Creates a resolver reading from `source` and checking existence in `target`.
    pub fn new(source: &'a S, target: &'a T, registry: &'a RelationshipRegistry) -> Self {
        Self {
            source,
            target,
            registry,
            cache: ExistenceCache::new(),
            visited: HashSet::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Attaches a cancellation token, checked before each node.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The existence cache of the last resolution.
    pub fn cache(&self) -> &ExistenceCache {
        &self.cache
    }

    /// Resolves the dependencies of `root`.
    ///
    /// A stub root is first read from the source store. The visited set and
    /// the existence cache are reset at the start of each call.
    ///
    /// # Errors
    ///
    /// - `RootUnreadable` if the root cannot be read
    /// - `Cancelled` if the token fires mid-walk
    /// - store errors from source reads or target existence checks
    pub fn resolve(
        &mut self,
        root: &Record,
        config: &DependencyConfig,
    ) -> EngineResult<DependencyGraph> {
        self.visited.clear();
        self.cache.clear();

        let root = if root.is_stub() {
            self.read_root(&root.id())?
        } else {
            root.clone()
        };

        let mut graph = DependencyGraph::new();
        self.visit(
            root,
            Depth {
                owned: 0,
                reference: 0,
            },
            config,
            &mut graph,
        )?;

        let stats = graph.stats();
        debug!(
            nodes = stats.nodes,
            stubs = stats.stubs,
            ownership_edges = stats.ownership_edges,
            reference_edges = stats.reference_edges,
            "dependency resolution finished"
        );
        Ok(graph)
    }

    /// Reads the root from the source store by ID and resolves it.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve).
    pub fn resolve_id(
        &mut self,
        id: &RecordId,
        config: &DependencyConfig,
    ) -> EngineResult<DependencyGraph> {
        let root = self.read_root(id)?;
        self.resolve(&root, config)
    }

    fn read_root(&self, id: &RecordId) -> EngineResult<Record> {
        match self.source.get_by_id(id) {
            Ok(Some(record)) if !record.is_stub() => Ok(record),
            Ok(Some(_)) => Err(EngineError::RootUnreadable {
                id: *id,
                message: "source returned a record without payload".into(),
            }),
            Ok(None) => Err(EngineError::RootUnreadable {
                id: *id,
                message: "not found in source".into(),
            }),
            Err(e) => Err(EngineError::RootUnreadable {
                id: *id,
                message: e.to_string(),
            }),
        }
    }

    fn visit(
        &mut self,
        record: Record,
        depth: Depth,
        config: &DependencyConfig,
        graph: &mut DependencyGraph,
    ) -> EngineResult<()> {
        self.cancel.check()?;

        let id = record.id();
        if !self.visited.insert(id) {
            return Ok(());
        }
        trace!(id = %id, kind = %record.kind(), owned = depth.owned, reference = depth.reference, "visiting");
        graph.add_object(record.clone());

        if config.skip_existing && self.cache.exists(self.target, &id)? {
            trace!(id = %id, "already in target, not descending");
            return Ok(());
        }

        if config.include_owned && depth.owned < config.max_owned_depth {
            self.visit_owned(&record, depth, config, graph)?;
        }

        if config.resolve_references && depth.reference < config.max_reference_depth {
            self.visit_references(&record, depth, config, graph)?;
        }

        Ok(())
    }

    fn visit_owned(
        &mut self,
        record: &Record,
        depth: Depth,
        config: &DependencyConfig,
        graph: &mut DependencyGraph,
    ) -> EngineResult<()> {
        let registry = self.registry;
        for rel in registry.owned(record.kind()) {
            if !config.accepts_owned(&rel.target_kind) {
                continue;
            }
            for child_id in record.referenced_ids(&rel.property) {
                graph.add_object(Record::stub(child_id, rel.target_kind.clone()));
                graph.add_dependency(child_id, record.id(), EdgeKind::Ownership);

                match self.source.get_by_id(&child_id) {
                    Ok(Some(child)) => {
                        let next = Depth {
                            owned: depth.owned + 1,
                            reference: depth.reference,
                        };
                        self.visit(child, next, config, graph)?;
                    }
                    Ok(None) => {
                        warn!(
                            id = %child_id,
                            owner = %record.id(),
                            property = %rel.property,
                            "owned record missing from source, keeping stub"
                        );
                    }
                    Err(e) => {
                        warn!(
                            id = %child_id,
                            owner = %record.id(),
                            error = %e,
                            "owned record unreadable, keeping stub"
                        );
                    }
                }
            }
        }
        Ok(())
    }

    fn visit_references(
        &mut self,
        record: &Record,
        depth: Depth,
        config: &DependencyConfig,
        graph: &mut DependencyGraph,
    ) -> EngineResult<()> {
        let registry = self.registry;
        for rel in registry.referenced(record.kind()) {
            if !config.accepts_reference(&rel.target_kind) {
                continue;
            }
            for ref_id in record.referenced_ids(&rel.property) {
                graph.add_object(Record::stub(ref_id, rel.target_kind.clone()));
                graph.add_dependency(record.id(), ref_id, EdgeKind::Reference);

                if self.cache.exists(self.target, &ref_id)? {
                    trace!(id = %ref_id, "reference satisfied by target, stub only");
                    continue;
                }

                match self.source.get_by_id(&ref_id) {
                    Ok(Some(target)) => {
                        let next = Depth {
                            owned: 0,
                            reference: depth.reference + 1,
                        };
                        self.visit(target, next, config, graph)?;
                    }
                    Ok(None) => {
                        warn!(
                            id = %ref_id,
                            referrer = %record.id(),
                            kind = %rel.target_kind,
                            "reference missing from both stores, keeping stub"
                        );
                    }
                    Err(e) => {
                        warn!(
                            id = %ref_id,
                            referrer = %record.id(),
                            error = %e,
                            "referenced record unreadable, keeping stub"
                        );
                    }
                }
            }
        }
        Ok(())
    }
}

/// Convenience wrapper: resolves `root` with a fresh resolver.
///
/// # Errors
///
/// Same as [`DependencyResolver::resolve`].
pub fn resolve<S, T>(
    source: &S,
    target: &T,
    registry: &RelationshipRegistry,
    root: &Record,
    config: &DependencyConfig,
) -> EngineResult<DependencyGraph>
where
    S: RecordStore + ?Sized,
    T: RecordStore + ?Sized,
{
    DependencyResolver::new(source, target, registry).resolve(root, config)
}

/// Returns the kinds a resolution may touch from `root_kind`, following the
/// registry tables breadth-first (ignoring depth limits and filters).
pub fn reachable_kinds(registry: &RelationshipRegistry, root_kind: &Kind) -> Vec<Kind> {
    let mut seen = vec![root_kind.clone()];
    let mut i = 0;
    while i < seen.len() {
        let kind = seen[i].clone();
        let related = registry
            .owned(&kind)
            .iter()
            .chain(registry.referenced(&kind))
            .map(|rel| rel.target_kind.clone())
            .collect::<Vec<_>>();
        for next in related {
            if !seen.contains(&next) {
                seen.push(next);
            }
        }
        i += 1;
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use objsync_model::Edge;
    use objsync_testkit::{LexiconBuilder, MemoryStore};

    fn id(name: &str) -> RecordId {
        RecordId::named(name)
    }

    #[test]
    fn leaf_record_yields_single_node() {
        let source = MemoryStore::new();
        let target = MemoryStore::new();
        let registry = RelationshipRegistry::lexicon();
        let form = Record::stub(id("form#1"), "MoForm").with_field("Form", "phika");
        source.insert(form.clone());

        let graph = resolve(&source, &target, &registry, &form, &DependencyConfig::new()).unwrap();
        assert_eq!(graph.len(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn unreadable_children_and_references_degrade_to_stubs() {
        let source = LexiconBuilder::new()
            .part_of_speech("noun", "Noun")
            .entry("dog", "dog")
            .sense("dog", "dog/s1", "dog")
            .sense("dog", "dog/s2", "hound")
            .set_part_of_speech("dog/s1", "noun")
            .build();
        source.fail_reads_of(id("dog/s2"));
        source.fail_reads_of(id("noun"));
        let target = MemoryStore::new();
        let registry = RelationshipRegistry::lexicon();
        let root = source.get(&id("dog")).unwrap();

        let graph = resolve(&source, &target, &registry, &root, &DependencyConfig::new()).unwrap();

        assert_eq!(graph.len(), 5);
        assert!(graph.node(&id("dog/s2")).unwrap().is_stub());
        assert!(graph.node(&id("noun")).unwrap().is_stub());
        assert!(!graph.node(&id("dog/s1")).unwrap().is_stub());
        assert!(graph.contains_edge(&Edge::new(id("dog/s1"), id("noun"), EdgeKind::Reference)));

        // The root itself still has to be readable.
        source.fail_reads_of(id("dog"));
        let err = DependencyResolver::new(&source, &target, &registry)
            .resolve_id(&id("dog"), &DependencyConfig::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::RootUnreadable { .. }));
    }

    #[test]
    fn existing_reference_becomes_stub() {
        let source = MemoryStore::new();
        let target = MemoryStore::new();
        let registry = RelationshipRegistry::lexicon();

        let main = Record::stub(id("main#1"), "LexEntry").with_field("CitationForm", "ku-");
        source.insert(main.clone());
        target.insert(main);
        source.insert(Record::stub(id("form#1"), "MoForm").with_field("Form", "phika"));
        let entry = Record::stub(id("entry#1"), "LexEntry")
            .with_field("LexemeForm", id("form#1"))
            .with_field("MainEntriesOrSenses", vec![id("main#1")]);
        source.insert(entry.clone());

        let graph = resolve(&source, &target, &registry, &entry, &DependencyConfig::new()).unwrap();

        assert_eq!(graph.len(), 3);
        assert!(graph.contains_edge(&Edge::ownership(id("form#1"), id("entry#1"))));
        assert!(graph.contains_edge(&Edge::reference(id("entry#1"), id("main#1"))));
        assert!(graph.node(&id("main#1")).unwrap().is_stub());
        assert_eq!(source.get_calls(&id("main#1")), 0);
    }

    #[test]
    fn stub_root_is_read_from_source() {
        let source = MemoryStore::new();
        let target = MemoryStore::new();
        let registry = RelationshipRegistry::lexicon();
        source.insert(Record::stub(id("form#1"), "MoForm").with_field("Form", "a"));

        let mut resolver = DependencyResolver::new(&source, &target, &registry);
        let graph = resolver
            .resolve(&Record::stub(id("form#1"), "MoForm"), &DependencyConfig::new())
            .unwrap();
        assert!(!graph.node(&id("form#1")).unwrap().is_stub());

        let err = resolver
            .resolve_id(&id("nope"), &DependencyConfig::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::RootUnreadable { .. }));
    }

    #[test]
    fn cancellation_stops_the_walk() {
        let (source, root) = LexiconBuilder::new().entry_with_senses("entry#1", "phika", 3);
        let target = MemoryStore::new();
        let registry = RelationshipRegistry::lexicon();
        let token = CancellationToken::new();
        token.cancel();

        let mut resolver =
            DependencyResolver::new(&source, &target, &registry).with_cancellation(token);
        let root = source.get(&root).unwrap();
        let err = resolver.resolve(&root, &DependencyConfig::new()).unwrap_err();
        assert!(matches!(err, EngineError::Cancelled));
    }

    #[test]
    fn reachable_kinds_follow_tables() {
        let registry = RelationshipRegistry::lexicon();
        let kinds = reachable_kinds(&registry, &Kind::from("LexSense"));
        assert_eq!(kinds[0], Kind::from("LexSense"));
        assert!(kinds.contains(&Kind::from("PartOfSpeech")));
        assert!(kinds.contains(&Kind::from("CmTranslation")));
        assert!(!kinds.contains(&Kind::from("LexEntry")));
    }
}
