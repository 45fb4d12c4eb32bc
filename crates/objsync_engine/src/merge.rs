//! The apply engine: create, update and delete against the target store.
//!
//! `MergeOperations` copies records into the target through per-kind
//! accessors. Single-record verbs (`create_object`, `update_object`,
//! `delete_object`) can be used directly; `apply_graph` walks a resolved
//! [`DependencyGraph`] owners-first and applies every node.
//!
//! The apply phase is **not transactional**: a failure on one node is
//! recorded as a [`SyncError`] and earlier successful operations stay in
//! place.

use crate::cancel::CancellationToken;
use crate::config::{ApplyConfig, DeletePolicy};
use crate::error::{EngineError, EngineResult};
use crate::graph::DependencyGraph;
use crate::registry::AccessorRegistry;
use crate::report::SyncReport;
use objsync_model::{
    Accessor, EdgeKind, Operation, Record, RecordId, RecordStore, SyncChange, SyncError, Value,
};
use std::collections::HashMap;
use tracing::{debug, info, trace, warn};

/// Applies changes to one target store.
pub struct MergeOperations<'a, T: ?Sized> {
    target: &'a T,
    config: ApplyConfig,
    cancel: CancellationToken,
}

/// Result of a successful create, before it is turned into a change record.
struct Created {
    record: Record,
    seed: Value,
    copied: Option<usize>,
}

impl<'a, T: RecordStore + ?Sized> MergeOperations<'a, T> {
    /// Creates an apply engine for `target`.
    ///
    /// # Errors
    ///
    /// Returns `NotWritable` if the target rejects mutations.
    pub fn new(target: &'a T) -> EngineResult<Self> {
        if !target.is_writable() {
            return Err(EngineError::NotWritable);
        }
        Ok(Self {
            target,
            config: ApplyConfig::default(),
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the apply configuration.
    pub fn with_config(mut self, config: ApplyConfig) -> Self {
        self.config = config;
        self
    }

    /// Attaches a cancellation token, checked before each node of a batch.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// The apply configuration.
    pub fn config(&self) -> &ApplyConfig {
        &self.config
    }

    /// Copies every syncable property of `source_record` onto `target_record`.
    ///
    /// Properties either accessor does not support are skipped silently.
    /// Returns true if the copy completed without an accessor failure, even
    /// when nothing was copied.
    pub fn copy_properties(
        &self,
        source_record: &Record,
        target_record: &Record,
        source_accessor: &dyn Accessor,
        target_accessor: &dyn Accessor,
    ) -> bool {
        match copy_named(
            source_record,
            target_record,
            source_accessor,
            target_accessor,
            None,
        ) {
            Ok(_) => true,
            Err(e) => {
                warn!(id = %target_record.id(), error = %e, "property copy failed");
                false
            }
        }
    }

    /// Creates a copy of `source_record` in the target.
    ///
    /// The seed (the source accessor's seed property) is passed to the
    /// target accessor's `create`, then the remaining properties are
    /// backfilled. `parent` is forwarded only to kinds that require one.
    ///
    /// # Errors
    ///
    /// Returns `CreationFailed` if `create` fails or a required parent is
    /// missing. A failed backfill after a successful create is logged, not
    /// raised.
    pub fn create_object(
        &self,
        target_accessor: &dyn Accessor,
        source_record: &Record,
        source_accessor: &dyn Accessor,
        parent: Option<&Record>,
    ) -> EngineResult<Record> {
        self.create_inner(target_accessor, source_record, source_accessor, parent)
            .map(|created| created.record)
    }

    /// Copies properties from `source_record` onto an existing target record.
    ///
    /// With `fields`, only the named properties are copied. Returns false
    /// instead of raising when the copy fails, so callers can aggregate
    /// partial success over a batch.
    pub fn update_object(
        &self,
        target_record: &Record,
        source_record: &Record,
        source_accessor: &dyn Accessor,
        target_accessor: &dyn Accessor,
        fields: Option<&[String]>,
    ) -> bool {
        match self.update_inner(
            target_record,
            source_record,
            source_accessor,
            target_accessor,
            fields,
        ) {
            Ok(_) => true,
            Err(e) => {
                warn!(id = %target_record.id(), error = %e, "update failed");
                false
            }
        }
    }

    /// Deletes a target record.
    ///
    /// With `validate_safe`, referring records are looked up first (when the
    /// accessor supports it). Under [`DeletePolicy::Advisory`] they are
    /// logged and the delete proceeds; under [`DeletePolicy::Refuse`] the
    /// delete is not attempted.
    ///
    /// # Errors
    ///
    /// - `DeleteBlocked` under `Refuse` when referring records exist
    /// - `DeletionFailed` if the accessor's delete fails
    pub fn delete_object(
        &self,
        target_accessor: &dyn Accessor,
        target_record: &Record,
        validate_safe: bool,
    ) -> EngineResult<bool> {
        let id = target_record.id();

        if validate_safe {
            self.check_delete_safe(target_accessor, target_record)?;
        }

        target_accessor
            .delete(target_record)
            .map_err(|e| EngineError::deletion_failed(id, e.to_string()))?;
        debug!(id = %id, kind = %target_record.kind(), "deleted");
        Ok(true)
    }

    /// Looks up referring records and applies the delete policy.
    fn check_delete_safe(
        &self,
        target_accessor: &dyn Accessor,
        target_record: &Record,
    ) -> EngineResult<()> {
        let id = target_record.id();
        match target_accessor.referring_objects(target_record) {
            Some(Ok(referrers)) if !referrers.is_empty() => {
                let referrers: Vec<RecordId> = referrers.iter().map(Record::id).collect();
                match self.config.delete_policy {
                    DeletePolicy::Advisory => {
                        warn!(
                            id = %id,
                            referrers = referrers.len(),
                            "deleting record that is still referenced"
                        );
                    }
                    DeletePolicy::Refuse => {
                        return Err(EngineError::DeleteBlocked { id, referrers });
                    }
                }
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => match self.config.delete_policy {
                DeletePolicy::Advisory => {
                    warn!(id = %id, error = %e, "referring-object lookup failed");
                }
                DeletePolicy::Refuse => return Err(e.into()),
            },
            None => {
                trace!(id = %id, "accessor has no referring-object lookup");
            }
        }
        Ok(())
    }

    /// Creates or updates one record in the target, without a graph.
    ///
    /// Follows the apply configuration like [`apply_graph`](Self::apply_graph):
    /// returns `None` when the record exists and updates are disabled, and
    /// only plans the change under `dry_run`.
    ///
    /// # Errors
    ///
    /// Precondition errors for unknown kinds; otherwise the error of the
    /// create or update that was attempted.
    pub fn sync_record(
        &self,
        source_record: &Record,
        sources: &AccessorRegistry,
        targets: &AccessorRegistry,
        parent: Option<&Record>,
    ) -> EngineResult<Option<SyncChange>> {
        let source_accessor = sources.get(source_record.kind())?;
        let target_accessor = targets.get(source_record.kind())?;
        let id = source_record.id();

        match self.target.get_by_id(&id)? {
            Some(_) if !self.config.update_existing => {
                trace!(id = %id, "exists in target, updates disabled");
                Ok(None)
            }
            Some(_) if self.config.dry_run => {
                Ok(Some(planned_change(Operation::Update, source_record, None)))
            }
            Some(target_record) => {
                let copied = self.update_inner(
                    &target_record,
                    source_record,
                    source_accessor,
                    target_accessor,
                    self.config.fields.as_deref(),
                )?;
                Ok(Some(update_change(source_record, copied)))
            }
            None if self.config.dry_run => Ok(Some(planned_change(
                Operation::Create,
                source_record,
                parent.map(Record::id),
            ))),
            None => {
                let created =
                    self.create_inner(target_accessor, source_record, source_accessor, parent)?;
                Ok(Some(create_change(
                    source_record,
                    &created,
                    parent.map(Record::id),
                )))
            }
        }
    }

    /// Applies every node of `graph` to the target, owners first.
    ///
    /// Stubs are skipped. Nodes already in the target are updated (when
    /// `update_existing`), the rest are created under their already-applied
    /// owner. Per-node failures land in the report; the batch continues.
    ///
    /// # Errors
    ///
    /// Fails before any mutation with `UnknownKind` if a node's kind has no
    /// accessor on either side.
    pub fn apply_graph(
        &self,
        graph: &DependencyGraph,
        sources: &AccessorRegistry,
        targets: &AccessorRegistry,
    ) -> EngineResult<SyncReport> {
        for record in graph.nodes().filter(|r| !r.is_stub()) {
            sources.get(record.kind())?;
            targets.get(record.kind())?;
        }

        let order = graph.best_effort_order(Some(EdgeKind::Ownership));
        if !order.is_complete() {
            warn!(
                unordered = order.unordered.len(),
                "ownership cycle in graph, applying remaining nodes in insertion order"
            );
        }

        let mut report = SyncReport {
            dry_run: self.config.dry_run,
            ..SyncReport::default()
        };
        let mut created: HashMap<RecordId, Record> = HashMap::new();

        for id in order.into_sequence() {
            if self.cancel.is_cancelled() {
                info!("apply cancelled");
                report.cancelled = true;
                break;
            }
            let Some(record) = graph.node(&id) else {
                continue;
            };
            if record.is_stub() {
                report.skipped.push(id);
                continue;
            }

            match self.apply_node(graph, record, sources, targets, &mut created) {
                Ok(Some(change)) => report.changes.push(change),
                Ok(None) => report.skipped.push(id),
                Err(error) => {
                    warn!(id = %id, error = %error, "node failed");
                    report.errors.push(error);
                }
            }
        }

        info!(summary = %report.summary(), "apply finished");
        Ok(report)
    }

    /// Deletes a batch of target records, best effort.
    ///
    /// # Errors
    ///
    /// Fails before any mutation with `UnknownKind` if a record's kind has
    /// no target accessor.
    pub fn delete_batch(
        &self,
        records: &[Record],
        targets: &AccessorRegistry,
        validate_safe: bool,
    ) -> EngineResult<SyncReport> {
        for record in records {
            targets.get(record.kind())?;
        }

        let mut report = SyncReport {
            dry_run: self.config.dry_run,
            ..SyncReport::default()
        };
        for record in records {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let change = SyncChange::new(Operation::Delete, record.kind().clone(), record.id());
            let accessor = targets.get(record.kind())?;
            let outcome = if self.config.dry_run {
                let checked = if validate_safe {
                    self.check_delete_safe(accessor, record)
                } else {
                    Ok(())
                };
                checked.map(|()| change.with_detail("dry_run", true))
            } else {
                self.delete_object(accessor, record, validate_safe)
                    .map(|_| change)
            };
            match outcome {
                Ok(change) => report.changes.push(change),
                Err(e) => report.errors.push(SyncError::new(
                    Operation::Delete,
                    Some(record.id()),
                    e.to_string(),
                )),
            }
        }
        Ok(report)
    }

    fn apply_node(
        &self,
        graph: &DependencyGraph,
        record: &Record,
        sources: &AccessorRegistry,
        targets: &AccessorRegistry,
        created: &mut HashMap<RecordId, Record>,
    ) -> Result<Option<SyncChange>, SyncError> {
        let id = record.id();
        let node_error = |operation, e: EngineError| SyncError::new(operation, Some(id), e.to_string());

        let source_accessor = sources
            .get(record.kind())
            .map_err(|e| node_error(Operation::Create, e))?;
        let target_accessor = targets
            .get(record.kind())
            .map_err(|e| node_error(Operation::Create, e))?;

        let existing = self
            .target
            .get_by_id(&id)
            .map_err(|e| node_error(Operation::Create, e.into()))?;

        if let Some(target_record) = existing {
            if !self.config.update_existing {
                trace!(id = %id, "exists in target, updates disabled");
                return Ok(None);
            }
            if self.config.dry_run {
                return Ok(Some(planned_change(Operation::Update, record, None)));
            }
            let copied = self
                .update_inner(
                    &target_record,
                    record,
                    source_accessor,
                    target_accessor,
                    self.config.fields.as_deref(),
                )
                .map_err(|e| node_error(Operation::Update, e))?;
            return Ok(Some(update_change(record, copied)));
        }

        let owner = graph.owner_of(&id);
        if self.config.dry_run {
            return Ok(Some(planned_change(Operation::Create, record, owner)));
        }

        let parent = match owner {
            Some(owner) if target_accessor.requires_parent() => {
                self.applied_parent(&owner, created)
                    .map_err(|e| node_error(Operation::Create, e))?
            }
            _ => None,
        };

        let result = self
            .create_inner(target_accessor, record, source_accessor, parent.as_ref())
            .map_err(|e| node_error(Operation::Create, e))?;
        let change = create_change(record, &result, parent.as_ref().map(Record::id));
        created.insert(id, result.record);
        Ok(Some(change))
    }

    /// The target-side copy of `owner`: created earlier in this batch, or
    /// already present in the target.
    fn applied_parent(
        &self,
        owner: &RecordId,
        created: &HashMap<RecordId, Record>,
    ) -> EngineResult<Option<Record>> {
        if let Some(record) = created.get(owner) {
            return Ok(Some(record.clone()));
        }
        Ok(self.target.get_by_id(owner)?)
    }

    fn create_inner(
        &self,
        target_accessor: &dyn Accessor,
        source_record: &Record,
        source_accessor: &dyn Accessor,
        parent: Option<&Record>,
    ) -> EngineResult<Created> {
        let kind = target_accessor.kind();
        let seed = match source_accessor.get_property(source_record, source_accessor.seed_property())
        {
            Ok(value) => value,
            Err(e) => {
                debug!(id = %source_record.id(), error = %e, "no seed value, creating with null");
                Value::Null
            }
        };

        let parent = if target_accessor.requires_parent() {
            match parent {
                Some(parent) => Some(parent),
                None => {
                    return Err(EngineError::creation_failed(
                        kind,
                        "kind requires an owning parent",
                    ))
                }
            }
        } else {
            None
        };

        let record = target_accessor
            .create(source_record.id(), parent, &seed)
            .map_err(|e| EngineError::creation_failed(kind, e.to_string()))?;
        debug!(id = %record.id(), kind = %kind, "created");

        let copied = match copy_named(
            source_record,
            &record,
            source_accessor,
            target_accessor,
            None,
        ) {
            Ok(n) => Some(n),
            Err(e) => {
                warn!(id = %record.id(), error = %e, "created record but backfill failed");
                None
            }
        };

        Ok(Created {
            record,
            seed,
            copied,
        })
    }

    fn update_inner(
        &self,
        target_record: &Record,
        source_record: &Record,
        source_accessor: &dyn Accessor,
        target_accessor: &dyn Accessor,
        fields: Option<&[String]>,
    ) -> EngineResult<usize> {
        let copied = copy_named(
            source_record,
            target_record,
            source_accessor,
            target_accessor,
            fields,
        )
        .map_err(|e| EngineError::UpdateFailed {
            id: target_record.id(),
            message: e.to_string(),
        })?;
        debug!(id = %target_record.id(), copied, "updated");
        Ok(copied)
    }
}

/// Copies the named (or all syncable) properties, returning how many were written.
fn copy_named(
    source_record: &Record,
    target_record: &Record,
    source_accessor: &dyn Accessor,
    target_accessor: &dyn Accessor,
    fields: Option<&[String]>,
) -> EngineResult<usize> {
    let names: Vec<String> = match fields {
        Some(fields) => fields.to_vec(),
        None => source_accessor
            .syncable_properties(source_record)?
            .into_keys()
            .collect(),
    };

    let mut copied = 0;
    for name in &names {
        if !source_accessor.capabilities().supports(name)
            || !target_accessor.capabilities().supports(name)
        {
            trace!(property = %name, "not supported on both sides, skipping");
            continue;
        }

        let value = match source_accessor.get_property(source_record, name) {
            Ok(value) => value,
            Err(e) if e.is_not_supported() => continue,
            Err(e) => return Err(e.into()),
        };
        if value.is_null() {
            continue;
        }

        match target_accessor.set_property(target_record, name, value) {
            Ok(()) => copied += 1,
            Err(e) if e.is_not_supported() => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(copied)
}

fn create_change(source_record: &Record, created: &Created, parent: Option<RecordId>) -> SyncChange {
    let mut change = SyncChange::new(
        Operation::Create,
        source_record.kind().clone(),
        source_record.id(),
    )
    .with_detail("seed", created.seed.clone());
    if let Some(copied) = created.copied {
        change = change.with_detail("copied", copied as i64);
    } else {
        change = change.with_detail("backfill_failed", true);
    }
    if let Some(parent) = parent {
        change = change.with_detail("parent", parent);
    }
    if created.record.id() != source_record.id() {
        change = change.with_detail("target_id", created.record.id());
    }
    change
}

/// A change that a dry run would have made.
fn planned_change(operation: Operation, record: &Record, parent: Option<RecordId>) -> SyncChange {
    let mut change =
        SyncChange::new(operation, record.kind().clone(), record.id()).with_detail("dry_run", true);
    if let Some(parent) = parent {
        change = change.with_detail("parent", parent);
    }
    change
}

fn update_change(source_record: &Record, copied: usize) -> SyncChange {
    SyncChange::new(
        Operation::Update,
        source_record.kind().clone(),
        source_record.id(),
    )
    .with_detail("copied", copied as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DependencyConfig;
    use crate::resolver::resolve;
    use crate::schema::RelationshipRegistry;
    use objsync_testkit::{lexicon_accessors, record_id, FieldAccessor, LexiconBuilder, MemoryStore};
    use std::sync::Arc;

    fn pos_accessor(store: &Arc<MemoryStore>) -> FieldAccessor {
        FieldAccessor::new("PartOfSpeech", Arc::clone(store))
            .with_properties(["Name", "Abbreviation"])
            .with_seed_property("Name")
    }

    fn noun(store: &MemoryStore) -> Record {
        let record = Record::stub(record_id("noun"), "PartOfSpeech")
            .with_field("Name", "Noun")
            .with_field("Abbreviation", "n");
        store.insert(record.clone());
        record
    }

    #[test]
    fn rejects_read_only_target() {
        let target = MemoryStore::read_only();
        assert!(matches!(
            MergeOperations::new(&target),
            Err(EngineError::NotWritable)
        ));
    }

    #[test]
    fn create_copies_seed_and_properties() {
        let source = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let record = noun(&source);

        let merge = MergeOperations::new(target.as_ref()).unwrap();
        let created = merge
            .create_object(&pos_accessor(&target), &record, &pos_accessor(&source), None)
            .unwrap();

        assert_eq!(created.id(), record.id());
        let copy = target.get(&record.id()).unwrap();
        assert_eq!(copy.field("Name"), Some(&Value::from("Noun")));
        assert_eq!(copy.field("Abbreviation"), Some(&Value::from("n")));
    }

    #[test]
    fn create_failure_is_fatal() {
        let source = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let record = noun(&source);

        let merge = MergeOperations::new(target.as_ref()).unwrap();
        let failing = pos_accessor(&target).failing_create("disk full");
        let err = merge
            .create_object(&failing, &record, &pos_accessor(&source), None)
            .unwrap_err();

        assert!(matches!(err, EngineError::CreationFailed { .. }));
        assert!(err.is_fatal());
        assert!(target.is_empty());
    }

    #[test]
    fn create_without_required_parent_fails() {
        let source = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let form = Record::stub(record_id("form"), "MoForm").with_field("Form", "phika");
        source.insert(form.clone());

        let form_accessor = |store: &Arc<MemoryStore>| {
            FieldAccessor::new("MoForm", Arc::clone(store))
                .with_properties(["Form"])
                .owned_by("LexemeForm", false)
        };
        let merge = MergeOperations::new(target.as_ref()).unwrap();
        let target_accessor = form_accessor(&target);
        let err = merge
            .create_object(&target_accessor, &form, &form_accessor(&source), None)
            .unwrap_err();

        assert!(matches!(err, EngineError::CreationFailed { .. }));
        assert_eq!(target_accessor.create_calls(), 0);
    }

    #[test]
    fn failed_backfill_keeps_created_record() {
        let source = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let record = noun(&source);

        let merge = MergeOperations::new(target.as_ref()).unwrap();
        let target_accessor = pos_accessor(&target).failing_set("read only");
        merge
            .create_object(&target_accessor, &record, &pos_accessor(&source), None)
            .unwrap();
        assert!(target.contains(&record.id()));
    }

    #[test]
    fn update_skips_unsupported_properties() {
        let source = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let record = noun(&source);
        target.insert(Record::stub(record.id(), "PartOfSpeech").with_field("Name", "old"));

        let narrow = FieldAccessor::new("PartOfSpeech", Arc::clone(&target)).with_properties(["Name"]);
        let merge = MergeOperations::new(target.as_ref()).unwrap();
        let target_record = target.get(&record.id()).unwrap();

        assert!(merge.update_object(&target_record, &record, &pos_accessor(&source), &narrow, None));
        let copy = target.get(&record.id()).unwrap();
        assert_eq!(copy.field("Name"), Some(&Value::from("Noun")));
        assert_eq!(copy.field("Abbreviation"), None);
    }

    #[test]
    fn update_with_field_filter() {
        let source = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let record = noun(&source);
        target.insert(Record::stub(record.id(), "PartOfSpeech").with_field("Name", "old"));

        let merge = MergeOperations::new(target.as_ref()).unwrap();
        let target_record = target.get(&record.id()).unwrap();
        let fields = vec!["Abbreviation".to_string()];
        assert!(merge.update_object(
            &target_record,
            &record,
            &pos_accessor(&source),
            &pos_accessor(&target),
            Some(&fields),
        ));

        let copy = target.get(&record.id()).unwrap();
        assert_eq!(copy.field("Name"), Some(&Value::from("old")));
        assert_eq!(copy.field("Abbreviation"), Some(&Value::from("n")));
    }

    #[test]
    fn update_failure_returns_false() {
        let source = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let record = noun(&source);
        target.insert(Record::stub(record.id(), "PartOfSpeech"));

        let merge = MergeOperations::new(target.as_ref()).unwrap();
        let target_record = target.get(&record.id()).unwrap();
        let failing = pos_accessor(&target).failing_set("locked");
        assert!(!merge.update_object(&target_record, &record, &pos_accessor(&source), &failing, None));
    }

    fn referenced_noun(target: &Arc<MemoryStore>) -> Record {
        let pos = noun(target);
        target.insert(Record::stub(record_id("s1"), "LexSense").with_field("PartOfSpeech", pos.id()));
        target.insert(Record::stub(record_id("s2"), "LexSense").with_field("PartOfSpeech", pos.id()));
        pos
    }

    #[test]
    fn advisory_delete_proceeds_with_referrers() {
        let target = Arc::new(MemoryStore::new());
        let pos = referenced_noun(&target);
        let accessor = pos_accessor(&target).with_referrer_lookup();

        let merge = MergeOperations::new(target.as_ref()).unwrap();
        assert!(merge.delete_object(&accessor, &pos, true).unwrap());
        assert_eq!(accessor.delete_calls(), 1);
        assert!(!target.contains(&pos.id()));
    }

    #[test]
    fn refuse_policy_blocks_delete() {
        let target = Arc::new(MemoryStore::new());
        let pos = referenced_noun(&target);
        let accessor = pos_accessor(&target).with_referrer_lookup();

        let merge = MergeOperations::new(target.as_ref())
            .unwrap()
            .with_config(ApplyConfig::new().with_delete_policy(DeletePolicy::Refuse));
        let err = merge.delete_object(&accessor, &pos, true).unwrap_err();

        match err {
            EngineError::DeleteBlocked { id, referrers } => {
                assert_eq!(id, pos.id());
                assert_eq!(referrers.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(accessor.delete_calls(), 0);

        // Without the safety check the policy does not apply.
        assert!(merge.delete_object(&accessor, &pos, false).unwrap());
    }

    #[test]
    fn delete_failure_is_fatal() {
        let target = Arc::new(MemoryStore::new());
        let pos = noun(&target);
        let merge = MergeOperations::new(target.as_ref()).unwrap();
        let err = merge
            .delete_object(&pos_accessor(&target).failing_delete("locked"), &pos, false)
            .unwrap_err();
        assert!(matches!(err, EngineError::DeletionFailed { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn sync_record_creates_then_updates() {
        let source = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let record = noun(&source);
        let sources: AccessorRegistry = lexicon_accessors(&source).into_iter().collect();
        let targets: AccessorRegistry = lexicon_accessors(&target).into_iter().collect();

        let merge = MergeOperations::new(target.as_ref()).unwrap();
        let first = merge.sync_record(&record, &sources, &targets, None).unwrap();
        assert_eq!(first.map(|c| c.operation), Some(Operation::Create));

        let second = merge.sync_record(&record, &sources, &targets, None).unwrap();
        assert_eq!(second.map(|c| c.operation), Some(Operation::Update));
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn sync_record_dry_run_leaves_target_alone() {
        let source = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let record = noun(&source);
        let sources: AccessorRegistry = lexicon_accessors(&source).into_iter().collect();
        let targets: AccessorRegistry = lexicon_accessors(&target).into_iter().collect();

        let merge = MergeOperations::new(target.as_ref())
            .unwrap()
            .with_config(ApplyConfig::new().with_dry_run(true));
        let planned = merge
            .sync_record(&record, &sources, &targets, None)
            .unwrap()
            .unwrap();
        assert_eq!(planned.operation, Operation::Create);
        assert_eq!(planned.details.get("dry_run"), Some(&Value::Bool(true)));
        assert!(target.is_empty());

        let stale = Record::stub(record.id(), "PartOfSpeech").with_field("Name", "Old");
        target.insert(stale.clone());
        let planned = merge
            .sync_record(&record, &sources, &targets, None)
            .unwrap()
            .unwrap();
        assert_eq!(planned.operation, Operation::Update);
        assert_eq!(target.get(&record.id()), Some(stale));
    }

    #[test]
    fn sync_record_skips_existing_when_updates_disabled() {
        let source = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let record = noun(&source);
        let stale = Record::stub(record.id(), "PartOfSpeech").with_field("Name", "Old");
        target.insert(stale.clone());
        let sources: AccessorRegistry = lexicon_accessors(&source).into_iter().collect();
        let targets: AccessorRegistry = lexicon_accessors(&target).into_iter().collect();

        let merge = MergeOperations::new(target.as_ref())
            .unwrap()
            .with_config(ApplyConfig::new().with_update_existing(false));
        assert_eq!(merge.sync_record(&record, &sources, &targets, None).unwrap(), None);
        assert_eq!(target.get(&record.id()), Some(stale));
    }

    #[test]
    fn dry_run_delete_batch_applies_delete_policy() {
        let target = Arc::new(MemoryStore::new());
        let pos = referenced_noun(&target);
        let targets: AccessorRegistry = lexicon_accessors(&target).into_iter().collect();
        let refuse = ApplyConfig::new().with_delete_policy(DeletePolicy::Refuse);

        let plan = MergeOperations::new(target.as_ref())
            .unwrap()
            .with_config(refuse.clone().with_dry_run(true))
            .delete_batch(std::slice::from_ref(&pos), &targets, true)
            .unwrap();
        let real = MergeOperations::new(target.as_ref())
            .unwrap()
            .with_config(refuse)
            .delete_batch(std::slice::from_ref(&pos), &targets, true)
            .unwrap();

        assert_eq!(plan.changes.len(), real.changes.len());
        assert_eq!(plan.errors.len(), 1);
        assert_eq!(real.errors.len(), 1);
        assert!(target.contains(&pos.id()));

        // Without the safety check the plan lists the delete.
        let plan = MergeOperations::new(target.as_ref())
            .unwrap()
            .with_config(ApplyConfig::new().with_dry_run(true))
            .delete_batch(std::slice::from_ref(&pos), &targets, false)
            .unwrap();
        assert_eq!(plan.deleted(), 1);
        assert!(target.contains(&pos.id()));
    }

    #[test]
    fn apply_graph_creates_owners_first() {
        let (source, root) = LexiconBuilder::new().entry_with_senses("dog", "dog", 2);
        let source = Arc::new(source);
        let target = Arc::new(MemoryStore::new());
        let registry = RelationshipRegistry::lexicon();
        let root = source.get(&root).unwrap();
        let graph = resolve(
            source.as_ref(),
            target.as_ref(),
            &registry,
            &root,
            &DependencyConfig::new(),
        )
        .unwrap();

        let sources: AccessorRegistry = lexicon_accessors(&source).into_iter().collect();
        let targets: AccessorRegistry = lexicon_accessors(&target).into_iter().collect();
        let report = MergeOperations::new(target.as_ref())
            .unwrap()
            .apply_graph(&graph, &sources, &targets)
            .unwrap();

        assert!(report.is_success(), "{:?}", report.errors);
        assert_eq!(report.created(), 4);
        assert_eq!(report.changes[0].id, root.id());

        let entry = target.get(&root.id()).unwrap();
        assert_eq!(entry.referenced_ids("LexemeForm"), vec![record_id("dog/form")]);
        assert_eq!(
            entry.referenced_ids("Senses"),
            vec![record_id("dog/sense1"), record_id("dog/sense2")]
        );
    }

    #[test]
    fn apply_graph_rejects_unknown_kinds_up_front() {
        let source = Arc::new(MemoryStore::new());
        let target = Arc::new(MemoryStore::new());
        let mut graph = DependencyGraph::new();
        graph.add_object(Record::stub(record_id("x"), "Widget").with_field("Name", "x"));

        let sources: AccessorRegistry = lexicon_accessors(&source).into_iter().collect();
        let targets: AccessorRegistry = lexicon_accessors(&target).into_iter().collect();
        let err = MergeOperations::new(target.as_ref())
            .unwrap()
            .apply_graph(&graph, &sources, &targets)
            .unwrap_err();
        assert!(err.is_precondition());
    }

    #[test]
    fn dry_run_plans_without_writing() {
        let (source, root) = LexiconBuilder::new().entry_with_senses("dog", "dog", 1);
        let source = Arc::new(source);
        let target = Arc::new(MemoryStore::new());
        let registry = RelationshipRegistry::lexicon();
        let root = source.get(&root).unwrap();
        let graph = resolve(
            source.as_ref(),
            target.as_ref(),
            &registry,
            &root,
            &DependencyConfig::new(),
        )
        .unwrap();

        let sources: AccessorRegistry = lexicon_accessors(&source).into_iter().collect();
        let targets: AccessorRegistry = lexicon_accessors(&target).into_iter().collect();
        let report = MergeOperations::new(target.as_ref())
            .unwrap()
            .with_config(ApplyConfig::new().with_dry_run(true))
            .apply_graph(&graph, &sources, &targets)
            .unwrap();

        assert!(report.dry_run);
        assert_eq!(report.created(), 3);
        assert!(target.is_empty());
        assert!(report.summary().ends_with("(dry run)"));
    }

    #[test]
    fn cancelled_batch_stops_before_first_node() {
        let (source, root) = LexiconBuilder::new().entry_with_senses("dog", "dog", 1);
        let source = Arc::new(source);
        let target = Arc::new(MemoryStore::new());
        let registry = RelationshipRegistry::lexicon();
        let root = source.get(&root).unwrap();
        let graph = resolve(
            source.as_ref(),
            target.as_ref(),
            &registry,
            &root,
            &DependencyConfig::new(),
        )
        .unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let sources: AccessorRegistry = lexicon_accessors(&source).into_iter().collect();
        let targets: AccessorRegistry = lexicon_accessors(&target).into_iter().collect();
        let report = MergeOperations::new(target.as_ref())
            .unwrap()
            .with_cancellation(token)
            .apply_graph(&graph, &sources, &targets)
            .unwrap();

        assert!(report.cancelled);
        assert!(report.changes.is_empty());
        assert!(target.is_empty());
    }
}
