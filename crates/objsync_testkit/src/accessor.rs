//! Field-backed accessors over a [`MemoryStore`].

use crate::store::MemoryStore;
use objsync_model::{
    Accessor, AccessorError, AccessorResult, Fields, Kind, PropertySet, Record, RecordId,
    RecordStore, StoreError, Value, DEFAULT_SEED_PROPERTY,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// An accessor that reads and writes record fields in a [`MemoryStore`].
///
/// Ownership properties are deliberately left out of the capability set: a
/// child is attached to its owner by `create`, through the property named
/// with [`owned_by`](FieldAccessor::owned_by).
#[derive(Debug)]
pub struct FieldAccessor {
    kind: Kind,
    store: Arc<MemoryStore>,
    properties: PropertySet,
    seed_property: String,
    owner_property: Option<(String, bool)>,
    owner_kinds: Vec<(Kind, String, bool)>,
    referrer_lookup: bool,
    fail_create: Option<String>,
    fail_delete: Option<String>,
    fail_set: Option<String>,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl FieldAccessor {
    /// Creates an accessor for `kind` with no properties.
    pub fn new(kind: impl Into<Kind>, store: Arc<MemoryStore>) -> Self {
        Self {
            kind: kind.into(),
            store,
            properties: PropertySet::new(),
            seed_property: DEFAULT_SEED_PROPERTY.to_string(),
            owner_property: None,
            owner_kinds: Vec::new(),
            referrer_lookup: false,
            fail_create: None,
            fail_delete: None,
            fail_set: None,
            create_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Declares the properties this accessor can get and set.
    #[must_use]
    pub fn with_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.properties.insert(name);
        }
        self
    }

    /// Sets the seed property.
    #[must_use]
    pub fn with_seed_property(mut self, name: impl Into<String>) -> Self {
        self.seed_property = name.into();
        self
    }

    /// Requires a parent on create and links new records into the parent's
    /// `property` (appended when `many`, replaced otherwise).
    #[must_use]
    pub fn owned_by(mut self, property: impl Into<String>, many: bool) -> Self {
        self.owner_property = Some((property.into(), many));
        self
    }

    /// Like [`owned_by`](Self::owned_by), for parents of `owner` kind only.
    ///
    /// For kinds with several possible owners, each one linking through its
    /// own property. A parent of an undeclared kind is rejected by `create`.
    #[must_use]
    pub fn owned_by_kind(
        mut self,
        owner: impl Into<Kind>,
        property: impl Into<String>,
        many: bool,
    ) -> Self {
        self.owner_kinds.push((owner.into(), property.into(), many));
        self
    }

    /// Enables `referring_objects`.
    #[must_use]
    pub fn with_referrer_lookup(mut self) -> Self {
        self.referrer_lookup = true;
        self
    }

    /// Makes every `create` fail with `message`.
    #[must_use]
    pub fn failing_create(mut self, message: impl Into<String>) -> Self {
        self.fail_create = Some(message.into());
        self
    }

    /// Makes every `delete` fail with `message`.
    #[must_use]
    pub fn failing_delete(mut self, message: impl Into<String>) -> Self {
        self.fail_delete = Some(message.into());
        self
    }

    /// Makes every `set_property` fail with `message`.
    #[must_use]
    pub fn failing_set(mut self, message: impl Into<String>) -> Self {
        self.fail_set = Some(message.into());
        self
    }

    /// Number of `create` calls.
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    /// Number of `delete` calls.
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// The property of a parent of kind `owner` that holds new records.
    fn link_property(&self, owner: &Kind) -> Option<(&str, bool)> {
        self.owner_kinds
            .iter()
            .find(|(kind, _, _)| kind == owner)
            .map(|(_, property, many)| (property.as_str(), *many))
            .or_else(|| {
                self.owner_property
                    .as_ref()
                    .map(|(property, many)| (property.as_str(), *many))
            })
    }

    fn current(&self, record: &Record) -> AccessorResult<Record> {
        self.store
            .get(&record.id())
            .ok_or(AccessorError::Store(StoreError::NotFound(record.id())))
    }

    fn check_supported(&self, name: &str) -> AccessorResult<()> {
        if self.properties.supports(name) {
            Ok(())
        } else {
            Err(AccessorError::not_supported(&self.kind, name))
        }
    }
}

impl Accessor for FieldAccessor {
    fn kind(&self) -> &Kind {
        &self.kind
    }

    fn capabilities(&self) -> &PropertySet {
        &self.properties
    }

    fn seed_property(&self) -> &str {
        &self.seed_property
    }

    fn requires_parent(&self) -> bool {
        self.owner_property.is_some() || !self.owner_kinds.is_empty()
    }

    fn create(
        &self,
        id: RecordId,
        parent: Option<&Record>,
        seed: &Value,
    ) -> AccessorResult<Record> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_create {
            return Err(AccessorError::failed(message.clone()));
        }
        if !self.store.is_writable() {
            return Err(StoreError::NotWritable.into());
        }
        if self.store.contains(&id) {
            return Err(AccessorError::failed(format!("{id} already exists")));
        }

        let mut fields = Fields::new();
        if !seed.is_null() && self.properties.supports(&self.seed_property) {
            fields.insert(self.seed_property.clone(), seed.clone());
        }
        let record = Record::new(id, self.kind.clone(), fields);

        match (self.requires_parent(), parent) {
            (true, Some(parent)) => {
                let Some((property, many)) = self.link_property(parent.kind()) else {
                    return Err(AccessorError::failed(format!(
                        "{} cannot be owned by {}",
                        self.kind,
                        parent.kind()
                    )));
                };
                self.store.insert(record.clone());
                let linked = if many {
                    self.store.append_ref(&parent.id(), property, id)
                } else {
                    self.store.set_field(&parent.id(), property, Value::Ref(id))
                };
                if let Err(e) = linked {
                    self.store.remove(&id).ok();
                    return Err(e.into());
                }
            }
            (true, None) => {
                return Err(AccessorError::failed(format!(
                    "{} needs an owning parent",
                    self.kind
                )));
            }
            (false, _) => {
                self.store.insert(record.clone());
            }
        }
        Ok(record)
    }

    fn syncable_properties(&self, record: &Record) -> AccessorResult<Fields> {
        let current = self.current(record)?;
        Ok(current
            .payload()
            .map(|fields| {
                fields
                    .iter()
                    .filter(|(name, _)| self.properties.supports(name))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get_property(&self, record: &Record, name: &str) -> AccessorResult<Value> {
        self.check_supported(name)?;
        let current = self.current(record)?;
        Ok(current.field(name).cloned().unwrap_or_default())
    }

    fn set_property(&self, record: &Record, name: &str, value: Value) -> AccessorResult<()> {
        self.check_supported(name)?;
        if let Some(message) = &self.fail_set {
            return Err(AccessorError::failed(message.clone()));
        }
        self.store.set_field(&record.id(), name, value)?;
        Ok(())
    }

    fn delete(&self, record: &Record) -> AccessorResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = &self.fail_delete {
            return Err(AccessorError::failed(message.clone()));
        }
        self.store.remove(&record.id())?;
        Ok(())
    }

    fn referring_objects(&self, record: &Record) -> Option<AccessorResult<Vec<Record>>> {
        self.referrer_lookup
            .then(|| Ok(self.store.referrers_of(&record.id())))
    }
}

/// Accessors for every kind in the lexicon relationship tables, bound to `store`.
///
/// Parts of speech are created without a parent: top-level categories have
/// no owner in the tables, so sub-categories are copied as unlinked
/// top-level records.
pub fn lexicon_accessors(store: &Arc<MemoryStore>) -> Vec<Arc<dyn Accessor>> {
    let named = |kind: &str, properties: &[&str]| {
        FieldAccessor::new(kind, Arc::clone(store))
            .with_properties(properties.iter().copied())
            .with_seed_property("Name")
    };

    vec![
        Arc::new(
            FieldAccessor::new("LexEntry", Arc::clone(store))
                .with_properties(["CitationForm", "Comment", "MainEntriesOrSenses"])
                .with_seed_property("CitationForm")
                .with_referrer_lookup(),
        ),
        Arc::new(
            FieldAccessor::new("MoForm", Arc::clone(store))
                .with_properties(["Form", "MorphType"])
                .owned_by("LexemeForm", false),
        ),
        Arc::new(
            FieldAccessor::new("LexSense", Arc::clone(store))
                .with_properties([
                    "Gloss",
                    "Definition",
                    "PartOfSpeech",
                    "SemanticDomains",
                    "UsageTypes",
                ])
                .with_seed_property("Gloss")
                .owned_by("Senses", true)
                .with_referrer_lookup(),
        ),
        Arc::new(
            FieldAccessor::new("LexPronunciation", Arc::clone(store))
                .with_properties(["Form"])
                .owned_by("Pronunciations", true),
        ),
        Arc::new(
            FieldAccessor::new("LexEtymology", Arc::clone(store))
                .with_properties(["Form", "Comment"])
                .owned_by("Etymology", true),
        ),
        Arc::new(
            FieldAccessor::new("LexExampleSentence", Arc::clone(store))
                .with_properties(["Example", "Reference"])
                .with_seed_property("Example")
                .owned_by("Examples", true),
        ),
        Arc::new(
            FieldAccessor::new("CmPicture", Arc::clone(store))
                .with_properties(["Caption", "PictureFile"])
                .with_seed_property("Caption")
                .owned_by("Pictures", true),
        ),
        Arc::new(
            FieldAccessor::new("CmTranslation", Arc::clone(store))
                .with_properties(["Translation"])
                .with_seed_property("Translation")
                .owned_by("Translations", true),
        ),
        Arc::new(named("CmPossibilityList", &["Name"])),
        Arc::new(
            named("CmPossibility", &["Name", "Abbreviation"])
                .owned_by_kind("CmPossibilityList", "Possibilities", true)
                .owned_by_kind("CmPossibility", "SubPossibilities", true)
                .with_referrer_lookup(),
        ),
        Arc::new(named("PartOfSpeech", &["Name", "Abbreviation"]).with_referrer_lookup()),
        Arc::new(
            named("CmSemanticDomain", &["Name", "Abbreviation", "RelatedDomains"])
                .with_referrer_lookup(),
        ),
        Arc::new(named("MoMorphType", &["Name"])),
    ]
}
