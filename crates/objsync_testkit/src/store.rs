//! In-memory record store.

use objsync_model::{Fields, Record, RecordId, RecordStore, StoreError, StoreResult, Value};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

/// A thread-safe in-memory store.
///
/// Counts `exists` and `get_by_id` calls per ID so tests can assert how
/// often the engine went to the store. Writes through the inherent methods
/// honour the writable flag; `insert` is a fixture helper and always works.
#[derive(Debug)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<RecordId, Record>>,
    writable: AtomicBool,
    unavailable: AtomicBool,
    unreadable: RwLock<HashSet<RecordId>>,
    exists_calls: Mutex<HashMap<RecordId, usize>>,
    get_calls: Mutex<HashMap<RecordId, usize>>,
}

#[derive(Serialize, Deserialize)]
struct Snapshot {
    writable: bool,
    records: Vec<Record>,
}

impl MemoryStore {
    /// Creates an empty writable store.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
            writable: AtomicBool::new(true),
            unavailable: AtomicBool::new(false),
            unreadable: RwLock::new(HashSet::new()),
            exists_calls: Mutex::new(HashMap::new()),
            get_calls: Mutex::new(HashMap::new()),
        }
    }

    /// Creates an empty read-only store.
    pub fn read_only() -> Self {
        let store = Self::new();
        store.set_writable(false);
        store
    }

    /// Sets the writable flag.
    pub fn set_writable(&self, writable: bool) {
        self.writable.store(writable, Ordering::SeqCst);
    }

    /// Makes every `RecordStore` call fail with `Unavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes `get_by_id` fail with `Unavailable` for one record only.
    pub fn fail_reads_of(&self, id: RecordId) {
        self.unreadable.write().insert(id);
    }

    /// Inserts or replaces a record. Stubs are stored with an empty payload.
    pub fn insert(&self, record: Record) -> Option<Record> {
        let id = record.id();
        let kind = record.kind().clone();
        let fields = record.into_payload().unwrap_or_default();
        self.records
            .write()
            .insert(id, Record::new(id, kind, fields))
    }

    /// Reads a record without touching the call counters.
    pub fn get(&self, id: &RecordId) -> Option<Record> {
        self.records.read().get(id).cloned()
    }

    /// Returns true if the record exists, without touching the call counters.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.read().contains_key(id)
    }

    /// Sets one field of a stored record.
    ///
    /// # Errors
    ///
    /// `NotWritable` on a read-only store, `NotFound` for unknown IDs.
    pub fn set_field(&self, id: &RecordId, name: &str, value: Value) -> StoreResult<()> {
        self.check_writable()?;
        self.update(id, |fields| {
            fields.insert(name.to_string(), value);
        })
    }

    /// Appends a reference to a sequence field, creating it if needed.
    ///
    /// # Errors
    ///
    /// `NotWritable` on a read-only store, `NotFound` for unknown IDs.
    pub fn append_ref(&self, id: &RecordId, name: &str, target: RecordId) -> StoreResult<()> {
        self.check_writable()?;
        self.update(id, |fields| {
            let mut ids = fields.get(name).map(Value::referenced_ids).unwrap_or_default();
            ids.push(target);
            fields.insert(name.to_string(), Value::RefSeq(ids));
        })
    }

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// `NotWritable` on a read-only store, `NotFound` for unknown IDs.
    pub fn remove(&self, id: &RecordId) -> StoreResult<Record> {
        self.check_writable()?;
        self.records
            .write()
            .remove(id)
            .ok_or(StoreError::NotFound(*id))
    }

    /// Records whose fields reference `id`.
    pub fn referrers_of(&self, id: &RecordId) -> Vec<Record> {
        self.records
            .read()
            .values()
            .filter(|record| {
                record.id() != *id
                    && record
                        .payload()
                        .is_some_and(|fields| fields.values().any(|v| v.referenced_ids().contains(id)))
            })
            .cloned()
            .collect()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// All record IDs, in ID order.
    pub fn ids(&self) -> Vec<RecordId> {
        self.records.read().keys().copied().collect()
    }

    /// `exists` calls made for `id`.
    pub fn exists_calls(&self, id: &RecordId) -> usize {
        self.exists_calls.lock().get(id).copied().unwrap_or(0)
    }

    /// `exists` calls made for all IDs.
    pub fn total_exists_calls(&self) -> usize {
        self.exists_calls.lock().values().sum()
    }

    /// `get_by_id` calls made for `id`.
    pub fn get_calls(&self, id: &RecordId) -> usize {
        self.get_calls.lock().get(id).copied().unwrap_or(0)
    }

    /// Resets the call counters.
    pub fn reset_counters(&self) {
        self.exists_calls.lock().clear();
        self.get_calls.lock().clear();
    }

    /// Serializes the store contents to JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let snapshot = Snapshot {
            writable: self.writable.load(Ordering::SeqCst),
            records: self.records.read().values().cloned().collect(),
        };
        serde_json::to_string_pretty(&snapshot)
    }

    /// Builds a store from a JSON snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not a valid snapshot.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        let store = Self::new();
        for record in snapshot.records {
            store.insert(record);
        }
        store.set_writable(snapshot.writable);
        Ok(store)
    }

    /// Writes a JSON snapshot to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Reads a JSON snapshot from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json).map_err(std::io::Error::other)
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.writable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::NotWritable)
        }
    }

    fn check_available(&self) -> StoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("store marked unavailable".into()))
        } else {
            Ok(())
        }
    }

    fn update(&self, id: &RecordId, f: impl FnOnce(&mut Fields)) -> StoreResult<()> {
        let mut records = self.records.write();
        let record = records.get_mut(id).ok_or(StoreError::NotFound(*id))?;
        let mut fields = record.payload().cloned().unwrap_or_default();
        f(&mut fields);
        *record = Record::new(*id, record.kind().clone(), fields);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for MemoryStore {
    fn exists(&self, id: &RecordId) -> StoreResult<bool> {
        self.check_available()?;
        *self.exists_calls.lock().entry(*id).or_insert(0) += 1;
        Ok(self.contains(id))
    }

    fn get_by_id(&self, id: &RecordId) -> StoreResult<Option<Record>> {
        self.check_available()?;
        *self.get_calls.lock().entry(*id).or_insert(0) += 1;
        if self.unreadable.read().contains(id) {
            return Err(StoreError::Unavailable(format!("read of {id} failed")));
        }
        Ok(self.get(id))
    }

    fn is_writable(&self) -> bool {
        self.writable.load(Ordering::SeqCst)
    }
}
