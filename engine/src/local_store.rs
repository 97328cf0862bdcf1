//! Local fallback storage.
//!
//! Records created while the server is unreachable are kept in a durable
//! key/value store owned by the client, next to the set of ids known to have
//! originated locally. Each entity type has two keys: `<entity>` holds a
//! JSON array of records and `<entity>_local_ids` a JSON array of ids.
//!
//! Every method reads or writes the full value for a key. Callers performing
//! a read-modify-write must not suspend between the read and the write.

use crate::{error::Result, Error, Record, RecordId};
use std::collections::{BTreeMap, BTreeSet};

const LOCAL_IDS_SUFFIX: &str = "_local_ids";

/// Durable string storage keyed by name.
pub trait KeyValueStorage {
    /// Read the value under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Overwrite the value under `key`.
    fn set(&mut self, key: &str, value: String) -> Result<()>;

    /// Remove `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Non-durable storage, for tests and ephemeral sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// All keys currently stored.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Storage key for an entity's records.
pub fn records_key(entity: &str) -> String {
    entity.to_string()
}

/// Storage key for an entity's local-origin id set.
pub fn local_ids_key(entity: &str) -> String {
    format!("{entity}{LOCAL_IDS_SUFFIX}")
}

/// Records and local-origin ids kept while the server is unreachable.
#[derive(Debug, Clone, Default)]
pub struct LocalFallbackStore<S> {
    storage: S,
}

impl<S: KeyValueStorage> LocalFallbackStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_inner(self) -> S {
        self.storage
    }

    /// Load every stored record, in insertion order. Empty if never written.
    pub fn load_all(&self, entity: &str) -> Result<Vec<Record>> {
        self.read_json(&records_key(entity))
    }

    /// Overwrite the stored records.
    pub fn save_all(&mut self, entity: &str, records: &[Record]) -> Result<()> {
        self.write_json(&records_key(entity), &records)
    }

    /// Load the local-origin ids.
    ///
    /// Always a subset of the ids in [`load_all`](Self::load_all): ids whose
    /// record is gone are dropped on read.
    pub fn load_local_ids(&self, entity: &str) -> Result<BTreeSet<RecordId>> {
        let stored: Vec<RecordId> = self.read_json(&local_ids_key(entity))?;
        if stored.is_empty() {
            return Ok(BTreeSet::new());
        }

        let present: BTreeSet<RecordId> = self.load_all(entity)?.iter().map(|r| r.id).collect();
        Ok(stored
            .into_iter()
            .filter(|id| present.contains(id))
            .collect())
    }

    /// Overwrite the local-origin ids.
    pub fn save_local_ids(&mut self, entity: &str, ids: &BTreeSet<RecordId>) -> Result<()> {
        let ids: Vec<RecordId> = ids.iter().copied().collect();
        self.write_json(&local_ids_key(entity), &ids)
    }

    /// Find a stored record by id.
    pub fn get(&self, entity: &str, id: RecordId) -> Result<Option<Record>> {
        Ok(self.load_all(entity)?.into_iter().find(|r| r.id == id))
    }

    /// Append a record and tag its id as local-origin.
    pub fn append(&mut self, entity: &str, record: Record) -> Result<()> {
        let id = record.id;

        let mut records = self.load_all(entity)?;
        records.push(record);
        self.save_all(entity, &records)?;

        let mut ids = self.load_local_ids(entity)?;
        ids.insert(id);
        self.save_local_ids(entity, &ids)
    }

    /// Replace the stored record that has the same id.
    pub fn replace(&mut self, entity: &str, record: Record) -> Result<()> {
        let mut records = self.load_all(entity)?;
        let slot = records
            .iter_mut()
            .find(|r| r.id == record.id)
            .ok_or(Error::RecordNotFound(record.id))?;
        *slot = record;
        self.save_all(entity, &records)
    }

    /// Remove a record and its local-origin tag, returning the record.
    pub fn remove(&mut self, entity: &str, id: RecordId) -> Result<Option<Record>> {
        let mut records = self.load_all(entity)?;
        let removed = records
            .iter()
            .position(|r| r.id == id)
            .map(|index| records.remove(index));

        if removed.is_some() {
            self.save_all(entity, &records)?;
        }

        let mut ids = self.load_local_ids(entity)?;
        if ids.remove(&id) {
            self.save_local_ids(entity, &ids)?;
        }

        Ok(removed)
    }

    /// Overwrite both keys at once.
    pub fn replace_all(
        &mut self,
        entity: &str,
        records: &[Record],
        ids: &BTreeSet<RecordId>,
    ) -> Result<()> {
        self.save_all(entity, records)?;
        self.save_local_ids(entity, ids)
    }

    /// Drop everything stored for an entity.
    pub fn clear(&mut self, entity: &str) -> Result<()> {
        self.storage.remove(&records_key(entity))?;
        self.storage.remove(&local_ids_key(entity))
    }

    fn read_json<T: serde::de::DeserializeOwned + Default>(&self, key: &str) -> Result<T> {
        match self.storage.get(key)? {
            None => Ok(T::default()),
            Some(text) => serde_json::from_str(&text).map_err(|e| Error::InvalidStorage {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn write_json<T: serde::Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let text = serde_json::to_string(value).map_err(|e| Error::Storage(e.to_string()))?;
        self.storage.set(key, text)
    }
}
