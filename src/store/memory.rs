use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{RecordStore, StoreError, CONVERSIONS};
use crate::record::ConversionRecord;

type Key = (String, String);

/// Keeps records in an ordered map for as long as the process lives.
pub struct MemoryStore {
    entries: Mutex<BTreeMap<Key, ConversionRecord>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn entries(&self) -> Result<MutexGuard<'_, BTreeMap<Key, ConversionRecord>>, StoreError> {
        self.entries
            .lock()
            .map_err(|err| StoreError::Backend(err.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

fn key_for(timestamp: &str) -> Key {
    (CONVERSIONS.to_string(), timestamp.to_string())
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn append(&self, record: &ConversionRecord) -> Result<(), StoreError> {
        match self.entries()?.entry(key_for(&record.timestamp)) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(record.timestamp.clone())),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(())
            }
        }
    }

    async fn list_all(&self) -> Result<Vec<ConversionRecord>, StoreError> {
        Ok(self
            .entries()?
            .iter()
            .filter(|((namespace, _), _)| namespace == CONVERSIONS)
            .map(|(_, record)| record.clone())
            .collect())
    }

    async fn find(&self, timestamp: &str) -> Result<Option<ConversionRecord>, StoreError> {
        Ok(self.entries()?.get(&key_for(timestamp)).cloned())
    }
}
