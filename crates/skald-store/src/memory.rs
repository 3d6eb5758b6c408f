//! In-memory SourceStore

use crate::StoreError;
use skald_domain::traits::SourceStore;
use skald_domain::{Histogram, SourceRecord};
use std::collections::BTreeMap;

/// Map-backed implementation of SourceStore
///
/// Nothing survives the process. It can be taken offline to exercise the
/// failure paths of callers.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    records: BTreeMap<String, Histogram>,
    online: bool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            online: true,
        }
    }

    /// Make every subsequent operation fail with [`StoreError::Unavailable`]
    pub fn take_offline(&mut self) {
        self.online = false;
    }

    /// Undo [`MemoryStore::take_offline`]
    pub fn bring_online(&mut self) {
        self.online = true;
    }

    /// Number of stored sources
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no source
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.online {
            Ok(())
        } else {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        }
    }
}

impl SourceStore for MemoryStore {
    type Error = StoreError;

    fn load(&self, source_id: &str) -> Result<Option<Histogram>, Self::Error> {
        self.ensure_online()?;
        Ok(self.records.get(source_id).cloned())
    }

    fn save_all(&mut self, records: &[SourceRecord]) -> Result<(), Self::Error> {
        self.ensure_online()?;
        for record in records {
            self.records
                .insert(record.source_id.clone(), record.ratings.clone());
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<usize, Self::Error> {
        self.ensure_online()?;
        let removed = self.records.len();
        self.records.clear();
        Ok(removed)
    }

    fn source_ids(&self) -> Result<Vec<String>, Self::Error> {
        self.ensure_online()?;
        Ok(self.records.keys().cloned().collect())
    }
}
