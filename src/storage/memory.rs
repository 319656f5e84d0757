//! MemoryStore: an in-process `RevisionStore` + `SettingsStore`.
//!
//! Holds everything in `HashMap`s behind `parking_lot::Mutex`. Useful for
//! tests and for callers that persist elsewhere and only need the engine.
//!
//! ## Lock ordering
//!
//! `revisions` and `meta` are never held at the same time.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::error::{Result, StorageError};
use crate::types::Revision;

use super::traits::{RevisionStore, SettingsStore};

#[derive(Default)]
pub struct MemoryStore {
    /// collection key → revisions in insertion order
    revisions: Mutex<HashMap<String, Vec<Revision>>>,
    /// setting key → value
    meta: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of revisions stored for a collection.
    pub fn revision_count(&self, collection_key: &str) -> usize {
        self.revisions
            .lock()
            .get(collection_key)
            .map_or(0, Vec::len)
    }
}

impl RevisionStore for MemoryStore {
    fn list_revisions(&self, collection_key: &str) -> Result<Vec<Revision>> {
        Ok(self
            .revisions
            .lock()
            .get(collection_key)
            .cloned()
            .unwrap_or_default())
    }

    fn put_revision(&self, revision: &Revision) -> Result<()> {
        let mut revisions = self.revisions.lock();
        let list = revisions.entry(revision.collection_key.clone()).or_default();
        if list.iter().any(|r| r.id == revision.id) {
            return Err(StorageError::backend(format!(
                "revision {}/{} already exists",
                revision.collection_key, revision.id
            ))
            .into());
        }
        list.push(revision.clone());
        Ok(())
    }
}

impl SettingsStore for MemoryStore {
    fn get_meta(&self, key: &str) -> Result<Option<String>> {
        Ok(self.meta.lock().get(key).cloned())
    }

    fn set_meta(&self, key: &str, value: Option<&str>) -> Result<()> {
        let mut meta = self.meta.lock();
        match value {
            Some(v) => {
                meta.insert(key.to_string(), v.to_string());
            }
            None => {
                meta.remove(key);
            }
        }
        Ok(())
    }
}
