//! Canonical (un-edited) collections: the source trait and an explicit
//! cache in front of it.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{ResolveError, Result};

// ============================================================================
// CanonicalSource (user-provided fetch layer)
// ============================================================================

/// Where canonical collections come from (bundled files, HTTP, ...).
#[async_trait]
pub trait CanonicalSource: Send + Sync {
    /// Fetch the canonical collection for `collection_key`.
    /// `Ok(None)` means the key has no canonical base (a user-created
    /// collection).
    async fn fetch_canonical(
        &self,
        collection_key: &str,
    ) -> std::result::Result<Option<Value>, CanonicalFetchError>;
}

/// Fetch-level error reported by a [`CanonicalSource`].
#[derive(Debug, Clone)]
pub struct CanonicalFetchError {
    pub message: String,
}

impl CanonicalFetchError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CanonicalFetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CanonicalFetchError {}

/// Source with no canonical collections at all.
pub struct NoCanonical;

#[async_trait]
impl CanonicalSource for NoCanonical {
    async fn fetch_canonical(
        &self,
        _collection_key: &str,
    ) -> std::result::Result<Option<Value>, CanonicalFetchError> {
        Ok(None)
    }
}

// ============================================================================
// CanonicalCache
// ============================================================================

/// Memoizes canonical fetches per collection key, including "no canonical
/// base" answers. Failed fetches are not cached.
pub struct CanonicalCache {
    source: Arc<dyn CanonicalSource>,
    entries: Mutex<HashMap<String, Option<Value>>>,
}

impl CanonicalCache {
    pub fn new(source: Arc<dyn CanonicalSource>) -> Self {
        Self {
            source,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Cached canonical collection, fetching on a miss. `force` bypasses and
    /// replaces the cached entry.
    pub async fn get(&self, collection_key: &str, force: bool) -> Result<Option<Value>> {
        if !force {
            let cached = self.entries.lock().get(collection_key).cloned();
            if let Some(hit) = cached {
                return Ok(hit);
            }
        }

        let fetched = self
            .source
            .fetch_canonical(collection_key)
            .await
            .map_err(|e| ResolveError::Canonical {
                collection: collection_key.to_string(),
                message: e.message,
            })?;

        tracing::debug!(
            collection = %collection_key,
            force,
            found = fetched.is_some(),
            "canonical collection fetched"
        );
        self.entries
            .lock()
            .insert(collection_key.to_string(), fetched.clone());
        Ok(fetched)
    }

    pub fn invalidate(&self, collection_key: &str) {
        self.entries.lock().remove(collection_key);
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn is_cached(&self, collection_key: &str) -> bool {
        self.entries.lock().contains_key(collection_key)
    }
}
