//! RevisionManager: compute, commit and resolve revisions for collections.
//!
//! Ties the pure patch engine to the storage collaborators. Commits for the
//! same collection key are serialized with a per-key async lock, since each
//! commit reads the active pointer, writes a revision and then moves the
//! pointer.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Mutex as TokioMutex;

use crate::canonical::{CanonicalCache, CanonicalSource};
use crate::config::InferenceConfig;
use crate::error::{Result, StorageError};
use crate::patch::diff::{compute_patch, DiffOptions, PatchComputation};
use crate::storage::traits::{RevisionStore, SettingsStore};
use crate::types::{CommitOptions, Patch, ResolveOptions, Revision};

use super::chain::{walk_chain, ChainResolver, ResolvedCollection};
use super::tracker::ActiveRevisionTracker;

// ============================================================================
// Options
// ============================================================================

/// Configuration for `RevisionManager`.
pub struct RevisionManagerOptions {
    pub revisions: Arc<dyn RevisionStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub canonical: Arc<dyn CanonicalSource>,
    /// Key inference heuristics (default: [`InferenceConfig::default`])
    pub inference: Option<InferenceConfig>,
}

// ============================================================================
// RevisionManager
// ============================================================================

pub struct RevisionManager {
    revisions: Arc<dyn RevisionStore>,
    tracker: ActiveRevisionTracker,
    canonical: Arc<CanonicalCache>,
    resolver: ChainResolver,
    inference: InferenceConfig,
    /// Per-collection async locks serializing commits
    locks: Mutex<HashMap<String, Arc<TokioMutex<()>>>>,
}

impl RevisionManager {
    pub fn new(options: RevisionManagerOptions) -> Self {
        let inference = options.inference.unwrap_or_default();
        let canonical = Arc::new(CanonicalCache::new(options.canonical));
        let resolver = ChainResolver::new(
            Arc::clone(&options.revisions),
            Arc::clone(&canonical),
            inference.default_array_key(),
        );
        Self {
            revisions: options.revisions,
            tracker: ActiveRevisionTracker::new(options.settings),
            canonical,
            resolver,
            inference,
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn canonical_cache(&self) -> &CanonicalCache {
        &self.canonical
    }

    pub fn inference(&self) -> &InferenceConfig {
        &self.inference
    }

    // -----------------------------------------------------------------------
    // Diffing
    // -----------------------------------------------------------------------

    /// [`compute_patch`] with this manager's inference settings.
    pub fn compute_patch(
        &self,
        base: &Value,
        input: &Value,
        replace_semantics: bool,
    ) -> PatchComputation {
        let options = DiffOptions {
            replace_semantics,
            inference: self.inference.clone(),
        };
        compute_patch(base, input, &options)
    }

    /// Diff `input` against the collection as currently resolved.
    pub async fn compute_against_active(
        &self,
        collection_key: &str,
        input: &Value,
        replace_semantics: bool,
    ) -> Result<PatchComputation> {
        let current = self.resolve_active(collection_key).await?;
        Ok(self.compute_patch(&current.collection, input, replace_semantics))
    }

    // -----------------------------------------------------------------------
    // Resolution
    // -----------------------------------------------------------------------

    pub async fn resolve_at_revision(
        &self,
        collection_key: &str,
        revision_id: Option<&str>,
        options: ResolveOptions,
    ) -> Result<ResolvedCollection> {
        self.resolver
            .resolve_at_revision(collection_key, revision_id, options)
            .await
    }

    /// Resolve at the active revision (or the base when none is active).
    pub async fn resolve_active(&self, collection_key: &str) -> Result<ResolvedCollection> {
        let active = self.tracker.get_active_revision_id(collection_key)?;
        self.resolver
            .resolve_at_revision(collection_key, active.as_deref(), ResolveOptions::default())
            .await
    }

    // -----------------------------------------------------------------------
    // Commit
    // -----------------------------------------------------------------------

    /// Store `patch` as a diff revision on top of the active one and make it
    /// active.
    pub async fn commit_patch(
        &self,
        collection_key: &str,
        patch: Patch,
        options: CommitOptions,
    ) -> Result<Revision> {
        self.with_lock(collection_key, async {
            let parent_id = self.tracker.get_active_revision_id(collection_key)?;
            let revision = Revision::diff(collection_key, parent_id, options.label, patch);
            self.persist_and_activate(revision)
        })
        .await
    }

    /// Store `blob` as a snapshot revision on top of the active one and make
    /// it active.
    pub async fn commit_snapshot(
        &self,
        collection_key: &str,
        blob: Value,
        options: CommitOptions,
    ) -> Result<Revision> {
        self.with_lock(collection_key, async {
            let parent_id = self.tracker.get_active_revision_id(collection_key)?;
            let revision = Revision::snapshot(collection_key, parent_id, options.label, blob);
            self.persist_and_activate(revision)
        })
        .await
    }

    fn persist_and_activate(&self, revision: Revision) -> Result<Revision> {
        self.revisions.put_revision(&revision)?;
        self.tracker
            .set_active_revision_id(&revision.collection_key, Some(&revision.id))?;
        tracing::debug!(
            collection = %revision.collection_key,
            revision_id = %revision.id,
            kind = ?revision.kind,
            parent_id = ?revision.parent_id,
            "revision committed"
        );
        Ok(revision)
    }

    // -----------------------------------------------------------------------
    // Active pointer
    // -----------------------------------------------------------------------

    pub fn get_active_revision_id(&self, collection_key: &str) -> Result<Option<String>> {
        self.tracker.get_active_revision_id(collection_key)
    }

    /// Set the pointer without validation; `None` reverts to the base.
    pub fn set_active_revision_id(
        &self,
        collection_key: &str,
        revision_id: Option<&str>,
    ) -> Result<()> {
        self.tracker
            .set_active_revision_id(collection_key, revision_id)
    }

    /// Make an existing revision active. Fails with `NotFound` if the id is
    /// not stored for this collection.
    pub async fn activate(&self, collection_key: &str, revision_id: &str) -> Result<()> {
        self.with_lock(collection_key, async {
            if self
                .revisions
                .get_revision(collection_key, revision_id)?
                .is_none()
            {
                return Err(StorageError::NotFound {
                    collection: collection_key.to_string(),
                    id: revision_id.to_string(),
                }
                .into());
            }
            self.tracker
                .set_active_revision_id(collection_key, Some(revision_id))?;
            tracing::debug!(collection = %collection_key, revision_id = %revision_id, "revision activated");
            Ok(())
        })
        .await
    }

    /// Point the collection back at its canonical base. Revisions are kept.
    pub async fn revert_to_base(&self, collection_key: &str) -> Result<()> {
        self.with_lock(collection_key, async {
            self.tracker.set_active_revision_id(collection_key, None)?;
            tracing::debug!(collection = %collection_key, "reverted to canonical base");
            Ok(())
        })
        .await
    }

    // -----------------------------------------------------------------------
    // History
    // -----------------------------------------------------------------------

    pub fn list_revisions(&self, collection_key: &str) -> Result<Vec<Revision>> {
        self.revisions.list_revisions(collection_key)
    }

    /// The active chain, oldest first. Empty when the base is active.
    pub fn history(&self, collection_key: &str) -> Result<Vec<Revision>> {
        let Some(active) = self.tracker.get_active_revision_id(collection_key)? else {
            return Ok(Vec::new());
        };
        let revisions = self.revisions.list_revisions(collection_key)?;
        let walk = walk_chain(&revisions, &active);
        Ok(walk.chain.into_iter().cloned().collect())
    }

    // -----------------------------------------------------------------------
    // Locking
    // -----------------------------------------------------------------------

    async fn with_lock<T, F: std::future::Future<Output = Result<T>>>(
        &self,
        collection_key: &str,
        f: F,
    ) -> Result<T> {
        let lock = {
            let mut locks = self.locks.lock();
            locks
                .entry(collection_key.to_string())
                .or_insert_with(|| Arc::new(TokioMutex::new(())))
                .clone()
        };
        let result = {
            let _guard = lock.lock().await;
            f.await
        };

        // Drop the entry once no other task holds or waits on it.
        let mut locks = self.locks.lock();
        if locks
            .get(collection_key)
            .is_some_and(|held| Arc::ptr_eq(held, &lock))
            && Arc::strong_count(&lock) == 2
        {
            locks.remove(collection_key);
        }
        result
    }
}
