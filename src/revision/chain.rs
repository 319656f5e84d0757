//! Revision chain resolution.
//!
//! Walks parent pointers from a target revision back to the root, then
//! replays the chain oldest-first on top of a seed collection. The walk stops
//! at a missing parent or a revisited id, so a corrupted store always
//! resolves to a best-effort result instead of looping or failing.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::canonical::CanonicalCache;
use crate::error::Result;
use crate::patch::apply::apply_patch;
use crate::storage::traits::RevisionStore;
use crate::types::{ResolveOptions, Revision, RevisionBody};

// ============================================================================
// Walk
// ============================================================================

/// Why a chain walk ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStop {
    /// Reached a revision without a parent.
    Root,
    /// A parent id is not in the store; the walk was truncated there.
    Dangling { parent_id: String },
    /// A parent id was already visited; the walk was truncated there.
    Cycle { revision_id: String },
    /// The requested revision is not in the store.
    UnknownTarget { revision_id: String },
}

impl ChainStop {
    pub fn is_truncated(&self) -> bool {
        !matches!(self, ChainStop::Root)
    }
}

/// Revisions from the root (or truncation point) to the target, oldest first.
#[derive(Debug, Clone)]
pub struct ChainWalk<'a> {
    pub chain: Vec<&'a Revision>,
    pub stop: ChainStop,
}

/// Follow `parent_id` links from `target_id`. When ids repeat in
/// `revisions`, the first record wins.
pub fn walk_chain<'a>(revisions: &'a [Revision], target_id: &str) -> ChainWalk<'a> {
    let mut by_id: HashMap<&str, &Revision> = HashMap::with_capacity(revisions.len());
    for revision in revisions {
        by_id.entry(revision.id.as_str()).or_insert(revision);
    }

    let Some(mut current) = by_id.get(target_id).copied() else {
        return ChainWalk {
            chain: Vec::new(),
            stop: ChainStop::UnknownTarget {
                revision_id: target_id.to_string(),
            },
        };
    };

    let mut visited: HashSet<&str> = HashSet::new();
    let mut chain = Vec::new();
    let stop = loop {
        visited.insert(current.id.as_str());
        chain.push(current);
        let Some(parent_id) = current.parent_id.as_deref() else {
            break ChainStop::Root;
        };
        if visited.contains(parent_id) {
            break ChainStop::Cycle {
                revision_id: parent_id.to_string(),
            };
        }
        match by_id.get(parent_id).copied() {
            Some(parent) => current = parent,
            None => {
                break ChainStop::Dangling {
                    parent_id: parent_id.to_string(),
                }
            }
        }
    };

    chain.reverse();
    ChainWalk { chain, stop }
}

// ============================================================================
// Replay
// ============================================================================

/// Outcome of replaying revisions onto a seed.
#[derive(Debug, Clone, PartialEq)]
pub struct Replay {
    pub collection: Value,
    pub applied: usize,
    /// Malformed revisions (kind does not match payload) that were skipped.
    pub skipped: usize,
}

/// Replay `chain` in order: snapshots replace the working collection, diffs
/// are applied to it, malformed revisions are skipped.
pub fn replay(seed: Value, chain: &[&Revision]) -> Replay {
    let mut working = seed;
    let mut applied = 0;
    let mut skipped = 0;

    for revision in chain {
        match revision.body() {
            Some(RevisionBody::Snapshot(blob)) => {
                working = blob.clone();
                applied += 1;
            }
            Some(RevisionBody::Diff(patch)) => {
                working = apply_patch(&working, patch);
                applied += 1;
            }
            None => {
                tracing::warn!(
                    collection = %revision.collection_key,
                    revision_id = %revision.id,
                    kind = ?revision.kind,
                    "skipping malformed revision"
                );
                skipped += 1;
            }
        }
    }

    Replay {
        collection: working,
        applied,
        skipped,
    }
}

/// Seed used when a collection has neither a snapshot nor a canonical base.
pub fn empty_collection(collection_key: &str, array_key: &str) -> Value {
    let mut collection = json!({ "metadata": { "name": collection_key, "version": 1 } });
    if let Value::Object(obj) = &mut collection {
        obj.insert(array_key.to_string(), Value::Array(Vec::new()));
    }
    collection
}

// ============================================================================
// ChainResolver
// ============================================================================

/// Collection reconstructed at a revision, with diagnostics kept outside the
/// document itself.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCollection {
    pub collection: Value,
    /// Revision the collection was resolved at; `None` for the base.
    pub revision_id: Option<String>,
    pub stop: ChainStop,
    pub applied: usize,
    pub skipped: usize,
}

pub struct ChainResolver {
    revisions: Arc<dyn RevisionStore>,
    canonical: Arc<CanonicalCache>,
    default_array_key: String,
}

impl ChainResolver {
    pub fn new(
        revisions: Arc<dyn RevisionStore>,
        canonical: Arc<CanonicalCache>,
        default_array_key: impl Into<String>,
    ) -> Self {
        Self {
            revisions,
            canonical,
            default_array_key: default_array_key.into(),
        }
    }

    /// Reconstruct `collection_key` at `revision_id`; `None` resolves to the
    /// canonical base. Store and canonical fetch failures propagate; chain
    /// corruption truncates the walk and is reported in `stop`.
    pub async fn resolve_at_revision(
        &self,
        collection_key: &str,
        revision_id: Option<&str>,
        options: ResolveOptions,
    ) -> Result<ResolvedCollection> {
        let Some(revision_id) = revision_id else {
            let collection = self.seed(collection_key, options.base_blob).await?;
            return Ok(ResolvedCollection {
                collection,
                revision_id: None,
                stop: ChainStop::Root,
                applied: 0,
                skipped: 0,
            });
        };

        let revisions = self.revisions.list_revisions(collection_key)?;
        let walk = walk_chain(&revisions, revision_id);
        if walk.stop.is_truncated() {
            tracing::warn!(
                collection = %collection_key,
                revision_id = %revision_id,
                stop = ?walk.stop,
                kept = walk.chain.len(),
                "revision chain truncated"
            );
        }

        // Everything before the latest snapshot is replaced by it, so replay
        // starts there and the canonical base is not needed.
        let last_snapshot = walk
            .chain
            .iter()
            .rposition(|r| matches!(r.body(), Some(RevisionBody::Snapshot(_))));
        let (seed, rest) = match last_snapshot {
            Some(i) => (Value::Null, &walk.chain[i..]),
            None => (
                self.seed(collection_key, options.base_blob).await?,
                &walk.chain[..],
            ),
        };

        let replayed = replay(seed, rest);
        Ok(ResolvedCollection {
            collection: replayed.collection,
            revision_id: Some(revision_id.to_string()),
            stop: walk.stop,
            applied: replayed.applied,
            skipped: replayed.skipped,
        })
    }

    /// Caller-provided base, else canonical, else an empty collection.
    async fn seed(&self, collection_key: &str, base_blob: Option<Value>) -> Result<Value> {
        if let Some(blob) = base_blob {
            return Ok(blob);
        }
        Ok(self
            .canonical
            .get(collection_key, false)
            .await?
            .unwrap_or_else(|| empty_collection(collection_key, &self.default_array_key)))
    }
}
