/// Storage collaborator traits for less-rev.
///
/// `RevisionStore` holds immutable revision records, indexed by collection
/// key. `SettingsStore` is a flat string key-value map; the active-revision
/// pointer lives there. Both are synchronous and must be `Send + Sync` so a
/// single instance can be shared behind an `Arc`.
use crate::error::Result;
use crate::types::Revision;

/// Persistent home of revision records.
pub trait RevisionStore: Send + Sync {
    /// All revisions recorded for a collection, in insertion order.
    /// Order carries no meaning for resolution; parent pointers do.
    fn list_revisions(&self, collection_key: &str) -> Result<Vec<Revision>>;

    /// Persist a new revision. Revisions are never updated in place.
    fn put_revision(&self, revision: &Revision) -> Result<()>;

    /// Fetch a single revision by id, scoped to a collection.
    /// The default implementation scans `list_revisions`.
    fn get_revision(&self, collection_key: &str, id: &str) -> Result<Option<Revision>> {
        Ok(self
            .list_revisions(collection_key)?
            .into_iter()
            .find(|r| r.id == id))
    }
}

/// String key-value settings map.
pub trait SettingsStore: Send + Sync {
    /// Read a setting. Returns `None` if it was never set or was cleared.
    fn get_meta(&self, key: &str) -> Result<Option<String>>;

    /// Write a setting; `None` clears it.
    fn set_meta(&self, key: &str, value: Option<&str>) -> Result<()>;
}
