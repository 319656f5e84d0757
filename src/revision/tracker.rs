//! Active revision pointer per collection, kept in the settings map.

use std::sync::Arc;

use crate::error::Result;
use crate::storage::traits::SettingsStore;

/// Settings key prefix for active revision pointers.
pub const ACTIVE_REVISION_PREFIX: &str = "activeRevision:";

pub struct ActiveRevisionTracker {
    settings: Arc<dyn SettingsStore>,
}

impl ActiveRevisionTracker {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    pub fn setting_key(collection_key: &str) -> String {
        format!("{ACTIVE_REVISION_PREFIX}{collection_key}")
    }

    /// Current revision id; `None` means the canonical base is current.
    pub fn get_active_revision_id(&self, collection_key: &str) -> Result<Option<String>> {
        Ok(self
            .settings
            .get_meta(&Self::setting_key(collection_key))?
            .filter(|id| !id.is_empty()))
    }

    /// Point the collection at `revision_id`; `None` reverts to the base.
    pub fn set_active_revision_id(
        &self,
        collection_key: &str,
        revision_id: Option<&str>,
    ) -> Result<()> {
        self.settings
            .set_meta(&Self::setting_key(collection_key), revision_id)
    }
}
