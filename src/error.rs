use thiserror::Error;

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Revision not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    #[error("Storage corruption in {collection}/{id}: failed to parse \"{field}\" field")]
    Corruption {
        collection: String,
        id: String,
        field: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Storage backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Backend failure without an underlying cause.
    pub fn backend(message: impl Into<String>) -> Self {
        StorageError::Backend {
            message: message.into(),
            source: None,
        }
    }
}

// ---------------------------------------------------------------------------
// ResolveError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Failed to fetch canonical collection \"{collection}\": {message}")]
    Canonical { collection: String, message: String },
}

// ---------------------------------------------------------------------------
// LessRevError (top-level rollup)
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LessRevError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}

/// Convenience alias; the default error type is `LessRevError`.
pub type Result<T, E = LessRevError> = std::result::Result<T, E>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
