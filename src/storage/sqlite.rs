//! SQLite storage backend for less-rev.
//!
//! Implements `RevisionStore` and `SettingsStore` using rusqlite (bundled).
//! Revisions live in one table with a secondary index on `collection_key`;
//! settings live in a `meta` key-value table. The connection is guarded by
//! a `parking_lot::Mutex`.

use parking_lot::Mutex;
use rusqlite::{params, OptionalExtension};

use crate::error::{LessRevError, Result, StorageError};
use crate::types::{Revision, RevisionKind};

use super::traits::{RevisionStore, SettingsStore};

/// Map a rusqlite error to a `LessRevError`.
fn storage_err(e: rusqlite::Error) -> LessRevError {
    LessRevError::Storage(StorageError::Sqlite(e))
}

fn kind_to_sql(kind: RevisionKind) -> &'static str {
    match kind {
        RevisionKind::Snapshot => "snapshot",
        RevisionKind::Diff => "diff",
    }
}

/// Raw column values of one `revisions` row, decoded after the statement
/// finishes so JSON errors can be reported as corruption.
struct RevisionRow {
    id: String,
    collection_key: String,
    kind: String,
    created_at: String,
    parent_id: Option<String>,
    label: Option<String>,
    patch: Option<String>,
    blob: Option<String>,
}

impl RevisionRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            collection_key: row.get(1)?,
            kind: row.get(2)?,
            created_at: row.get(3)?,
            parent_id: row.get(4)?,
            label: row.get(5)?,
            patch: row.get(6)?,
            blob: row.get(7)?,
        })
    }

    fn corruption(
        &self,
        field: &str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> LessRevError {
        StorageError::Corruption {
            collection: self.collection_key.clone(),
            id: self.id.clone(),
            field: field.to_string(),
            source: source.into(),
        }
        .into()
    }

    fn into_revision(self) -> Result<Revision> {
        let kind = match self.kind.as_str() {
            "snapshot" => RevisionKind::Snapshot,
            "diff" => RevisionKind::Diff,
            other => return Err(self.corruption("kind", format!("unknown kind \"{other}\""))),
        };
        let patch = match &self.patch {
            Some(s) => Some(serde_json::from_str(s).map_err(|e| self.corruption("patch", e))?),
            None => None,
        };
        let blob = match &self.blob {
            Some(s) => Some(serde_json::from_str(s).map_err(|e| self.corruption("blob", e))?),
            None => None,
        };
        Ok(Revision {
            id: self.id,
            collection_key: self.collection_key,
            kind,
            created_at: self.created_at,
            parent_id: self.parent_id,
            label: self.label,
            patch,
            blob,
        })
    }
}

// ============================================================================
// SqliteStore
// ============================================================================

pub struct SqliteStore {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteStore {
    /// Open (and initialize) a file-backed SQLite database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = rusqlite::Connection::open(path).map_err(storage_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    /// Open an in-memory SQLite database (useful for tests).
    pub fn open_in_memory() -> Result<Self> {
        let conn = rusqlite::Connection::open_in_memory().map_err(storage_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA busy_timeout=5000;",
        )
        .map_err(storage_err)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS revisions (
                seq             INTEGER PRIMARY KEY AUTOINCREMENT,
                id              TEXT NOT NULL,
                collection_key  TEXT NOT NULL,
                kind            TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                parent_id       TEXT,
                label           TEXT,
                patch           TEXT,
                blob            TEXT,
                UNIQUE (collection_key, id)
            );
            CREATE INDEX IF NOT EXISTS idx_revisions_collection
                ON revisions(collection_key);
            CREATE TABLE IF NOT EXISTS meta (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );",
        )
        .map_err(storage_err)?;

        conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema:version', '1')",
            [],
        )
        .map_err(storage_err)?;
        Ok(())
    }
}

impl RevisionStore for SqliteStore {
    fn list_revisions(&self, collection_key: &str) -> Result<Vec<Revision>> {
        let rows: Vec<RevisionRow> = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, collection_key, kind, created_at, parent_id, label, patch, blob \
                     FROM revisions WHERE collection_key = ?1 ORDER BY seq",
                )
                .map_err(storage_err)?;
            let mapped = stmt
                .query_map(params![collection_key], RevisionRow::from_row)
                .map_err(storage_err)?;
            mapped
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(storage_err)?
        };
        rows.into_iter().map(RevisionRow::into_revision).collect()
    }

    fn put_revision(&self, revision: &Revision) -> Result<()> {
        let patch = revision.patch.as_ref().map(serde_json::to_string).transpose()?;
        let blob = revision.blob.as_ref().map(serde_json::to_string).transpose()?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO revisions \
             (id, collection_key, kind, created_at, parent_id, label, patch, blob) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                revision.id,
                revision.collection_key,
                kind_to_sql(revision.kind),
                revision.created_at,
                revision.parent_id,
                revision.label,
                patch,
                blob,
            ],
        )
        .map_err(storage_err)?;
        Ok(())
    }

    fn get_revision(&self, collection_key: &str, id: &str) -> Result<Option<Revision>> {
        let row = {
            let conn = self.conn.lock();
            let mut stmt = conn
                .prepare_cached(
                    "SELECT id, collection_key, kind, created_at, parent_id, label, patch, blob \
                     FROM revisions WHERE collection_key = ?1 AND id = ?2",
                )
                .map_err(storage_err)?;
            stmt.query_row(params![collection_key, id], RevisionRow::from_row)
                .optional()
                .map_err(storage_err)?
        };
        row.map(RevisionRow::into_revision).transpose()
    }
}

impl SettingsStore for SqliteStore {
    fn get_meta(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached("SELECT value FROM meta WHERE key = ?1")
            .map_err(storage_err)?;
        stmt.query_row(params![key], |row| row.get::<_, String>(0))
            .optional()
            .map_err(storage_err)
    }

    fn set_meta(&self, key: &str, value: Option<&str>) -> Result<()> {
        let conn = self.conn.lock();
        match value {
            Some(v) => conn.execute(
                "INSERT OR REPLACE INTO meta (key, value) VALUES (?1, ?2)",
                params![key, v],
            ),
            None => conn.execute("DELETE FROM meta WHERE key = ?1", params![key]),
        }
        .map(|_| ())
        .map_err(storage_err)
    }
}
