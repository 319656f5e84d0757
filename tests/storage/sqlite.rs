//! SqliteStore tests against in-memory and temp-file databases.

use less_rev::error::{LessRevError, StorageError};
use less_rev::storage::sqlite::SqliteStore;
use less_rev::storage::traits::{RevisionStore, SettingsStore};
use less_rev::types::{Patch, Revision};
use serde_json::json;

// ============================================================================
// Helpers
// ============================================================================

fn make_store() -> SqliteStore {
    SqliteStore::open_in_memory().expect("open in-memory DB")
}

fn diff(collection: &str, id: &str, parent: Option<&str>) -> Revision {
    let mut patch = Patch::new("entries", "id");
    patch.entries.upsert = vec![json!({"id": id})];
    patch.metadata.set.insert("touched".to_string(), json!(true));
    let mut revision = Revision::diff(collection, parent.map(str::to_string), None, patch);
    revision.id = id.to_string();
    revision
}

fn temp_db_path() -> String {
    std::env::temp_dir()
        .join(format!("less-rev-{}.db", uuid::Uuid::new_v4()))
        .to_string_lossy()
        .into_owned()
}

// ============================================================================
// Revisions
// ============================================================================

#[test]
fn put_then_list_round_trips() {
    let store = make_store();
    let first = diff("vocab", "r1", None);
    let snapshot = Revision::snapshot(
        "vocab",
        Some("r1".to_string()),
        Some("import".to_string()),
        json!({"metadata": {"name": "V"}, "entries": [{"id": "a", "n": 1.5}]}),
    );

    store.put_revision(&first).unwrap();
    store.put_revision(&snapshot).unwrap();

    assert_eq!(store.list_revisions("vocab").unwrap(), vec![first, snapshot]);
}

#[test]
fn list_is_scoped_to_collection() {
    let store = make_store();
    store.put_revision(&diff("a", "r1", None)).unwrap();
    store.put_revision(&diff("b", "r2", None)).unwrap();

    let listed = store.list_revisions("a").unwrap();

    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, "r1");
    assert!(store.list_revisions("c").unwrap().is_empty());
}

#[test]
fn get_revision_by_id() {
    let store = make_store();
    let revision = diff("a", "r1", None);
    store.put_revision(&revision).unwrap();

    assert_eq!(store.get_revision("a", "r1").unwrap(), Some(revision));
    assert_eq!(store.get_revision("a", "r2").unwrap(), None);
    assert_eq!(store.get_revision("b", "r1").unwrap(), None);
}

#[test]
fn duplicate_id_fails() {
    let store = make_store();
    store.put_revision(&diff("a", "r1", None)).unwrap();

    let err = store.put_revision(&diff("a", "r1", None)).unwrap_err();

    assert!(matches!(err, LessRevError::Storage(StorageError::Sqlite(_))));
}

#[test]
fn corrupt_patch_column_reports_corruption() {
    let path = temp_db_path();
    {
        let store = SqliteStore::open(&path).unwrap();
        store.put_revision(&diff("a", "r1", None)).unwrap();
    }
    {
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute("UPDATE revisions SET patch = '{not json' WHERE id = 'r1'", [])
            .unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();
    let err = store.list_revisions("a").unwrap_err();

    match err {
        LessRevError::Storage(StorageError::Corruption { id, field, .. }) => {
            assert_eq!(id, "r1");
            assert_eq!(field, "patch");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    drop(store);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn data_survives_reopen() {
    let path = temp_db_path();
    {
        let store = SqliteStore::open(&path).unwrap();
        store.put_revision(&diff("a", "r1", None)).unwrap();
        store.set_meta("activeRevision:a", Some("r1")).unwrap();
    }

    let store = SqliteStore::open(&path).unwrap();

    assert_eq!(store.list_revisions("a").unwrap().len(), 1);
    assert_eq!(store.get_meta("activeRevision:a").unwrap().as_deref(), Some("r1"));
    drop(store);
    let _ = std::fs::remove_file(&path);
}

// ============================================================================
// Settings
// ============================================================================

#[test]
fn meta_set_replace_delete() {
    let store = make_store();
    assert_eq!(store.get_meta("k").unwrap(), None);

    store.set_meta("k", Some("v1")).unwrap();
    store.set_meta("k", Some("v2")).unwrap();
    assert_eq!(store.get_meta("k").unwrap().as_deref(), Some("v2"));

    store.set_meta("k", None).unwrap();
    assert_eq!(store.get_meta("k").unwrap(), None);
}

#[test]
fn schema_version_is_seeded() {
    let store = make_store();
    assert_eq!(store.get_meta("schema:version").unwrap().as_deref(), Some("1"));
}
