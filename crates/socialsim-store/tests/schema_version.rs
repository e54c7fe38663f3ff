//! Schema versioning: a fresh database is stamped with the current
//! version; a database stamped with any other version is refused.

use rusqlite::Connection;
use socialsim_store::{Database, SCHEMA_VERSION};
use socialsim_types::{Error, RunConfig, RunRepository};
use tempfile::TempDir;

#[test]
fn fresh_database_is_stamped_with_current_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sim.sqlite");

    let db = Database::open(&path).unwrap();
    drop(db);

    let conn = Connection::open(&path).unwrap();
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version, SCHEMA_VERSION);
}

#[test]
fn reopening_preserves_data() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sim.sqlite");

    let db = Database::open(&path).unwrap();
    let run = db.create_run(&RunConfig::new(1, 1, "chronological")).unwrap();
    drop(db);

    let db = Database::open(&path).unwrap();
    let loaded = db.get_run(&run.run_id).unwrap();
    assert!(loaded.is_some());
}

#[test]
fn mismatched_version_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sim.sqlite");

    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch("PRAGMA user_version = 99").unwrap();
    }

    let err = Database::open(&path).unwrap_err();
    match err {
        Error::SchemaMismatch { found, expected } => {
            assert_eq!(found, 99);
            assert_eq!(expected, SCHEMA_VERSION);
        }
        other => panic!("expected SchemaMismatch, got {:?}", other),
    }
}
