use rusqlite::Connection;
use tillstore_core::db::migrations::latest_version;
use tillstore_core::db::{open_db, open_db_in_memory, DbError};
use tillstore_core::{Store, StoreConfig, StoreError, StoreLocation};

#[test]
fn open_db_in_memory_creates_catalog() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "record_types");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("till.db"));

    let conn_first = open_db(&config).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&config).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "record_types");
}

#[test]
fn opening_database_with_newer_catalog_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let config = StoreConfig {
        location: StoreLocation::File { path },
        busy_timeout_ms: 100,
    };
    match open_db(&config).unwrap_err() {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(
        Store::open(&config),
        Err(StoreError::Db(DbError::UnsupportedSchemaVersion { .. }))
    ));
}

#[test]
fn opening_missing_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("missing").join("till.db"));
    assert!(matches!(open_db(&config), Err(DbError::Sqlite(_))));
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
