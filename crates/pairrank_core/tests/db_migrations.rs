use pairrank_core::db::migrations::latest_version;
use pairrank_core::db::{open_db, open_db_in_memory, DbError};
use pairrank_core::{RepoError, SqliteRankingRepository};
use rusqlite::Connection;

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    for table in ["lists", "items", "ratings", "pairs"] {
        assert_table_exists(&conn, table);
    }
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pairrank.db");

    let conn_first = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_first), latest_version());
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_table_exists(&conn_second, "pairs");
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        } => {
            assert_eq!(db_version, 999);
            assert_eq!(latest_supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let err = SqliteRankingRepository::try_new(&conn)
        .err()
        .expect("raw connection must be rejected");
    assert!(matches!(
        err,
        RepoError::UninitializedConnection {
            actual_version: 0,
            ..
        }
    ));
}

#[test]
fn schema_rejects_winner_outside_pair() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO lists (id, name) VALUES ('l1', 'films');
         INSERT INTO items (id, list_id, kind, payload) VALUES ('a', 'l1', 'text', '\"A\"');
         INSERT INTO items (id, list_id, kind, payload) VALUES ('b', 'l1', 'text', '\"B\"');
         INSERT INTO items (id, list_id, kind, payload) VALUES ('c', 'l1', 'text', '\"C\"');
         INSERT INTO pairs (id, list_id, left_item_id, right_item_id) VALUES ('p1', 'l1', 'a', 'b');",
    )
    .unwrap();

    let result = conn.execute(
        "UPDATE pairs SET resolved = 1, winner_item_id = 'c' WHERE id = 'p1';",
        [],
    );
    assert!(result.is_err());
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
