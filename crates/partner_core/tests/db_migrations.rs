use partner_core::db::migrations::{apply_migrations, latest_version, schema_version};
use partner_core::db::{open_db, open_db_in_memory, DbError};
use rusqlite::Connection;

const PORTAL_TABLES: [&str; 5] = ["partners", "categories", "partner_configs", "screens", "fields"];

#[test]
fn fresh_database_has_every_portal_table() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    for table in PORTAL_TABLES {
        assert!(has_object(&conn, "table", table), "missing table {table}");
    }
    assert!(has_object(&conn, "index", "idx_screens_partner_category_version"));
}

#[test]
fn reopening_a_file_applies_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("portal.sqlite3");
    drop(open_db(&path).unwrap());

    let mut conn = open_db(&path).unwrap();
    assert_eq!(apply_migrations(&mut conn).unwrap(), 0);
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
}

#[test]
fn version_one_database_is_upgraded_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("v1.sqlite3");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(include_str!("../src/db/migrations/0001_init.sql"))
            .unwrap();
        conn.pragma_update(None, "user_version", 1).unwrap();
        conn.execute(
            "INSERT INTO partners (id, name) VALUES ('p-1', 'acme');",
            [],
        )
        .unwrap();
    }

    let conn = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn).unwrap(), latest_version());
    assert!(has_object(&conn, "index", "idx_partner_configs_partner_version"));
    let partners: i64 = conn
        .query_row("SELECT COUNT(*) FROM partners;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(partners, 1);
}

#[test]
fn deleting_a_partner_row_cascades() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(
        "INSERT INTO partners (id, name) VALUES ('p-1', 'acme');
         INSERT INTO categories (id, partner_id, name) VALUES ('c-1', 'p-1', 'loans');
         INSERT INTO screens (id, partner_id, category_name, configuration_version)
         VALUES ('s-1', 'p-1', 'loans', 1);
         INSERT INTO fields (id, screen_id, type, configuration_version)
         VALUES ('f-1', 's-1', 'text', 1);
         DELETE FROM partners WHERE id = 'p-1';",
    )
    .unwrap();

    for table in PORTAL_TABLES {
        let rows: i64 = conn
            .query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0, "{table} kept rows");
    }
}

#[test]
fn newer_schema_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.sqlite3");
    {
        let conn = Connection::open(&path).unwrap();
        conn.pragma_update(None, "user_version", 999).unwrap();
    }

    match open_db(&path).unwrap_err() {
        DbError::UnsupportedSchemaVersion { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

fn has_object(conn: &Connection, kind: &str, name: &str) -> bool {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = ?1 AND name = ?2);",
        [kind, name],
        |row| row.get(0),
    )
    .unwrap()
}
