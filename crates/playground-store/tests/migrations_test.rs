// Integration tests for the migration framework

use playground_core::ExErrorKind;
use playground_store::migrations::{apply_migrations, compute_checksum, get_migrations};
use rusqlite::Connection;

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

fn get_table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
        .unwrap();

    let tables = stmt
        .query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap();

    tables
}

#[test]
fn test_apply_migrations_on_empty_db() {
    let mut conn = setup_test_db();

    let result = apply_migrations(&mut conn);
    assert!(
        result.is_ok(),
        "Migrations should succeed: {:?}",
        result.err()
    );

    assert_eq!(get_table_names(&conn), vec!["schema_version", "snippets"]);
}

#[test]
fn test_migration_idempotency() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    assert_eq!(apply_migrations(&mut conn).unwrap(), 0);

    let version_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version_count, get_migrations().len() as i64);
}

#[test]
fn test_checksum_is_recorded() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    let checksum: String = conn
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?",
            ["001_initial_schema"],
            |row| row.get(0),
        )
        .unwrap();

    let embedded = &get_migrations()[0];
    assert_eq!(checksum, compute_checksum(embedded.sql));
}

#[test]
fn test_checksum_mismatch_is_fatal() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();
    conn.execute(
        "UPDATE schema_version SET checksum = 'tampered' WHERE migration_id = '001_initial_schema'",
        [],
    )
    .unwrap();

    let err = apply_migrations(&mut conn).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
    assert!(err.message().contains("001_initial_schema"));
}

#[test]
fn test_contents_are_unique_at_the_schema_level() {
    let mut conn = setup_test_db();
    apply_migrations(&mut conn).unwrap();

    let insert = "INSERT INTO snippets (id, contents, content_digest, created_at) VALUES (?1, 'same', 'd', 0)";
    conn.execute(insert, ["a"]).unwrap();
    assert!(conn.execute(insert, ["b"]).is_err());
}
