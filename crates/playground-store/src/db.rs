//! Database connection management

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, io_error, unsupported_url, Result};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Where a `DATABASE_URL` points
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

/// Parse a `DATABASE_URL`
///
/// Accepts `sqlite://<path>`, `sqlite:<path>`, `sqlite::memory:`,
/// `:memory:` and bare file paths. Query parameters are ignored.
pub fn parse_database_url(url: &str) -> Result<DatabaseLocation> {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(unsupported_url(url, "empty"));
    }

    let rest = if let Some(rest) = trimmed.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = trimmed.strip_prefix("sqlite:") {
        rest
    } else if trimmed.contains("://") {
        return Err(unsupported_url(url, "only sqlite is supported"));
    } else {
        trimmed
    };

    let path = rest.split('?').next().unwrap_or_default();
    match path {
        "" => Err(unsupported_url(url, "missing path")),
        ":memory:" => Ok(DatabaseLocation::Memory),
        path => Ok(DatabaseLocation::File(PathBuf::from(path))),
    }
}

/// Open a SQLite database at the given path, creating parent directories
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error("create_database_dir", e))?;
    }
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Open whatever `location` names
pub fn open_location(location: &DatabaseLocation) -> Result<Connection> {
    match location {
        DatabaseLocation::Memory => open_in_memory(),
        DatabaseLocation::File(path) => open(path),
    }
}

/// Apply connection settings: foreign keys, WAL journal, busy timeout
pub fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(from_rusqlite)?;

    // In-memory databases answer "memory" and keep that mode
    let mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .map_err(from_rusqlite)?;
    tracing::debug!(journal_mode = %mode, "configured sqlite connection");

    conn.busy_timeout(BUSY_TIMEOUT).map_err(from_rusqlite)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use playground_core::ExErrorKind;

    #[test]
    fn test_parse_memory_forms() {
        for url in ["sqlite::memory:", ":memory:", "sqlite://:memory:"] {
            assert_eq!(parse_database_url(url).unwrap(), DatabaseLocation::Memory);
        }
    }

    #[test]
    fn test_parse_file_forms() {
        assert_eq!(
            parse_database_url("sqlite://jsonnet-playground.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("jsonnet-playground.db"))
        );
        assert_eq!(
            parse_database_url("sqlite:/var/lib/app.db?mode=rwc").unwrap(),
            DatabaseLocation::File(PathBuf::from("/var/lib/app.db"))
        );
        assert_eq!(
            parse_database_url("data/app.db").unwrap(),
            DatabaseLocation::File(PathBuf::from("data/app.db"))
        );
    }

    #[test]
    fn test_parse_rejects_other_schemes() {
        let err = parse_database_url("postgres://user@localhost/db").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert!(parse_database_url("").is_err());
        assert!(parse_database_url("sqlite://").is_err());
    }

    #[test]
    fn test_configure_in_memory() {
        let conn = open_in_memory().unwrap();
        configure(&conn).unwrap();
        let fk: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk, 1);
    }
}
