//! SQLite-backed snippet store

#![allow(clippy::result_large_err)]

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use playground_core::errors::ExError;
use playground_core::model::{content_digest, validate_contents, Snippet, SnippetId};
use playground_core::store::{snippet_not_found, SnippetStore};
use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

use crate::db::{self, DatabaseLocation};
use crate::errors::{corrupt_row, from_rusqlite, Result};
use crate::migrations::apply_migrations;

const SELECT_COLUMNS: &str = "SELECT id, contents, created_at FROM snippets";

/// Snippet store over a single shared SQLite connection
///
/// Cloning is cheap; clones share the connection.
#[derive(Clone)]
pub struct SqliteSnippetStore {
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteSnippetStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSnippetStore").finish_non_exhaustive()
    }
}

impl SqliteSnippetStore {
    /// Open the database named by a `DATABASE_URL`, configure it and bring
    /// the schema up to date
    pub fn open(url: &str) -> Result<Self> {
        let location = db::parse_database_url(url)?;
        let conn = db::open_location(&location)?;
        if let DatabaseLocation::File(path) = &location {
            tracing::info!(path = %path.display(), "opened sqlite database");
        }
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    /// Wrap an already-open connection, configuring and migrating it
    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves no open transaction behind; the
        // connection is still usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnippetStore for SqliteSnippetStore {
    fn save(&self, contents: &str) -> Result<Snippet> {
        validate_contents(contents).map_err(|e| ExError::from(e).with_op("save"))?;

        let candidate = Snippet::create(contents);
        let digest = content_digest(contents);

        let mut conn = self.lock();
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;

        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO snippets (id, contents, content_digest, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    candidate.id.to_string(),
                    candidate.contents,
                    digest,
                    candidate.created_at.timestamp_millis(),
                ],
            )
            .map_err(from_rusqlite)?;

        let row = tx
            .query_row(
                &format!(
                    "{} WHERE content_digest = ?1 AND contents = ?2",
                    SELECT_COLUMNS
                ),
                rusqlite::params![digest, contents],
                read_row,
            )
            .map_err(from_rusqlite)?;

        tx.commit().map_err(from_rusqlite)?;
        drop(conn);

        let snippet = row.into_snippet()?;
        tracing::debug!(
            snippet_id = %snippet.id,
            deduplicated = inserted == 0,
            "saved snippet"
        );
        Ok(snippet)
    }

    fn get(&self, id: &SnippetId) -> Result<Snippet> {
        let row = self
            .lock()
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                [id.to_string()],
                read_row,
            )
            .optional()
            .map_err(from_rusqlite)?;

        match row {
            Some(row) => row.into_snippet(),
            None => Err(snippet_not_found(id)),
        }
    }

    fn count(&self) -> Result<u64> {
        let count: i64 = self
            .lock()
            .query_row("SELECT COUNT(*) FROM snippets", [], |row| row.get(0))
            .map_err(from_rusqlite)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

struct SnippetRow {
    id: String,
    contents: String,
    created_at: i64,
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<SnippetRow> {
    Ok(SnippetRow {
        id: row.get(0)?,
        contents: row.get(1)?,
        created_at: row.get(2)?,
    })
}

impl SnippetRow {
    fn into_snippet(self) -> Result<Snippet> {
        let id = SnippetId::parse(&self.id).map_err(|e| corrupt_row(&self.id, &e.to_string()))?;
        let created_at = DateTime::<Utc>::from_timestamp_millis(self.created_at)
            .ok_or_else(|| corrupt_row(&self.id, "created_at out of range"))?;
        Ok(Snippet {
            id,
            contents: self.contents,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playground_core::ExErrorKind;

    #[test]
    fn test_save_then_get() {
        let store = SqliteSnippetStore::open_in_memory().unwrap();
        let saved = store.save("local x = 1; x").unwrap();
        let fetched = store.get(&saved.id).unwrap();
        assert_eq!(fetched.contents, "local x = 1; x");
        assert_eq!(fetched.id, saved.id);
    }

    #[test]
    fn test_save_rejects_empty_contents() {
        let store = SqliteSnippetStore::open_in_memory().unwrap();
        let err = store.save("").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_id_is_persistence_error() {
        let store = SqliteSnippetStore::open_in_memory().unwrap();
        store
            .lock()
            .execute(
                "INSERT INTO snippets (id, contents, content_digest, created_at)
                 VALUES ('garbage', 'x', ?1, 0)",
                [content_digest("x")],
            )
            .unwrap();
        let err = store.save("x").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Persistence);
    }
}
