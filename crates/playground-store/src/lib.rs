//! SQLite persistence for playground snippets
//!
//! Provides:
//! - Connection opening from a `DATABASE_URL`
//! - Embedded, checksummed schema migrations
//! - `SqliteSnippetStore`, the durable `SnippetStore`

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;

pub use errors::Result;
pub use repo::SqliteSnippetStore;
