//! Migration framework
//!
//! - Embedded SQL migrations applied in order
//! - Each application recorded in `schema_version` with a SHA-256 checksum
//! - Re-running is a no-op; an edited, already-applied migration is fatal

mod checksums;
mod embedded;
mod runner;

pub use checksums::compute_checksum;
pub use embedded::{get_migrations, Migration};
pub use runner::apply_migrations;
