//! Domain layer of the Jsonnet playground
//!
//! Holds the snippet model, the storage and evaluation seams the HTTP layer
//! is written against, and the error and logging facilities shared by every
//! crate in the workspace.

pub mod errors;
pub mod eval;
pub mod logging_facility;
pub mod model;
pub mod store;

// Macros expand to `$crate::schema::*`
pub use playground_core_types::schema;
pub use playground_core_types::{RequestId, Sensitive};

pub use errors::{ErrorClass, ExError, ExErrorKind, PlaygroundError, Result};
pub use eval::{Evaluator, JsonnetEvaluator};
pub use model::{Snippet, SnippetId, MAX_CONTENTS_CHARS};
pub use store::SnippetStore;
