//! HTTP surface of the Jsonnet playground
//!
//! Three JSON endpoints under `/api/v1` (save, get, execute) plus the static
//! single-page app for every other path.

pub mod config;
pub mod envelope;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use config::{Config, LogFormat};
pub use router::{build_router, build_router_with_timeout};
pub use state::AppState;
