//! Collaborators shared by every request

use std::sync::Arc;
use std::time::Duration;

use playground_core::{Evaluator, SnippetStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn SnippetStore>,
    pub evaluator: Arc<dyn Evaluator>,
    /// Per-request bound on `execute`
    pub eval_timeout: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SnippetStore>,
        evaluator: Arc<dyn Evaluator>,
        eval_timeout: Duration,
    ) -> Self {
        Self {
            store,
            evaluator,
            eval_timeout,
        }
    }
}
