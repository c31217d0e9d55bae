//! Evaluation seam and the Jsonnet-backed implementation

use std::time::Duration;

use playground_jsonnet::{evaluate_snippet, EvalLimits, JsonnetError};

use crate::errors::{ExError, PlaygroundError, Result};

/// Turns source text into its JSON manifestation
pub trait Evaluator: Send + Sync {
    /// Evaluate `source` and return the manifested JSON
    ///
    /// # Errors
    ///
    /// `Evaluation` with the engine's diagnostic when the source does not
    /// parse or fails at runtime, `Timeout` when the wall-clock budget runs
    /// out.
    fn evaluate(&self, source: &str) -> Result<String>;
}

/// Runs each evaluation in a fresh interpreter; the engine gives every
/// run its own thread sized by `EvalLimits::stack_bytes`
#[derive(Debug, Clone)]
pub struct JsonnetEvaluator {
    limits: EvalLimits,
}

impl JsonnetEvaluator {
    pub fn new(limits: EvalLimits) -> Self {
        Self { limits }
    }

    /// Bound every evaluation by `timeout` of wall-clock time
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.limits.timeout = Some(timeout);
        self
    }

    pub fn with_stack_bytes(mut self, stack_bytes: usize) -> Self {
        self.limits.stack_bytes = stack_bytes;
        self
    }

    pub fn limits(&self) -> &EvalLimits {
        &self.limits
    }
}

impl Default for JsonnetEvaluator {
    fn default() -> Self {
        Self::new(EvalLimits::default())
    }
}

impl Evaluator for JsonnetEvaluator {
    fn evaluate(&self, source: &str) -> Result<String> {
        evaluate_snippet(source, &self.limits)
            .map_err(|err| ExError::from(engine_error(err)).with_op("evaluate"))
    }
}

fn engine_error(err: JsonnetError) -> PlaygroundError {
    match err {
        JsonnetError::Timeout { millis } => PlaygroundError::EvaluationTimeout { millis },
        JsonnetError::Internal { message } => PlaygroundError::Internal { message },
        other => PlaygroundError::Evaluation {
            message: other.to_string(),
        },
    }
}
