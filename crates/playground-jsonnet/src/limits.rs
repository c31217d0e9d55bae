//! Resource ceilings applied to a single evaluation

use std::time::Duration;

/// Stack reserved for the evaluation thread
pub const DEFAULT_STACK_BYTES: usize = 256 * 1024 * 1024;

/// Bounds on one evaluation
///
/// Every snippet is untrusted input, so the interpreter refuses to run
/// past these limits instead of exhausting the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalLimits {
    /// Maximum number of nested function calls
    pub max_stack: usize,
    /// Maximum nesting of the interpreter itself (expressions, thunks, manifestation)
    pub max_depth: usize,
    /// Maximum number of evaluation steps (each expression and each allocation counts)
    pub max_steps: u64,
    /// Maximum syntactic nesting accepted by the parser
    pub max_parse_depth: usize,
    /// Longest string value that may be built
    pub max_string_bytes: usize,
    /// Most elements a single array may hold
    pub max_array_len: usize,
    /// Longest manifested output
    pub max_output_bytes: usize,
    /// Wall-clock budget, measured from interpreter creation
    pub timeout: Option<Duration>,
    /// Stack size of the thread [`evaluate_snippet`](crate::evaluate_snippet) runs on;
    /// `max_depth` must fit inside it
    pub stack_bytes: usize,
}

impl Default for EvalLimits {
    fn default() -> Self {
        Self {
            max_stack: 500,
            max_depth: 2_500,
            max_steps: 10_000_000,
            max_parse_depth: 1_000,
            max_string_bytes: 16 * 1024 * 1024,
            max_array_len: 4 * 1024 * 1024,
            max_output_bytes: 16 * 1024 * 1024,
            timeout: None,
            stack_bytes: DEFAULT_STACK_BYTES,
        }
    }
}
