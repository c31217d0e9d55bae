//! Jsonnet interpreter used by the playground
//!
//! A self-contained, side-effect-free evaluator for the Jsonnet language
//! without imports or external variables. Evaluation is lazy and every run
//! is bounded by [`EvalLimits`].
//!
//! ```
//! use playground_jsonnet::{evaluate_snippet, EvalLimits};
//!
//! let out = evaluate_snippet("local x = 1; x + 1", &EvalLimits::default()).unwrap();
//! assert_eq!(out, "2");
//! ```

pub mod analyze;
pub mod ast;
pub mod error;
pub mod eval;
mod format;
pub mod lexer;
pub mod limits;
pub mod manifest;
pub mod parser;
pub mod stdlib;
pub mod value;

pub use error::{JsonnetError, Result};
pub use limits::EvalLimits;

use eval::Interpreter;

/// Names visible at the top level of every program
const GLOBALS: &[&str] = &["std"];

/// Evaluate a program and manifest the result as JSON
///
/// Output uses three-space indentation, sorted keys, and has no trailing
/// newline. The interpreter recurses on the native stack, so the work runs
/// on a scoped thread with `limits.stack_bytes` of stack; callers need no
/// stack headroom of their own.
///
/// # Errors
///
/// Returns a [`JsonnetError`] when the source does not parse, references
/// unknown names, fails at runtime, or exceeds one of the limits.
/// [`JsonnetError::Internal`] reports a thread that could not be started or
/// that panicked.
pub fn evaluate_snippet(source: &str, limits: &EvalLimits) -> Result<String> {
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("jsonnet-eval".to_string())
            .stack_size(limits.stack_bytes)
            .spawn_scoped(scope, || evaluate_on_current_thread(source, limits))
            .map_err(|e| JsonnetError::Internal {
                message: format!("failed to start evaluation thread: {}", e),
            })?;
        handle.join().map_err(|_| JsonnetError::Internal {
            message: "evaluator crashed".to_string(),
        })?
    })
}

fn evaluate_on_current_thread(source: &str, limits: &EvalLimits) -> Result<String> {
    let tokens = lexer::tokenize(source)?;
    let program = parser::parse(tokens, limits.max_parse_depth)?;
    analyze::check(&program, GLOBALS)?;

    let interp = Interpreter::new(*limits);
    let env = interp.root_env();
    let value = interp.eval(&program, &env)?;
    manifest::pretty(&interp, &value, "   ")
}
