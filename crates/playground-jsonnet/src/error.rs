//! Diagnostics produced by the engine

use thiserror::Error;

/// Result type alias using JsonnetError
pub type Result<T> = std::result::Result<T, JsonnetError>;

/// Every way an evaluation can fail
///
/// The variants only exist to produce good messages; callers outside this
/// crate treat them all as one evaluation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum JsonnetError {
    /// Source could not be tokenized or parsed
    #[error("syntax error at line {line}, column {column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Source parsed but is not well-formed (unknown variable, `self` outside an object)
    #[error("static error: {message}")]
    Static { message: String },

    /// Evaluation failed (type error, `error` expression, failed assertion)
    #[error("runtime error: {message}")]
    Runtime { message: String },

    /// A resource limit was hit
    #[error("resource limit exceeded: {message}")]
    Limit { message: String },

    /// The wall-clock budget ran out
    #[error("evaluation timed out after {millis} ms")]
    Timeout { millis: u64 },

    /// The evaluation thread could not be started or died
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl JsonnetError {
    /// The bare message without the class prefix
    pub fn message(&self) -> &str {
        match self {
            JsonnetError::Syntax { message, .. }
            | JsonnetError::Static { message }
            | JsonnetError::Runtime { message }
            | JsonnetError::Limit { message }
            | JsonnetError::Internal { message } => message,
            JsonnetError::Timeout { .. } => "evaluation timed out",
        }
    }
}

pub(crate) fn runtime(message: impl Into<String>) -> JsonnetError {
    JsonnetError::Runtime {
        message: message.into(),
    }
}

pub(crate) fn static_error(message: impl Into<String>) -> JsonnetError {
    JsonnetError::Static {
        message: message.into(),
    }
}

pub(crate) fn limit(message: impl Into<String>) -> JsonnetError {
    JsonnetError::Limit {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_display_includes_position() {
        let err = JsonnetError::Syntax {
            line: 3,
            column: 7,
            message: "unexpected end of input".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "syntax error at line 3, column 7: unexpected end of input"
        );
        assert_eq!(err.message(), "unexpected end of input");
    }

    #[test]
    fn test_runtime_display() {
        assert_eq!(runtime("boom").to_string(), "runtime error: boom");
    }
}
