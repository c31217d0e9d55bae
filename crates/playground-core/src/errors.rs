use playground_core_types::RequestId;
use thiserror::Error;

/// Result type alias used across the store and evaluator seams
pub type Result<T> = std::result::Result<T, ExError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that tests and log queries can
/// match on without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,
    NotFound,
    ConstraintViolation,

    // Evaluation
    Evaluation,
    Timeout,

    // Infrastructure
    Io,
    Persistence,
    Serialization,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput => "ERR_INVALID_INPUT",
            Self::NotFound => "ERR_NOT_FOUND",
            Self::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            Self::Evaluation => "ERR_EVALUATION",
            Self::Timeout => "ERR_TIMEOUT",
            Self::Io => "ERR_IO",
            Self::Persistence => "ERR_PERSISTENCE",
            Self::Serialization => "ERR_SERIALIZATION",
            Self::Internal => "ERR_INTERNAL",
        }
    }

    /// Coarse class used by the HTTP layer to pick a status and message
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidInput => ErrorClass::Validation,
            Self::NotFound => ErrorClass::NotFound,
            Self::Persistence | Self::Io | Self::ConstraintViolation | Self::Internal => {
                ErrorClass::Storage
            }
            Self::Evaluation | Self::Timeout => ErrorClass::Evaluation,
            Self::Serialization => ErrorClass::Serialization,
        }
    }
}

/// The five failure classes callers of the service can observe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    NotFound,
    Storage,
    Evaluation,
    Serialization,
}

/// Structured error with kind, context and message
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    request_id: Option<RequestId>,
    message: String,
    source: Option<Box<ExError>>,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            request_id: None,
            message: String::new(),
            source: None,
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Add source error
    pub fn with_source(mut self, source: ExError) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn class(&self) -> ErrorClass {
        self.kind.class()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    /// Human-readable cause, without code or context decoration
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn source_error(&self) -> Option<&ExError> {
        self.source.as_deref()
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn std::error::Error + 'static))
    }
}

// ========== End Error Facility ==========

/// Domain errors raised by validation, storage and evaluation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaygroundError {
    #[error("missing contents")]
    MissingContents,

    #[error("contents too long: {len} characters exceeds the limit of {max}")]
    ContentsTooLong { len: usize, max: usize },

    #[error("missing id")]
    MissingId,

    #[error("invalid id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    #[error("snippet not found")]
    SnippetNotFound { id: String },

    #[error("{message}")]
    Evaluation { message: String },

    #[error("evaluation timed out after {millis} ms")]
    EvaluationTimeout { millis: u64 },

    #[error("{message}")]
    Internal { message: String },
}

impl From<PlaygroundError> for ExError {
    fn from(err: PlaygroundError) -> Self {
        let message = err.to_string();
        match err {
            PlaygroundError::MissingContents | PlaygroundError::ContentsTooLong { .. } => {
                ExError::new(ExErrorKind::InvalidInput)
                    .with_entity_id("contents")
                    .with_message(message)
            }
            PlaygroundError::MissingId => ExError::new(ExErrorKind::InvalidInput)
                .with_entity_id("id")
                .with_message(message),
            PlaygroundError::InvalidId { id, reason } => ExError::new(ExErrorKind::InvalidInput)
                .with_entity_id(id)
                .with_message(reason),
            PlaygroundError::SnippetNotFound { id } => ExError::new(ExErrorKind::NotFound)
                .with_entity_id(id)
                .with_message(message),
            PlaygroundError::Evaluation { .. } => {
                ExError::new(ExErrorKind::Evaluation).with_message(message)
            }
            PlaygroundError::EvaluationTimeout { .. } => {
                ExError::new(ExErrorKind::Timeout).with_message(message)
            }
            PlaygroundError::Internal { message } => {
                ExError::new(ExErrorKind::Internal).with_message(message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_has_a_distinct_code() {
        let kinds = [
            ExErrorKind::InvalidInput,
            ExErrorKind::NotFound,
            ExErrorKind::ConstraintViolation,
            ExErrorKind::Evaluation,
            ExErrorKind::Timeout,
            ExErrorKind::Io,
            ExErrorKind::Persistence,
            ExErrorKind::Serialization,
            ExErrorKind::Internal,
        ];
        let codes: std::collections::HashSet<_> = kinds.iter().map(|k| k.code()).collect();
        assert_eq!(codes.len(), kinds.len());
        assert!(codes.iter().all(|c| c.starts_with("ERR_")));
    }

    #[test]
    fn test_invalid_id_keeps_only_the_cause() {
        let err: ExError = PlaygroundError::InvalidId {
            id: "nope".to_string(),
            reason: "invalid length".to_string(),
        }
        .into();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
        assert_eq!(err.message(), "invalid length");
        assert_eq!(err.entity_id(), Some("nope"));
    }

    #[test]
    fn test_source_chain_is_exposed() {
        let inner = ExError::new(ExErrorKind::Io).with_message("disk full");
        let outer = ExError::new(ExErrorKind::Persistence).with_source(inner);
        let source = std::error::Error::source(&outer).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("[ERR_IO]: disk full"));
    }
}
