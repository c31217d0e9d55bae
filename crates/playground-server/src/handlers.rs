//! Request handlers for `/api/v1`
//!
//! Every failure is answered with 400 and a `"<context>: <cause>"` message;
//! only a success body that fails to serialize yields 500.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, PathRejection};
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use playground_core::errors::{ExError, ExErrorKind, PlaygroundError};
use playground_core::model::{validate_contents, SnippetId};
use playground_core::{log_op_end, log_op_error, log_op_start, RequestId};
use serde::{Deserialize, Serialize};

use crate::envelope;
use crate::state::AppState;

pub const OP_SAVE: &str = "save_code";
pub const OP_GET: &str = "get_code";
pub const OP_EXECUTE: &str = "execute_code";

/// Body accepted by save and execute
#[derive(Debug, Default, Deserialize)]
pub struct CodeRequest {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveCodeResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GetCodeResponse {
    pub contents: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub output: String,
}

/// An error plus the context it is reported under
struct HandlerError {
    context: Option<&'static str>,
    error: ExError,
}

impl HandlerError {
    fn bare(error: impl Into<ExError>) -> Self {
        Self {
            context: None,
            error: error.into(),
        }
    }

    fn wrap(context: &'static str, error: impl Into<ExError>) -> Self {
        Self {
            context: Some(context),
            error: error.into(),
        }
    }

    fn message(&self) -> String {
        match self.context {
            Some(context) => format!("{}: {}", context, self.error.message()),
            None => self.error.message().to_string(),
        }
    }
}

type HandlerResult<T> = std::result::Result<T, HandlerError>;

/// `POST /api/v1/code`
pub async fn save_code(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    log_op_start!(OP_SAVE);
    finish(OP_SAVE, &request_id, started, save(&state, body).await)
}

async fn save(
    state: &AppState,
    body: Result<Bytes, BytesRejection>,
) -> HandlerResult<SaveCodeResponse> {
    let code = decode_code(body)?;
    validate_contents(&code).map_err(HandlerError::bare)?;

    let store = state.store.clone();
    let snippet = blocking(move || store.save(&code))
        .await
        .map_err(|e| HandlerError::wrap("failed to save", e))?;

    Ok(SaveCodeResponse {
        id: snippet.id.to_string(),
    })
}

/// `GET /api/v1/code/:id`
///
/// A path segment that does not decode (`%FF`) is reported like any other
/// malformed id.
pub async fn get_code(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    path: Result<Path<String>, PathRejection>,
) -> Response {
    let started = Instant::now();
    let result = match path {
        Ok(Path(raw_id)) => {
            log_op_start!(OP_GET, snippet_id = %raw_id);
            get(&state, &raw_id).await
        }
        Err(rejection) => {
            log_op_start!(OP_GET);
            Err(path_error(&rejection))
        }
    };
    finish(OP_GET, &request_id, started, result)
}

fn path_error(rejection: &PathRejection) -> HandlerError {
    HandlerError::wrap(
        "failed to parse id",
        ExError::new(ExErrorKind::InvalidInput).with_message(rejection.body_text()),
    )
}

async fn get(state: &AppState, raw_id: &str) -> HandlerResult<GetCodeResponse> {
    let id = SnippetId::parse(raw_id).map_err(|e| match e {
        PlaygroundError::MissingId => HandlerError::bare(e),
        other => HandlerError::wrap("failed to parse id", other),
    })?;

    let store = state.store.clone();
    let snippet = blocking(move || store.get(&id))
        .await
        .map_err(|e| HandlerError::wrap("failed to get code", e))?;

    Ok(GetCodeResponse {
        contents: snippet.contents,
    })
}

/// `POST /api/v1/execute`
pub async fn execute_code(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();
    log_op_start!(OP_EXECUTE);
    finish(OP_EXECUTE, &request_id, started, execute(&state, body).await)
}

async fn execute(
    state: &AppState,
    body: Result<Bytes, BytesRejection>,
) -> HandlerResult<ExecuteResponse> {
    let code = decode_code(body)?;
    if code.is_empty() {
        return Err(HandlerError::bare(PlaygroundError::MissingContents));
    }

    let evaluator = state.evaluator.clone();
    let task = tokio::task::spawn_blocking(move || evaluator.evaluate(&code));
    let output = match tokio::time::timeout(state.eval_timeout, task).await {
        Ok(joined) => joined.map_err(join_error).and_then(|r| r),
        // The evaluation thread stops on its own deadline
        Err(_) => Err(PlaygroundError::EvaluationTimeout {
            millis: u64::try_from(state.eval_timeout.as_millis()).unwrap_or(u64::MAX),
        }
        .into()),
    }
    .map_err(|e| HandlerError::wrap("failed to evaluate code", e))?;

    Ok(ExecuteResponse { output })
}

/// Fallback for unknown paths under `/api/v1`
pub async fn not_found() -> Response {
    envelope::error(StatusCode::NOT_FOUND, "not found")
}

/// Decode `{"code": ...}` regardless of the request's content type
///
/// A missing or `null` field decodes to an empty string.
fn decode_code(body: Result<Bytes, BytesRejection>) -> HandlerResult<String> {
    let bytes = body.map_err(|e| {
        HandlerError::wrap(
            "failed to decode body",
            ExError::new(ExErrorKind::InvalidInput).with_message(e.body_text()),
        )
    })?;
    let request: CodeRequest = serde_json::from_slice(&bytes).map_err(|e| {
        HandlerError::wrap(
            "failed to decode body",
            ExError::new(ExErrorKind::InvalidInput).with_message(e.to_string()),
        )
    })?;
    Ok(request.code.unwrap_or_default())
}

async fn blocking<T, F>(f: F) -> playground_core::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> playground_core::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(join_error)
        .and_then(|r| r)
}

fn join_error(err: tokio::task::JoinError) -> ExError {
    ExError::new(ExErrorKind::Internal)
        .with_op("spawn_blocking")
        .with_message(format!("worker task failed: {}", err))
}

fn finish<T: Serialize>(
    op: &'static str,
    request_id: &RequestId,
    started: Instant,
    result: HandlerResult<T>,
) -> Response {
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    match result {
        Ok(body) => {
            log_op_end!(op, duration_ms = duration_ms);
            envelope::success(&body)
        }
        Err(err) => {
            let message = err.message();
            let class = err.error.class();
            let error = err.error.with_request_id(request_id.clone());
            log_op_error!(op, error, duration_ms = duration_ms, err.class = ?class);
            envelope::error(StatusCode::BAD_REQUEST, message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(raw: &str) -> Result<Bytes, BytesRejection> {
        Ok(Bytes::from(raw.to_string()))
    }

    #[test]
    fn test_decode_code_variants() {
        assert_eq!(decode_code(body(r#"{"code":"1+1"}"#)).ok(), Some("1+1".to_string()));
        assert_eq!(decode_code(body(r#"{"code":null}"#)).ok(), Some(String::new()));
        assert_eq!(decode_code(body("{}")).ok(), Some(String::new()));
    }

    #[test]
    fn test_decode_failure_message() {
        let err = decode_code(body("not json")).err().map(|e| e.message());
        assert!(err.is_some_and(|m| m.starts_with("failed to decode body: ")));

        let wrong_type = decode_code(body(r#"{"code": 5}"#)).err().map(|e| e.message());
        assert!(wrong_type.is_some_and(|m| m.starts_with("failed to decode body: ")));
    }

    #[test]
    fn test_bare_validation_message() {
        let err = HandlerError::bare(PlaygroundError::MissingContents);
        assert_eq!(err.message(), "missing contents");
    }
}
