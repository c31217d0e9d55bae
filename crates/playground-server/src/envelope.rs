//! Uniform JSON response envelope

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use playground_core::errors::{ExError, ExErrorKind};
use serde::{Deserialize, Serialize};

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub message: String,
}

/// Serialize `body` with status 200
///
/// A body that fails to serialize becomes a 500 error envelope.
pub fn success<T: Serialize>(body: &T) -> Response {
    match serde_json::to_vec(body) {
        Ok(bytes) => json_response(StatusCode::OK, bytes),
        Err(err) => {
            let err = ExError::new(ExErrorKind::Serialization)
                .with_op("write_response")
                .with_message(err.to_string());
            tracing::error!(
                err.code = err.code(),
                err.class = ?err.class(),
                err.message = err.message(),
                "failed to serialize response body"
            );
            error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("failed to write resp: {}", err.message()),
            )
        }
    }
}

/// `{"message": ...}` with the given status
pub fn error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorResponse {
        message: message.into(),
    };
    match serde_json::to_vec(&body) {
        Ok(bytes) => json_response(status, bytes),
        // Unreachable for a struct holding one String
        Err(_) => json_response(status, br#"{"message":"internal error"}"#.to_vec()),
    }
}

fn json_response(status: StatusCode, bytes: Vec<u8>) -> Response {
    (
        status,
        [(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        )],
        bytes,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::ser::Error as _;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("refusing to serialize"))
        }
    }

    fn content_type(response: &Response) -> Option<&str> {
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    #[test]
    fn test_success_is_200_json() {
        let response = success(&serde_json::json!({"id": "abc"}));
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), Some("application/json"));
    }

    #[test]
    fn test_error_keeps_status() {
        let response = error(StatusCode::BAD_REQUEST, "missing contents");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(content_type(&response), Some("application/json"));
    }

    #[test]
    fn test_serialization_failure_degrades_to_500() {
        let response = success(&Unserializable);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(content_type(&response), Some("application/json"));
    }

    #[tokio::test]
    async fn test_serialization_failure_message_names_the_cause() {
        let response = success(&Unserializable);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.message, "failed to write resp: refusing to serialize");
    }
}
