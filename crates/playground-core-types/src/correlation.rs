//! Request correlation
//!
//! A `RequestId` is assigned to every inbound HTTP request (or taken from the
//! caller's `x-request-id` header) and attached to the request's log span.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest caller-supplied request id that is accepted verbatim
pub const MAX_REQUEST_ID_LEN: usize = 128;

/// Unique identifier for a single request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new RequestId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reuse a caller-supplied id if it is printable ASCII of sane length,
    /// otherwise generate a fresh one.
    pub fn from_header(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v)
                if !v.is_empty()
                    && v.len() <= MAX_REQUEST_ID_LEN
                    && v.bytes().all(|b| b.is_ascii_graphic()) =>
            {
                Self(v.to_string())
            }
            _ => Self::new(),
        }
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_request_id_display() {
        let id = RequestId::new();
        assert_eq!(format!("{}", id), id.as_str());
    }

    #[test]
    fn test_from_header_reuses_valid_value() {
        let id = RequestId::from_header(Some("abc-123"));
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn test_from_header_rejects_garbage() {
        let missing = RequestId::from_header(None);
        assert!(!missing.as_str().is_empty());

        let spaced = RequestId::from_header(Some("has space"));
        assert_ne!(spaced.as_str(), "has space");

        let long = "x".repeat(MAX_REQUEST_ID_LEN + 1);
        let too_long = RequestId::from_header(Some(&long));
        assert_ne!(too_long.as_str(), long);
    }

    #[test]
    fn test_serialization() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
