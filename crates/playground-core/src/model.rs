//! Snippet model and input validation

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::errors::PlaygroundError;

/// Longest accepted snippet, counted in Unicode scalar values
pub const MAX_CONTENTS_CHARS: usize = 400_000;

/// Opaque, non-sequential snippet identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnippetId(Uuid);

impl SnippetId {
    /// Fresh random (v4) id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse the textual form of an id
    ///
    /// # Errors
    ///
    /// `MissingId` for blank input, `InvalidId` when it is not a UUID.
    pub fn parse(raw: &str) -> Result<Self, PlaygroundError> {
        if raw.trim().is_empty() {
            return Err(PlaygroundError::MissingId);
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| PlaygroundError::InvalidId {
                id: raw.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SnippetId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for SnippetId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl FromStr for SnippetId {
    type Err = PlaygroundError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SnippetId {
    /// Canonical hyphenated lowercase form
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// One immutable piece of saved source text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: SnippetId,
    pub contents: String,
    pub created_at: DateTime<Utc>,
}

impl Snippet {
    /// Build a new snippet with a fresh id and the current time
    pub fn create(contents: impl Into<String>) -> Self {
        Self {
            id: SnippetId::new(),
            contents: contents.into(),
            created_at: Utc::now(),
        }
    }

    pub fn digest(&self) -> String {
        content_digest(&self.contents)
    }
}

/// Check that `contents` is non-empty and within [`MAX_CONTENTS_CHARS`]
///
/// # Errors
///
/// `MissingContents` or `ContentsTooLong`.
pub fn validate_contents(contents: &str) -> Result<(), PlaygroundError> {
    if contents.is_empty() {
        return Err(PlaygroundError::MissingContents);
    }
    // Byte length bounds the char count from above
    if contents.len() > MAX_CONTENTS_CHARS {
        let len = contents.chars().count();
        if len > MAX_CONTENTS_CHARS {
            return Err(PlaygroundError::ContentsTooLong {
                len,
                max: MAX_CONTENTS_CHARS,
            });
        }
    }
    Ok(())
}

/// Lowercase hex SHA-256 of the raw contents bytes
pub fn content_digest(contents: &str) -> String {
    hex::encode(Sha256::digest(contents.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet_id_display_is_canonical() {
        let id = SnippetId::parse("0E5A1D2C-4B7F-4C1A-9F3E-2D6B8A0C1E4F").unwrap();
        assert_eq!(id.to_string(), "0e5a1d2c-4b7f-4c1a-9f3e-2d6b8a0c1e4f");
    }

    #[test]
    fn test_snippet_id_parse_errors() {
        assert_eq!(SnippetId::parse(""), Err(PlaygroundError::MissingId));
        assert!(matches!(
            SnippetId::parse("not-an-id"),
            Err(PlaygroundError::InvalidId { .. })
        ));
    }

    #[test]
    fn test_new_ids_are_v4_and_distinct() {
        let a = SnippetId::new();
        let b = SnippetId::new();
        assert_ne!(a, b);
        assert_eq!(a.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn test_validate_contents_counts_characters() {
        // 400,000 four-byte characters is still within bounds
        let wide = "😀".repeat(MAX_CONTENTS_CHARS);
        assert!(validate_contents(&wide).is_ok());
        let too_wide = "😀".repeat(MAX_CONTENTS_CHARS + 1);
        assert!(matches!(
            validate_contents(&too_wide),
            Err(PlaygroundError::ContentsTooLong { len, .. }) if len == MAX_CONTENTS_CHARS + 1
        ));
    }

    #[test]
    fn test_content_digest() {
        assert_eq!(
            content_digest("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
