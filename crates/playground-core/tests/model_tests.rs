use playground_core::model::{content_digest, validate_contents, Snippet, SnippetId};
use playground_core::{PlaygroundError, MAX_CONTENTS_CHARS};
use proptest::prelude::*;

#[test]
fn test_empty_contents_rejected() {
    assert_eq!(validate_contents(""), Err(PlaygroundError::MissingContents));
}

#[test]
fn test_contents_boundary() {
    assert!(validate_contents(&"a".repeat(MAX_CONTENTS_CHARS)).is_ok());
    assert!(matches!(
        validate_contents(&"a".repeat(MAX_CONTENTS_CHARS + 1)),
        Err(PlaygroundError::ContentsTooLong { .. })
    ));
}

#[test]
fn test_whitespace_only_contents_are_accepted() {
    assert!(validate_contents(" ").is_ok());
}

#[test]
fn test_nil_uuid_parses() {
    let id: SnippetId = "00000000-0000-0000-0000-000000000000".parse().unwrap();
    assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000000");
}

#[test]
fn test_snippet_serializes_id_as_string() {
    let snippet = Snippet::create("1 + 1");
    let json = serde_json::to_value(&snippet).unwrap();
    assert_eq!(json["id"], serde_json::json!(snippet.id.to_string()));
    assert_eq!(snippet.digest(), content_digest("1 + 1"));
}

proptest! {
    #[test]
    fn prop_snippet_id_display_parses_back(bytes in any::<[u8; 16]>()) {
        let id = SnippetId::from(uuid::Uuid::from_bytes(bytes));
        let parsed: SnippetId = id.to_string().parse().unwrap();
        prop_assert_eq!(parsed, id);
    }

    #[test]
    fn prop_digest_distinguishes_contents(a in ".{1,64}", b in ".{1,64}") {
        prop_assume!(a != b);
        prop_assert_ne!(content_digest(&a), content_digest(&b));
    }
}
