// Behaviour of the SQLite snippet store

use std::collections::HashSet;
use std::sync::Arc;

use playground_core::{ExErrorKind, SnippetId, SnippetStore, MAX_CONTENTS_CHARS};
use playground_store::SqliteSnippetStore;
use proptest::prelude::*;

fn store() -> SqliteSnippetStore {
    SqliteSnippetStore::open_in_memory().expect("open in-memory store")
}

#[test]
fn test_identical_saves_share_one_id() {
    let store = store();
    let first = store.save("local x=1; x+1").unwrap();
    let second = store.save("local x=1; x+1").unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.created_at, second.created_at);
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_round_trip() {
    let store = store();
    let contents = "{ a: 'ünïcödé', b: [1, 2, 3] }\n";
    let saved = store.save(contents).unwrap();
    assert_eq!(store.get(&saved.id).unwrap().contents, contents);
}

#[test]
fn test_distinct_contents_get_distinct_ids() {
    let store = store();
    let a = store.save("1").unwrap();
    let b = store.save("1 ").unwrap();
    assert_ne!(a.id, b.id);
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn test_length_boundary() {
    let store = store();
    assert!(store.save(&"a".repeat(MAX_CONTENTS_CHARS)).is_ok());

    let err = store.save(&"a".repeat(MAX_CONTENTS_CHARS + 1)).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_unknown_id_is_not_found() {
    let store = store();
    let nil: SnippetId = "00000000-0000-0000-0000-000000000000".parse().unwrap();
    let err = store.get(&nil).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
    assert_eq!(err.entity_id(), Some("00000000-0000-0000-0000-000000000000"));
}

#[test]
fn test_malformed_id_lookup_is_not_found() {
    let store = store();
    let err = store.get_by_str("not-an-id").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::NotFound);
}

#[test]
fn test_snippets_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("playground.db");
    let url = format!("sqlite://{}", path.display());

    let id = {
        let store = SqliteSnippetStore::open(&url).unwrap();
        store.save("std.length([1, 2])").unwrap().id
    };

    let reopened = SqliteSnippetStore::open(&url).unwrap();
    assert_eq!(reopened.get(&id).unwrap().contents, "std.length([1, 2])");
    assert_eq!(reopened.save("std.length([1, 2])").unwrap().id, id);
}

#[test]
fn test_open_rejects_non_sqlite_url() {
    let err = SqliteSnippetStore::open("postgres://localhost/playground").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::InvalidInput);
}

#[test]
fn test_concurrent_identical_saves_deduplicate() {
    let store = Arc::new(store());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.save("{ racing: true }").unwrap().id)
        })
        .collect();

    let ids: HashSet<SnippetId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(store.count().unwrap(), 1);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_save_is_idempotent_and_round_trips(contents in "\\PC{1,200}") {
        let store = store();
        let first = store.save(&contents).unwrap();
        let second = store.save(&contents).unwrap();
        prop_assert_eq!(first.id, second.id);
        prop_assert_eq!(store.get(&first.id).unwrap().contents, contents);
        prop_assert_eq!(store.count().unwrap(), 1);
    }
}
