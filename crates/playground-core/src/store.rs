//! Storage seam for snippets

use crate::errors::{ExError, PlaygroundError, Result};
use crate::model::{Snippet, SnippetId};

/// Durable, content-deduplicating snippet storage
///
/// Implementations are shared across request handlers, so they must be
/// safe to call from many threads at once.
pub trait SnippetStore: Send + Sync {
    /// Store `contents`, or return the snippet that already holds exactly
    /// these contents
    ///
    /// # Errors
    ///
    /// `InvalidInput` for empty or oversized contents, `Persistence` when
    /// the backend fails.
    fn save(&self, contents: &str) -> Result<Snippet>;

    /// # Errors
    ///
    /// `NotFound` when no snippet has this id, `Persistence` when the
    /// backend fails.
    fn get(&self, id: &SnippetId) -> Result<Snippet>;

    /// Number of stored snippets
    ///
    /// # Errors
    ///
    /// `Persistence` when the backend fails.
    fn count(&self) -> Result<u64>;

    /// Look up by the textual id; a malformed id is reported as `NotFound`
    ///
    /// # Errors
    ///
    /// Same as [`SnippetStore::get`].
    fn get_by_str(&self, raw_id: &str) -> Result<Snippet> {
        match SnippetId::parse(raw_id) {
            Ok(id) => self.get(&id),
            Err(_) => Err(not_found(raw_id)),
        }
    }
}

pub(crate) fn not_found(id: &str) -> ExError {
    ExError::from(PlaygroundError::SnippetNotFound { id: id.to_string() }).with_op("get")
}

/// `NotFound` error for a snippet id, with the `get` operation attached
pub fn snippet_not_found(id: &SnippetId) -> ExError {
    not_found(&id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MapStore {
        rows: Mutex<HashMap<SnippetId, Snippet>>,
    }

    impl SnippetStore for MapStore {
        fn save(&self, contents: &str) -> Result<Snippet> {
            let mut rows = self
                .rows
                .lock()
                .map_err(|_| ExError::new(ExErrorKind::Internal))?;
            if let Some(existing) = rows.values().find(|s| s.contents == contents) {
                return Ok(existing.clone());
            }
            let snippet = Snippet::create(contents);
            rows.insert(snippet.id, snippet.clone());
            Ok(snippet)
        }

        fn get(&self, id: &SnippetId) -> Result<Snippet> {
            self.rows
                .lock()
                .map_err(|_| ExError::new(ExErrorKind::Internal))?
                .get(id)
                .cloned()
                .ok_or_else(|| snippet_not_found(id))
        }

        fn count(&self) -> Result<u64> {
            Ok(self.rows.lock().map(|r| r.len() as u64).unwrap_or(0))
        }
    }

    #[test]
    fn test_get_by_str_maps_malformed_id_to_not_found() {
        let store = MapStore::default();
        let err = store.get_by_str("not-an-id").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
        assert_eq!(err.entity_id(), Some("not-an-id"));
    }

    #[test]
    fn test_get_by_str_finds_saved_snippet() {
        let store = MapStore::default();
        let saved = store.save("1 + 1").unwrap();
        let found = store.get_by_str(&saved.id.to_string()).unwrap();
        assert_eq!(found, saved);
    }
}
