//! Document persistence collaborator.
//!
//! The protocol core treats persistence as an opaque key-value document
//! store: one structured value per document key. The concrete on-disk
//! syntax is an infrastructure detail behind the [`DocumentStore`] trait;
//! the implementation here keeps one JSON file per key.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

/// Document key for the server's chat history.
pub const HISTORY_DOCUMENT: &str = "MessageHistory";

/// Document key for the client's connection defaults.
pub const CONNECTION_DETAILS_DOCUMENT: &str = "ConnectionDetails";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Interface the core depends on for durable state.
///
/// A missing or unparsable document is reported as absent, never as a
/// fatal error; save failures are surfaced so callers can log and move on.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Persist `value` under `key`, replacing any previous document.
    async fn save(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError>;

    /// Load the document stored under `key`, or `None` if it is missing
    /// or cannot be parsed.
    async fn load(&self, key: &str) -> Option<serde_json::Value>;
}

/// File-backed store holding one JSON document per key under a root
/// directory. The document is wrapped in a single-entry root map keyed by
/// the document name, matching the layout history files have always used.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.json"))
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn save(&self, key: &str, value: serde_json::Value) -> Result<(), StoreError> {
        let document = serde_json::json!({ key: value });
        let contents = serde_json::to_string_pretty(&document)?;

        if let Some(parent) = self.path_for(key).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(self.path_for(key), contents).await?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Option<serde_json::Value> {
        let path = self.path_for(key);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) => {
                tracing::debug!("No document at {}: {}", path.display(), e);
                return None;
            }
        };

        let mut document: serde_json::Value = match serde_json::from_str(&contents) {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Failed to parse document {}: {}", path.display(), e);
                return None;
            }
        };

        match document.get_mut(key) {
            Some(value) => Some(value.take()),
            None => {
                tracing::warn!("Document {} has no '{}' entry", path.display(), key);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn save_then_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        let value = json!([{ "User": "bob", "Message": "hi" }]);
        store.save(HISTORY_DOCUMENT, value.clone()).await.unwrap();

        let loaded = store.load(HISTORY_DOCUMENT).await;
        assert_eq!(loaded, Some(value));
    }

    #[tokio::test]
    async fn missing_document_loads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        assert_eq!(store.load(HISTORY_DOCUMENT).await, None);
    }

    #[tokio::test]
    async fn unparsable_document_loads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("{HISTORY_DOCUMENT}.json"));
        tokio::fs::write(&path, "not json {{{").await.unwrap();

        let store = JsonFileStore::new(dir.path());
        assert_eq!(store.load(HISTORY_DOCUMENT).await, None);
    }

    #[tokio::test]
    async fn document_missing_root_key_loads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(format!("{HISTORY_DOCUMENT}.json"));
        tokio::fs::write(&path, r#"{"Other": []}"#).await.unwrap();

        let store = JsonFileStore::new(dir.path());
        assert_eq!(store.load(HISTORY_DOCUMENT).await, None);
    }

    #[tokio::test]
    async fn save_replaces_previous_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path());

        store
            .save(CONNECTION_DETAILS_DOCUMENT, json!({ "Username": "a" }))
            .await
            .unwrap();
        store
            .save(CONNECTION_DETAILS_DOCUMENT, json!({ "Username": "b" }))
            .await
            .unwrap();

        let loaded = store.load(CONNECTION_DETAILS_DOCUMENT).await.unwrap();
        assert_eq!(loaded["Username"], "b");
    }
}
