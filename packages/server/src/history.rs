//! Append-only chat history with snapshot persistence.

use banter_shared::store::{DocumentStore, StoreError, HISTORY_DOCUMENT};
use banter_shared::types::ChatMessage;

/// Ordered log of chat messages.
///
/// Append-only during a run; replaced wholesale on load at startup;
/// persisted in full on a fixed interval and on graceful shutdown, never
/// per message.
#[derive(Debug, Default, Clone)]
pub struct HistoryStore {
    messages: Vec<ChatMessage>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Replace the log with whatever the store holds.
    ///
    /// A missing or unparsable document means "no history": the log is
    /// cleared and `false` is returned. Never fatal.
    pub async fn load_from(&mut self, store: &dyn DocumentStore) -> bool {
        let Some(value) = store.load(HISTORY_DOCUMENT).await else {
            self.messages.clear();
            return false;
        };

        match serde_json::from_value::<Vec<ChatMessage>>(value) {
            Ok(messages) => {
                self.messages = messages;
                true
            }
            Err(e) => {
                tracing::warn!("Failed to decode message history document: {}", e);
                self.messages.clear();
                false
            }
        }
    }

    /// Serialize the full current log unconditionally. Callers log a
    /// failure and carry on; persistence problems never abort the server.
    pub async fn save_to(&self, store: &dyn DocumentStore) -> Result<(), StoreError> {
        let value = serde_json::to_value(&self.messages)?;
        store.save(HISTORY_DOCUMENT, value).await
    }
}
