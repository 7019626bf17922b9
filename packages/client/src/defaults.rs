//! Persisted connection defaults.
//!
//! The last successful connection's username, color and server address
//! are saved so the next run can omit the flags.

use banter_shared::store::{DocumentStore, CONNECTION_DETAILS_DOCUMENT};
use serde::{Deserialize, Serialize};

/// The on-disk connection defaults record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDetails {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Color")]
    pub color: u32,
    #[serde(rename = "ServerIP")]
    pub server_address: String,
}

impl ConnectionDetails {
    /// Load saved defaults. Missing or unreadable records are treated as
    /// "no defaults", never as an error.
    pub async fn load(store: &dyn DocumentStore) -> Option<Self> {
        let value = store.load(CONNECTION_DETAILS_DOCUMENT).await?;
        match serde_json::from_value(value) {
            Ok(details) => Some(details),
            Err(e) => {
                tracing::warn!("Failed to decode connection defaults: {}", e);
                None
            }
        }
    }

    /// Persist these details. Failures are logged by the caller; losing
    /// the defaults never aborts a session.
    pub async fn save(&self, store: &dyn DocumentStore) -> Result<(), banter_shared::store::StoreError> {
        let value = serde_json::to_value(self)?;
        store.save(CONNECTION_DETAILS_DOCUMENT, value).await
    }
}
