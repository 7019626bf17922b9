//! The session registry: the server's authoritative map of authenticated
//! sessions to user identity.

use std::collections::HashMap;

use banter_shared::types::UserInfo;

/// Opaque transport-level connection identity.
pub type ConnectionId = u64;

/// Mapping from connection id to authenticated user.
///
/// Mutated only by the protocol state machine in response to
/// connect/disconnect/kick events. A session absent from the registry is
/// unauthenticated and is not visible to other clients.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    entries: HashMap<ConnectionId, UserInfo>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Authenticate a connection under `username`.
    ///
    /// Rejects without mutating when the username is already registered;
    /// the comparison is a case-sensitive exact match.
    pub fn try_authenticate(&mut self, conn: ConnectionId, username: &str, color: u32) -> bool {
        if self.entries.values().any(|user| user.username == username) {
            return false;
        }

        self.entries.insert(
            conn,
            UserInfo {
                color,
                username: username.to_string(),
            },
        );
        true
    }

    /// Remove a connection. Removing an id that is not registered is a
    /// no-op, so concurrent disconnect paths stay idempotent.
    pub fn remove(&mut self, conn: ConnectionId) -> Option<UserInfo> {
        self.entries.remove(&conn)
    }

    pub fn lookup(&self, conn: ConnectionId) -> Option<&UserInfo> {
        self.entries.get(&conn)
    }

    pub fn contains(&self, conn: ConnectionId) -> bool {
        self.entries.contains_key(&conn)
    }

    pub fn find_by_username(&self, username: &str) -> Option<ConnectionId> {
        self.entries
            .iter()
            .find(|(_, user)| user.username == username)
            .map(|(conn, _)| *conn)
    }

    /// Registered connection ids, for fan-out target selection.
    pub fn ids(&self) -> Vec<ConnectionId> {
        self.entries.keys().copied().collect()
    }

    /// Current roster. Order is not stable across calls; the snapshot is
    /// only used for roster broadcasts.
    pub fn snapshot(&self) -> Vec<UserInfo> {
        self.entries.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
