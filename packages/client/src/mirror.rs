//! Local mirror of server-side session state.
//!
//! The server is authoritative; the mirror only reflects what the server
//! has announced. It tracks the connection phase and the roster, and
//! resolves sender display colors for the formatter.

use std::collections::HashMap;

use banter_shared::types::{UserInfo, FALLBACK_COLOR, SERVER_SENTINEL};

/// Where this session is in its lifecycle.
///
/// The phases are strictly ordered; there is no way back. The welcome
/// banner is deferred until the history replay lands so that restored
/// messages print above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connection request sent, no response yet.
    Authenticating,
    /// Accepted; waiting for the initial history replay.
    HistoryPending,
    /// Fully joined.
    Ready,
}

/// Client-side roster and phase state.
#[derive(Debug)]
pub struct StateMirror {
    roster: HashMap<String, UserInfo>,
    phase: SessionPhase,
}

impl Default for StateMirror {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMirror {
    pub fn new() -> Self {
        Self {
            roster: HashMap::new(),
            phase: SessionPhase::Authenticating,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Record that the server accepted the connection request.
    pub fn mark_accepted(&mut self) {
        if self.phase == SessionPhase::Authenticating {
            self.phase = SessionPhase::HistoryPending;
        }
    }

    /// Record that the initial history replay has arrived.
    ///
    /// Returns true exactly once, when the session becomes ready; the
    /// caller prints the deferred welcome banner on that transition.
    pub fn mark_history_received(&mut self) -> bool {
        if self.phase == SessionPhase::HistoryPending {
            self.phase = SessionPhase::Ready;
            true
        } else {
            false
        }
    }

    /// Replace the roster wholesale with a server snapshot.
    pub fn apply_roster(&mut self, users: Vec<UserInfo>) {
        self.roster = users
            .into_iter()
            .map(|user| (user.username.clone(), user))
            .collect();
    }

    /// A client joined; upserts so a roster push arriving first is fine.
    pub fn apply_connect(&mut self, user: UserInfo) {
        self.roster.insert(user.username.clone(), user);
    }

    /// A client left. Unknown usernames are a no-op.
    pub fn apply_disconnect(&mut self, user: &UserInfo) {
        self.roster.remove(&user.username);
    }

    pub fn roster(&self) -> impl Iterator<Item = &UserInfo> {
        self.roster.values()
    }

    pub fn contains(&self, username: &str) -> bool {
        self.roster.contains_key(username)
    }

    /// Display color for a sender.
    ///
    /// The operator sentinel is not in the roster and gets the fallback
    /// silently; any other unknown sender means the mirror has drifted
    /// from the server and is worth a log line.
    pub fn resolve_color(&self, username: &str) -> u32 {
        if let Some(user) = self.roster.get(username) {
            return user.color;
        }
        if username != SERVER_SENTINEL {
            tracing::error!("Unknown sender {:?}, not in the roster mirror", username);
        }
        FALLBACK_COLOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(username: &str, color: u32) -> UserInfo {
        UserInfo {
            color,
            username: username.to_string(),
        }
    }

    #[test]
    fn phases_advance_in_order_and_welcome_fires_once() {
        let mut mirror = StateMirror::new();
        assert_eq!(mirror.phase(), SessionPhase::Authenticating);

        // history before acceptance does not make the session ready
        assert!(!mirror.mark_history_received());
        assert_eq!(mirror.phase(), SessionPhase::Authenticating);

        mirror.mark_accepted();
        assert_eq!(mirror.phase(), SessionPhase::HistoryPending);

        assert!(mirror.mark_history_received());
        assert_eq!(mirror.phase(), SessionPhase::Ready);

        // later history pushes never re-trigger the welcome
        assert!(!mirror.mark_history_received());
    }

    #[test]
    fn roster_push_replaces_wholesale() {
        let mut mirror = StateMirror::new();
        mirror.apply_roster(vec![user("alice", 1), user("bob", 2)]);
        assert!(mirror.contains("alice"));

        mirror.apply_roster(vec![user("carol", 3)]);
        assert!(!mirror.contains("alice"));
        assert!(!mirror.contains("bob"));
        assert!(mirror.contains("carol"));
    }

    #[test]
    fn connect_and_disconnect_update_membership() {
        let mut mirror = StateMirror::new();
        mirror.apply_connect(user("bob", 2));
        assert!(mirror.contains("bob"));

        // upsert: a second announcement refreshes the color
        mirror.apply_connect(user("bob", 7));
        assert_eq!(mirror.resolve_color("bob"), 7);

        mirror.apply_disconnect(&user("bob", 7));
        assert!(!mirror.contains("bob"));

        // removing an unknown user is a no-op
        mirror.apply_disconnect(&user("ghost", 0));
    }

    #[test]
    fn color_resolution_falls_back_for_unknown_senders() {
        let mut mirror = StateMirror::new();
        mirror.apply_roster(vec![user("alice", 0x00FF_0000)]);

        assert_eq!(mirror.resolve_color("alice"), 0x00FF_0000);
        assert_eq!(mirror.resolve_color("stranger"), FALLBACK_COLOR);
        assert_eq!(mirror.resolve_color(SERVER_SENTINEL), FALLBACK_COLOR);
    }
}
