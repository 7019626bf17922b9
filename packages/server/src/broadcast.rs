//! Broadcast engine: unicast, fan-out and the periodic roster push.

use std::sync::Arc;
use std::time::Duration;

use banter_shared::packet::ServerPacket;
use banter_shared::store::DocumentStore;

use crate::registry::ConnectionId;
use crate::state::AppState;

/// Send one packet to one session. Returns false when the session is
/// gone or its writer has stopped.
pub async fn send_to(state: &AppState, conn: ConnectionId, packet: &ServerPacket) -> bool {
    let bytes = packet.to_bytes().freeze();

    let sessions = state.sessions.lock().await;
    match sessions.get(&conn) {
        Some(handle) => {
            if handle.send_bytes(bytes) {
                true
            } else {
                tracing::warn!("Failed to send packet to connection {}", conn);
                false
            }
        }
        None => false,
    }
}

/// Fan one packet out to every registered (authenticated) session except
/// the optionally excluded one. Returns the number of recipients reached.
///
/// Unauthenticated sessions never receive these broadcasts; they only get
/// direct responses and the periodic roster push.
pub async fn broadcast_registered(
    state: &AppState,
    packet: &ServerPacket,
    exclude: Option<ConnectionId>,
) -> usize {
    let bytes = packet.to_bytes().freeze();

    let targets = {
        let registry = state.registry.lock().await;
        registry.ids()
    };

    let sessions = state.sessions.lock().await;
    let mut delivered = 0;
    for conn in targets {
        if Some(conn) == exclude {
            continue;
        }
        if let Some(handle) = sessions.get(&conn) {
            if handle.send_bytes(bytes.clone()) {
                delivered += 1;
            } else {
                tracing::warn!("Failed to send packet to connection {}", conn);
            }
        }
    }
    delivered
}

/// Fan one packet out to every live transport session, registered or not.
/// Used for the periodic roster push and the shutdown notice.
pub async fn broadcast_all_sessions(state: &AppState, packet: &ServerPacket) -> usize {
    let bytes = packet.to_bytes().freeze();

    let sessions = state.sessions.lock().await;
    let mut delivered = 0;
    for (conn, handle) in sessions.iter() {
        if handle.send_bytes(bytes.clone()) {
            delivered += 1;
        } else {
            tracing::warn!("Failed to send packet to connection {}", conn);
        }
    }
    delivered
}

/// One scheduled roster/persistence tick: push a fresh roster to every
/// session and snapshot history to the document store.
pub async fn roster_tick(state: &AppState, store: &dyn DocumentStore) {
    let roster = {
        let registry = state.registry.lock().await;
        registry.snapshot()
    };
    broadcast_all_sessions(state, &ServerPacket::ClientList(roster)).await;

    // Snapshot under the lock, persist outside it.
    let history = {
        let history = state.history.lock().await;
        history.clone()
    };
    if let Err(e) = history.save_to(store).await {
        tracing::warn!("Failed to persist message history: {}", e);
    }
}

/// Run the periodic roster/persistence task until the state is dropped.
pub fn spawn_roster_task(
    state: Arc<AppState>,
    store: Arc<dyn DocumentStore>,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so the cadence starts
        // one full interval after startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            roster_tick(&state, store.as_ref()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use banter_shared::types::UserInfo;
    use tokio::sync::mpsc;

    use crate::state::{Outbound, SessionHandle};

    async fn attach_session(
        state: &AppState,
        conn: ConnectionId,
    ) -> mpsc::UnboundedReceiver<Outbound> {
        let (tx, rx) = mpsc::unbounded_channel();
        state
            .sessions
            .lock()
            .await
            .insert(conn, SessionHandle::new(tx, format!("test:{conn}")));
        rx
    }

    fn next_packet(rx: &mut mpsc::UnboundedReceiver<Outbound>) -> ServerPacket {
        match rx.try_recv().expect("expected a queued packet") {
            Outbound::Packet(bytes) => ServerPacket::decode(&bytes).unwrap(),
            Outbound::Close => panic!("expected a packet, got close"),
        }
    }

    #[tokio::test]
    async fn unicast_reaches_only_the_target() {
        let state = AppState::new();
        let mut rx1 = attach_session(&state, 1).await;
        let mut rx2 = attach_session(&state, 2).await;

        let sent = send_to(&state, 1, &ServerPacket::ServerShutdown).await;

        assert!(sent);
        assert_eq!(next_packet(&mut rx1), ServerPacket::ServerShutdown);
        assert!(rx2.try_recv().is_err());
    }

    #[tokio::test]
    async fn unicast_to_unknown_session_reports_failure() {
        let state = AppState::new();
        assert!(!send_to(&state, 42, &ServerPacket::ServerShutdown).await);
    }

    #[tokio::test]
    async fn registered_broadcast_skips_unauthenticated_and_excluded() {
        let state = AppState::new();
        let mut rx1 = attach_session(&state, 1).await;
        let mut rx2 = attach_session(&state, 2).await;
        let mut rx3 = attach_session(&state, 3).await; // never authenticates

        {
            let mut registry = state.registry.lock().await;
            registry.try_authenticate(1, "alice", 1);
            registry.try_authenticate(2, "bob", 2);
        }

        let packet = ServerPacket::Message {
            username: "alice".to_string(),
            message: "hi".to_string(),
        };
        let delivered = broadcast_registered(&state, &packet, Some(1)).await;

        assert_eq!(delivered, 1);
        assert!(rx1.try_recv().is_err(), "sender must not be echoed");
        assert_eq!(next_packet(&mut rx2), packet);
        assert!(rx3.try_recv().is_err(), "unauthenticated session got a broadcast");
    }

    #[tokio::test]
    async fn broadcast_with_no_recipients_delivers_zero() {
        let state = AppState::new();
        let _rx = attach_session(&state, 1).await;
        {
            let mut registry = state.registry.lock().await;
            registry.try_authenticate(1, "bob", 1);
        }

        let packet = ServerPacket::Message {
            username: "bob".to_string(),
            message: "hi".to_string(),
        };
        assert_eq!(broadcast_registered(&state, &packet, Some(1)).await, 0);
    }

    #[tokio::test]
    async fn roster_push_reaches_unauthenticated_sessions() {
        let state = AppState::new();
        let mut rx1 = attach_session(&state, 1).await;
        let mut rx2 = attach_session(&state, 2).await; // unauthenticated

        {
            let mut registry = state.registry.lock().await;
            registry.try_authenticate(1, "alice", 7);
        }

        let roster = {
            let registry = state.registry.lock().await;
            registry.snapshot()
        };
        let delivered =
            broadcast_all_sessions(&state, &ServerPacket::ClientList(roster)).await;

        assert_eq!(delivered, 2);
        let expected = ServerPacket::ClientList(vec![UserInfo {
            color: 7,
            username: "alice".to_string(),
        }]);
        assert_eq!(next_packet(&mut rx1), expected);
        assert_eq!(next_packet(&mut rx2), expected);
    }
}
