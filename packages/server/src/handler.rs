//! The per-connection protocol state machine.
//!
//! Each connection is a two-state machine: unauthenticated until a valid
//! `ClientConnectionRequest` is accepted, then authenticated until
//! disconnect or kick. There is no path back; a session is single-use.

use banter_shared::packet::{ClientPacket, ServerPacket};
use banter_shared::store::DocumentStore;
use banter_shared::types::{validate_message, ChatMessage, UserInfo, SERVER_SENTINEL};

use crate::broadcast::{broadcast_all_sessions, broadcast_registered, send_to};
use crate::registry::ConnectionId;
use crate::state::AppState;

/// Process one inbound buffer from a connection.
///
/// A buffer that fails to decode is dropped with a log line; the
/// connection stays open.
pub async fn handle_packet(state: &AppState, conn: ConnectionId, buf: &[u8]) {
    let packet = match ClientPacket::decode(buf) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::warn!("Dropping malformed packet from connection {}: {}", conn, e);
            return;
        }
    };

    match packet {
        ClientPacket::Message { message } => handle_chat_message(state, conn, message).await,
        ClientPacket::ConnectionRequest { color, username } => {
            handle_connection_request(state, conn, color, username).await
        }
        ClientPacket::Disconnect => {
            // Carried in the protocol but unhandled; the transport-level
            // disconnect event is authoritative.
            tracing::debug!("Connection {} sent a disconnect request", conn);
        }
        ClientPacket::Reserved(packet_type) => {
            tracing::debug!(
                "Ignoring unhandled packet type {:?} from connection {}",
                packet_type,
                conn
            );
        }
        ClientPacket::Unknown(raw) => {
            tracing::debug!(
                "Ignoring unknown packet type {} from connection {}",
                raw,
                conn
            );
        }
    }
}

async fn handle_chat_message(state: &AppState, conn: ConnectionId, mut message: String) {
    // Unauthenticated senders cannot chat.
    let username = {
        let registry = state.registry.lock().await;
        match registry.lookup(conn) {
            Some(user) => user.username.clone(),
            None => {
                let descriptor = describe(state, conn).await;
                tracing::warn!(
                    "Rejected chat message from unregistered connection {} ({})",
                    conn,
                    descriptor
                );
                return;
            }
        }
    };

    if !validate_message(&mut message) {
        tracing::debug!("Discarded invalid chat message from {}", username);
        return;
    }

    {
        let mut history = state.history.lock().await;
        history.append(ChatMessage::new(username.clone(), message.clone()));
    }

    tracing::info!("{}: {}", username, message);

    // The sender already has a local echo and is excluded from fan-out.
    broadcast_registered(
        state,
        &ServerPacket::Message { username, message },
        Some(conn),
    )
    .await;
}

async fn handle_connection_request(
    state: &AppState,
    conn: ConnectionId,
    color: u32,
    username: String,
) {
    // Username uniqueness is the only validation rule.
    let accepted = {
        let mut registry = state.registry.lock().await;
        registry.try_authenticate(conn, &username, color)
    };

    // The requester is told the outcome regardless.
    send_to(state, conn, &ServerPacket::ConnectionResponse { accepted }).await;

    if !accepted {
        tracing::info!(
            "Rejected connection request from {} for username {:?}: already in use",
            conn,
            username
        );
        return;
    }

    tracing::info!("Welcome {} (color {:08X})", username, color);

    let user = UserInfo {
        color,
        username: username.clone(),
    };
    broadcast_registered(state, &ServerPacket::ClientConnect(user), Some(conn)).await;

    // The new client gets the full roster, then the full history.
    let roster = {
        let registry = state.registry.lock().await;
        registry.snapshot()
    };
    send_to(state, conn, &ServerPacket::ClientList(roster)).await;

    let history = {
        let history = state.history.lock().await;
        history.messages().to_vec()
    };
    send_to(state, conn, &ServerPacket::MessageHistory(history)).await;
}

/// Transport-level disconnect event.
///
/// Idempotent: the registry entry may already be gone when disconnect and
/// kick race, in which case there is nothing to announce.
pub async fn handle_disconnect(state: &AppState, conn: ConnectionId) {
    let user = {
        let mut registry = state.registry.lock().await;
        registry.remove(conn)
    };

    match user {
        Some(user) => {
            tracing::info!("Client {} disconnected", user.username);
            broadcast_registered(state, &ServerPacket::ClientDisconnect(user), None).await;
        }
        None => {
            tracing::debug!("Connection {} closed without authenticating", conn);
        }
    }
}

/// Operator-initiated kick. Returns false when no connected user has the
/// requested username.
pub async fn kick_user(state: &AppState, username: &str, reason: &str) -> bool {
    let conn = {
        let registry = state.registry.lock().await;
        registry.find_by_username(username)
    };
    let Some(conn) = conn else {
        return false;
    };

    send_to(
        state,
        conn,
        &ServerPacket::ClientKick {
            reason: reason.to_string(),
        },
    )
    .await;

    // Close the transport once the kick packet has drained, then run the
    // normal disconnect handling.
    {
        let sessions = state.sessions.lock().await;
        if let Some(handle) = sessions.get(&conn) {
            handle.close();
        }
    }
    handle_disconnect(state, conn).await;
    true
}

/// A chat line from the server operator, relayed under the SERVER name
/// and recorded in history.
pub async fn server_chat(state: &AppState, message: &str) {
    if message.is_empty() {
        return;
    }

    {
        let mut history = state.history.lock().await;
        history.append(ChatMessage::new(SERVER_SENTINEL, message));
    }

    broadcast_registered(
        state,
        &ServerPacket::Message {
            username: SERVER_SENTINEL.to_string(),
            message: message.to_string(),
        },
        None,
    )
    .await;
}

/// Graceful shutdown: notify every session, then persist history one last
/// time. Persistence failure is logged, never fatal.
pub async fn shutdown(state: &AppState, store: &dyn DocumentStore) {
    broadcast_all_sessions(state, &ServerPacket::ServerShutdown).await;

    let history = {
        let history = state.history.lock().await;
        history.clone()
    };
    if let Err(e) = history.save_to(store).await {
        tracing::warn!("Failed to persist message history on shutdown: {}", e);
    }
}

async fn describe(state: &AppState, conn: ConnectionId) -> String {
    let sessions = state.sessions.lock().await;
    sessions
        .get(&conn)
        .map(|handle| handle.descriptor.clone())
        .unwrap_or_else(|| "unknown".to_string())
}
