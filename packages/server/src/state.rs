//! Shared server state and per-session handles.

use std::collections::HashMap;

use bytes::Bytes;
use tokio::sync::{mpsc, Mutex};

use crate::history::HistoryStore;
use crate::registry::{ConnectionId, SessionRegistry};

/// Control entries on a session's outbound channel.
#[derive(Debug)]
pub enum Outbound {
    /// An encoded packet to deliver.
    Packet(Bytes),
    /// Close the transport connection after draining queued packets.
    Close,
}

/// Transport-side handle for one live session: the outbound channel plus
/// a human-readable connection descriptor (the peer address).
#[derive(Debug)]
pub struct SessionHandle {
    sender: mpsc::UnboundedSender<Outbound>,
    pub descriptor: String,
}

impl SessionHandle {
    pub fn new(sender: mpsc::UnboundedSender<Outbound>, descriptor: String) -> Self {
        Self { sender, descriptor }
    }

    /// Queue an encoded packet. Returns false when the writer task is
    /// already gone; the caller logs and moves on.
    pub fn send_bytes(&self, bytes: Bytes) -> bool {
        self.sender.send(Outbound::Packet(bytes)).is_ok()
    }

    /// Ask the writer task to close the connection once queued packets
    /// have been flushed.
    pub fn close(&self) {
        let _ = self.sender.send(Outbound::Close);
    }
}

/// Shared application state.
///
/// Registry and history are shared mutable state between the transport
/// callbacks and the periodic roster task; every mutation happens behind
/// these locks, and packets are encoded outside the critical sections.
#[derive(Debug, Default)]
pub struct AppState {
    /// All live transport sessions, authenticated or not.
    pub sessions: Mutex<HashMap<ConnectionId, SessionHandle>>,
    /// Authenticated sessions only.
    pub registry: Mutex<SessionRegistry>,
    /// Chat history log.
    pub history: Mutex<HistoryStore>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}
