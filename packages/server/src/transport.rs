//! TCP transport: the accept loop and per-connection reader/writer tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use banter_shared::framing;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::error::ServerError;
use crate::handler;
use crate::registry::ConnectionId;
use crate::state::{AppState, Outbound, SessionHandle};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Accept connections forever, spawning one connection task per peer.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> Result<(), ServerError> {
    loop {
        let (stream, peer) = listener.accept().await.map_err(ServerError::Accept)?;
        let conn = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Accepted connection {} from {}", conn, peer);

        let state = Arc::clone(&state);
        tokio::spawn(async move {
            handle_connection(stream, conn, peer.to_string(), state).await;
        });
    }
}

/// Drive one connection: register its session handle, run the reader and
/// writer halves until either stops, then clean up.
async fn handle_connection(
    stream: TcpStream,
    conn: ConnectionId,
    descriptor: String,
    state: Arc<AppState>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    {
        let mut sessions = state.sessions.lock().await;
        sessions.insert(conn, SessionHandle::new(tx, descriptor));
    }

    let (read_half, write_half) = stream.into_split();

    let mut writer = tokio::spawn(write_loop(write_half, rx, conn));
    let mut reader = tokio::spawn(read_loop(read_half, Arc::clone(&state), conn));

    // Whichever half stops first ends the session; the other is aborted.
    tokio::select! {
        _ = &mut reader => writer.abort(),
        _ = &mut writer => reader.abort(),
    }

    {
        let mut sessions = state.sessions.lock().await;
        sessions.remove(&conn);
    }
    handler::handle_disconnect(&state, conn).await;
    tracing::info!("Connection {} closed", conn);
}

/// Drain the outbound channel onto the socket. A `Close` entry shuts the
/// socket down after queued packets have been flushed.
async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    conn: ConnectionId,
) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Packet(bytes) => {
                if let Err(e) = framing::write_message(&mut write_half, &bytes).await {
                    tracing::debug!("Write to connection {} failed: {}", conn, e);
                    return;
                }
            }
            Outbound::Close => {
                let _ = write_half.shutdown().await;
                return;
            }
        }
    }
}

/// Feed inbound messages to the protocol state machine until the peer
/// disconnects or the stream turns bad.
async fn read_loop(mut read_half: OwnedReadHalf, state: Arc<AppState>, conn: ConnectionId) {
    loop {
        match framing::read_message(&mut read_half).await {
            Ok(Some(buf)) => handler::handle_packet(&state, conn, &buf).await,
            Ok(None) => return,
            Err(e) => {
                tracing::debug!("Read from connection {} failed: {}", conn, e);
                return;
            }
        }
    }
}
