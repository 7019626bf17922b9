//! Client session management: connect, authenticate, then run the
//! read/write loops until the session ends.

use std::io::Write as _;
use std::sync::Arc;

use bytes::BytesMut;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};

use banter_shared::framing;
use banter_shared::packet::{ClientPacket, ServerPacket};
use banter_shared::types::{validate_message, DEFAULT_PORT};

use crate::error::ClientError;
use crate::formatter::MessageFormatter;
use crate::mirror::StateMirror;

/// Connection parameters for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub address: String,
    pub username: String,
    pub color: u32,
}

/// Why the session ended.
#[derive(Debug)]
enum SessionEnd {
    /// The stream closed or turned bad.
    ConnectionLost,
    /// The server rejected the username.
    Rejected,
    /// The server kicked this client.
    Kicked(String),
    /// The server announced shutdown.
    ServerShutdown,
}

/// Complete a connection target: a bare host gets the default port.
pub fn complete_address(address: &str) -> String {
    if address.contains(':') {
        address.to_string()
    } else {
        format!("{address}:{DEFAULT_PORT}")
    }
}

/// Run one client session to completion.
pub async fn run_session(config: SessionConfig) -> Result<(), ClientError> {
    let address = complete_address(&config.address);

    let stream = TcpStream::connect(&address)
        .await
        .map_err(|e| ClientError::Connection(format!("failed to connect to {address}: {e}")))?;
    tracing::info!("Connected to {}", address);

    let (read_half, mut write_half) = stream.into_split();

    // Authenticate before anything else.
    let mut buf = BytesMut::new();
    ClientPacket::ConnectionRequest {
        color: config.color,
        username: config.username.clone(),
    }
    .encode(&mut buf);
    framing::write_message(&mut write_half, &buf)
        .await
        .map_err(|e| ClientError::Connection(e.to_string()))?;

    let mirror = Arc::new(Mutex::new(StateMirror::new()));

    let mut read_task = tokio::spawn(read_loop(
        read_half,
        Arc::clone(&mirror),
        config.username.clone(),
    ));

    // rustyline is synchronous; it runs on its own thread and feeds the
    // async write loop through a channel.
    let (input_tx, input_rx) = mpsc::unbounded_channel::<String>();
    let prompt = format!("{}> ", config.username);
    let _readline_handle = std::thread::spawn(move || read_input_lines(&prompt, input_tx));

    let mut write_task = tokio::spawn(write_loop(
        write_half,
        input_rx,
        Arc::clone(&mirror),
        config.username.clone(),
        config.color,
    ));

    let end = tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            read_result.unwrap_or(SessionEnd::ConnectionLost)
        }
        _ = &mut write_task => {
            // Input closed (Ctrl+C / Ctrl+D) or the socket died.
            read_task.abort();
            return Ok(());
        }
    };

    match end {
        SessionEnd::ServerShutdown => Ok(()),
        SessionEnd::Rejected => Err(ClientError::DuplicateUsername(config.username)),
        SessionEnd::Kicked(reason) => Err(ClientError::Kicked(reason)),
        SessionEnd::ConnectionLost => {
            Err(ClientError::Connection("connection lost".to_string()))
        }
    }
}

/// Receive packets, update the mirror, render to the terminal.
async fn read_loop(
    mut read_half: OwnedReadHalf,
    mirror: Arc<Mutex<StateMirror>>,
    own_username: String,
) -> SessionEnd {
    loop {
        let buf = match framing::read_message(&mut read_half).await {
            Ok(Some(buf)) => buf,
            Ok(None) => return SessionEnd::ConnectionLost,
            Err(e) => {
                tracing::warn!("Read error: {}", e);
                return SessionEnd::ConnectionLost;
            }
        };

        let packet = match ServerPacket::decode(&buf) {
            Ok(packet) => packet,
            Err(e) => {
                tracing::warn!("Dropping malformed packet from server: {}", e);
                continue;
            }
        };

        let mut mirror = mirror.lock().await;
        match packet {
            ServerPacket::ConnectionResponse { accepted } => {
                if !accepted {
                    return SessionEnd::Rejected;
                }
                mirror.mark_accepted();
            }
            ServerPacket::ClientList(users) => {
                mirror.apply_roster(users);
            }
            ServerPacket::ClientConnect(user) => {
                print!("{}", MessageFormatter::format_join(&user));
                mirror.apply_connect(user);
                redisplay_prompt(&own_username);
            }
            ServerPacket::ClientDisconnect(user) => {
                print!("{}", MessageFormatter::format_leave(&user));
                mirror.apply_disconnect(&user);
                redisplay_prompt(&own_username);
            }
            ServerPacket::Message { username, message } => {
                let color = mirror.resolve_color(&username);
                print!(
                    "{}",
                    MessageFormatter::format_chat_message(&username, color, &message)
                );
                redisplay_prompt(&own_username);
            }
            ServerPacket::MessageHistory(history) => {
                for entry in &history {
                    let color = mirror.resolve_color(&entry.username);
                    print!(
                        "{}",
                        MessageFormatter::format_history_message(
                            &entry.username,
                            color,
                            &entry.message
                        )
                    );
                }
                // The welcome banner waits for the first history replay
                // so restored messages appear above it.
                if mirror.mark_history_received() {
                    print!("{}", MessageFormatter::format_welcome(&own_username));
                }
                redisplay_prompt(&own_username);
            }
            ServerPacket::ClientKick { reason } => {
                print!("{}", MessageFormatter::format_kick(&reason));
                return SessionEnd::Kicked(reason);
            }
            ServerPacket::ServerShutdown => {
                print!("{}", MessageFormatter::format_shutdown());
                return SessionEnd::ServerShutdown;
            }
            ServerPacket::Reserved(t) => {
                tracing::debug!("Ignoring unhandled packet type {:?}", t);
            }
            ServerPacket::Unknown(raw) => {
                tracing::debug!("Ignoring unknown packet type {}", raw);
            }
        }
    }
}

/// Validate and send chat lines from the input channel.
async fn write_loop(
    mut write_half: OwnedWriteHalf,
    mut input_rx: mpsc::UnboundedReceiver<String>,
    mirror: Arc<Mutex<StateMirror>>,
    own_username: String,
    own_color: u32,
) {
    while let Some(line) = input_rx.recv().await {
        if line == "/list" {
            let mirror = mirror.lock().await;
            print!(
                "{}",
                MessageFormatter::format_roster(mirror.roster(), &own_username)
            );
            continue;
        }

        let mut message = line;
        if !validate_message(&mut message) {
            continue;
        }

        let mut buf = BytesMut::new();
        ClientPacket::Message {
            message: message.clone(),
        }
        .encode(&mut buf);
        if let Err(e) = framing::write_message(&mut write_half, &buf).await {
            tracing::warn!("Failed to send message: {}", e);
            return;
        }

        // The server never echoes a message back to its sender.
        print!(
            "{}",
            MessageFormatter::format_chat_message(&own_username, own_color, &message)
        );
    }
}

/// Blocking rustyline loop feeding the input channel. Runs on a plain
/// thread; returns when input ends or the session is gone.
fn read_input_lines(prompt: &str, input_tx: mpsc::UnboundedSender<String>) {
    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("Failed to initialize readline: {e}");
            return;
        }
    };

    loop {
        match rl.readline(prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line).ok();
                if input_tx.send(line.to_string()).is_err() {
                    break;
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                tracing::error!("Readline error: {}", e);
                break;
            }
        }
    }
}

fn redisplay_prompt(username: &str) {
    print!("{username}> ");
    let _ = std::io::stdout().flush();
}
