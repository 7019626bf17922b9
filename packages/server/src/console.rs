//! Operator console: line-based commands on the server's stdin.
//!
//! Plain lines are chat from the operator; lines starting with `/` are
//! commands.

use std::sync::Arc;

use banter_shared::store::DocumentStore;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::handler;
use crate::state::AppState;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Say something to the room under the SERVER name.
    Chat(String),
    /// Disconnect a user by username, with an optional reason.
    Kick { username: String, reason: String },
    /// Shut the server down.
    Quit,
}

/// Parse one console line. `None` for blank lines and unrecognized or
/// incomplete commands.
pub fn parse_line(line: &str) -> Option<ConsoleCommand> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return None;
    }

    let Some(rest) = line.strip_prefix('/') else {
        return Some(ConsoleCommand::Chat(line.to_string()));
    };

    let mut parts = rest.splitn(3, ' ');
    match parts.next()? {
        "quit" | "shutdown" => Some(ConsoleCommand::Quit),
        "kick" => {
            let username = parts.next()?.to_string();
            if username.is_empty() {
                return None;
            }
            // The rest of the line, spaces included, is the reason.
            let reason = parts.next().unwrap_or("").to_string();
            Some(ConsoleCommand::Kick { username, reason })
        }
        other => {
            tracing::warn!("Unknown console command: /{}", other);
            None
        }
    }
}

/// Read commands from stdin until quit is requested.
///
/// When stdin closes (the server is running non-interactively) the
/// console parks instead of returning, so it never ends the server's
/// select loop on its own.
pub async fn run_console(state: Arc<AppState>, store: Arc<dyn DocumentStore>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!("Console input closed");
                std::future::pending::<()>().await;
                unreachable!();
            }
            Err(e) => {
                tracing::warn!("Failed to read console input: {}", e);
                std::future::pending::<()>().await;
                unreachable!();
            }
        };

        match parse_line(&line) {
            Some(ConsoleCommand::Chat(message)) => {
                handler::server_chat(&state, &message).await;
            }
            Some(ConsoleCommand::Kick { username, reason }) => {
                if handler::kick_user(&state, &username, &reason).await {
                    tracing::info!("Kicked {}", username);
                } else {
                    tracing::warn!("No connected user named {:?}", username);
                }
            }
            Some(ConsoleCommand::Quit) => {
                tracing::info!("Shutdown requested from console");
                handler::shutdown(&state, store.as_ref()).await;
                return;
            }
            None => {}
        }
    }
}
