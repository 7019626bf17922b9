//! CLI chat client.
//!
//! Connects to a chat server, authenticates with a username and display
//! color, then relays terminal input as chat messages. Successful
//! connection details are remembered and used as defaults on later runs.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin banter-client -- --username Alice
//! cargo run --bin banter-client -- -u Bob -a 127.0.0.1:8192 -c FF8800
//! ```

use std::process::exit;

use clap::Parser;

use banter_client::defaults::ConnectionDetails;
use banter_client::error::ClientError;
use banter_client::session::{run_session, SessionConfig};
use banter_shared::logger::setup_logger;
use banter_shared::store::JsonFileStore;
use banter_shared::types::FALLBACK_COLOR;

#[derive(Debug, Parser)]
#[command(name = "banter-client", about = "Banter chat client")]
struct Args {
    /// Username to connect as (must be unique on the server)
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// Display color as RRGGBB hex
    #[arg(short = 'c', long)]
    color: Option<String>,

    /// Server address; a bare host uses the default port
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// Directory for remembered connection details
    #[arg(long, default_value = "data")]
    data_dir: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logger("banter_client", "warn");

    let store = JsonFileStore::new(&args.data_dir);
    let saved = ConnectionDetails::load(&store).await;

    let username = match args.username.or_else(|| saved.as_ref().map(|d| d.username.clone())) {
        Some(username) => username,
        None => {
            eprintln!("No username given and no saved connection details; use --username");
            exit(1);
        }
    };

    let color = match &args.color {
        Some(hex) => match u32::from_str_radix(hex.trim_start_matches('#'), 16) {
            Ok(color) => color,
            Err(_) => {
                eprintln!("Invalid color {hex:?}; expected RRGGBB hex");
                exit(1);
            }
        },
        None => saved
            .as_ref()
            .map(|d| d.color)
            .unwrap_or(FALLBACK_COLOR),
    };

    let address = args
        .address
        .or_else(|| saved.as_ref().map(|d| d.server_address.clone()))
        .unwrap_or_else(|| "127.0.0.1".to_string());

    // Remember this attempt for the next run.
    let details = ConnectionDetails {
        username: username.clone(),
        color,
        server_address: address.clone(),
    };
    if let Err(e) = details.save(&store).await {
        tracing::warn!("Failed to save connection details: {}", e);
    }

    let config = SessionConfig {
        address,
        username,
        color,
    };
    match run_session(config).await {
        Ok(()) => {}
        Err(e @ ClientError::DuplicateUsername(_)) => {
            eprintln!("{e}");
            exit(1);
        }
        Err(e) => {
            tracing::error!("{}", e);
            exit(1);
        }
    }
}
