use std::process::exit;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use banter_shared::logger::setup_logger;
use banter_shared::store::{DocumentStore, JsonFileStore};
use banter_shared::types::DEFAULT_PORT;
use banter_server::error::ServerError;
use banter_server::state::AppState;
use banter_server::{broadcast, console, handler, transport};

#[derive(Debug, Parser)]
#[command(name = "banter-server", about = "Banter chat server")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Directory for persisted documents (message history)
    #[arg(long, default_value = "data")]
    data_dir: String,

    /// Seconds between roster pushes and history snapshots
    #[arg(long, default_value_t = 10)]
    sync_interval: u64,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    setup_logger("banter_server", "info");

    let store: Arc<dyn DocumentStore> = Arc::new(JsonFileStore::new(&args.data_dir));
    let state = Arc::new(AppState::new());

    {
        let mut history = state.history.lock().await;
        if history.load_from(store.as_ref()).await {
            tracing::info!("Restored {} history messages", history.len());
        } else {
            tracing::info!("Starting with empty message history");
        }
    }

    let addr = format!("{}:{}", args.host, args.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(source) => {
            let e = ServerError::Bind { addr, source };
            tracing::error!("{}", e);
            exit(1);
        }
    };
    tracing::info!("Listening on {}", addr);

    let roster = broadcast::spawn_roster_task(
        Arc::clone(&state),
        Arc::clone(&store),
        Duration::from_secs(args.sync_interval),
    );

    tokio::select! {
        result = transport::serve(listener, Arc::clone(&state)) => {
            if let Err(e) = result {
                tracing::error!("{}", e);
            }
        }
        _ = console::run_console(Arc::clone(&state), Arc::clone(&store)) => {
            // Console already ran the shutdown sequence on /quit; fall
            // through so ctrl-c and console exits share the cleanup path.
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, shutting down");
            handler::shutdown(&state, store.as_ref()).await;
        }
    }

    roster.abort();
    tracing::info!("Server stopped");
}
