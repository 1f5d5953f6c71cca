//! Party card game server.
//!
//! Loads a card file, spawns the session hub actor, and serves the
//! WebSocket endpoint until ctrl-c.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Error};
use log::info;
use pico_args::Arguments;

use party_cards::cards::MemoryCardStore;
use party_cards::game::{Card, CardKind};
use party_cards::ratings::LogRatingSink;
use pc_server::hub::SessionHub;

const HELP: &str = "\
Run a party card game server

USAGE:
  pc_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]
  --cards      PATH        JSON card file to load      [default: env CARDS_PATH or demos/cards.json]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  CARDS_PATH               Path to the JSON card file
";

struct Args {
    bind: SocketAddr,
    cards: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.value_from_str("--bind").unwrap_or_else(|_| {
            std::env::var("SERVER_BIND")
                .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
                .parse()
                .expect("Invalid SERVER_BIND address")
        }),
        cards: pargs.value_from_str("--cards").unwrap_or_else(|_| {
            std::env::var("CARDS_PATH")
                .unwrap_or_else(|_| "demos/cards.json".to_string())
                .into()
        }),
    };

    env_logger::builder().format_target(false).init();
    info!("Starting party card game server at {}", args.bind);

    let store = load_card_store(&args.cards)?;
    let ratings = Arc::new(LogRatingSink);

    let (hub, handle) = SessionHub::new(Arc::new(store), ratings);
    tokio::spawn(hub.run());

    let app = pc_server::create_router(handle);

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind to {}", args.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        args.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down server...");

    Ok(())
}

/// Load the JSON card file and split it by kind.
fn load_card_store(path: &PathBuf) -> Result<MemoryCardStore, Error> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read card file {}", path.display()))?;
    let cards: Vec<Card> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse card file {}", path.display()))?;

    let (prompts, responses): (Vec<Card>, Vec<Card>) = cards
        .into_iter()
        .partition(|card| card.kind == CardKind::Prompt);
    info!(
        "Loaded {} prompt and {} response cards from {}",
        prompts.len(),
        responses.len(),
        path.display()
    );
    Ok(MemoryCardStore::new(prompts, responses))
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
