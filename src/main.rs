//! CLI for GameHub
//!
//! Subcommands:
//! - `server`: run the event hub and its WebSocket endpoint
//! - `client`: join a game and play a few moves typed as keypad digits

use std::time::Duration;

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use gamehub::client::keypad;
use gamehub::config::load_config;
use gamehub::hub::Hub;
use gamehub::hub::event::{Event, JoinGame, MovePlayer};
use gamehub::transport::start_websocket_server;
use gamehub::utils::logging;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "gamehub")]
enum Command {
    /// Start the hub and its WebSocket server
    Server,
    /// Connect as `user`, join `game` and send one move per keypad digit
    Client {
        /// Server base URL; `/ws/{user}` is appended
        #[arg(long, default_value = "ws://127.0.0.1:8081")]
        url: String,
        #[arg(long)]
        user: String,
        #[arg(long, default_value = "lobby")]
        game: String,
        /// Keypad digits: 2 up, 8 or 0 down, 4 left, 6 right
        #[arg(long, default_value = "")]
        moves: String,
        /// How long to keep printing incoming events, in seconds
        #[arg(long, default_value_t = 5)]
        listen: u64,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    logging::init(&config.log);

    let cmd = Command::parse();

    match cmd {
        Command::Server => {
            if let Err(e) = run_server(config).await {
                error!("Server failed: {}", e);
            }
        }
        Command::Client {
            url,
            user,
            game,
            moves,
            listen,
        } => {
            if let Err(e) = run_client(&url, &user, &game, &moves, listen).await {
                error!("Client failed: {}", e);
            }
        }
    }
}

async fn run_server(config: gamehub::config::Settings) -> Result<(), Box<dyn std::error::Error>> {
    let (hub, handle) = Hub::new(&config.hub);
    tokio::spawn(hub.run());

    tokio::select! {
        res = start_websocket_server(handle, config) => {
            res?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_client(
    url: &str,
    user: &str,
    game: &str,
    keys: &str,
    listen: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let endpoint = format!("{}/ws/{user}", url.trim_end_matches('/'));
    let (mut ws_stream, _response) = connect_async(&endpoint).await?;
    info!("Connected to {endpoint}");

    let join = Event::Join(JoinGame {
        user_id: Some(user.to_string()),
        game_id: game.to_string(),
    });
    ws_stream.send(WsMessage::Text(join.encode()?.into())).await?;

    let (moves, skipped) = keypad::directions(keys);
    if !skipped.is_empty() {
        warn!(?skipped, "Ignoring keys without a direction");
    }
    for direction in moves {
        let mv = Event::Move(MovePlayer {
            user_id: None,
            game_id: None,
            direction: direction.to_string(),
        });
        ws_stream.send(WsMessage::Text(mv.encode()?.into())).await?;
    }

    let deadline = tokio::time::Instant::now() + Duration::from_secs(listen);
    while let Ok(Some(frame)) = tokio::time::timeout_at(deadline, ws_stream.next()).await {
        match frame? {
            WsMessage::Text(text) => println!("Incoming: {text}"),
            WsMessage::Close(_) => break,
            _ => {}
        }
    }

    let _ = ws_stream.close(None).await;
    Ok(())
}
