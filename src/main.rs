//! Midsegment Arena · triangle midsegment quiz backend
//!
//! - Axum HTTP + WebSocket API driving a per-player quiz state machine
//! - Optional OpenAI question generation with built-in fallback questions
//! - File-backed top-10 leaderboard
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT              : u16 (default 3000)
//!   OPENAI_API_KEY    : enables question generation if present
//!   OPENAI_BASE_URL   : default "https://api.openai.com/v1"
//!   OPENAI_MODEL      : default "gpt-4o-mini"
//!   ARENA_CONFIG_PATH : path to TOML config (prompts, question bank, storage)
//!   LEADERBOARD_PATH  : leaderboard JSON file (default "data/leaderboard.json")
//!   LOG_LEVEL         : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT        : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod errors;
mod config;
mod seeds;
mod game;
mod leaderboard;
mod geometry;
mod openai;
mod state;
mod protocol;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: games, question pool, leaderboard, OpenAI client, prompts.
  let state = Arc::new(AppState::new());

  // Warm the question pool without delaying startup.
  let prefetch_state = state.clone();
  tokio::spawn(async move { prefetch_state.prefetch_questions().await });

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "arena", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  info!(target: "arena", "Server stopped");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "arena", error = %e, "Could not listen for Ctrl-C; running until killed");
    std::future::pending::<()>().await;
  }
  info!(target: "arena", "Shutdown requested");
}
