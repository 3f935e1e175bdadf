//! WebSocket upgrade + message loop. Each connection owns one game, created on
//! connect and dropped on disconnect. Client messages are parsed as JSON and
//! forwarded to core logic with one JSON reply per request; state changes from
//! background question fetches are pushed as they land.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::logic::*;
use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(ws, state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "arena", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  let mut updates = state.updates.subscribe();
  let (game_id, view) = state.create_game().await;
  info!(target: "arena", %game_id, "WebSocket connected");

  if send(&mut socket, &ServerWsMessage::State { state: view }).await {
    loop {
      tokio::select! {
        msg = socket.recv() => match msg {
          Some(Ok(Message::Text(txt))) => {
            let reply = match serde_json::from_str::<ClientWsMessage>(&txt) {
              Ok(incoming) => {
                debug!(target: "arena", %game_id, "WS received: {:?}", &incoming);
                handle_client_ws(incoming, &state, game_id).await
              }
              Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
            };
            if !send(&mut socket, &reply).await {
              break;
            }
          }
          Some(Ok(Message::Ping(payload))) => {
            let _ = socket.send(Message::Pong(payload)).await;
          }
          Some(Ok(Message::Close(_))) | None => break,
          Some(Ok(_)) => {}
          Some(Err(e)) => {
            warn!(target: "arena", %game_id, error = %e, "WS receive error");
            break;
          }
        },
        update = updates.recv() => {
          let push = match update {
            Ok(id) => id == game_id,
            // Missed notifications; a fresh snapshot covers them.
            Err(RecvError::Lagged(skipped)) => {
              warn!(target: "arena", %game_id, skipped, "WS update channel lagged");
              true
            }
            Err(RecvError::Closed) => break,
          };
          if push {
            let msg = match state.game_view(game_id).await {
              Ok(view) => ServerWsMessage::State { state: view },
              Err(e) => ServerWsMessage::Error { message: e.to_string() },
            };
            if !send(&mut socket, &msg).await {
              break;
            }
          }
        }
      }
    }
  }

  state.remove_game(game_id).await;
  info!(target: "arena", %game_id, "WebSocket disconnected");
}

/// Serialize and send; `false` means the socket is gone.
async fn send(socket: &mut WebSocket, msg: &ServerWsMessage) -> bool {
  let out = serde_json::to_string(msg).unwrap_or_else(|e| {
    serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
  });
  match socket.send(Message::Text(out)).await {
    Ok(()) => true,
    Err(e) => {
      error!(target: "arena", error = %e, "WS send error");
      false
    }
  }
}

#[instrument(level = "info", skip(msg, state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &Arc<AppState>, game_id: Uuid) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::GetState => match state.game_view(game_id).await {
      Ok(view) => ServerWsMessage::State { state: view },
      Err(e) => ServerWsMessage::Error { message: e.to_string() },
    },

    ClientWsMessage::GetLeaderboard => {
      ServerWsMessage::Leaderboard { entries: leaderboard_entries(state).await }
    }

    ClientWsMessage::Command { command } => {
      let name = command.name();
      match apply_command(state, game_id, command).await {
        Ok(view) => {
          info!(target: "game", %game_id, command = name, screen = ?view.screen, "WS command applied");
          ServerWsMessage::State { state: view }
        }
        Err(e) => {
          debug!(target: "game", %game_id, command = name, error = %e, "WS command rejected");
          ServerWsMessage::Error { message: e.to_string() }
        }
      }
    }
  }
}
