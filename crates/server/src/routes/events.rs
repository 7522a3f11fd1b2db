//! WebSocket push of trainer events for one game.

use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::Path,
    response::IntoResponse,
    Extension,
};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use trainer::{Trainer, TrainerEvent};

use crate::error::AppError;
use crate::state::SessionStore;

/// GET /api/games/{id}/events
pub async fn game_events(
    ws: WebSocketUpgrade,
    Path(id): Path<u64>,
    Extension(store): Extension<Arc<SessionStore>>,
) -> Result<impl IntoResponse, AppError> {
    let trainer = store
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Game {id} not found")))?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, trainer, id)))
}

async fn handle_socket(socket: WebSocket, trainer: Arc<Trainer>, id: u64) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = trainer.subscribe();

    // Current state first so a fresh client can render without polling
    let snapshot = trainer.snapshot().await;
    let status: TrainerEvent = snapshot.status_line.clone().into();
    let suggestion = TrainerEvent::Suggestion {
        suggestion: snapshot.suggestion.clone(),
    };
    for event in [status, suggestion] {
        if send_json(&mut sender, &event).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    if send_json(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(game_id = id, skipped, "Event subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!(game_id = id, "Event socket closed");
}

async fn send_json<T: Serialize>(
    sender: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &T,
) -> anyhow::Result<()> {
    let json = serde_json::to_string(msg)?;
    sender.send(Message::Text(json.into())).await?;
    Ok(())
}
