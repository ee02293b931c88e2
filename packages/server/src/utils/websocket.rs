use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};

use crate::error::GameError;
use crate::models::event::GameEvent;
use crate::state::AppState;

pub async fn handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, GameError> {
    // Subscribe before reading the backlog so nothing falls in between.
    let rx = state.sessions.subscribe(&session_id).await?;
    let backlog = state.sessions.events(&session_id, 0).await?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, session_id, backlog, rx)))
}

pub async fn handle_socket(
    ws: WebSocket,
    session_id: String,
    backlog: Vec<GameEvent>,
    mut rx: broadcast::Receiver<GameEvent>,
) {
    info!("WebSocket subscriber attached to session {}", session_id);
    let (mut sender, mut receiver) = ws.split();

    let send_session = session_id.clone();
    let mut send_task = tokio::spawn(async move {
        let mut next_seq = 0;
        for event in backlog {
            next_seq = event.seq + 1;
            if send_event(&mut sender, &event).await.is_err() {
                return;
            }
        }
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if event.seq < next_seq {
                        continue;
                    }
                    next_seq = event.seq + 1;
                    if send_event(&mut sender, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "WebSocket subscriber in session {} lagged by {} events",
                        send_session, skipped
                    );
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Inbound frames are ignored; commands go through the HTTP surface.
    let mut receive_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => receive_task.abort(),
        _ = &mut receive_task => send_task.abort(),
    }
    info!("WebSocket subscriber left session {}", session_id);
}

async fn send_event<S>(sender: &mut S, event: &GameEvent) -> Result<(), ()>
where
    S: SinkExt<Message> + Unpin,
{
    let text = serde_json::to_string(event).map_err(|_| ())?;
    sender.send(Message::Text(text)).await.map_err(|_| ())
}
