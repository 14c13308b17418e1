//! WebSocket handler for real-time reading streaming

use axum::{
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
};
use futures::{SinkExt, stream::StreamExt};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::{actors::messages::ReadingEvent, api::state::ApiState};

/// WebSocket upgrade handler
///
/// GET /api/v1/stream
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(|socket| handle_websocket(socket, state))
}

pub(crate) fn reading_message(event: &ReadingEvent) -> serde_json::Value {
    let reading = &event.reading;

    json!({
        "type": "reading",
        "id": reading.timestamp.timestamp_millis().to_string(),
        "temperature": reading.temperature,
        "humidity": reading.humidity,
        "water_temp": reading.water_temp,
        "timestamp": reading.timestamp.to_rfc3339(),
        "source": event.source,
    })
}

async fn handle_websocket(socket: WebSocket, state: ApiState) {
    info!("WebSocket client connected");

    let (mut sender, mut receiver) = socket.split();

    // subscribe before greeting so no reading falls in between
    let mut reading_rx = state.subscribe();

    let greeting = json!({ "type": "connected" }).to_string();
    if sender.send(Message::Text(greeting)).await.is_err() {
        debug!("WebSocket closed before greeting");
        return;
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            match reading_rx.recv().await {
                Ok(event) => {
                    let text = reading_message(&event).to_string();
                    if sender.send(Message::Text(text)).await.is_err() {
                        debug!("WebSocket send failed, client disconnected");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagged, skipped {skipped} readings");
                }
                Err(RecvError::Closed) => {
                    debug!("reading channel closed");
                    break;
                }
            }
        }
    });

    // incoming messages are ignored apart from close
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => {
            recv_task.abort();
        }
        _ = (&mut recv_task) => {
            send_task.abort();
        }
    }

    info!("WebSocket client disconnected");
}
