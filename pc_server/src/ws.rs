//! WebSocket endpoint.
//!
//! Each connection gets a fresh identity, an outbound channel
//! registered with the hub, and two halves: a spawned send task
//! draining that channel onto the socket, and the receive loop
//! decoding JSON commands. Malformed frames are answered directly
//! with an `Error` without bothering the hub.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use log::{error, info, warn};
use tokio::sync::mpsc;

use party_cards::game::PlayerId;
use party_cards::net::{ClientCommand, ServerMessage};

use crate::hub::{HubHandle, HubMessage};

pub async fn websocket_handler(ws: WebSocketUpgrade, State(hub): State<HubHandle>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

async fn handle_socket(socket: WebSocket, hub: HubHandle) {
    let conn_id = PlayerId::new();
    let (mut sender, mut receiver) = socket.split();

    info!("WebSocket connected: {conn_id}");

    let (tx, mut rx) = mpsc::channel::<ServerMessage>(32);
    if hub
        .send(HubMessage::Connect {
            conn_id,
            sender: tx.clone(),
        })
        .await
        .is_err()
    {
        error!("Hub unavailable; closing {conn_id}");
        return;
    }

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(err) => {
                    error!("Failed to serialize a server message: {err}");
                    continue;
                }
            };
            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientCommand>(text.as_str()) {
                Ok(command) => {
                    if hub
                        .send(HubMessage::Command { conn_id, command })
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(err) => {
                    warn!("Unparseable frame from {conn_id}: {err}");
                    let reply = ServerMessage::Error {
                        message: "Invalid message format".to_string(),
                    };
                    if tx.send(reply).await.is_err() {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => {
                info!("WebSocket closed: {conn_id}");
                break;
            }
            Err(err) => {
                error!("WebSocket error on {conn_id}: {err}");
                break;
            }
            _ => {}
        }
    }

    let _ = hub.send(HubMessage::Disconnect { conn_id }).await;
    send_task.abort();

    info!("WebSocket disconnected: {conn_id}");
}
