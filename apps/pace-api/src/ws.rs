//! Notification channel transport: one WebSocket per client id, one JSON notification per text frame.

use std::time::Duration;

use axum::{
	extract::{
		Path, State, WebSocketUpgrade,
		ws::{Message, WebSocket},
	},
	response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use tokio::time;

use pace_service::ChannelHub;

use crate::state::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

pub async fn notifications(
	ws: WebSocketUpgrade,
	State(state): State<AppState>,
	Path(client_id): Path<String>,
) -> impl IntoResponse {
	let hub = state.service.hub.clone();

	ws.on_upgrade(move |socket| forward(socket, hub, client_id))
}

async fn forward(socket: WebSocket, hub: ChannelHub, channel: String) {
	let subscription = hub.connect(&channel);
	let connection_id = subscription.connection_id;
	let mut notifications = subscription.receiver;
	let (mut sender, mut incoming) = socket.split();
	let mut ping = time::interval(PING_INTERVAL);

	// The first tick completes immediately.
	ping.tick().await;

	loop {
		tokio::select! {
			notification = notifications.recv() => {
				let Some(notification) = notification else {
					tracing::debug!(channel = %channel, "Connection replaced by a newer one.");

					break;
				};

				match serde_json::to_string(&notification) {
					Ok(json) => {
						if sender.send(Message::Text(json.into())).await.is_err() {
							tracing::debug!(channel = %channel, "WebSocket send failed. Client disconnected.");

							break;
						}
					},
					Err(err) => {
						tracing::warn!(error = %err, channel = %channel, "Failed to serialize notification.");
					},
				}
			},
			_ = ping.tick() => {
				if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
					tracing::debug!(channel = %channel, "Ping failed. Client disconnected.");

					break;
				}
			},
			message = incoming.next() => {
				match message {
					Some(Ok(Message::Close(_))) | None => break,
					Some(Err(err)) => {
						tracing::debug!(error = %err, channel = %channel, "WebSocket error.");

						break;
					},
					// Clients only listen; inbound frames are ignored.
					_ => {},
				}
			},
		}
	}

	hub.disconnect(&channel, connection_id);

	tracing::debug!(channel = %channel, connection_id, "WebSocket connection closed.");
}
