use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU64, Ordering},
	},
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use pace_domain::RecommendationResult;

use crate::{Error, NotificationSink, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
	Started,
	Completed,
}

/// One message on a notification channel, serialized as `{"type": ..., "payload": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "lowercase")]
pub enum Notification {
	Status { task_client_id: String, status: RunStatus },
	Result {
		task_client_id: String,
		#[serde(flatten)]
		result: RecommendationResult,
	},
	Error { task_client_id: String, message: String },
}
impl Notification {
	pub fn started(task_client_id: &str) -> Self {
		Self::Status { task_client_id: task_client_id.to_string(), status: RunStatus::Started }
	}

	pub fn completed(task_client_id: &str) -> Self {
		Self::Status { task_client_id: task_client_id.to_string(), status: RunStatus::Completed }
	}

	pub fn result(task_client_id: &str, result: RecommendationResult) -> Self {
		Self::Result { task_client_id: task_client_id.to_string(), result }
	}

	pub fn error(task_client_id: &str, message: impl Into<String>) -> Self {
		Self::Error { task_client_id: task_client_id.to_string(), message: message.into() }
	}

	pub fn task_client_id(&self) -> &str {
		match self {
			Self::Status { task_client_id, .. }
			| Self::Result { task_client_id, .. }
			| Self::Error { task_client_id, .. } => task_client_id,
		}
	}

	pub fn kind(&self) -> &'static str {
		match self {
			Self::Status { .. } => "status",
			Self::Result { .. } => "result",
			Self::Error { .. } => "error",
		}
	}
}

/// A live connection's end of a channel.
pub struct Subscription {
	pub connection_id: u64,
	pub receiver: mpsc::UnboundedReceiver<Notification>,
}

/// Routes notifications to the connection currently bound to each channel id.
///
/// A channel has at most one connection; reconnecting replaces the previous one. Messages for a
/// channel with no connection are dropped with an error.
#[derive(Clone, Default)]
pub struct ChannelHub {
	channels: Arc<Mutex<HashMap<String, (u64, mpsc::UnboundedSender<Notification>)>>>,
	next_id: Arc<AtomicU64>,
}
impl ChannelHub {
	pub fn connect(&self, channel: &str) -> Subscription {
		let (sender, receiver) = mpsc::unbounded_channel();
		let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);

		self.channels
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.insert(channel.to_string(), (connection_id, sender));

		tracing::debug!(channel, connection_id, "Notification channel connected.");

		Subscription { connection_id, receiver }
	}

	/// Unbinds the channel if `connection_id` still owns it.
	pub fn disconnect(&self, channel: &str, connection_id: u64) {
		let mut channels = self.channels.lock().unwrap_or_else(|err| err.into_inner());

		if channels.get(channel).is_some_and(|(id, _)| *id == connection_id) {
			channels.remove(channel);

			tracing::debug!(channel, connection_id, "Notification channel disconnected.");
		}
	}

	pub fn is_connected(&self, channel: &str) -> bool {
		self.channels.lock().unwrap_or_else(|err| err.into_inner()).contains_key(channel)
	}
}

impl NotificationSink for ChannelHub {
	fn send(&self, channel: &str, notification: Notification) -> Result<()> {
		let mut channels = self.channels.lock().unwrap_or_else(|err| err.into_inner());
		let Some((_, sender)) = channels.get(channel) else {
			return Err(Error::Notification {
				message: format!("No live connection for channel {channel}."),
			});
		};

		if sender.send(notification).is_err() {
			channels.remove(channel);

			return Err(Error::Notification {
				message: format!("Connection for channel {channel} is closed."),
			});
		}

		Ok(())
	}
}
