//! Runs the pipeline for one task-creation event and reports back.
//!
//! Notifications on a job's channel always follow `started -> (result | error) -> completed`,
//! with `completed` only after a result. Persistence is keyed by the caller's correlation id.

use std::{
	collections::HashSet,
	sync::{Arc, Mutex},
};

use serde::{Deserialize, Serialize};

use pace_domain::{PipelineInputArgs, RecommendationResult};

use crate::{EstimationStore, Notification, NotificationSink, Orchestrator};

/// A task-creation event that carries a notification target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationJob {
	pub channel: String,
	pub task_client_id: String,
	pub owner_id: String,
	pub title: String,
	pub description: String,
	pub tag_names: Vec<String>,
	pub initial_minutes: u32,
	pub initial_cost: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
	Completed(RecommendationResult),
	Failed { message: String },
	/// Another run for the same correlation id was in flight.
	Rejected,
}

pub struct Delivery {
	orchestrator: Orchestrator,
	store: Arc<dyn EstimationStore>,
	sink: Arc<dyn NotificationSink>,
	leases: Leases,
}
impl Delivery {
	pub fn new(
		orchestrator: Orchestrator,
		store: Arc<dyn EstimationStore>,
		sink: Arc<dyn NotificationSink>,
	) -> Self {
		Self { orchestrator, store, sink, leases: Leases::default() }
	}

	pub fn announce(&self, job: &EstimationJob) {
		self.notify(&job.channel, Notification::started(&job.task_client_id));
	}

	/// Runs the pipeline and delivers its outcome. Call [`Self::announce`] first.
	pub async fn run(&self, job: EstimationJob) -> DeliveryOutcome {
		let Some(_lease) = self.leases.try_acquire(&job.task_client_id) else {
			tracing::warn!(
				task_client_id = %job.task_client_id,
				channel = %job.channel,
				"Estimation already running for task. Rejecting duplicate."
			);
			self.notify(
				&job.channel,
				Notification::error(
					&job.task_client_id,
					"An estimation for this task is already running.",
				),
			);

			return DeliveryOutcome::Rejected;
		};
		let args = self.pipeline_args(&job).await;

		match self.orchestrator.run(args).await {
			Ok(run) => {
				let result = run.result;

				self.notify(&job.channel, Notification::result(&job.task_client_id, result.clone()));

				if let Err(err) = self.store.record_estimation(&job.task_client_id, &result).await {
					tracing::warn!(
						error = %err,
						task_client_id = %job.task_client_id,
						"Failed to persist estimation. The notification was already sent."
					);
				}

				self.notify(&job.channel, Notification::completed(&job.task_client_id));

				DeliveryOutcome::Completed(result)
			},
			Err(err) => {
				let message = err.to_string();

				self.fail(&job.channel, &job.task_client_id, &message).await;

				DeliveryOutcome::Failed { message }
			},
		}
	}

	/// Terminal failure path: error notification, then a best-effort `error` status on the task.
	pub async fn fail(&self, channel: &str, task_client_id: &str, message: &str) {
		tracing::error!(task_client_id, channel, error = message, "Estimation run failed.");

		self.notify(channel, Notification::error(task_client_id, message));

		if let Err(err) = self.store.record_estimation_error(task_client_id).await {
			tracing::warn!(
				error = %err,
				task_client_id,
				"Failed to persist estimation error status."
			);
		}
	}

	async fn pipeline_args(&self, job: &EstimationJob) -> PipelineInputArgs {
		let tag_name = job.tag_names.first().map(|tag| tag.trim().to_string());
		let tag_description = match tag_name.as_deref() {
			Some(tag) if !tag.is_empty() => self.tag_description(&job.owner_id, tag).await,
			_ => String::new(),
		};

		PipelineInputArgs {
			correlation_id: job.task_client_id.clone(),
			owner_id: job.owner_id.clone(),
			title: job.title.clone(),
			description: job.description.clone(),
			tag_name,
			tag_description,
			initial_minutes: job.initial_minutes,
			initial_cost: job.initial_cost,
		}
	}

	async fn tag_description(&self, owner_id: &str, tag_name: &str) -> String {
		match self.store.tag_description(owner_id, tag_name).await {
			Ok(Some(description)) => description,
			Ok(None) => {
				tracing::warn!(owner_id, tag = tag_name, "Tag not registered. Using empty description.");

				String::new()
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					owner_id,
					tag = tag_name,
					"Tag lookup failed. Using empty description."
				);

				String::new()
			},
		}
	}

	fn notify(&self, channel: &str, notification: Notification) {
		let kind = notification.kind();

		if let Err(err) = self.sink.send(channel, notification) {
			tracing::warn!(error = %err, channel, kind, "Notification not delivered.");
		}
	}
}

/// Correlation ids with a run in flight.
#[derive(Clone, Default)]
pub struct Leases {
	held: Arc<Mutex<HashSet<String>>>,
}
impl Leases {
	pub fn try_acquire(&self, task_client_id: &str) -> Option<LeaseGuard> {
		let inserted = self
			.held
			.lock()
			.unwrap_or_else(|err| err.into_inner())
			.insert(task_client_id.to_string());

		inserted.then(|| LeaseGuard { held: self.held.clone(), task_client_id: task_client_id.to_string() })
	}

	pub fn is_held(&self, task_client_id: &str) -> bool {
		self.held.lock().unwrap_or_else(|err| err.into_inner()).contains(task_client_id)
	}
}

/// Releases its lease on drop, including during unwinding.
pub struct LeaseGuard {
	held: Arc<Mutex<HashSet<String>>>,
	task_client_id: String,
}
impl Drop for LeaseGuard {
	fn drop(&mut self) {
		self.held.lock().unwrap_or_else(|err| err.into_inner()).remove(&self.task_client_id);
	}
}
