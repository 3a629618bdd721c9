use serde::{Deserialize, Serialize};

use pace_storage::{
	models::{AiEstimation, NewTask},
	outbox::{self, OutboxOp},
	queries,
};

use crate::{Error, EstimationJob, PaceService, Result};

const DEFAULT_INITIAL_MINUTES: u32 = 30;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTaskRequest {
	pub task_client_id: String,
	pub owner_id: String,
	pub title: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub tag_names: Vec<String>,
	pub initial_minutes: Option<u32>,
	pub initial_cost: Option<u32>,
	/// Notification channel for the estimation run. Without one no estimation is queued.
	pub socket_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateTaskResponse {
	pub task_client_id: String,
	pub estimation_queued: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompleteTaskRequest {
	pub actual_duration_minutes: Option<u32>,
	pub actual_cost: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskAck {
	pub task_client_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertTagRequest {
	pub owner_id: String,
	pub tag_name: String,
	#[serde(default)]
	pub tag_description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EstimationResponse {
	pub task_client_id: String,
	pub status: Option<String>,
	pub time_estimation: Option<i32>,
	pub cost_estimation: Option<i32>,
	pub recommendation: Option<String>,
	pub reasoning: Option<String>,
	pub confidence: Option<String>,
}
impl From<AiEstimation> for EstimationResponse {
	fn from(row: AiEstimation) -> Self {
		Self {
			task_client_id: row.task_client_id,
			status: row.ai_estimation_status,
			time_estimation: row.ai_time_estimation,
			cost_estimation: row.ai_cost_estimation,
			recommendation: row.ai_recommendation,
			reasoning: row.ai_reasoning,
			confidence: row.ai_confidence,
		}
	}
}

impl PaceService {
	/// Stores the task with its indexing outbox entry, then queues an estimation when a
	/// notification channel is given. The response does not wait for the estimation.
	pub async fn create_task(&self, req: CreateTaskRequest) -> Result<CreateTaskResponse> {
		let task_client_id = required("task_client_id", &req.task_client_id)?;
		let owner_id = required("owner_id", &req.owner_id)?;
		let title = required("title", &req.title)?;
		let tag_names = normalize_tags(&req.tag_names);
		let initial_minutes = match req.initial_minutes {
			Some(minutes) if minutes > 0 => minutes,
			_ => DEFAULT_INITIAL_MINUTES,
		};
		let initial_cost = req.initial_cost.unwrap_or(0);
		let task = NewTask {
			task_client_id: task_client_id.clone(),
			owner_id: owner_id.clone(),
			title: title.clone(),
			description: req.description.clone(),
			tag_names: tag_names.clone(),
			duration_minutes: to_column("initial_minutes", initial_minutes)?,
			estimated_cost: to_column("initial_cost", initial_cost)?,
		};
		let mut tx = self.db.pool.begin().await?;

		queries::upsert_task_tx(&mut tx, &task).await?;
		outbox::enqueue_tx(&mut tx, &task_client_id, OutboxOp::Upsert).await?;

		tx.commit().await?;

		let channel = req.socket_id.as_deref().map(str::trim).filter(|channel| !channel.is_empty());
		let Some(channel) = channel else {
			return Ok(CreateTaskResponse { task_client_id, estimation_queued: false });
		};
		let job = EstimationJob {
			channel: channel.to_string(),
			task_client_id: task_client_id.clone(),
			owner_id,
			title,
			description: req.description,
			tag_names,
			initial_minutes,
			initial_cost,
		};
		let estimation_queued = match self.queue.submit(job) {
			Ok(()) => true,
			Err(err) => {
				tracing::error!(
					error = %err,
					task_client_id = %task_client_id,
					"Failed to queue estimation. Task was stored without one."
				);

				false
			},
		};

		Ok(CreateTaskResponse { task_client_id, estimation_queued })
	}

	/// Marks the task completed so it can serve as history for later estimates.
	pub async fn complete_task(
		&self,
		task_client_id: &str,
		req: CompleteTaskRequest,
	) -> Result<TaskAck> {
		let task_client_id = required("task_client_id", task_client_id)?;
		let actual_duration = req
			.actual_duration_minutes
			.map(|minutes| to_column("actual_duration_minutes", minutes))
			.transpose()?;
		let actual_cost =
			req.actual_cost.map(|cost| to_column("actual_cost", cost)).transpose()?;
		let mut tx = self.db.pool.begin().await?;

		if !queries::complete_task_tx(&mut tx, &task_client_id, actual_duration, actual_cost).await? {
			return Err(Error::NotFound { message: format!("task {task_client_id}") });
		}

		outbox::enqueue_tx(&mut tx, &task_client_id, OutboxOp::Upsert).await?;

		tx.commit().await?;

		Ok(TaskAck { task_client_id })
	}

	pub async fn delete_task(&self, task_client_id: &str) -> Result<TaskAck> {
		let task_client_id = required("task_client_id", task_client_id)?;
		let mut tx = self.db.pool.begin().await?;

		if !queries::delete_task_tx(&mut tx, &task_client_id).await? {
			return Err(Error::NotFound { message: format!("task {task_client_id}") });
		}

		outbox::enqueue_tx(&mut tx, &task_client_id, OutboxOp::Delete).await?;

		tx.commit().await?;

		Ok(TaskAck { task_client_id })
	}

	pub async fn upsert_tag(&self, req: UpsertTagRequest) -> Result<()> {
		let owner_id = required("owner_id", &req.owner_id)?;
		let tag_name = required("tag_name", &req.tag_name)?;

		queries::upsert_tag(&self.db, &owner_id, &tag_name, req.tag_description.trim()).await?;

		Ok(())
	}

	pub async fn get_estimation(&self, task_client_id: &str) -> Result<EstimationResponse> {
		let task_client_id = required("task_client_id", task_client_id)?;
		let row = queries::get_ai_estimation(&self.db, &task_client_id)
			.await?
			.ok_or_else(|| Error::NotFound { message: format!("task {task_client_id}") })?;

		Ok(row.into())
	}
}

fn required(field: &str, value: &str) -> Result<String> {
	let value = value.trim();

	if value.is_empty() {
		return Err(Error::InvalidRequest { message: format!("{field} must be non-empty.") });
	}

	Ok(value.to_string())
}

/// Trims tags and drops blanks. The first remaining tag drives estimation.
fn normalize_tags(tags: &[String]) -> Vec<String> {
	tags.iter().map(|tag| tag.trim()).filter(|tag| !tag.is_empty()).map(str::to_string).collect()
}

fn to_column(field: &str, value: u32) -> Result<i32> {
	i32::try_from(value).map_err(|_| Error::InvalidRequest {
		message: format!("{field} must be at most {}.", i32::MAX),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn required_fields_are_trimmed() {
		assert_eq!(required("title", "  Write report ").expect("valid"), "Write report");
		assert!(matches!(required("title", "   "), Err(Error::InvalidRequest { .. })));
	}

	#[test]
	fn blank_tags_are_dropped_in_order() {
		let tags = vec![" ".to_string(), "work ".to_string(), "home".to_string()];

		assert_eq!(normalize_tags(&tags), vec!["work".to_string(), "home".to_string()]);
	}

	#[test]
	fn oversized_values_are_rejected() {
		assert_eq!(to_column("initial_cost", 42).expect("fits"), 42);
		assert!(matches!(to_column("initial_cost", u32::MAX), Err(Error::InvalidRequest { .. })));
	}
}
