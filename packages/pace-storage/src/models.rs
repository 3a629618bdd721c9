use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TaskRecord {
	pub task_id: Uuid,
	pub task_client_id: String,
	pub owner_id: String,
	pub title: String,
	pub description: String,
	pub tag_names: Vec<String>,
	pub duration_minutes: i32,
	pub estimated_cost: i32,
	pub actual_duration_minutes: Option<i32>,
	pub actual_cost: Option<i32>,
	pub is_completed: bool,
	pub ai_estimation_status: Option<String>,
	pub ai_time_estimation: Option<i32>,
	pub ai_cost_estimation: Option<i32>,
	pub ai_recommendation: Option<String>,
	pub ai_reasoning: Option<String>,
	pub ai_confidence: Option<String>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl TaskRecord {
	/// Duration a finished task is remembered by: the actual one when recorded, else the plan.
	pub fn historical_duration(&self) -> i32 {
		self.actual_duration_minutes.unwrap_or(self.duration_minutes)
	}

	pub fn historical_cost(&self) -> i32 {
		self.actual_cost.unwrap_or(self.estimated_cost)
	}
}

#[derive(Debug, Clone)]
pub struct NewTask {
	pub task_client_id: String,
	pub owner_id: String,
	pub title: String,
	pub description: String,
	pub tag_names: Vec<String>,
	pub duration_minutes: i32,
	pub estimated_cost: i32,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Tag {
	pub owner_id: String,
	pub tag_name: String,
	pub tag_description: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// Successful estimate written back onto a task row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiEstimationUpdate {
	pub time_estimation: i32,
	pub cost_estimation: i32,
	pub recommendation: String,
	pub reasoning: String,
	pub confidence: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AiEstimation {
	pub task_client_id: String,
	pub ai_estimation_status: Option<String>,
	pub ai_time_estimation: Option<i32>,
	pub ai_cost_estimation: Option<i32>,
	pub ai_recommendation: Option<String>,
	pub ai_reasoning: Option<String>,
	pub ai_confidence: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct TaskIndexingOutboxEntry {
	pub outbox_id: Uuid,
	pub task_client_id: String,
	pub op: String,
	pub status: String,
	pub attempts: i32,
	pub last_error: Option<String>,
	pub available_at: OffsetDateTime,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
