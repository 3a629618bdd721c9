use sqlx::{Postgres, Transaction};

use crate::{
	Error, Result,
	db::Db,
	models::{AiEstimation, AiEstimationUpdate, NewTask, TaskRecord},
};

pub const AI_STATUS_SUCCESS: &str = "success";
pub const AI_STATUS_ERROR: &str = "error";

const TASK_COLUMNS: &str = "\
	task_id,
	task_client_id,
	owner_id,
	title,
	description,
	tag_names,
	duration_minutes,
	estimated_cost,
	actual_duration_minutes,
	actual_cost,
	is_completed,
	ai_estimation_status,
	ai_time_estimation,
	ai_cost_estimation,
	ai_recommendation,
	ai_reasoning,
	ai_confidence,
	created_at,
	updated_at";

/// Inserts or replaces the user-editable fields of a task. Estimation fields are left untouched.
pub async fn upsert_task_tx(tx: &mut Transaction<'_, Postgres>, task: &NewTask) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO tasks (
	task_client_id,
	owner_id,
	title,
	description,
	tag_names,
	duration_minutes,
	estimated_cost
)
VALUES ($1, $2, $3, $4, $5, $6, $7)
ON CONFLICT (task_client_id) DO UPDATE
SET
	owner_id = EXCLUDED.owner_id,
	title = EXCLUDED.title,
	description = EXCLUDED.description,
	tag_names = EXCLUDED.tag_names,
	duration_minutes = EXCLUDED.duration_minutes,
	estimated_cost = EXCLUDED.estimated_cost,
	updated_at = now()",
	)
	.bind(task.task_client_id.as_str())
	.bind(task.owner_id.as_str())
	.bind(task.title.as_str())
	.bind(task.description.as_str())
	.bind(&task.tag_names)
	.bind(task.duration_minutes)
	.bind(task.estimated_cost)
	.execute(&mut **tx)
	.await?;

	Ok(())
}

/// Returns false when no task carries the id.
pub async fn complete_task_tx(
	tx: &mut Transaction<'_, Postgres>,
	task_client_id: &str,
	actual_duration_minutes: Option<i32>,
	actual_cost: Option<i32>,
) -> Result<bool> {
	let result = sqlx::query(
		"\
UPDATE tasks
SET
	is_completed = true,
	actual_duration_minutes = COALESCE($2, actual_duration_minutes),
	actual_cost = COALESCE($3, actual_cost),
	updated_at = now()
WHERE task_client_id = $1",
	)
	.bind(task_client_id)
	.bind(actual_duration_minutes)
	.bind(actual_cost)
	.execute(&mut **tx)
	.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn delete_task_tx(
	tx: &mut Transaction<'_, Postgres>,
	task_client_id: &str,
) -> Result<bool> {
	let result = sqlx::query("DELETE FROM tasks WHERE task_client_id = $1")
		.bind(task_client_id)
		.execute(&mut **tx)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn get_task(db: &Db, task_client_id: &str) -> Result<Option<TaskRecord>> {
	let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE task_client_id = $1");
	let row = sqlx::query_as::<_, TaskRecord>(sql.as_str())
		.bind(task_client_id)
		.fetch_optional(&db.pool)
		.await?;

	Ok(row)
}

pub async fn upsert_tag(
	db: &Db,
	owner_id: &str,
	tag_name: &str,
	tag_description: &str,
) -> Result<()> {
	sqlx::query(
		"\
INSERT INTO tags (owner_id, tag_name, tag_description)
VALUES ($1, $2, $3)
ON CONFLICT (owner_id, tag_name) DO UPDATE
SET tag_description = EXCLUDED.tag_description, updated_at = now()",
	)
	.bind(owner_id)
	.bind(tag_name)
	.bind(tag_description)
	.execute(&db.pool)
	.await?;

	Ok(())
}

pub async fn get_tag_description(db: &Db, owner_id: &str, tag_name: &str) -> Result<Option<String>> {
	let description: Option<String> = sqlx::query_scalar(
		"SELECT tag_description FROM tags WHERE owner_id = $1 AND tag_name = $2",
	)
	.bind(owner_id)
	.bind(tag_name)
	.fetch_optional(&db.pool)
	.await?;

	Ok(description)
}

/// Writes a successful estimate keyed by the caller's correlation id.
pub async fn record_ai_estimation(
	db: &Db,
	task_client_id: &str,
	update: &AiEstimationUpdate,
) -> Result<()> {
	let result = sqlx::query(
		"\
UPDATE tasks
SET
	ai_estimation_status = $2,
	ai_time_estimation = $3,
	ai_cost_estimation = $4,
	ai_recommendation = $5,
	ai_reasoning = $6,
	ai_confidence = $7,
	updated_at = now()
WHERE task_client_id = $1",
	)
	.bind(task_client_id)
	.bind(AI_STATUS_SUCCESS)
	.bind(update.time_estimation)
	.bind(update.cost_estimation)
	.bind(update.recommendation.as_str())
	.bind(update.reasoning.as_str())
	.bind(update.confidence.as_str())
	.execute(&db.pool)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("task {task_client_id}")));
	}

	Ok(())
}

/// Marks the estimate as failed. Previously stored estimate values are kept.
pub async fn record_ai_estimation_error(db: &Db, task_client_id: &str) -> Result<()> {
	let result = sqlx::query(
		"UPDATE tasks SET ai_estimation_status = $2, updated_at = now() WHERE task_client_id = $1",
	)
	.bind(task_client_id)
	.bind(AI_STATUS_ERROR)
	.execute(&db.pool)
	.await?;

	if result.rows_affected() == 0 {
		return Err(Error::NotFound(format!("task {task_client_id}")));
	}

	Ok(())
}

pub async fn get_ai_estimation(db: &Db, task_client_id: &str) -> Result<Option<AiEstimation>> {
	let row = sqlx::query_as::<_, AiEstimation>(
		"\
SELECT
	task_client_id,
	ai_estimation_status,
	ai_time_estimation,
	ai_cost_estimation,
	ai_recommendation,
	ai_reasoning,
	ai_confidence
FROM tasks
WHERE task_client_id = $1",
	)
	.bind(task_client_id)
	.fetch_optional(&db.pool)
	.await?;

	Ok(row)
}
