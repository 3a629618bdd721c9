//! Keeps the historical task index in step with Postgres by draining `task_indexing_outbox`.

use std::{collections::HashMap, time::Duration as StdDuration};

use qdrant_client::{
	QdrantError,
	client::Payload,
	qdrant::{
		Condition, DeletePointsBuilder, Filter, PointStruct, UpsertPointsBuilder, Value, Vector,
	},
};
use serde_json::Value as JsonValue;
use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use pace_config::EmbeddingProviderConfig;
use pace_providers::embedding;
use pace_storage::{
	db::Db,
	models::{TaskIndexingOutboxEntry, TaskRecord},
	outbox::{self, OutboxOp},
	qdrant::{self, DENSE_VECTOR_NAME, QdrantStore, TAGS_FIELD, TASK_CLIENT_ID_FIELD},
	queries,
};

use crate::{Error, Result};

const POLL_INTERVAL_MS: i64 = 500;
const CLAIM_LEASE_SECONDS: i64 = 30;
const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;
const MAX_OUTBOX_ERROR_CHARS: usize = 1_024;

pub struct WorkerState {
	pub db: Db,
	pub qdrant: QdrantStore,
	pub embedding: EmbeddingProviderConfig,
}

pub async fn run_worker(state: WorkerState) -> Result<()> {
	tracing::info!(collection = %state.qdrant.collection, "Indexing worker started.");

	loop {
		match process_indexing_outbox_once(&state).await {
			// Drain back to back while jobs are due.
			Ok(true) => continue,
			Ok(false) => {},
			Err(err) => tracing::error!(error = %err, "Indexing outbox processing failed."),
		}

		tokio_time::sleep(to_std_duration(Duration::milliseconds(POLL_INTERVAL_MS))).await;
	}
}

/// Handles at most one due job. Returns whether a job was claimed.
pub async fn process_indexing_outbox_once(state: &WorkerState) -> Result<bool> {
	let now = OffsetDateTime::now_utc();
	let lease = Duration::seconds(CLAIM_LEASE_SECONDS);
	let Some(job) = outbox::fetch_next_job(&state.db, now, lease).await? else {
		return Ok(false);
	};
	let result = match OutboxOp::parse(&job.op) {
		Ok(OutboxOp::Upsert) => handle_upsert(state, &job).await,
		Ok(OutboxOp::Delete) => handle_delete(state, &job).await,
		Err(err) => Err(err.into()),
	};

	match result {
		Ok(()) => {
			outbox::mark_done(&state.db, job.outbox_id, OffsetDateTime::now_utc()).await?;

			tracing::debug!(
				outbox_id = %job.outbox_id,
				task_client_id = %job.task_client_id,
				op = %job.op,
				"Outbox job done."
			);
		},
		Err(err) => {
			mark_failed(&state.db, &job, &err).await?;

			tracing::error!(
				error = %err,
				outbox_id = %job.outbox_id,
				task_client_id = %job.task_client_id,
				"Outbox job failed."
			);
		},
	}

	Ok(true)
}

async fn handle_upsert(state: &WorkerState, job: &TaskIndexingOutboxEntry) -> Result<()> {
	let Some(task) = queries::get_task(&state.db, &job.task_client_id).await? else {
		tracing::info!(
			task_client_id = %job.task_client_id,
			"Task missing for outbox job. Marking done."
		);

		return Ok(());
	};
	let vectors = embedding::embed(&state.embedding, &[index_text(&task)]).await?;
	let Some(vector) = vectors.into_iter().next() else {
		return Err(Error::Message("Embedding provider returned no vectors.".to_string()));
	};

	validate_vector_dim(&vector, state.qdrant.vector_dim)?;

	let point = build_point(&task, vector);
	let upsert = UpsertPointsBuilder::new(state.qdrant.collection.clone(), vec![point]).wait(true);

	state.qdrant.client.upsert_points(upsert).await?;

	Ok(())
}

async fn handle_delete(state: &WorkerState, job: &TaskIndexingOutboxEntry) -> Result<()> {
	let filter =
		Filter::must([Condition::matches(TASK_CLIENT_ID_FIELD, job.task_client_id.clone())]);
	let delete =
		DeletePointsBuilder::new(state.qdrant.collection.clone()).points(filter).wait(true);

	match state.qdrant.client.delete_points(delete).await {
		Ok(_) => {},
		Err(err) =>
			if is_not_found_error(&err) {
				tracing::info!(
					task_client_id = %job.task_client_id,
					"Qdrant point missing during delete."
				);
			} else {
				return Err(err.into());
			},
	}

	Ok(())
}

/// Text embedded for a task.
fn index_text(task: &TaskRecord) -> String {
	let description = task.description.trim();

	if description.is_empty() {
		task.title.clone()
	} else {
		format!("{}: {description}", task.title)
	}
}

fn build_point(task: &TaskRecord, vector: Vec<f32>) -> PointStruct {
	let fields = [
		(TASK_CLIENT_ID_FIELD, JsonValue::from(task.task_client_id.clone())),
		("owner_id", JsonValue::from(task.owner_id.clone())),
		("title", JsonValue::from(task.title.clone())),
		("description", JsonValue::from(task.description.clone())),
		(TAGS_FIELD, JsonValue::from(task.tag_names.clone())),
		("duration_minutes", JsonValue::from(task.historical_duration())),
		("cost", JsonValue::from(task.historical_cost())),
		("is_completed", JsonValue::from(task.is_completed)),
	];
	let payload_map: HashMap<String, Value> =
		fields.into_iter().map(|(key, value)| (key.to_string(), Value::from(value))).collect();
	let mut vector_map = HashMap::new();

	vector_map.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(vector));

	PointStruct::new(
		qdrant::point_id_for(&task.task_client_id).to_string(),
		vector_map,
		Payload::from(payload_map),
	)
}

fn validate_vector_dim(vec: &[f32], expected_dim: u32) -> Result<()> {
	if vec.len() != expected_dim as usize {
		return Err(Error::Message(format!(
			"Embedding dimension {} does not match configured vector_dim {expected_dim}.",
			vec.len()
		)));
	}

	Ok(())
}

fn is_not_found_error(err: &QdrantError) -> bool {
	let message = err.to_string().to_lowercase();
	let point_not_found =
		(message.contains("not found") || message.contains("404")) && message.contains("point");
	let no_point_found = message.contains("no point") && message.contains("found");

	point_not_found || no_point_found
}

async fn mark_failed(db: &Db, job: &TaskIndexingOutboxEntry, err: &Error) -> Result<()> {
	let next_attempts = job.attempts.saturating_add(1);
	let now = OffsetDateTime::now_utc();
	let available_at = now + backoff_for_attempt(next_attempts);
	let error_text = sanitize_outbox_error(&err.to_string());

	outbox::mark_failed(db, job.outbox_id, next_attempts, &error_text, available_at, now).await?;

	Ok(())
}

/// Redacts credentials that provider errors tend to echo back and caps the length.
fn sanitize_outbox_error(text: &str) -> String {
	let mut parts = Vec::new();
	let mut redact_next = false;

	for raw in text.split_whitespace() {
		let mut word = raw.to_string();

		if redact_next {
			word = "[REDACTED]".to_string();
			redact_next = false;
		}
		if raw.eq_ignore_ascii_case("bearer") {
			redact_next = true;
		}

		let lowered = raw.to_ascii_lowercase();

		for key in ["api_key", "apikey", "password", "secret", "token"] {
			if lowered.contains(key) && (lowered.contains('=') || lowered.contains(':')) {
				let sep = if raw.contains('=') { '=' } else { ':' };
				let prefix = raw.split(sep).next().unwrap_or(raw);

				word = format!("{prefix}{sep}[REDACTED]");

				break;
			}
		}

		parts.push(word);
	}

	let mut out = parts.join(" ");

	if out.chars().count() > MAX_OUTBOX_ERROR_CHARS {
		out = out.chars().take(MAX_OUTBOX_ERROR_CHARS).collect();
		out.push_str("...");
	}

	out
}

fn backoff_for_attempt(attempt: i32) -> Duration {
	let attempts = attempt.max(1) as u32;
	let exp = attempts.saturating_sub(1).min(6);
	let base = BASE_BACKOFF_MS.saturating_mul(1 << exp);

	Duration::milliseconds(base.min(MAX_BACKOFF_MS))
}

fn to_std_duration(duration: Duration) -> StdDuration {
	let millis = duration.whole_milliseconds();

	if millis <= 0 {
		return StdDuration::from_millis(0);
	}

	StdDuration::from_millis(millis as u64)
}
