use std::collections::{BTreeSet, HashMap};

use qdrant_client::qdrant::{
	Condition, Filter, Query, QueryPointsBuilder, ScoredPoint, Value, value::Kind,
};

use pace_domain::HistoricalTask;
use pace_storage::qdrant::{DENSE_VECTOR_NAME, QdrantStore, TAGS_FIELD, TASK_CLIENT_ID_FIELD};

use crate::{BoxFuture, Error, Result, TaskIndex};

/// Restricts history to tasks sharing a tag, minus the task being estimated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalFilter {
	pub tag_name: String,
	pub exclude_id: String,
}
impl HistoricalFilter {
	pub fn new(tag_name: impl Into<String>, exclude_id: impl Into<String>) -> Self {
		Self { tag_name: tag_name.into(), exclude_id: exclude_id.into() }
	}

	pub fn matches(&self, task: &HistoricalTask) -> bool {
		task.has_tag(&self.tag_name) && task.id != self.exclude_id
	}

	/// The same predicate expressed as a Qdrant payload filter.
	pub fn to_qdrant(&self) -> Filter {
		let mut filter = Filter::must([Condition::matches(TAGS_FIELD, self.tag_name.clone())]);

		filter.must_not.push(Condition::matches(TASK_CLIENT_ID_FIELD, self.exclude_id.clone()));

		filter
	}
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredTask {
	pub task: HistoricalTask,
	pub score: f32,
}

pub struct QdrantTaskIndex {
	qdrant: QdrantStore,
}
impl QdrantTaskIndex {
	pub fn new(qdrant: QdrantStore) -> Self {
		Self { qdrant }
	}

	async fn query(
		&self,
		vector: Vec<f32>,
		filter: &HistoricalFilter,
		limit: u32,
	) -> Result<Vec<ScoredTask>> {
		let search = QueryPointsBuilder::new(self.qdrant.collection.clone())
			.query(Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.filter(filter.to_qdrant())
			.with_payload(true)
			.limit(u64::from(limit));
		let response = self
			.qdrant
			.client
			.query(search)
			.await
			.map_err(|err| Error::Qdrant { message: err.to_string() })?;
		let mut tasks = Vec::with_capacity(response.result.len());

		for point in response.result {
			match scored_task_from_point(point) {
				Some(task) => tasks.push(task),
				None => tracing::debug!("Skipping Qdrant point without a task payload."),
			}
		}

		Ok(tasks)
	}
}

impl TaskIndex for QdrantTaskIndex {
	fn search<'a>(
		&'a self,
		vector: Vec<f32>,
		filter: &'a HistoricalFilter,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<ScoredTask>>> {
		Box::pin(self.query(vector, filter, limit))
	}
}

fn scored_task_from_point(point: ScoredPoint) -> Option<ScoredTask> {
	let task = historical_task_from_payload(&point.payload)?;

	Some(ScoredTask { task, score: point.score })
}

fn historical_task_from_payload(payload: &HashMap<String, Value>) -> Option<HistoricalTask> {
	Some(HistoricalTask {
		id: payload_string(payload, TASK_CLIENT_ID_FIELD)?,
		title: payload_string(payload, "title").unwrap_or_default(),
		duration_minutes: payload_u32(payload, "duration_minutes"),
		cost: payload_u32(payload, "cost"),
		tags: payload_strings(payload, TAGS_FIELD),
		description: payload_string(payload, "description").unwrap_or_default(),
	})
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.clone()),
		_ => None,
	}
}

fn payload_u32(payload: &HashMap<String, Value>, key: &str) -> Option<u32> {
	match &payload.get(key)?.kind {
		Some(Kind::IntegerValue(value)) => u32::try_from(*value).ok(),
		Some(Kind::DoubleValue(value)) if value.is_finite() && *value >= 0.0 =>
			u32::try_from(value.round() as i64).ok(),
		_ => None,
	}
}

fn payload_strings(payload: &HashMap<String, Value>, key: &str) -> BTreeSet<String> {
	match payload.get(key).and_then(|value| value.kind.as_ref()) {
		Some(Kind::ListValue(list)) => list
			.values
			.iter()
			.filter_map(|value| match &value.kind {
				Some(Kind::StringValue(text)) => Some(text.clone()),
				_ => None,
			})
			.collect(),
		Some(Kind::StringValue(text)) => BTreeSet::from([text.clone()]),
		_ => BTreeSet::new(),
	}
}
