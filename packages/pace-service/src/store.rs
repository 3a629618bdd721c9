use std::sync::Arc;

use pace_domain::RecommendationResult;
use pace_storage::{db::Db, models::AiEstimationUpdate, queries};

use crate::{BoxFuture, EstimationStore, Result};

/// Postgres-backed [`EstimationStore`].
pub struct PgEstimationStore {
	db: Arc<Db>,
}
impl PgEstimationStore {
	pub fn new(db: Arc<Db>) -> Self {
		Self { db }
	}
}

impl EstimationStore for PgEstimationStore {
	fn tag_description<'a>(
		&'a self,
		owner_id: &'a str,
		tag_name: &'a str,
	) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async move {
			Ok(queries::get_tag_description(&self.db, owner_id, tag_name).await?)
		})
	}

	fn record_estimation<'a>(
		&'a self,
		task_client_id: &'a str,
		result: &'a RecommendationResult,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			let update = to_update(result);

			queries::record_ai_estimation(&self.db, task_client_id, &update).await?;

			tracing::info!(
				task_client_id,
				recommendation = %update.recommendation,
				time_estimation = update.time_estimation,
				"Estimation persisted."
			);

			Ok(())
		})
	}

	fn record_estimation_error<'a>(&'a self, task_client_id: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(queries::record_ai_estimation_error(&self.db, task_client_id).await?)
		})
	}
}

fn to_update(result: &RecommendationResult) -> AiEstimationUpdate {
	AiEstimationUpdate {
		time_estimation: i32::try_from(result.suggested_minutes).unwrap_or(i32::MAX),
		cost_estimation: i32::try_from(result.suggested_cost).unwrap_or(i32::MAX),
		recommendation: result.recommendation.as_str().to_string(),
		reasoning: result.reasoning.clone(),
		confidence: result.confidence.as_str().to_string(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use pace_domain::{Confidence, Recommendation};

	#[test]
	fn update_uses_wire_names_and_saturates() {
		let update = to_update(&RecommendationResult {
			recommendation: Recommendation::Keep,
			suggested_minutes: u32::MAX,
			suggested_cost: 12,
			confidence: Confidence::Low,
			reasoning: "Matches history.".to_string(),
			similar_tags_found: 1,
			historical_tasks_analyzed: 2,
		});

		assert_eq!(update.time_estimation, i32::MAX);
		assert_eq!(update.cost_estimation, 12);
		assert_eq!(update.recommendation, "keep");
		assert_eq!(update.confidence, "low");
	}
}
