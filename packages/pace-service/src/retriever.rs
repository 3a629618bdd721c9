//! Similarity retrieval of historical tasks.

use std::sync::Arc;

use pace_config::EmbeddingProviderConfig;
use pace_domain::HistoricalTask;

use crate::{EmbeddingProvider, Error, HistoricalFilter, Result, TaskIndex};

pub struct Retriever {
	embedding: Arc<dyn EmbeddingProvider>,
	index: Arc<dyn TaskIndex>,
	cfg: EmbeddingProviderConfig,
}
impl Retriever {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		index: Arc<dyn TaskIndex>,
		cfg: EmbeddingProviderConfig,
	) -> Self {
		Self { embedding, index, cfg }
	}

	/// Returns at most `k` tasks tagged `tag_name`, excluding `exclude_id`, most similar first.
	///
	/// Similarity is approximate and ties keep whatever order the index returned, so two calls
	/// may order equally scored tasks differently. Backend failures degrade to an empty result.
	pub async fn retrieve(
		&self,
		query_text: &str,
		tag_name: &str,
		exclude_id: &str,
		k: u32,
	) -> Vec<HistoricalTask> {
		if query_text.trim().is_empty() || k == 0 {
			return Vec::new();
		}

		let filter = HistoricalFilter::new(tag_name, exclude_id);

		match self.try_retrieve(query_text, &filter, k).await {
			Ok(tasks) => tasks,
			Err(err) => {
				tracing::warn!(
					error = %err,
					tag = tag_name,
					task_client_id = exclude_id,
					"Similarity retrieval failed. Continuing without history."
				);

				Vec::new()
			},
		}
	}

	async fn try_retrieve(
		&self,
		query_text: &str,
		filter: &HistoricalFilter,
		k: u32,
	) -> Result<Vec<HistoricalTask>> {
		let vectors = self.embedding.embed(&self.cfg, &[query_text.to_string()]).await?;
		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};
		let mut scored = self.index.search(vector, filter, k).await?;

		// The index applies the filter too; re-check so a misbehaving backend cannot leak records.
		scored.retain(|candidate| filter.matches(&candidate.task));
		scored.sort_by(|a, b| b.score.total_cmp(&a.score));
		scored.truncate(k as usize);

		Ok(scored.into_iter().map(|candidate| candidate.task).collect())
	}
}
