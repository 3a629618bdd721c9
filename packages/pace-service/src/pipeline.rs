//! Two-stage estimation pipeline: retrieve history, then synthesize a recommendation.
//!
//! Each stage reads an immutable snapshot of [`PipelineState`] and returns a [`StateUpdate`]. The
//! orchestrator merges updates by replacing keys, except `trace`, which only grows. A run owns its
//! state, so one [`Orchestrator`] can serve any number of concurrent runs.

use std::{sync::Arc, time::Duration};

use tokio::time;

use pace_config::Config;
use pace_domain::{HistoricalTask, PipelineInput, PipelineInputArgs, RecommendationResult};

use crate::{
	Error, Providers, Result, TaskIndex,
	retriever::Retriever,
	synthesizer::{PromptLimits, Synthesizer},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
	Retrieve,
	Synthesize,
	Done,
}
impl Stage {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Retrieve => "retrieve",
			Self::Synthesize => "synthesize",
			Self::Done => "done",
		}
	}

	fn next(self) -> Self {
		match self {
			Self::Retrieve => Self::Synthesize,
			Self::Synthesize | Self::Done => Self::Done,
		}
	}
}

#[derive(Debug, Clone)]
pub struct PipelineState {
	pub input: PipelineInput,
	pub historical: Vec<HistoricalTask>,
	pub result: Option<RecommendationResult>,
	pub trace: Vec<String>,
}
impl PipelineState {
	pub fn new(input: PipelineInput) -> Self {
		Self { input, historical: Vec::new(), result: None, trace: Vec::new() }
	}

	pub fn merge(mut self, update: StateUpdate) -> Self {
		if let Some(historical) = update.historical {
			self.historical = historical;
		}
		if let Some(result) = update.result {
			self.result = Some(result);
		}

		self.trace.extend(update.trace);

		self
	}
}

/// Partial state produced by a stage. `None` leaves the key untouched.
#[derive(Debug, Clone, Default)]
pub struct StateUpdate {
	pub historical: Option<Vec<HistoricalTask>>,
	pub result: Option<RecommendationResult>,
	pub trace: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineRun {
	pub result: RecommendationResult,
	pub trace: Vec<String>,
}

pub struct Orchestrator {
	retriever: Retriever,
	synthesizer: Synthesizer,
	top_k: u32,
	retrieve_timeout: Duration,
}
impl Orchestrator {
	pub fn new(cfg: &Config, providers: &Providers, index: Arc<dyn TaskIndex>) -> Self {
		let estimation = &cfg.estimation;
		let retriever =
			Retriever::new(providers.embedding.clone(), index, cfg.providers.embedding.clone());
		let synthesizer = Synthesizer::new(
			providers.judgment.clone(),
			cfg.providers.llm_judgment.clone(),
			PromptLimits::from(estimation),
			Duration::from_millis(estimation.judgment_timeout_ms),
		);

		Self {
			retriever,
			synthesizer,
			top_k: estimation.top_k,
			retrieve_timeout: Duration::from_millis(estimation.retrieve_timeout_ms),
		}
	}

	/// Runs both stages to completion.
	///
	/// Invalid input and a run that ends without a result are the only errors; retrieval and
	/// judgment problems degrade inside their stage.
	pub async fn run(&self, args: PipelineInputArgs) -> Result<PipelineRun> {
		let input = PipelineInput::new(args)
			.map_err(|rejection| Error::Orchestrator { message: rejection.to_string() })?;
		let mut state = PipelineState::new(input);
		let mut stage = Stage::Retrieve;

		while stage != Stage::Done {
			tracing::debug!(
				task_client_id = state.input.correlation_id(),
				stage = stage.as_str(),
				"Entering pipeline stage."
			);

			let update = match stage {
				Stage::Retrieve => self.retrieve_stage(&state).await,
				Stage::Synthesize => self.synthesize_stage(&state).await,
				Stage::Done => StateUpdate::default(),
			};

			state = state.merge(update);
			stage = stage.next();
		}

		let PipelineState { input, result, trace, .. } = state;
		let result = result.ok_or_else(|| Error::Orchestrator {
			message: format!("Pipeline for {} finished without a result.", input.correlation_id()),
		})?;

		tracing::debug!(task_client_id = input.correlation_id(), trace = ?trace, "Pipeline finished.");

		Ok(PipelineRun { result, trace })
	}

	async fn retrieve_stage(&self, state: &PipelineState) -> StateUpdate {
		let input = &state.input;
		let retrieval = self.retriever.retrieve(
			input.query_text(),
			input.tag_name(),
			input.correlation_id(),
			self.top_k,
		);
		let historical = match time::timeout(self.retrieve_timeout, retrieval).await {
			Ok(historical) => historical,
			Err(_) => {
				tracing::warn!(
					task_client_id = input.correlation_id(),
					timeout_ms = self.retrieve_timeout.as_millis() as u64,
					"Similarity retrieval timed out. Continuing without history."
				);

				Vec::new()
			},
		};
		let trace = vec![format!("retrieve: {} historical tasks", historical.len())];

		StateUpdate { historical: Some(historical), trace, ..Default::default() }
	}

	async fn synthesize_stage(&self, state: &PipelineState) -> StateUpdate {
		let result = self.synthesizer.synthesize(&state.input, &state.historical).await;
		let trace = vec![format!(
			"synthesize: {} {} minutes, cost {}",
			result.recommendation.as_str(),
			result.suggested_minutes,
			result.suggested_cost
		)];

		StateUpdate { result: Some(result), trace, ..Default::default() }
	}
}
