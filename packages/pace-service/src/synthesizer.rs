//! Turns retrieved history into a floored recommendation.
//!
//! Statistics are computed locally, then a schema-constrained judgment is requested. Whatever the
//! judgment returns is decoded strictly; a failed, late, or malformed judgment selects the
//! deterministic fallback instead of failing the run.

use std::{fmt::Write as _, sync::Arc, time::Duration};

use serde_json::Value;
use tokio::time;

use pace_config::{Estimation, LlmProviderConfig};
use pace_domain::{
	HistoricalTask, PipelineInput, RecommendationResult,
	floor::{self, Evidence},
	judgment,
	stats::{self, HistoricalStats, SeriesStats},
	text,
};

use crate::JudgmentProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptLimits {
	pub max_quoted_tasks: usize,
	pub max_field_chars: usize,
}
impl From<&Estimation> for PromptLimits {
	fn from(cfg: &Estimation) -> Self {
		Self {
			max_quoted_tasks: cfg.max_quoted_tasks as usize,
			max_field_chars: cfg.max_quoted_field_chars as usize,
		}
	}
}

pub struct Synthesizer {
	judgment: Arc<dyn JudgmentProvider>,
	cfg: LlmProviderConfig,
	limits: PromptLimits,
	timeout: Duration,
}
impl Synthesizer {
	pub fn new(
		judgment: Arc<dyn JudgmentProvider>,
		cfg: LlmProviderConfig,
		limits: PromptLimits,
		timeout: Duration,
	) -> Self {
		Self { judgment, cfg, limits, timeout }
	}

	pub async fn synthesize(
		&self,
		input: &PipelineInput,
		historical: &[HistoricalTask],
	) -> RecommendationResult {
		let evidence = Evidence {
			similar_tags_found: stats::distinct_tag_count(historical),
			historical_tasks_analyzed: u32::try_from(historical.len()).unwrap_or(u32::MAX),
		};

		if historical.is_empty() {
			tracing::debug!(
				task_client_id = input.correlation_id(),
				"No history retrieved. Keeping the initial estimate."
			);

			return floor::fallback(input, evidence);
		}

		let stats = HistoricalStats::from_tasks(historical);
		let messages = build_messages(input, historical, &stats, self.limits);

		match self.request_judgment(input, &messages).await {
			Some(value) => match judgment::decode(&value) {
				Ok(decoded) => decoded.into_result(input, evidence),
				Err(rejection) => {
					tracing::warn!(
						task_client_id = input.correlation_id(),
						error = %rejection,
						"Judgment output rejected. Using fallback recommendation."
					);

					floor::fallback(input, evidence)
				},
			},
			None => floor::fallback(input, evidence),
		}
	}

	async fn request_judgment(&self, input: &PipelineInput, messages: &[Value]) -> Option<Value> {
		let schema = judgment::response_schema();
		let call = self.judgment.judge(&self.cfg, messages, judgment::SCHEMA_NAME, &schema);

		match time::timeout(self.timeout, call).await {
			Ok(Ok(value)) => Some(value),
			Ok(Err(err)) => {
				tracing::warn!(
					task_client_id = input.correlation_id(),
					error = %err,
					"Judgment call failed. Using fallback recommendation."
				);

				None
			},
			Err(_) => {
				tracing::warn!(
					task_client_id = input.correlation_id(),
					timeout_ms = self.timeout.as_millis() as u64,
					"Judgment call timed out. Using fallback recommendation."
				);

				None
			},
		}
	}
}

pub fn build_messages(
	input: &PipelineInput,
	historical: &[HistoricalTask],
	stats: &HistoricalStats,
	limits: PromptLimits,
) -> Vec<Value> {
	let system = "\
You review time and cost estimates for personal and work tasks.
Rules:
- The user's initial estimate is a hard floor. You may recommend \"increase\" or \"keep\", never a \
decrease.
- suggested_minutes must be at least the initial minutes and suggested_cost at least the initial \
cost.
- Base the recommendation on the historical tasks and statistics provided.
- confidence is \"high\", \"medium\", or \"low\" depending on how much comparable history exists.
- Reply only with the JSON object required by the schema.";
	let user = build_context(input, historical, stats, limits);

	vec![
		serde_json::json!({ "role": "system", "content": system }),
		serde_json::json!({ "role": "user", "content": user }),
	]
}

/// Renders the bounded context block. Every free-text field is flattened and capped.
pub fn build_context(
	input: &PipelineInput,
	historical: &[HistoricalTask],
	stats: &HistoricalStats,
	limits: PromptLimits,
) -> String {
	let field = |value: &str| text::truncate_chars(&text::single_line(value), limits.max_field_chars);
	let mut out = String::new();

	let _ = writeln!(out, "Task to estimate:");
	let _ = writeln!(out, "- Title: {}", field(input.title()));
	let _ = writeln!(out, "- Description: {}", field(input.description()));
	let _ = writeln!(
		out,
		"- Tag: {} ({})",
		field(input.tag_name()),
		field(input.tag_description())
	);
	let _ = writeln!(out, "- Initial estimate: {} minutes", input.initial_minutes());
	let _ = writeln!(out, "- Initial cost: {}", input.initial_cost());
	let _ = writeln!(out);
	let _ = writeln!(out, "Historical statistics ({} similar tasks):", historical.len());

	write_series(&mut out, "Duration (minutes)", stats.duration.as_ref());
	write_series(&mut out, "Cost", stats.cost.as_ref());

	let quoted = historical.len().min(limits.max_quoted_tasks);

	let _ = writeln!(out);
	let _ = writeln!(out, "Similar tasks ({quoted} of {}):", historical.len());

	for (index, task) in historical.iter().take(quoted).enumerate() {
		let tags = task.tags.iter().map(|tag| field(tag.as_str())).collect::<Vec<_>>().join(", ");

		let _ = writeln!(
			out,
			"{}. {} | duration: {} | cost: {} | tags: {} | description: {}",
			index + 1,
			field(task.title.as_str()),
			format_optional(task.duration_minutes, " minutes"),
			format_optional(task.cost, ""),
			tags,
			field(task.description.as_str()),
		);
	}

	let _ = write!(
		out,
		"\nShould the {}-minute estimate with cost {} be kept or increased?",
		input.initial_minutes(),
		input.initial_cost()
	);

	out
}

fn write_series(out: &mut String, label: &str, series: Option<&SeriesStats>) {
	match series {
		Some(series) => {
			let _ = writeln!(
				out,
				"- {label}: {} known, average {:.1}, range {}-{}",
				series.count, series.average, series.min, series.max
			);
		},
		None => {
			let _ = writeln!(out, "- {label}: no data");
		},
	}
}

fn format_optional(value: Option<u32>, suffix: &str) -> String {
	match value {
		Some(value) => format!("{value}{suffix}"),
		None => "unknown".to_string(),
	}
}
