//! Monotonic floor: a recommendation may raise the caller's estimate, never lower it.

use crate::{Confidence, PipelineInput, Recommendation, RecommendationResult};

pub const DEFAULT_REASONING: &str = "No reasoning provided";

/// Counts reported alongside a recommendation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evidence {
	pub similar_tags_found: u32,
	pub historical_tasks_analyzed: u32,
}

pub fn floor_minutes(suggested: u32, input: &PipelineInput) -> u32 {
	suggested.max(input.initial_minutes())
}

pub fn floor_cost(suggested: u32, input: &PipelineInput) -> u32 {
	suggested.max(input.initial_cost())
}

/// Re-applies both floors to an already built result.
pub fn enforce(mut result: RecommendationResult, input: &PipelineInput) -> RecommendationResult {
	result.suggested_minutes = floor_minutes(result.suggested_minutes, input);
	result.suggested_cost = floor_cost(result.suggested_cost, input);

	result
}

/// Deterministic result used whenever no usable judgment exists.
pub fn fallback(input: &PipelineInput, evidence: Evidence) -> RecommendationResult {
	RecommendationResult {
		recommendation: Recommendation::Keep,
		suggested_minutes: input.initial_minutes(),
		suggested_cost: input.initial_cost(),
		confidence: Confidence::Medium,
		reasoning: DEFAULT_REASONING.to_string(),
		similar_tags_found: evidence.similar_tags_found,
		historical_tasks_analyzed: evidence.historical_tasks_analyzed,
	}
}
