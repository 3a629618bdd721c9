//! Strict decoding of the generative judgment.
//!
//! The judgment is requested with a JSON schema. Whatever comes back is decoded against the same
//! contract here; any deviation is a rejection and callers fall back to
//! [`crate::floor::fallback`]. There is no partial or keyword-based recovery.

use std::fmt;

use serde::Deserialize;
use serde_json::Value;

use crate::{
	Confidence, PipelineInput, Recommendation, RecommendationResult,
	floor::{self, DEFAULT_REASONING, Evidence},
};

pub const SCHEMA_NAME: &str = "task_estimate_recommendation";

#[derive(Debug, Clone, PartialEq)]
pub enum JudgmentRejection {
	NotAnObject,
	Shape(String),
	InvalidNumber { field: &'static str },
}
impl fmt::Display for JudgmentRejection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotAnObject => write!(f, "Judgment output is not a JSON object."),
			Self::Shape(message) => write!(f, "Judgment output does not match schema: {message}"),
			Self::InvalidNumber { field } =>
				write!(f, "Judgment field {field} must be a finite number of zero or more."),
		}
	}
}

/// A judgment that passed schema validation. Numbers are not yet floored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgment {
	pub recommendation: Recommendation,
	pub suggested_minutes: u32,
	pub suggested_cost: u32,
	pub confidence: Confidence,
	pub reasoning: String,
}
impl Judgment {
	/// Builds the final result. The floor is applied whether or not the model respected it.
	pub fn into_result(self, input: &PipelineInput, evidence: Evidence) -> RecommendationResult {
		let reasoning = if self.reasoning.trim().is_empty() {
			DEFAULT_REASONING.to_string()
		} else {
			self.reasoning
		};

		RecommendationResult {
			recommendation: self.recommendation,
			suggested_minutes: floor::floor_minutes(self.suggested_minutes, input),
			suggested_cost: floor::floor_cost(self.suggested_cost, input),
			confidence: self.confidence,
			reasoning,
			similar_tags_found: evidence.similar_tags_found,
			historical_tasks_analyzed: evidence.historical_tasks_analyzed,
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawJudgment {
	recommendation: Recommendation,
	suggested_minutes: f64,
	suggested_cost: f64,
	confidence: Confidence,
	reasoning: String,
}

/// JSON schema handed to the provider for constrained decoding.
pub fn response_schema() -> Value {
	serde_json::json!({
		"type": "object",
		"additionalProperties": false,
		"required": [
			"recommendation",
			"suggested_minutes",
			"suggested_cost",
			"confidence",
			"reasoning"
		],
		"properties": {
			"recommendation": { "type": "string", "enum": ["increase", "keep"] },
			"suggested_minutes": { "type": "integer", "minimum": 0 },
			"suggested_cost": { "type": "integer", "minimum": 0 },
			"confidence": { "type": "string", "enum": ["high", "medium", "low"] },
			"reasoning": { "type": "string" }
		}
	})
}

pub fn decode(value: &Value) -> Result<Judgment, JudgmentRejection> {
	if !value.is_object() {
		return Err(JudgmentRejection::NotAnObject);
	}

	let raw: RawJudgment = serde_json::from_value(value.clone())
		.map_err(|err| JudgmentRejection::Shape(err.to_string()))?;

	Ok(Judgment {
		recommendation: raw.recommendation,
		suggested_minutes: to_whole(raw.suggested_minutes, "suggested_minutes")?,
		suggested_cost: to_whole(raw.suggested_cost, "suggested_cost")?,
		confidence: raw.confidence,
		reasoning: raw.reasoning,
	})
}

fn to_whole(value: f64, field: &'static str) -> Result<u32, JudgmentRejection> {
	if !value.is_finite() || value < 0.0 {
		return Err(JudgmentRejection::InvalidNumber { field });
	}

	let rounded = value.round();

	if rounded >= f64::from(u32::MAX) { Ok(u32::MAX) } else { Ok(rounded as u32) }
}
