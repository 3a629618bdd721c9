use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputRejection {
	MissingCorrelationId,
	MissingOwnerId,
	MissingTitle,
	MissingTagName,
}
impl InputRejection {
	pub fn field(self) -> &'static str {
		match self {
			Self::MissingCorrelationId => "correlation_id",
			Self::MissingOwnerId => "owner_id",
			Self::MissingTitle => "title",
			Self::MissingTagName => "tag_name",
		}
	}
}
impl fmt::Display for InputRejection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Pipeline input is missing {}.", self.field())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recommendation {
	Increase,
	Keep,
}
impl Recommendation {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Increase => "increase",
			Self::Keep => "keep",
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
	High,
	Medium,
	Low,
}
impl Confidence {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::High => "high",
			Self::Medium => "medium",
			Self::Low => "low",
		}
	}
}

/// Raw fields of a task-creation event, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineInputArgs {
	pub correlation_id: String,
	pub owner_id: String,
	pub title: String,
	pub description: String,
	pub tag_name: Option<String>,
	pub tag_description: String,
	pub initial_minutes: u32,
	pub initial_cost: u32,
}

/// Validated, immutable input for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInput {
	correlation_id: String,
	owner_id: String,
	title: String,
	description: String,
	tag_name: String,
	tag_description: String,
	initial_minutes: u32,
	initial_cost: u32,
}
impl PipelineInput {
	pub fn new(args: PipelineInputArgs) -> Result<Self, InputRejection> {
		let correlation_id = args.correlation_id.trim().to_string();
		let owner_id = args.owner_id.trim().to_string();
		let tag_name = args.tag_name.as_deref().map(str::trim).unwrap_or_default().to_string();

		if correlation_id.is_empty() {
			return Err(InputRejection::MissingCorrelationId);
		}
		if owner_id.is_empty() {
			return Err(InputRejection::MissingOwnerId);
		}
		if args.title.trim().is_empty() {
			return Err(InputRejection::MissingTitle);
		}
		if tag_name.is_empty() {
			return Err(InputRejection::MissingTagName);
		}

		Ok(Self {
			correlation_id,
			owner_id,
			title: args.title,
			description: args.description,
			tag_name,
			tag_description: args.tag_description,
			initial_minutes: args.initial_minutes,
			initial_cost: args.initial_cost,
		})
	}

	pub fn correlation_id(&self) -> &str {
		&self.correlation_id
	}

	pub fn owner_id(&self) -> &str {
		&self.owner_id
	}

	pub fn title(&self) -> &str {
		&self.title
	}

	pub fn description(&self) -> &str {
		&self.description
	}

	pub fn tag_name(&self) -> &str {
		&self.tag_name
	}

	pub fn tag_description(&self) -> &str {
		&self.tag_description
	}

	pub fn initial_minutes(&self) -> u32 {
		self.initial_minutes
	}

	pub fn initial_cost(&self) -> u32 {
		self.initial_cost
	}

	/// Text used to look up similar history: the description, or the title when the
	/// description is blank.
	pub fn query_text(&self) -> &str {
		if self.description.trim().is_empty() { &self.title } else { &self.description }
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoricalTask {
	pub id: String,
	pub title: String,
	pub duration_minutes: Option<u32>,
	pub cost: Option<u32>,
	pub tags: BTreeSet<String>,
	pub description: String,
}
impl HistoricalTask {
	pub fn has_tag(&self, tag: &str) -> bool {
		self.tags.contains(tag)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationResult {
	pub recommendation: Recommendation,
	pub suggested_minutes: u32,
	pub suggested_cost: u32,
	pub confidence: Confidence,
	pub reasoning: String,
	pub similar_tags_found: u32,
	pub historical_tasks_analyzed: u32,
}
