pub mod floor;
pub mod judgment;
pub mod model;
pub mod stats;
pub mod text;

pub use model::{
	Confidence, HistoricalTask, InputRejection, PipelineInput, PipelineInputArgs, Recommendation,
	RecommendationResult,
};
