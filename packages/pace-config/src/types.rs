use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub estimation: Estimation,
	pub security: Security,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm_judgment: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Knobs for the retrieve-then-synthesize pipeline and its background pool.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Estimation {
	/// Number of similar historical tasks pulled from the index.
	pub top_k: u32,
	/// Upper bound on historical tasks quoted verbatim in the judgment prompt.
	pub max_quoted_tasks: u32,
	/// Per-field character cap for anything quoted into the prompt.
	pub max_quoted_field_chars: u32,
	pub retrieve_timeout_ms: u64,
	pub judgment_timeout_ms: u64,
	pub max_concurrent_runs: u32,
}
impl Default for Estimation {
	fn default() -> Self {
		Self {
			top_k: 4,
			max_quoted_tasks: 4,
			max_quoted_field_chars: 280,
			retrieve_timeout_ms: 10_000,
			judgment_timeout_ms: 30_000,
			max_concurrent_runs: 16,
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}
