mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Estimation, LlmProviderConfig, Postgres, Providers, Qdrant,
	Security, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::validation("service.http_bind must be non-empty."));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::validation(
			"storage.postgres.pool_max_conns must be greater than zero.",
		));
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::validation("storage.qdrant.collection must be non-empty."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::validation(
			"providers.embedding.dimensions must be greater than zero.",
		));
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::validation(
			"providers.embedding.dimensions must match storage.qdrant.vector_dim.",
		));
	}

	let temperature = cfg.providers.llm_judgment.temperature;

	if !temperature.is_finite() {
		return Err(Error::validation(
			"providers.llm_judgment.temperature must be a finite number.",
		));
	}
	if !(0.0..=2.0).contains(&temperature) {
		return Err(Error::validation(
			"providers.llm_judgment.temperature must be in the range 0.0-2.0.",
		));
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("llm_judgment", &cfg.providers.llm_judgment.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::validation(format!("Provider {label} api_key must be non-empty.")));
		}
	}
	for (label, timeout_ms) in [
		("providers.embedding.timeout_ms", cfg.providers.embedding.timeout_ms),
		("providers.llm_judgment.timeout_ms", cfg.providers.llm_judgment.timeout_ms),
		("estimation.retrieve_timeout_ms", cfg.estimation.retrieve_timeout_ms),
		("estimation.judgment_timeout_ms", cfg.estimation.judgment_timeout_ms),
	] {
		if timeout_ms == 0 {
			return Err(Error::validation(format!("{label} must be greater than zero.")));
		}
	}
	for (label, value) in [
		("estimation.top_k", cfg.estimation.top_k),
		("estimation.max_quoted_tasks", cfg.estimation.max_quoted_tasks),
		("estimation.max_quoted_field_chars", cfg.estimation.max_quoted_field_chars),
		("estimation.max_concurrent_runs", cfg.estimation.max_concurrent_runs),
	] {
		if value == 0 {
			return Err(Error::validation(format!("{label} must be greater than zero.")));
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	let api_base = cfg.providers.embedding.api_base.trim_end_matches('/').to_string();

	cfg.providers.embedding.api_base = api_base;

	let api_base = cfg.providers.llm_judgment.api_base.trim_end_matches('/').to_string();

	cfg.providers.llm_judgment.api_base = api_base;

	// Quoting more tasks than retrieval can return only wastes prompt budget.
	if cfg.estimation.max_quoted_tasks > cfg.estimation.top_k {
		cfg.estimation.max_quoted_tasks = cfg.estimation.top_k;
	}
}
