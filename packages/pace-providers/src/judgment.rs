use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{Error, Result};

const MAX_ATTEMPTS: usize = 3;

/// Requests a schema-constrained JSON completion and returns the decoded object.
///
/// Transport and HTTP status errors are returned immediately. Content that is not JSON is retried
/// up to three times before giving up.
pub async fn judge(
	cfg: &pace_config::LlmProviderConfig,
	messages: &[Value],
	schema_name: &str,
	schema: &Value,
) -> Result<Value> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
		"response_format": {
			"type": "json_schema",
			"json_schema": {
				"name": schema_name,
				"strict": true,
				"schema": schema,
			},
		},
	});

	for attempt in 1..=MAX_ATTEMPTS {
		let res = client
			.post(&url)
			.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.json(&body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;

		match parse_judgment_json(json) {
			Ok(parsed) => return Ok(parsed),
			Err(err) => {
				tracing::debug!(attempt, error = %err, "Judgment content was not JSON.");
			},
		}
	}

	Err(Error::invalid_response("Judgment response is not valid JSON."))
}

fn parse_judgment_json(json: Value) -> Result<Value> {
	let content = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.ok_or_else(|| Error::invalid_response("Judgment response is missing message content."))?;
	let parsed: Value = serde_json::from_str(content.trim())
		.map_err(|_| Error::invalid_response("Judgment content is not valid JSON."))?;

	Ok(parsed)
}
