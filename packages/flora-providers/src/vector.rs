use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EmbeddingHit {
	pub chinese_name: String,
	#[serde(default)]
	pub scientific_name: String,
	pub family: Option<String>,
	pub life_form: Option<String>,
	pub score: f32,
	pub summary: Option<String>,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct Health {
	pub ok: bool,
	pub ready: bool,
}

pub async fn search(
	cfg: &flora_config::SearchProviderConfig,
	query: &str,
	top_k: u32,
) -> Result<Vec<EmbeddingHit>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "query": query, "top_k": top_k });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_search_response(json)
}

pub async fn health(cfg: &flora_config::SearchProviderConfig) -> Result<Health> {
	let Some(path) = cfg.health_path.as_deref() else {
		return Ok(Health { ok: true, ready: true });
	};
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{path}", cfg.api_base);
	let res = client
		.get(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;
	let ok = json.get("ok").and_then(|v| v.as_bool()).unwrap_or(true);
	let ready = json.get("ready").and_then(|v| v.as_bool()).unwrap_or(ok);

	Ok(Health { ok, ready })
}

fn parse_search_response(json: Value) -> Result<Vec<EmbeddingHit>> {
	let results = json
		.get("results")
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Embedding search response is missing results array."))?;
	let mut out = Vec::with_capacity(results.len());

	for item in results {
		let hit: EmbeddingHit = serde_json::from_value(item.clone())
			.map_err(|err| eyre::eyre!("Invalid embedding search result: {err}."))?;

		out.push(hit);
	}

	Ok(out)
}
