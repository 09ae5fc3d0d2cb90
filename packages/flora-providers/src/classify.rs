use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ClassifyVerdict {
	pub is_plant: bool,
	pub plant_score: f32,
	pub category: Option<String>,
}

pub async fn classify(cfg: &flora_config::ProviderConfig, query: &str) -> Result<ClassifyVerdict> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "query": query });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_classify_response(json)
}

fn parse_classify_response(json: Value) -> Result<ClassifyVerdict> {
	let is_plant = json
		.get("is_plant")
		.and_then(|v| v.as_bool())
		.ok_or_else(|| eyre::eyre!("Classification response is missing is_plant."))?;
	let plant_score =
		json.get("plant_score").and_then(|v| v.as_f64()).map(|v| v as f32).unwrap_or(0.0);
	let category = json.get("category").and_then(|v| v.as_str()).map(str::to_string);

	Ok(ClassifyVerdict { is_plant, plant_score, category })
}
