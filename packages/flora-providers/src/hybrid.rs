use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct HybridHit {
	pub chinese_name: String,
	#[serde(default)]
	pub scientific_name: String,
	pub family: Option<String>,
	pub life_form: Option<String>,
	pub score: f32,
	#[serde(default)]
	pub embedding_score: f32,
	#[serde(default)]
	pub feature_score: f32,
	#[serde(default)]
	pub matched_features: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct HybridResponse {
	pub results: Vec<HybridHit>,
	#[serde(default)]
	pub feature_info: Value,
}

pub struct HybridQuery<'a> {
	pub query: &'a str,
	pub features: &'a [String],
	pub guess_names: &'a [String],
	pub embedding_weight: f32,
	pub feature_weight: f32,
	pub traits: Value,
}

pub async fn search(
	cfg: &flora_config::SearchProviderConfig,
	request: &HybridQuery<'_>,
	top_k: u32,
) -> Result<HybridResponse> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"query": request.query,
		"features": request.features,
		"guess_names": request.guess_names,
		"top_k": top_k,
		"weights": {
			"embedding": request.embedding_weight,
			"feature": request.feature_weight,
		},
		"traits": request.traits,
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_hybrid_response(json)
}

fn parse_hybrid_response(json: Value) -> Result<HybridResponse> {
	if json.get("results").and_then(|v| v.as_array()).is_none() {
		return Err(eyre::eyre!("Hybrid search response is missing results array."));
	}

	serde_json::from_value(json).map_err(|err| eyre::eyre!("Invalid hybrid search response: {err}."))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_hybrid_results_with_feature_breakdown() {
		let json = serde_json::json!({
			"results": [
				{
					"chinese_name": "血桐",
					"scientific_name": "Macaranga tanarius",
					"score": 0.81,
					"embedding_score": 0.7,
					"feature_score": 0.11,
					"matched_features": ["互生", "心形葉"]
				}
			],
			"feature_info": { "query_features": 4 }
		});
		let response = parse_hybrid_response(json).expect("parse failed");

		assert_eq!(response.results.len(), 1);
		assert_eq!(response.results[0].matched_features.len(), 2);
	}

	#[test]
	fn missing_results_is_an_error() {
		assert!(parse_hybrid_response(serde_json::json!({ "feature_info": {} })).is_err());
	}
}
