use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde_json::Value;

/// The structured instructions sent with every photo. The model is asked for
/// prose plus a JSON trait block; the extractor tolerates replies that honour
/// only half of that.
pub const DESCRIBE_INSTRUCTIONS: &str = "\
You are a botanist describing a photograph for species identification.\n\
Describe the subject in detail, then append a JSON object with these fields:\n\
intent (plant/animal/object/unknown), is_plant, guess_names, visible_parts,\n\
fruit_visible, and a traits object keyed by: life_form, leaf_arrangement,\n\
leaf_shape, leaf_type, leaf_margin, leaf_texture, phenology, inflorescence,\n\
flower_color, flower_shape, flower_position, inflorescence_orientation,\n\
fruit_type, fruit_color, fruit_cluster, fruit_surface, root_type, stem_type,\n\
surface_hair, special. Each trait holds value, confidence (0-1), and a short\n\
evidence quote. Use \"unknown\" when a part is not clearly visible.";

pub async fn describe(
	cfg: &flora_config::VisionProviderConfig,
	image_base64: &str,
	extra_instructions: Option<&str>,
) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let mut text = DESCRIBE_INSTRUCTIONS.to_string();

	if let Some(extra) = extra_instructions {
		text.push('\n');
		text.push_str(extra);
	}

	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": [
			{
				"role": "user",
				"content": [
					{ "type": "text", "text": text },
					{
						"type": "image_url",
						"image_url": { "url": format!("data:image/jpeg;base64,{image_base64}") }
					}
				]
			}
		],
	});
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_describe_response(json)
}

fn parse_describe_response(json: Value) -> Result<String> {
	json.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
		.map(str::to_string)
		.ok_or_else(|| eyre::eyre!("Vision response is missing message content."))
}
