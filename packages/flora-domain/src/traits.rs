use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::vocab;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraitKey {
	LifeForm,
	LeafArrangement,
	LeafShape,
	LeafType,
	LeafMargin,
	LeafTexture,
	Phenology,
	Inflorescence,
	FlowerColor,
	FlowerShape,
	FlowerPosition,
	InflorescenceOrientation,
	FruitType,
	FruitColor,
	FruitCluster,
	FruitSurface,
	RootType,
	StemType,
	SurfaceHair,
	Special,
}
impl TraitKey {
	pub const ALL: [Self; 20] = [
		Self::LifeForm,
		Self::LeafArrangement,
		Self::LeafShape,
		Self::LeafType,
		Self::LeafMargin,
		Self::LeafTexture,
		Self::Phenology,
		Self::Inflorescence,
		Self::FlowerColor,
		Self::FlowerShape,
		Self::FlowerPosition,
		Self::InflorescenceOrientation,
		Self::FruitType,
		Self::FruitColor,
		Self::FruitCluster,
		Self::FruitSurface,
		Self::RootType,
		Self::StemType,
		Self::SurfaceHair,
		Self::Special,
	];
	/// Trait kinds whose presence and confidence dominate quality scoring.
	pub const KEY_KINDS: [Self; 4] =
		[Self::LeafArrangement, Self::LeafShape, Self::Inflorescence, Self::LeafType];
	pub const SECONDARY_KINDS: [Self; 3] = [Self::LifeForm, Self::LeafMargin, Self::FlowerColor];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::LifeForm => "life_form",
			Self::LeafArrangement => "leaf_arrangement",
			Self::LeafShape => "leaf_shape",
			Self::LeafType => "leaf_type",
			Self::LeafMargin => "leaf_margin",
			Self::LeafTexture => "leaf_texture",
			Self::Phenology => "phenology",
			Self::Inflorescence => "inflorescence",
			Self::FlowerColor => "flower_color",
			Self::FlowerShape => "flower_shape",
			Self::FlowerPosition => "flower_position",
			Self::InflorescenceOrientation => "inflorescence_orientation",
			Self::FruitType => "fruit_type",
			Self::FruitColor => "fruit_color",
			Self::FruitCluster => "fruit_cluster",
			Self::FruitSurface => "fruit_surface",
			Self::RootType => "root_type",
			Self::StemType => "stem_type",
			Self::SurfaceHair => "surface_hair",
			Self::Special => "special",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		Self::ALL.into_iter().find(|key| key.as_str() == raw)
	}

	pub fn is_fruit(self) -> bool {
		matches!(self, Self::FruitType | Self::FruitColor | Self::FruitCluster | Self::FruitSurface)
	}

	pub fn is_flower(self) -> bool {
		matches!(
			self,
			Self::Inflorescence
				| Self::FlowerColor
				| Self::FlowerShape
				| Self::FlowerPosition
				| Self::InflorescenceOrientation
		)
	}
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Trait {
	pub value: String,
	pub confidence: f32,
	#[serde(default)]
	pub evidence: String,
}

pub type TraitSet = BTreeMap<TraitKey, Trait>;

/// Everything recoverable from one vision-model reply.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Observation {
	pub traits: TraitSet,
	pub asserts_plant: bool,
	pub guess_names: Vec<String>,
	pub intent: Option<String>,
}

pub const MIN_TRAIT_CONFIDENCE: f32 = 0.3;

const UNKNOWN: &str = "unknown";
const DOWNGRADED_CONFIDENCE: f32 = 0.1;

/// Pulls a structured trait block out of a free-text vision reply.
///
/// Tries, in order: a fenced code block, a brace-matched object anchored at the
/// first recognized trait key, and the whole reply as a single JSON payload.
/// Returns `None` when no attempt yields at least one recognized key.
pub fn extract_observation(text: &str) -> Option<Observation> {
	for raw in [fenced_block(text), anchored_object(text), Some(text.trim().to_string())]
		.into_iter()
		.flatten()
	{
		let Ok(value) = serde_json::from_str::<Value>(&raw) else {
			continue;
		};
		let observation = observation_from_value(&value);

		if !observation.traits.is_empty() {
			return Some(observation);
		}
	}

	None
}

/// Partial structured fields (intent, features, guess names) from a reply whose
/// trait block failed to parse. Used as the secondary retrieval path.
pub fn extract_partial(text: &str) -> Option<PartialObservation> {
	for raw in [fenced_block(text), first_object(text)].into_iter().flatten() {
		let Ok(value) = serde_json::from_str::<Value>(&raw) else {
			continue;
		};
		let partial = partial_from_value(&value);

		if partial.intent.is_some()
			|| !partial.features.is_empty()
			|| !partial.guess_names.is_empty()
		{
			return Some(partial);
		}
	}

	None
}

#[derive(Clone, Debug, Default)]
pub struct PartialObservation {
	pub intent: Option<String>,
	pub features: Vec<String>,
	pub guess_names: Vec<String>,
}

fn fenced_block(text: &str) -> Option<String> {
	let start = text.find("```")?;
	let after = &text[start + 3..];
	let body_start = after.find('\n').map(|idx| idx + 1).unwrap_or(0);
	let body = &after[body_start..];
	let end = body.find("```")?;
	let block = body[..end].trim();

	if block.starts_with('{') { Some(block.to_string()) } else { None }
}

fn anchored_object(text: &str) -> Option<String> {
	let anchor = TraitKey::ALL
		.iter()
		.filter_map(|key| text.find(&format!("\"{}\"", key.as_str())))
		.min()?;
	let open = text[..anchor].rfind('{')?;

	balanced_object(&text[open..])
}

fn first_object(text: &str) -> Option<String> {
	let open = text.find('{')?;

	balanced_object(&text[open..])
}

// Counts braces outside string literals; good enough for model output.
fn balanced_object(text: &str) -> Option<String> {
	let mut depth = 0_u32;
	let mut in_string = false;
	let mut escaped = false;

	for (idx, ch) in text.char_indices() {
		if in_string {
			if escaped {
				escaped = false;
			} else if ch == '\\' {
				escaped = true;
			} else if ch == '"' {
				in_string = false;
			}

			continue;
		}

		match ch {
			'"' => in_string = true,
			'{' => depth += 1,
			'}' => {
				depth = depth.saturating_sub(1);

				if depth == 0 {
					return Some(text[..=idx].to_string());
				}
			},
			_ => {},
		}
	}

	None
}

fn observation_from_value(value: &Value) -> Observation {
	let Some(object) = value.as_object() else {
		return Observation::default();
	};
	// Trait blocks sometimes arrive nested under a "traits" field.
	let trait_object = object.get("traits").and_then(|v| v.as_object()).unwrap_or(object);
	let mut traits = TraitSet::new();

	for (raw_key, raw_trait) in trait_object {
		let Some(key) = TraitKey::parse(raw_key) else {
			continue;
		};
		let Some(item) = raw_trait.as_object() else {
			continue;
		};
		let Some(trait_value) = item.get("value").and_then(|v| v.as_str()) else {
			continue;
		};
		let confidence =
			item.get("confidence").and_then(|v| v.as_f64()).map(|v| v as f32).unwrap_or(0.0);
		let evidence =
			item.get("evidence").and_then(|v| v.as_str()).unwrap_or_default().to_string();

		traits.insert(
			key,
			Trait { value: trait_value.trim().to_lowercase(), confidence, evidence },
		);
	}

	apply_visibility_downgrade(&mut traits, object);
	validate(&mut traits);

	let asserts_plant = object.get("is_plant").and_then(|v| v.as_bool()).unwrap_or(false)
		|| object.get("intent").and_then(|v| v.as_str()) == Some("plant");

	Observation {
		traits,
		asserts_plant,
		guess_names: string_list(object.get("guess_names")),
		intent: object.get("intent").and_then(|v| v.as_str()).map(str::to_string),
	}
}

fn partial_from_value(value: &Value) -> PartialObservation {
	let Some(object) = value.as_object() else {
		return PartialObservation::default();
	};
	let plant = object.get("plant").and_then(|v| v.as_object());
	let features = string_list(
		object.get("features").or_else(|| plant.and_then(|plant| plant.get("features"))),
	);
	let guess_names = string_list(
		object.get("guess_names").or_else(|| plant.and_then(|plant| plant.get("guess_names"))),
	);

	PartialObservation {
		intent: object.get("intent").and_then(|v| v.as_str()).map(str::to_string),
		features,
		guess_names,
	}
}

fn string_list(value: Option<&Value>) -> Vec<String> {
	value
		.and_then(|v| v.as_array())
		.map(|items| {
			items
				.iter()
				.filter_map(|item| item.as_str())
				.map(|item| item.trim().to_string())
				.filter(|item| !item.is_empty())
				.collect()
		})
		.unwrap_or_default()
}

/// Guard against hallucinated fruit and flower claims. Runs once, before the
/// generic per-key validation.
fn apply_visibility_downgrade(traits: &mut TraitSet, object: &serde_json::Map<String, Value>) {
	let fruit_visible = object
		.get("fruit_visible")
		.and_then(|v| v.as_bool().or_else(|| v.get("value").and_then(Value::as_bool)));
	let visible_parts = visible_parts(object);

	if fruit_visible == Some(false) {
		for key in [TraitKey::FruitType, TraitKey::FruitColor] {
			downgrade(traits, key);
		}
	} else if let Some(fruit) = traits.get(&TraitKey::FruitType)
		&& fruit.value != UNKNOWN
	{
		let evidence = fruit.evidence.to_lowercase();
		let evidence_mentions_fruit =
			vocab::FRUIT_EVIDENCE_KEYWORDS.iter().any(|keyword| evidence.contains(keyword));
		let in_closed_vocab = vocab::FRUIT_TYPE_VALUES.contains(&fruit.value.as_str());

		if !evidence_mentions_fruit || !in_closed_vocab {
			downgrade(traits, TraitKey::FruitType);
		}
	}

	// The vision prompt reports which organs are actually in frame; traits for
	// organs outside that list are ignored even at high stated confidence.
	if let Some(parts) = visible_parts {
		if !parts.iter().any(|part| part == "fruit") {
			for key in TraitKey::ALL.into_iter().filter(|key| key.is_fruit()) {
				downgrade(traits, key);
			}
		}
		if !parts.iter().any(|part| part == "flower") {
			for key in TraitKey::ALL.into_iter().filter(|key| key.is_flower()) {
				downgrade(traits, key);
			}
		}
	}
}

fn visible_parts(object: &serde_json::Map<String, Value>) -> Option<Vec<String>> {
	let value = object.get("visible_parts")?;
	let list = value.as_array().or_else(|| value.get("value").and_then(Value::as_array))?;

	Some(list.iter().filter_map(|item| item.as_str()).map(str::to_lowercase).collect())
}

fn downgrade(traits: &mut TraitSet, key: TraitKey) {
	if let Some(entry) = traits.get_mut(&key) {
		entry.value = UNKNOWN.to_string();
		entry.confidence = DOWNGRADED_CONFIDENCE;
	}
}

fn validate(traits: &mut TraitSet) {
	traits.retain(|_, item| {
		item.confidence = item.confidence.clamp(0.0, 1.0);

		!item.value.is_empty() && item.value != UNKNOWN && item.confidence > MIN_TRAIT_CONFIDENCE
	});
}
