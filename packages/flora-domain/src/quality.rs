use serde::{Deserialize, Serialize};

use crate::{
	traits::{TraitKey, TraitSet},
	vocab::{self, Feature},
};

const FULL_COVERAGE_TRAITS: f32 = 6.0;

/// How trustworthy an extracted trait set is, as a single scalar plus the
/// terms it was derived from.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct QualityMetrics {
	pub quality: f32,
	pub coverage: f32,
	pub avg_confidence: f32,
	pub generic_ratio: f32,
}

pub fn assess(traits: &TraitSet, features: &[Feature]) -> QualityMetrics {
	let coverage = (traits.len() as f32 / FULL_COVERAGE_TRAITS).min(1.0);
	let avg_confidence = average_confidence(traits);
	let generic_ratio = generic_ratio(features);
	let conf_term = ((avg_confidence - 0.45) / 0.35).clamp(0.0, 1.0);
	let spec_term = 1.0 - ((generic_ratio - 0.4) / 0.5).clamp(0.0, 1.0);
	let quality = (0.4 * coverage + 0.4 * conf_term + 0.2 * spec_term).clamp(0.0, 1.0);

	QualityMetrics { quality, coverage, avg_confidence, generic_ratio }
}

/// Average over the key trait kinds when any are present, otherwise over the
/// secondary kinds. Empty both ways means zero confidence.
fn average_confidence(traits: &TraitSet) -> f32 {
	for kinds in [TraitKey::KEY_KINDS.as_slice(), TraitKey::SECONDARY_KINDS.as_slice()] {
		let confidences: Vec<f32> = kinds
			.iter()
			.filter_map(|key| traits.get(key).map(|item| effective_confidence(*key, item)))
			.collect();

		if !confidences.is_empty() {
			return confidences.iter().sum::<f32>() / confidences.len() as f32;
		}
	}

	0.0
}

fn effective_confidence(key: TraitKey, item: &crate::traits::Trait) -> f32 {
	// A known failure mode: the model reports the colour of seeds as the
	// flower colour. Such evidence contributes nothing.
	if key == TraitKey::FlowerColor {
		let evidence = item.evidence.to_lowercase();

		if evidence.contains("seed") || evidence.contains("種子") {
			return 0.0;
		}
	}

	item.confidence
}

fn generic_ratio(features: &[Feature]) -> f32 {
	if features.is_empty() {
		return 0.0;
	}

	let generic = features.iter().filter(|feature| vocab::is_generic(feature)).count();

	generic as f32 / features.len() as f32
}
