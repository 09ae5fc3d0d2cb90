use serde::{Deserialize, Serialize};

use crate::quality::QualityMetrics;
use flora_config::Ranking;

const MIN_WEIGHT: f32 = 0.1;
const MAX_WEIGHT: f32 = 0.9;

/// The (embedding, feature) pair used to combine the two retrieval scores.
/// Always sums to 1 with both sides inside [0.1, 0.9].
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct WeightBlend {
	pub embedding_weight: f32,
	pub feature_weight: f32,
}

/// Picks the first segment whose upper bound exceeds the quality score, then
/// applies the generic-ratio clamp and renormalizes.
pub fn select(cfg: &Ranking, metrics: &QualityMetrics) -> WeightBlend {
	let segment = cfg
		.weight_segments
		.iter()
		.find(|segment| metrics.quality < segment.max_quality)
		.or(cfg.weight_segments.last());
	let (embedding, mut feature) = segment
		.map(|segment| (segment.embedding_weight, segment.feature_weight))
		.unwrap_or((0.5, 0.5));
	let sum = embedding + feature;

	feature = if sum > 0.0 { feature / sum } else { 0.5 };

	// Very generic feature sets must not dominate scoring even when coverage
	// and confidence look good. The freed weight goes to the embedding side.
	if metrics.generic_ratio >= cfg.generic_ratio_floor && feature > cfg.generic_feature_weight_cap
	{
		feature = cfg.generic_feature_weight_cap;
	}

	feature = feature.clamp(MIN_WEIGHT, MAX_WEIGHT);

	WeightBlend { embedding_weight: 1.0 - feature, feature_weight: feature }
}

#[cfg(test)]
mod tests {
	use super::*;
	use flora_config::{Boost, MergeGuard, WeightSegment};

	fn ranking() -> Ranking {
		Ranking {
			weight_segments: vec![
				WeightSegment { max_quality: 0.30, embedding_weight: 0.9, feature_weight: 0.1 },
				WeightSegment { max_quality: 0.55, embedding_weight: 0.7, feature_weight: 0.3 },
				WeightSegment { max_quality: 0.75, embedding_weight: 0.5, feature_weight: 0.5 },
				WeightSegment { max_quality: 1.0, embedding_weight: 0.3, feature_weight: 0.7 },
			],
			generic_ratio_floor: 0.6,
			generic_feature_weight_cap: 0.55,
			merge: MergeGuard { feature_score_floor: 0.08, min_matched_features: 2 },
			boost: Boost {
				min_base_score: 0.5,
				amount: 0.15,
				min_name_len: 2,
				min_matched_features: 2,
			},
			demotion: vec![],
		}
	}

	fn metrics(quality: f32, generic_ratio: f32) -> QualityMetrics {
		QualityMetrics { quality, coverage: 0.5, avg_confidence: 0.5, generic_ratio }
	}

	#[test]
	fn low_quality_leans_on_the_embedding() {
		let blend = select(&ranking(), &metrics(0.2, 0.0));

		assert!((blend.embedding_weight - 0.9).abs() < 1e-6);
		assert!((blend.feature_weight - 0.1).abs() < 1e-6);
	}

	#[test]
	fn high_quality_leans_on_the_features() {
		let blend = select(&ranking(), &metrics(0.8, 0.0));

		assert!((blend.embedding_weight - 0.3).abs() < 1e-6);
		assert!((blend.feature_weight - 0.7).abs() < 1e-6);
	}

	#[test]
	fn generic_sets_get_their_feature_weight_capped() {
		let blend = select(&ranking(), &metrics(0.8, 0.7));

		assert!(blend.feature_weight <= 0.55 + 1e-6);
		assert!((blend.embedding_weight + blend.feature_weight - 1.0).abs() < 1e-6);
	}

	#[test]
	fn weights_always_sum_to_one_and_stay_clamped() {
		for quality in [0.0, 0.29, 0.3, 0.54, 0.74, 0.99, 1.0] {
			for generic_ratio in [0.0, 0.6, 1.0] {
				let blend = select(&ranking(), &metrics(quality, generic_ratio));

				assert!((blend.embedding_weight + blend.feature_weight - 1.0).abs() < 1e-6);
				assert!((0.1..=0.9).contains(&blend.embedding_weight));
				assert!((0.1..=0.9).contains(&blend.feature_weight));
			}
		}
	}
}
