use serde::{Deserialize, Serialize};

use crate::traits::{Trait, TraitKey, TraitSet};
use flora_config::Session;

const HIGH_CONFIDENCE: f32 = 0.7;
const MEDIUM_CONFIDENCE: f32 = 0.5;

/// Whether a trait set describes a living specimen strongly enough to justify
/// the hybrid retrieval stage.
pub fn is_plant_like(traits: &TraitSet) -> bool {
	let key_confidences: Vec<f32> = TraitKey::KEY_KINDS
		.iter()
		.filter_map(|key| traits.get(key).map(|item| item.confidence))
		.collect();

	if key_confidences.iter().any(|confidence| *confidence >= HIGH_CONFIDENCE) {
		return true;
	}
	if key_confidences.iter().any(|confidence| *confidence >= MEDIUM_CONFIDENCE)
		&& traits.len() >= 2
	{
		return true;
	}

	traits.len() >= 3
}

/// Majority-vote aggregation across rounds.
///
/// Per key, the value with the highest summed confidence across all rounds
/// wins; ties break toward the most recent round. The winning entry keeps the
/// confidence and evidence of its highest-confidence occurrence, so a later
/// weak sighting never waters down an earlier strong one.
pub fn aggregate_rounds(rounds: &[TraitSet]) -> TraitSet {
	let mut out = TraitSet::new();

	for key in TraitKey::ALL {
		let mut tallies: Vec<Tally> = Vec::new();

		for (round, traits) in rounds.iter().enumerate() {
			let Some(item) = traits.get(&key) else {
				continue;
			};

			match tallies.iter_mut().find(|tally| tally.value == item.value) {
				Some(tally) => {
					tally.summed_confidence += item.confidence;
					tally.last_round = round;

					if item.confidence > tally.best.confidence {
						tally.best = item.clone();
					}
				},
				None => tallies.push(Tally {
					value: item.value.clone(),
					summed_confidence: item.confidence,
					last_round: round,
					best: item.clone(),
				}),
			}
		}

		let winner = tallies.into_iter().max_by(|a, b| {
			a.summed_confidence
				.total_cmp(&b.summed_confidence)
				.then(a.last_round.cmp(&b.last_round))
		});

		if let Some(winner) = winner {
			out.insert(key, winner.best);
		}
	}

	out
}

struct Tally {
	value: String,
	summed_confidence: f32,
	last_round: usize,
	best: Trait,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundDecision {
	Final,
	NeedMorePhotos,
}

/// Everything the uncertainty check needs to know about one finished round.
#[derive(Clone, Debug)]
pub struct RoundAssessment {
	pub top_score: Option<f32>,
	/// Score at the configured gap rank; `None` when fewer candidates exist.
	pub gap_score: Option<f32>,
	pub has_diagnostic_feature: bool,
	/// Both orientations (or competing inflorescence types) were asserted
	/// before cap resolution.
	pub conflicting_inflorescence: bool,
	pub plant_like_subject: bool,
	pub photo_count: u8,
}

pub fn decide(cfg: &Session, assessment: &RoundAssessment) -> RoundDecision {
	// Man-made or otherwise non-living subjects never loop for more photos.
	if !assessment.plant_like_subject {
		return RoundDecision::Final;
	}
	if assessment.photo_count >= cfg.max_rounds {
		return RoundDecision::Final;
	}
	// A disputed diagnostic feature is not a diagnostic feature.
	if assessment.conflicting_inflorescence {
		return RoundDecision::NeedMorePhotos;
	}
	if assessment.has_diagnostic_feature {
		return RoundDecision::Final;
	}

	let top = assessment.top_score.unwrap_or(0.0);
	let gap = top - assessment.gap_score.unwrap_or(0.0);

	if top >= cfg.final_top_score && gap >= cfg.final_score_gap {
		return RoundDecision::Final;
	}

	RoundDecision::NeedMorePhotos
}

#[cfg(test)]
mod tests {
	use super::*;

	fn session_config() -> Session {
		Session { max_rounds: 3, final_top_score: 0.75, final_score_gap: 0.08, gap_rank: 5 }
	}

	fn entry(value: &str, confidence: f32, evidence: &str) -> Trait {
		Trait { value: value.to_string(), confidence, evidence: evidence.to_string() }
	}

	fn assessment() -> RoundAssessment {
		RoundAssessment {
			top_score: Some(0.6),
			gap_score: Some(0.55),
			has_diagnostic_feature: false,
			conflicting_inflorescence: false,
			plant_like_subject: true,
			photo_count: 1,
		}
	}

	#[test]
	fn high_confidence_key_trait_is_plant_like() {
		let mut traits = TraitSet::new();

		traits.insert(TraitKey::LeafArrangement, entry("opposite", 0.8, "opposite pairs"));

		assert!(is_plant_like(&traits));
	}

	#[test]
	fn single_low_confidence_trait_is_not_plant_like() {
		let mut traits = TraitSet::new();

		traits.insert(TraitKey::LifeForm, entry("tree", 0.4, "maybe a tree"));

		assert!(!is_plant_like(&traits));
	}

	#[test]
	fn three_traits_suffice_without_key_kinds() {
		let mut traits = TraitSet::new();

		traits.insert(TraitKey::LifeForm, entry("shrub", 0.4, "low shrub"));
		traits.insert(TraitKey::Phenology, entry("evergreen", 0.4, "green in winter"));
		traits.insert(TraitKey::StemType, entry("woody", 0.4, "woody stems"));

		assert!(is_plant_like(&traits));
	}

	#[test]
	fn voting_prefers_highest_summed_confidence() {
		let mut round1 = TraitSet::new();
		let mut round2 = TraitSet::new();
		let mut round3 = TraitSet::new();

		round1.insert(TraitKey::LeafArrangement, entry("alternate", 0.5, "looks alternate"));
		round2.insert(TraitKey::LeafArrangement, entry("opposite", 0.6, "clearly opposite"));
		round3.insert(TraitKey::LeafArrangement, entry("opposite", 0.4, "again opposite"));

		let merged = aggregate_rounds(&[round1, round2, round3]);

		assert_eq!(merged[&TraitKey::LeafArrangement].value, "opposite");
		// The winner carries its best occurrence, not the latest one.
		assert!((merged[&TraitKey::LeafArrangement].confidence - 0.6).abs() < f32::EPSILON);
	}

	#[test]
	fn voting_ties_break_toward_the_most_recent_round() {
		let mut round1 = TraitSet::new();
		let mut round2 = TraitSet::new();

		round1.insert(TraitKey::FlowerColor, entry("white", 0.6, "pale blooms"));
		round2.insert(TraitKey::FlowerColor, entry("yellow", 0.6, "yellow blooms"));

		let merged = aggregate_rounds(&[round1, round2]);

		assert_eq!(merged[&TraitKey::FlowerColor].value, "yellow");
	}

	#[test]
	fn voting_keeps_keys_seen_in_any_round() {
		let mut round1 = TraitSet::new();
		let mut round2 = TraitSet::new();

		round1.insert(TraitKey::LifeForm, entry("tree", 0.8, "tall trunk"));
		round2.insert(TraitKey::FlowerColor, entry("red", 0.7, "red flowers"));

		let merged = aggregate_rounds(&[round1, round2]);

		assert_eq!(merged.len(), 2);
	}

	#[test]
	fn ambiguous_plant_round_asks_for_more_photos() {
		let decision = decide(&session_config(), &assessment());

		assert_eq!(decision, RoundDecision::NeedMorePhotos);
	}

	#[test]
	fn diagnostic_feature_settles_the_round() {
		let assessment = RoundAssessment { has_diagnostic_feature: true, ..assessment() };

		assert_eq!(decide(&session_config(), &assessment), RoundDecision::Final);
	}

	#[test]
	fn conflicting_inflorescence_overrides_the_diagnostic_exit() {
		let assessment = RoundAssessment {
			has_diagnostic_feature: true,
			conflicting_inflorescence: true,
			..assessment()
		};

		assert_eq!(decide(&session_config(), &assessment), RoundDecision::NeedMorePhotos);
	}

	#[test]
	fn confident_gap_settles_the_round() {
		let assessment = RoundAssessment {
			top_score: Some(0.8),
			gap_score: Some(0.6),
			..assessment()
		};

		assert_eq!(decide(&session_config(), &assessment), RoundDecision::Final);
	}

	#[test]
	fn third_photo_always_ends_the_session() {
		let assessment = RoundAssessment { photo_count: 3, ..assessment() };

		assert_eq!(decide(&session_config(), &assessment), RoundDecision::Final);
	}

	#[test]
	fn non_living_subjects_never_loop() {
		let assessment = RoundAssessment {
			plant_like_subject: false,
			top_score: Some(0.1),
			..assessment()
		};

		assert_eq!(decide(&session_config(), &assessment), RoundDecision::Final);
	}
}
