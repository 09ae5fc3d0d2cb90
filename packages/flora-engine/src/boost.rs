use flora_config::{Boost, DemotionRule};
use flora_domain::vocab;

use crate::merge::{self, Candidate};

/// Rewards candidates the vision model itself named, when the candidate also
/// carries real feature evidence.
///
/// The whole pass is skipped when the best pre-boost score is low: a name
/// match on top of weak retrieval is more likely a hallucinated name than a
/// confirmation.
pub fn apply_name_boost(cfg: &Boost, reply: &str, candidates: Vec<Candidate>) -> Vec<Candidate> {
	let best = candidates.iter().map(|c| c.score).fold(0.0f32, f32::max);

	if best < cfg.min_base_score {
		return candidates;
	}

	let mut boosted = candidates;

	for candidate in &mut boosted {
		if candidate.matched_features.len() < cfg.min_matched_features as usize {
			continue;
		}
		if !name_mentioned(cfg, reply, candidate) {
			continue;
		}

		// Capped relative to the base score so a mid-pack candidate cannot
		// leapfrog the list on a name mention alone.
		let boost = cfg.amount.min(0.5 * candidate.score);

		tracing::debug!(name = %candidate.identity(), boost, "name-match boost");

		candidate.score = (candidate.score + boost).min(1.0);
	}

	merge::sorted(boosted)
}

fn name_mentioned(cfg: &Boost, reply: &str, candidate: &Candidate) -> bool {
	let min_len = cfg.min_name_len as usize;
	let chinese = &candidate.chinese_name;

	if chinese.chars().count() >= min_len && reply.contains(chinese.as_str()) {
		return true;
	}
	// Synonym table covers trade names the vision model prefers over the
	// index's canonical names.
	for (a, b) in vocab::NAME_SYNONYMS {
		if (chinese == a && reply.contains(b)) || (chinese == b && reply.contains(a)) {
			return true;
		}
	}

	let scientific = candidate.scientific_name.trim();

	scientific.chars().count() >= min_len
		&& reply.to_lowercase().contains(&scientific.to_lowercase())
}

/// Config-driven penalties for names the index over-ranks. A rule only fires
/// below its confidence bar, so a genuinely strong match is never demoted.
pub fn apply_demotions(rules: &[DemotionRule], candidates: Vec<Candidate>) -> Vec<Candidate> {
	let mut demoted = candidates;

	for candidate in &mut demoted {
		for rule in rules {
			if candidate.chinese_name.contains(&rule.name_contains)
				&& candidate.score < rule.min_confidence
			{
				tracing::debug!(rule = %rule.id, name = %candidate.identity(), "demotion");

				candidate.score = (candidate.score - rule.penalty).max(0.);
			}
		}
	}

	merge::sorted(demoted)
}
