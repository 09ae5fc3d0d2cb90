use serde::{Deserialize, Serialize};

use flora_config::MergeGuard;
use flora_providers::{hybrid::HybridHit, vector::EmbeddingHit};

/// One ranked identification. Hits from both retrieval stages collapse into
/// this shape; stage-one hits simply carry no feature evidence.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Candidate {
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
	#[serde(skip_serializing_if = "Option::is_none")]
	pub summary: Option<String>,
}

impl Candidate {
	/// Dedup key. Chinese name when present, otherwise the scientific name;
	/// the index is keyed the same way.
	pub fn identity(&self) -> &str {
		if self.chinese_name.is_empty() { &self.scientific_name } else { &self.chinese_name }
	}
}

impl From<EmbeddingHit> for Candidate {
	fn from(hit: EmbeddingHit) -> Self {
		Self {
			chinese_name: hit.chinese_name,
			scientific_name: hit.scientific_name,
			family: hit.family,
			life_form: hit.life_form,
			score: hit.score,
			embedding_score: hit.score,
			feature_score: 0.,
			matched_features: Vec::new(),
			summary: hit.summary,
		}
	}
}

impl From<HybridHit> for Candidate {
	fn from(hit: HybridHit) -> Self {
		Self {
			chinese_name: hit.chinese_name,
			scientific_name: hit.scientific_name,
			family: hit.family,
			life_form: hit.life_form,
			score: hit.score,
			embedding_score: hit.embedding_score,
			feature_score: hit.feature_score,
			matched_features: hit.matched_features,
			summary: None,
		}
	}
}

#[derive(Clone, Debug)]
pub struct MergeOutcome {
	pub candidates: Vec<Candidate>,
	/// False when the guard rejected stage two and stage one stood alone.
	pub stage2_applied: bool,
}

/// Combines the two stages, unless the hybrid stage looks like a regression.
///
/// A hybrid pass whose best hit matched almost nothing would re-rank the list
/// on noise; the guard keeps the embedding-only ranking in that case.
pub fn merge(guard: &MergeGuard, stage1: Vec<Candidate>, stage2: Vec<Candidate>) -> MergeOutcome {
	if stage2.is_empty() {
		return MergeOutcome { candidates: sorted(stage1), stage2_applied: false };
	}

	let weak = stage2.iter().max_by(|a, b| a.score.total_cmp(&b.score)).is_some_and(|best| {
		best.feature_score < guard.feature_score_floor
			|| best.matched_features.len() < guard.min_matched_features as usize
	});

	if !stage1.is_empty() && weak {
		return MergeOutcome { candidates: sorted(stage1), stage2_applied: false };
	}

	let mut merged: Vec<Candidate> = Vec::new();

	// Stage two first so a dedup collision keeps its feature evidence when
	// scores tie.
	for candidate in stage2.into_iter().chain(stage1) {
		match merged.iter_mut().find(|held| held.identity() == candidate.identity()) {
			Some(held) =>
				if candidate.score > held.score {
					*held = candidate;
				},
			None => merged.push(candidate),
		}
	}

	MergeOutcome { candidates: sorted(merged), stage2_applied: true }
}

pub fn sorted(mut candidates: Vec<Candidate>) -> Vec<Candidate> {
	candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

	candidates
}

#[cfg(test)]
pub(crate) fn test_candidate(name: &str, score: f32, feature_score: f32, matched: usize) -> Candidate {
	Candidate {
		chinese_name: name.to_string(),
		scientific_name: String::new(),
		family: None,
		life_form: None,
		score,
		embedding_score: score,
		feature_score,
		matched_features: (0..matched).map(|i| format!("feature-{i}")).collect(),
		summary: None,
	}
}
