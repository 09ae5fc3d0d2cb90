use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use flora_domain::{
	normalize,
	quality::{self, QualityMetrics},
	session as round,
	session::{RoundAssessment, RoundDecision},
	traits::{self, Observation, TraitSet},
	vocab,
	weights::{self, WeightBlend},
};
use flora_providers::{hybrid::HybridQuery, vector::Health};

use crate::{
	Engine, Result,
	backend::SearchBackend,
	boost,
	error::Error,
	merge::{self, Candidate},
	session::{self, SessionPayload},
};

const MAX_CANDIDATES: usize = 10;
const SHORT_DESCRIPTION_CHARS: usize = 200;
const MIN_QUERY_FEATURES: usize = 3;

#[derive(Clone, Debug, Deserialize)]
pub struct IdentifyRequest {
	/// Vision-model reply for this round's photo.
	pub reply: String,
	/// Sealed state from the previous round, if the client is continuing one.
	pub session: Option<SessionPayload>,
}

#[derive(Clone, Debug, Serialize)]
pub struct IdentifyOutcome {
	pub candidates: Vec<Candidate>,
	/// Canonical features that drove the hybrid stage, in rank order.
	pub features: Vec<String>,
	pub decision: RoundDecision,
	/// Present exactly when the decision asks for more photos.
	pub session: Option<SessionPayload>,
	pub diagnostics: Diagnostics,
}

/// Per-request scoring context, logged and returned for debugging. Never
/// feeds back into ranking.
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostics {
	pub trace_id: Uuid,
	pub classified_plant: bool,
	pub plant_score: f32,
	pub quality: QualityMetrics,
	pub weights: WeightBlend,
	pub stage2_applied: bool,
	pub photo_count: u8,
	pub vocab_version: &'static str,
}

impl<B> Engine<B>
where
	B: SearchBackend,
{
	/// Runs one full identification round: trait extraction, two-stage
	/// retrieval, ranking adjustments, and the keep-going-or-stop decision.
	///
	/// Collaborator failures inside the retrieval stages degrade the result
	/// instead of failing the round; only an unusable request errors.
	pub async fn identify(&self, request: &IdentifyRequest) -> Result<IdentifyOutcome> {
		let reply = request.reply.trim();

		if reply.is_empty() {
			return Err(Error::InvalidRequest {
				message: "Vision reply must not be empty.".to_string(),
			});
		}

		let trace_id = Uuid::new_v4();
		let previous = request.session.as_ref().filter(|payload| {
			let valid = session::verify(payload);

			if !valid {
				tracing::warn!(%trace_id, "session checksum mismatch, starting a fresh round");
			}

			valid
		});
		let photo_count = previous
			.map(|payload| payload.photo_count.max(1))
			.unwrap_or(1)
			.min(self.cfg.session.max_rounds);
		let combined = match previous {
			Some(payload) => format!("{}\n\n{reply}", payload.detailed_description),
			None => reply.to_string(),
		};

		let observation = traits::extract_observation(reply);
		let partial = if observation.is_none() { traits::extract_partial(reply) } else { None };
		let mut rounds: Vec<TraitSet> =
			previous.map(|payload| payload.traits.clone()).unwrap_or_default();

		if let Some(observation) = &observation {
			rounds.push(observation.traits.clone());
		}

		let merged_traits = if rounds.len() > 1 {
			round::aggregate_rounds(&rounds)
		} else {
			rounds.first().cloned().unwrap_or_default()
		};

		let mut raw_features = normalize::collect(&merged_traits, &combined);

		// A reply whose trait block failed to parse can still name features
		// outright; map them through the vocabulary like anything else.
		if let Some(partial) = &partial {
			for name in &partial.features {
				if let Some(feature) = vocab::by_name(name)
					&& !raw_features.contains(&feature)
				{
					raw_features.push(feature);
				}
			}
		}

		let conflicting_inflorescence = normalize::has_conflicting_inflorescence(&raw_features);
		let features = normalize::resolve_contradictions(&raw_features);
		let metrics = quality::assess(&merged_traits, &features);
		let blend = weights::select(&self.cfg.ranking, &metrics);

		tracing::debug!(
			%trace_id,
			quality = metrics.quality,
			feature_weight = blend.feature_weight,
			features = features.len(),
			"round context",
		);

		let verdict = self.classify(trace_id, reply).await;
		let threshold = if observation.as_ref().is_some_and(|o| o.asserts_plant) {
			self.cfg.retrieval.asserted_plant_threshold
		} else {
			self.cfg.retrieval.plant_score_threshold
		};
		let classified_plant =
			verdict.as_ref().is_some_and(|v| v.is_plant && v.plant_score >= threshold);
		// Trait cues only stand in for the classifier when it was unreachable;
		// an affirmative non-plant verdict must not be overridden by them.
		let denied_plant = verdict.as_ref().is_some_and(|v| !v.is_plant);
		let plant_score = verdict.as_ref().map(|v| v.plant_score).unwrap_or(0.);

		let stage1 = if classified_plant && self.embedding_ready().await {
			self.embedding_stage(trace_id, &combined).await
		} else {
			Vec::new()
		};

		let plant_like = round::is_plant_like(&merged_traits)
			|| partial.as_ref().is_some_and(|p| {
				p.intent.as_deref().is_some_and(|intent| intent.contains("plant"))
					|| !features.is_empty()
			});
		let feature_names: Vec<String> =
			features.iter().map(|feature| feature.name.to_string()).collect();
		let stage2 = if plant_like {
			let guess_names = self.guess_names(&observation, &partial, &stage1);

			self.hybrid_stage(trace_id, &combined, &feature_names, &guess_names, &merged_traits, blend)
				.await
		} else {
			Vec::new()
		};

		let merged = merge::merge(&self.cfg.ranking.merge, stage1, stage2);
		let stage2_applied = merged.stage2_applied;
		let candidates = boost::apply_name_boost(&self.cfg.ranking.boost, &combined, merged.candidates);
		let mut candidates = boost::apply_demotions(&self.cfg.ranking.demotion, candidates);

		candidates.truncate(MAX_CANDIDATES);

		let assessment = RoundAssessment {
			top_score: candidates.first().map(|c| c.score),
			gap_score: candidates
				.get(self.cfg.session.gap_rank.saturating_sub(1) as usize)
				.map(|c| c.score),
			has_diagnostic_feature: features.iter().any(|f| f.category.is_diagnostic()),
			conflicting_inflorescence,
			plant_like_subject: classified_plant || (plant_like && !denied_plant),
			photo_count,
		};
		let decision = round::decide(&self.cfg.session, &assessment);
		let session = match decision {
			RoundDecision::Final => None,
			RoundDecision::NeedMorePhotos => {
				let mut payload = SessionPayload {
					description: truncate_chars(reply, SHORT_DESCRIPTION_CHARS).to_string(),
					detailed_description: combined.clone(),
					traits: rounds,
					plants: candidates.clone(),
					photo_count: photo_count + 1,
					checksum: String::new(),
				};

				session::seal(&mut payload)?;

				Some(payload)
			},
		};

		tracing::info!(
			%trace_id,
			candidates = candidates.len(),
			?decision,
			photo_count,
			"identification round finished",
		);

		Ok(IdentifyOutcome {
			candidates,
			features: feature_names,
			decision,
			session,
			diagnostics: Diagnostics {
				trace_id,
				classified_plant,
				plant_score,
				quality: metrics,
				weights: blend,
				stage2_applied,
				photo_count,
				vocab_version: vocab::VOCAB_VERSION,
			},
		})
	}

	async fn classify(
		&self,
		trace_id: Uuid,
		reply: &str,
	) -> Option<flora_providers::classify::ClassifyVerdict> {
		match self.backend.classify(reply).await {
			Ok(verdict) => Some(verdict),
			Err(error) => {
				tracing::warn!(%trace_id, ?error, "classifier unavailable, skipping stage one");

				None
			},
		}
	}

	async fn embedding_stage(&self, trace_id: Uuid, query: &str) -> Vec<Candidate> {
		let top_k = self.cfg.providers.embedding_search.top_k;

		match self.backend.embedding_search(query, top_k).await {
			Ok(hits) => hits.into_iter().map(Candidate::from).collect(),
			Err(error) => {
				tracing::warn!(%trace_id, ?error, "embedding search failed, continuing without it");

				Vec::new()
			},
		}
	}

	async fn hybrid_stage(
		&self,
		trace_id: Uuid,
		description: &str,
		feature_names: &[String],
		guess_names: &[String],
		merged_traits: &TraitSet,
		blend: WeightBlend,
	) -> Vec<Candidate> {
		let max_features = self.cfg.retrieval.max_query_features as usize;
		let query_features = &feature_names[..feature_names.len().min(max_features)];
		let fallback;
		let query = if query_features.len() >= MIN_QUERY_FEATURES {
			fallback = query_features.join(" ");

			fallback.as_str()
		} else {
			truncate_chars(description, self.cfg.retrieval.query_fallback_chars as usize)
		};
		let request = HybridQuery {
			query,
			features: feature_names,
			guess_names,
			embedding_weight: blend.embedding_weight,
			feature_weight: blend.feature_weight,
			traits: serde_json::to_value(merged_traits).unwrap_or(Value::Null),
		};
		let top_k = self.cfg.providers.hybrid_search.top_k;

		match self.backend.hybrid_search(&request, top_k).await {
			Ok(response) => response.results.into_iter().map(Candidate::from).collect(),
			Err(error) => {
				tracing::warn!(%trace_id, ?error, "hybrid search failed, continuing without it");

				Vec::new()
			},
		}
	}

	fn guess_names(
		&self,
		observation: &Option<Observation>,
		partial: &Option<traits::PartialObservation>,
		stage1: &[Candidate],
	) -> Vec<String> {
		let mut names: Vec<String> = Vec::new();
		let from_reply = observation
			.as_ref()
			.map(|o| o.guess_names.as_slice())
			.or(partial.as_ref().map(|p| p.guess_names.as_slice()))
			.unwrap_or_default();

		for name in from_reply.iter().map(String::as_str).chain(stage1.iter().map(|c| c.identity()))
		{
			let name = name.trim();

			if !name.is_empty() && !names.iter().any(|held| held == name) {
				names.push(name.to_string());
			}
		}

		names.truncate(self.cfg.retrieval.max_guess_names as usize);

		names
	}

	async fn embedding_ready(&self) -> bool {
		if let Some(health) = self.readiness.fresh(self.clock.as_ref()) {
			return health.ready;
		}

		let health = match self.backend.embedding_health().await {
			Ok(health) => health,
			Err(error) => {
				tracing::warn!(?error, "embedding health probe failed");

				Health { ok: false, ready: false }
			},
		};

		self.readiness.store(health, self.clock.as_ref());

		health.ready
	}
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
	match text.char_indices().nth(max_chars) {
		Some((idx, _)) => &text[..idx],
		None => text,
	}
}
