mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Boost, Config, DemotionRule, MergeGuard, ProviderConfig, Providers, Ranking, Retrieval,
	SearchProviderConfig, Service, Session, VisionProviderConfig, WeightSegment,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}

	for (label, value) in [
		("retrieval.plant_score_threshold", cfg.retrieval.plant_score_threshold),
		("retrieval.asserted_plant_threshold", cfg.retrieval.asserted_plant_threshold),
	] {
		if !value.is_finite() || !(0.0..=1.0).contains(&value) {
			return Err(Error::Validation {
				message: format!("{label} must be in the range 0.0-1.0."),
			});
		}
	}

	if cfg.retrieval.asserted_plant_threshold > cfg.retrieval.plant_score_threshold {
		return Err(Error::Validation {
			message:
				"retrieval.asserted_plant_threshold must not exceed retrieval.plant_score_threshold."
					.to_string(),
		});
	}
	if cfg.retrieval.max_query_features == 0 {
		return Err(Error::Validation {
			message: "retrieval.max_query_features must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.readiness_ttl_secs == 0 {
		return Err(Error::Validation {
			message: "retrieval.readiness_ttl_secs must be greater than zero.".to_string(),
		});
	}

	validate_weight_segments(&cfg.ranking.weight_segments)?;

	for (label, value) in [
		("ranking.generic_ratio_floor", cfg.ranking.generic_ratio_floor),
		("ranking.generic_feature_weight_cap", cfg.ranking.generic_feature_weight_cap),
		("ranking.merge.feature_score_floor", cfg.ranking.merge.feature_score_floor),
		("ranking.boost.min_base_score", cfg.ranking.boost.min_base_score),
		("ranking.boost.amount", cfg.ranking.boost.amount),
	] {
		if !value.is_finite() || value < 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number, zero or greater."),
			});
		}
	}

	for rule in &cfg.ranking.demotion {
		if rule.id.trim().is_empty() || rule.name_contains.trim().is_empty() {
			return Err(Error::Validation {
				message: "ranking.demotion rules must have a non-empty id and trigger.".to_string(),
			});
		}
		if !rule.penalty.is_finite() || rule.penalty < 0.0 {
			return Err(Error::Validation {
				message: format!("ranking.demotion.{}.penalty must be zero or greater.", rule.id),
			});
		}
	}

	if cfg.session.max_rounds == 0 || cfg.session.max_rounds > 3 {
		return Err(Error::Validation {
			message: "session.max_rounds must be between 1 and 3.".to_string(),
		});
	}
	if !cfg.session.final_top_score.is_finite()
		|| !(0.0..=1.0).contains(&cfg.session.final_top_score)
	{
		return Err(Error::Validation {
			message: "session.final_top_score must be in the range 0.0-1.0.".to_string(),
		});
	}
	if !cfg.session.final_score_gap.is_finite() || cfg.session.final_score_gap < 0.0 {
		return Err(Error::Validation {
			message: "session.final_score_gap must be zero or greater.".to_string(),
		});
	}
	if cfg.session.gap_rank == 0 {
		return Err(Error::Validation {
			message: "session.gap_rank must be greater than zero.".to_string(),
		});
	}

	for (label, key) in [
		("classifier", &cfg.providers.classifier.api_key),
		("embedding_search", &cfg.providers.embedding_search.api_key),
		("hybrid_search", &cfg.providers.hybrid_search.api_key),
		("vision", &cfg.providers.vision.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	for (label, timeout) in [
		("classifier", cfg.providers.classifier.timeout_ms),
		("embedding_search", cfg.providers.embedding_search.timeout_ms),
		("hybrid_search", cfg.providers.hybrid_search.timeout_ms),
		("vision", cfg.providers.vision.timeout_ms),
	] {
		if timeout == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} timeout_ms must be greater than zero."),
			});
		}
	}

	for (label, top_k) in [
		("embedding_search", cfg.providers.embedding_search.top_k),
		("hybrid_search", cfg.providers.hybrid_search.top_k),
	] {
		if top_k == 0 {
			return Err(Error::Validation {
				message: format!("Provider {label} top_k must be greater than zero."),
			});
		}
	}

	Ok(())
}

pub fn validate_weight_segments(segments: &[WeightSegment]) -> Result<()> {
	if segments.is_empty() {
		return Err(Error::Validation {
			message: "ranking.weight_segments must be non-empty.".to_string(),
		});
	}

	let mut last_max = f32::NEG_INFINITY;

	for segment in segments {
		if !segment.max_quality.is_finite() {
			return Err(Error::Validation {
				message: "ranking.weight_segments.max_quality must be a finite number.".to_string(),
			});
		}
		if segment.max_quality <= last_max {
			return Err(Error::Validation {
				message: "ranking.weight_segments.max_quality must be strictly increasing."
					.to_string(),
			});
		}

		for (label, weight) in [
			("embedding_weight", segment.embedding_weight),
			("feature_weight", segment.feature_weight),
		] {
			if !weight.is_finite() || !(0.0..=1.0).contains(&weight) {
				return Err(Error::Validation {
					message: format!(
						"ranking.weight_segments.{label} must be in the range 0.0-1.0."
					),
				});
			}
		}

		last_max = segment.max_quality;
	}

	// Quality is clamped to [0, 1], so the table must cover it.
	let Some(last) = segments.last() else {
		return Err(Error::Validation {
			message: "ranking.weight_segments must be non-empty.".to_string(),
		});
	};

	if last.max_quality < 1.0 {
		return Err(Error::Validation {
			message: "The last ranking.weight_segments.max_quality must be at least 1.0."
				.to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for health_path in [
		&mut cfg.providers.embedding_search.health_path,
		&mut cfg.providers.hybrid_search.health_path,
	] {
		if health_path.as_deref().map(|path| path.trim().is_empty()).unwrap_or(false) {
			*health_path = None;
		}
	}
}
