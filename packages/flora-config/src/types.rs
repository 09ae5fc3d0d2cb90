use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	pub retrieval: Retrieval,
	pub ranking: Ranking,
	pub session: Session,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub classifier: ProviderConfig,
	pub embedding_search: SearchProviderConfig,
	pub hybrid_search: SearchProviderConfig,
	pub vision: VisionProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct SearchProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	/// Optional GET endpoint probed before retrieval. Blank means no probe.
	pub health_path: Option<String>,
	pub top_k: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct VisionProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Retrieval {
	/// Classification score at or above which the subject counts as a plant query.
	pub plant_score_threshold: f32,
	/// Lowered threshold used when the vision reply itself asserts a plant.
	pub asserted_plant_threshold: f32,
	/// Number of normalized features forwarded in the hybrid query string.
	pub max_query_features: u32,
	/// Description prefix length used when too few features exist for a query.
	pub query_fallback_chars: u32,
	pub max_guess_names: u32,
	pub readiness_ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Ranking {
	pub weight_segments: Vec<WeightSegment>,
	/// Generic trait sets must not dominate scoring even when quality is high.
	pub generic_ratio_floor: f32,
	pub generic_feature_weight_cap: f32,
	pub merge: MergeGuard,
	pub boost: Boost,
	#[serde(default)]
	pub demotion: Vec<DemotionRule>,
}

#[derive(Debug, Deserialize)]
pub struct WeightSegment {
	pub max_quality: f32,
	pub embedding_weight: f32,
	pub feature_weight: f32,
}

#[derive(Debug, Deserialize)]
pub struct MergeGuard {
	pub feature_score_floor: f32,
	pub min_matched_features: u32,
}

#[derive(Debug, Deserialize)]
pub struct Boost {
	pub min_base_score: f32,
	pub amount: f32,
	pub min_name_len: u32,
	pub min_matched_features: u32,
}

#[derive(Debug, Deserialize)]
pub struct DemotionRule {
	pub id: String,
	pub name_contains: String,
	pub penalty: f32,
	pub min_confidence: f32,
}

#[derive(Debug, Deserialize)]
pub struct Session {
	pub max_rounds: u8,
	pub final_top_score: f32,
	pub final_score_gap: f32,
	/// Rank (1-based) the gap is measured against.
	pub gap_rank: u32,
}
