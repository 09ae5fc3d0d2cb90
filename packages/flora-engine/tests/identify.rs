//! End-to-end pipeline tests against a canned backend.

use std::sync::{
	Arc, Mutex,
	atomic::{AtomicUsize, Ordering},
};

use color_eyre::eyre;
use serde_json::Value;

use flora_engine::{
	Engine, SearchBackend,
	identify::IdentifyRequest,
	session,
};
use flora_providers::{
	classify::ClassifyVerdict,
	hybrid::{HybridHit, HybridQuery, HybridResponse},
	vector::{EmbeddingHit, Health},
};

const CONFIG: &str = r#"
[service]
http_bind = "127.0.0.1:8080"
log_level = "info"

[providers.classifier]
provider_id = "classifier"
api_base    = "http://localhost:9001"
api_key     = "test"
path        = "/classify"
timeout_ms  = 1000

[providers.embedding_search]
provider_id = "embedding"
api_base    = "http://localhost:9002"
api_key     = "test"
path        = "/search"
health_path = "/health"
top_k       = 10
timeout_ms  = 1000

[providers.hybrid_search]
provider_id = "hybrid"
api_base    = "http://localhost:9003"
api_key     = "test"
path        = "/hybrid"
top_k       = 10
timeout_ms  = 1000

[providers.vision]
provider_id = "vision"
api_base    = "http://localhost:9004"
api_key     = "test"
path        = "/v1/chat/completions"
model       = "test-model"
temperature = 0.2
timeout_ms  = 1000

[retrieval]
plant_score_threshold    = 0.5
asserted_plant_threshold = 0.35
max_query_features       = 15
query_fallback_chars     = 120
max_guess_names          = 5
readiness_ttl_secs       = 60

[ranking]
generic_ratio_floor        = 0.6
generic_feature_weight_cap = 0.55

[[ranking.weight_segments]]
max_quality      = 0.3
embedding_weight = 0.9
feature_weight   = 0.1

[[ranking.weight_segments]]
max_quality      = 0.55
embedding_weight = 0.7
feature_weight   = 0.3

[[ranking.weight_segments]]
max_quality      = 0.75
embedding_weight = 0.5
feature_weight   = 0.5

[[ranking.weight_segments]]
max_quality      = 1.0
embedding_weight = 0.3
feature_weight   = 0.7

[ranking.merge]
feature_score_floor  = 0.2
min_matched_features = 2

[ranking.boost]
min_base_score       = 0.5
amount               = 0.06
min_name_len         = 2
min_matched_features = 2

[session]
max_rounds      = 3
final_top_score = 0.75
final_score_gap = 0.08
gap_rank        = 5
"#;

const DIAGNOSTIC_REPLY: &str = r#"這是一株喬木，頂端有平頂的花叢。
```json
{
	"life_form": {"value": "tree", "confidence": 0.8, "evidence": "tall woody trunk"},
	"leaf_arrangement": {"value": "alternate", "confidence": 0.75, "evidence": "alternate leaves along twigs"},
	"leaf_margin": {"value": "entire", "confidence": 0.7, "evidence": "smooth leaf edges"},
	"inflorescence": {"value": "corymb", "confidence": 0.8, "evidence": "flat-topped flower cluster"},
	"is_plant": true,
	"guess_names": ["樟樹"]
}
```"#;

const AMBIGUOUS_REPLY: &str = r#"一叢灌木，葉對生。
```json
{
	"life_form": {"value": "shrub", "confidence": 0.8, "evidence": "low woody shrub"},
	"leaf_arrangement": {"value": "opposite", "confidence": 0.75, "evidence": "opposite leaf pairs"},
	"leaf_margin": {"value": "serrate", "confidence": 0.7, "evidence": "toothed leaf edges"},
	"is_plant": true
}
```"#;

#[derive(Default)]
struct StubBackend {
	verdict: Option<ClassifyVerdict>,
	embedding: Vec<EmbeddingHit>,
	hybrid: Vec<HybridHit>,
	ready: bool,
	health_calls: AtomicUsize,
	hybrid_queries: Mutex<Vec<String>>,
}

impl SearchBackend for StubBackend {
	async fn classify(&self, _query: &str) -> color_eyre::Result<ClassifyVerdict> {
		self.verdict.clone().ok_or_else(|| eyre::eyre!("classifier offline"))
	}

	async fn embedding_search(
		&self,
		_query: &str,
		_top_k: u32,
	) -> color_eyre::Result<Vec<EmbeddingHit>> {
		Ok(self.embedding.clone())
	}

	async fn hybrid_search(
		&self,
		request: &HybridQuery<'_>,
		_top_k: u32,
	) -> color_eyre::Result<HybridResponse> {
		self.hybrid_queries.lock().unwrap().push(request.query.to_string());

		Ok(HybridResponse { results: self.hybrid.clone(), feature_info: Value::Null })
	}

	async fn embedding_health(&self) -> color_eyre::Result<Health> {
		self.health_calls.fetch_add(1, Ordering::SeqCst);

		Ok(Health { ok: self.ready, ready: self.ready })
	}
}

fn engine(backend: Arc<StubBackend>) -> Engine<Arc<StubBackend>> {
	let cfg = toml::from_str(CONFIG).expect("fixture config must parse");

	Engine::new(Arc::new(cfg), backend)
}

fn plant_verdict(score: f32) -> Option<ClassifyVerdict> {
	Some(ClassifyVerdict { is_plant: true, plant_score: score, category: None })
}

fn embedding_hit(name: &str, score: f32) -> EmbeddingHit {
	EmbeddingHit {
		chinese_name: name.to_string(),
		scientific_name: String::new(),
		family: None,
		life_form: None,
		score,
		summary: None,
	}
}

fn hybrid_hit(name: &str, score: f32, feature_score: f32, matched: &[&str]) -> HybridHit {
	HybridHit {
		chinese_name: name.to_string(),
		scientific_name: String::new(),
		family: None,
		life_form: None,
		score,
		embedding_score: score,
		feature_score,
		matched_features: matched.iter().map(|s| s.to_string()).collect(),
	}
}

#[tokio::test]
async fn diagnostic_round_finishes_in_one_pass() {
	let backend = Arc::new(StubBackend {
		verdict: plant_verdict(0.9),
		embedding: vec![embedding_hit("樟樹", 0.82), embedding_hit("黃金榕", 0.4)],
		hybrid: vec![
			hybrid_hit("樟樹", 0.78, 0.6, &["喬木", "互生", "繖房花序"]),
			hybrid_hit("杜鵑", 0.5, 0.3, &["灌木"]),
		],
		ready: true,
		..StubBackend::default()
	});
	let engine = engine(backend.clone());
	let request = IdentifyRequest { reply: DIAGNOSTIC_REPLY.to_string(), session: None };
	let outcome = engine.identify(&request).await.unwrap();

	assert_eq!(outcome.candidates[0].chinese_name, "樟樹");
	assert!(outcome.session.is_none());
	assert!(outcome.diagnostics.classified_plant);
	assert!(outcome.diagnostics.stage2_applied);
	assert!(outcome.features.iter().any(|name| name == "繖房花序"));
	assert_eq!(
		outcome.decision,
		flora_domain::session::RoundDecision::Final,
	);
}

#[tokio::test]
async fn ambiguous_round_asks_for_another_photo() {
	let backend = Arc::new(StubBackend {
		verdict: plant_verdict(0.8),
		embedding: vec![embedding_hit("六月雪", 0.62), embedding_hit("杜鵑", 0.58)],
		hybrid: vec![
			hybrid_hit("六月雪", 0.6, 0.5, &["灌木", "對生"]),
			hybrid_hit("杜鵑", 0.58, 0.4, &["灌木"]),
		],
		ready: true,
		..StubBackend::default()
	});
	let engine = engine(backend);
	let request = IdentifyRequest { reply: AMBIGUOUS_REPLY.to_string(), session: None };
	let outcome = engine.identify(&request).await.unwrap();

	assert_eq!(outcome.decision, flora_domain::session::RoundDecision::NeedMorePhotos);

	let payload = outcome.session.expect("a continue decision must carry a session");

	assert!(session::verify(&payload));
	assert_eq!(payload.photo_count, 2);
	assert_eq!(payload.traits.len(), 1);
	assert!(!payload.plants.is_empty());
}

#[tokio::test]
async fn third_round_is_always_final() {
	let backend = Arc::new(StubBackend {
		verdict: plant_verdict(0.8),
		embedding: vec![embedding_hit("六月雪", 0.62)],
		hybrid: vec![hybrid_hit("六月雪", 0.6, 0.5, &["灌木", "對生"])],
		ready: true,
		..StubBackend::default()
	});
	let engine = engine(backend);
	let first = engine
		.identify(&IdentifyRequest { reply: AMBIGUOUS_REPLY.to_string(), session: None })
		.await
		.unwrap();
	let second = engine
		.identify(&IdentifyRequest { reply: AMBIGUOUS_REPLY.to_string(), session: first.session })
		.await
		.unwrap();

	assert_eq!(second.diagnostics.photo_count, 2);

	let third = engine
		.identify(&IdentifyRequest { reply: AMBIGUOUS_REPLY.to_string(), session: second.session })
		.await
		.unwrap();

	assert_eq!(third.diagnostics.photo_count, 3);
	assert_eq!(third.decision, flora_domain::session::RoundDecision::Final);
	assert!(third.session.is_none());
}

#[tokio::test]
async fn tampered_session_starts_a_fresh_round() {
	let backend = Arc::new(StubBackend {
		verdict: plant_verdict(0.8),
		hybrid: vec![hybrid_hit("六月雪", 0.6, 0.5, &["灌木", "對生"])],
		ready: true,
		..StubBackend::default()
	});
	let engine = engine(backend);
	let first = engine
		.identify(&IdentifyRequest { reply: AMBIGUOUS_REPLY.to_string(), session: None })
		.await
		.unwrap();
	let mut payload = first.session.unwrap();

	payload.photo_count = 9;

	let outcome = engine
		.identify(&IdentifyRequest { reply: AMBIGUOUS_REPLY.to_string(), session: Some(payload) })
		.await
		.unwrap();

	assert_eq!(outcome.diagnostics.photo_count, 1);
}

#[tokio::test]
async fn non_plant_subject_finishes_empty() {
	let backend = Arc::new(StubBackend {
		verdict: Some(ClassifyVerdict {
			is_plant: false,
			plant_score: 0.05,
			category: Some("furniture".to_string()),
		}),
		ready: true,
		..StubBackend::default()
	});
	let engine = engine(backend);
	let request =
		IdentifyRequest { reply: "這是一張木頭桌子的照片。".to_string(), session: None };
	let outcome = engine.identify(&request).await.unwrap();

	assert_eq!(outcome.decision, flora_domain::session::RoundDecision::Final);
	assert!(outcome.candidates.is_empty());
	assert!(outcome.session.is_none());
	assert!(!outcome.diagnostics.classified_plant);
}

#[tokio::test]
async fn denied_verdict_overrides_plant_like_traits() {
	// A plastic plant reads trait-rich, but the classifier said non-living;
	// the round must settle instead of asking for another photo.
	let backend = Arc::new(StubBackend {
		verdict: Some(ClassifyVerdict {
			is_plant: false,
			plant_score: 0.1,
			category: Some("artificial_object".to_string()),
		}),
		ready: true,
		..StubBackend::default()
	});
	let engine = engine(backend);
	let request = IdentifyRequest { reply: AMBIGUOUS_REPLY.to_string(), session: None };
	let outcome = engine.identify(&request).await.unwrap();

	assert_eq!(outcome.decision, flora_domain::session::RoundDecision::Final);
	assert!(outcome.session.is_none());
	assert!(!outcome.diagnostics.classified_plant);
}

#[tokio::test]
async fn classifier_outage_still_serves_the_hybrid_stage() {
	let backend = Arc::new(StubBackend {
		verdict: None,
		hybrid: vec![hybrid_hit("樟樹", 0.7, 0.6, &["喬木", "互生", "繖房花序"])],
		ready: true,
		..StubBackend::default()
	});
	let engine = engine(backend);
	let request = IdentifyRequest { reply: DIAGNOSTIC_REPLY.to_string(), session: None };
	let outcome = engine.identify(&request).await.unwrap();

	assert!(!outcome.diagnostics.classified_plant);
	assert_eq!(outcome.candidates[0].chinese_name, "樟樹");
}

#[tokio::test]
async fn unready_index_skips_stage_one_and_caches_the_probe() {
	let backend = Arc::new(StubBackend {
		verdict: plant_verdict(0.9),
		embedding: vec![embedding_hit("樟樹", 0.82)],
		hybrid: vec![hybrid_hit("杜鵑", 0.6, 0.5, &["灌木", "對生"])],
		ready: false,
		..StubBackend::default()
	});
	let engine = engine(backend.clone());
	let request = IdentifyRequest { reply: DIAGNOSTIC_REPLY.to_string(), session: None };
	let outcome = engine.identify(&request).await.unwrap();

	// Stage one never ran, so the embedding-only hit cannot appear.
	assert!(outcome.candidates.iter().all(|c| c.chinese_name != "樟樹"));

	engine.identify(&request).await.unwrap();

	assert_eq!(backend.health_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn feature_rich_round_queries_by_features() {
	let backend = Arc::new(StubBackend {
		verdict: plant_verdict(0.9),
		hybrid: vec![hybrid_hit("樟樹", 0.7, 0.6, &["喬木"])],
		ready: true,
		..StubBackend::default()
	});
	let engine = engine(backend.clone());
	let request = IdentifyRequest { reply: DIAGNOSTIC_REPLY.to_string(), session: None };

	engine.identify(&request).await.unwrap();

	let queries = backend.hybrid_queries.lock().unwrap();

	assert!(queries[0].contains("喬木"));
	assert!(queries[0].contains("繖房花序"));
}

#[tokio::test]
async fn blank_reply_is_rejected() {
	let engine = engine(Arc::new(StubBackend::default()));
	let request = IdentifyRequest { reply: "   ".to_string(), session: None };

	assert!(engine.identify(&request).await.is_err());
}
