use regex::Regex;

use crate::{
	traits::{TraitKey, TraitSet},
	vocab::{self, Category, Feature, Strength},
};

const STRONG_MIN_CONFIDENCE: f32 = 0.55;
const FRAGILE_MIN_CONFIDENCE: f32 = 0.30;
const WEAK_MIN_CONFIDENCE: f32 = 0.35;
const SHORT_EVIDENCE_CHARS: usize = 6;
const FRUIT_CONTEXT_WINDOW: usize = 40;
// Deliberately narrower than the evidence keyword list: the cue word itself
// ("pod", "berry") must not satisfy its own gate.
const FRUIT_CONTEXT_KEYWORDS: &[&str] = &["fruit", "fruiting", "ripe", "果實", "結果"];

/// Converts a validated trait set plus the raw description into the canonical,
/// contradiction-free, category-capped feature list.
pub fn normalize(traits: &TraitSet, description: &str) -> Vec<Feature> {
	resolve_contradictions(&collect(traits, description))
}

/// The mapped, strength-gated, deduplicated feature list before contradiction
/// resolution. The uncertainty check inspects this to tell a disputed feature
/// apart from a settled one.
pub fn collect(traits: &TraitSet, description: &str) -> Vec<Feature> {
	let mut features = Vec::new();

	for (key, item) in traits {
		let Some(feature) = vocab::lookup(*key, &item.value) else {
			// Unmapped raw values would leak the extraction language into the
			// search query; drop them.
			continue;
		};

		if passes_strength_gate(*key, feature, item.confidence, &item.evidence) {
			push_unique(&mut features, feature);
		}
	}

	// Structured extraction fails often enough that the prose gets its own
	// pass; anything it finds that the trait set missed still counts.
	for feature in keyword_assist(description) {
		push_unique(&mut features, feature);
	}

	features
}

/// True when the pre-resolution list asserts both inflorescence orientations,
/// or more than one inflorescence type. Cap resolution would silently pick a
/// winner; callers that care about the dispute must look before it runs.
pub fn has_conflicting_inflorescence(features: &[Feature]) -> bool {
	let orientations =
		features.iter().filter(|f| f.category == Category::InflorescenceOrientation).count();
	let types = features.iter().filter(|f| f.category == Category::InflorescenceType).count();

	orientations > 1 || types > 1
}

fn passes_strength_gate(key: TraitKey, feature: Feature, confidence: f32, evidence: &str) -> bool {
	let effective = if evidence.chars().count() < SHORT_EVIDENCE_CHARS {
		// Short evidence correlates with guesswork.
		confidence / 2.0
	} else {
		confidence
	};
	let threshold = match feature.strength {
		Strength::Strong if matches!(key, TraitKey::FlowerShape | TraitKey::FruitColor) =>
			FRAGILE_MIN_CONFIDENCE,
		Strength::Strong => STRONG_MIN_CONFIDENCE,
		Strength::Weak if matches!(key, TraitKey::FlowerShape | TraitKey::FruitColor) =>
			FRAGILE_MIN_CONFIDENCE,
		Strength::Weak => WEAK_MIN_CONFIDENCE,
	};

	effective >= threshold
}

/// Scans the free-text description for domain cues and returns the matching
/// canonical features. Fruit cues only count when a fruit-referring word sits
/// near the match, mirroring the evidence rule for extracted fruit traits.
pub fn keyword_assist(description: &str) -> Vec<Feature> {
	// (pattern, canonical feature, requires nearby fruit context)
	const PATTERNS: &[(&str, &str, bool)] = &[
		(r"(?i)palm\b|palm tree|fronds?|椰子|棕櫚", "棕櫚", false),
		(r"(?i)pinnately|pinnate|feather[- ]like lea|羽狀", "羽狀複葉", false),
		(r"(?i)bipinnate|twice[- ]pinnate", "二回羽狀複葉", false),
		(r"(?i)palmately compound|掌狀複葉", "掌狀複葉", false),
		(r"(?i)compound lea|複葉", "複葉", false),
		(r"(?i)simple lea|單葉", "單葉", false),
		(r"(?i)berr(y|ies)|漿果", "漿果", true),
		(r"(?i)drupes?|核果", "核果", true),
		(r"(?i)pods?\b|legumes?|莢果", "莢果", true),
		(r"(?i)capsules?|蒴果", "蒴果", true),
		(r"(?i)racemes?|總狀花序", "總狀花序", false),
		(r"(?i)panicles?|圓錐花序", "圓錐花序", false),
		(r"(?i)umbels?|繖形花序|傘形花序", "繖形花序", false),
		(r"(?i)spikes? of flowers|flower spikes?|穗狀花序", "穗狀花序", false),
		(r"(?i)cymes?|聚繖花序|聚傘花序", "聚繖花序", false),
		(r"(?i)corymbs?|繖房花序", "繖房花序", false),
		(r"(?i)capitulum|head-like cluster|頭狀花序", "頭狀花序", false),
		(r"(?i)alternate(ly)? arranged|alternate lea|互生", "互生", false),
		(r"(?i)opposite(ly)? arranged|opposite lea|對生", "對生", false),
		(r"(?i)whorl(s|ed)?|輪生", "輪生", false),
		(r"(?i)serrated?|toothed (edge|margin)|鋸齒", "鋸齒緣", false),
		(r"(?i)(entire|smooth) margins?|全緣", "全緣", false),
		(r"(?i)thorns?|spines?|prickl|有刺|棘刺", "有刺", false),
		(r"(?i)latex|milky sap|乳汁", "有乳汁", false),
		(r"(?i)buttress(ed)? roots?|板根", "板根", false),
		(r"(?i)aerial roots?|prop roots?|氣生根|氣根", "氣生根", false),
	];

	let mut found = Vec::new();

	for (pattern, name, needs_fruit_context) in PATTERNS {
		let Ok(re) = Regex::new(pattern) else {
			continue;
		};
		let Some(matched) = re.find(description) else {
			continue;
		};

		if *needs_fruit_context && !has_fruit_context(description, matched.start(), matched.end())
		{
			continue;
		}

		if let Some(feature) = vocab::by_name(name) {
			push_unique(&mut found, feature);
		}
	}

	found
}

fn has_fruit_context(description: &str, start: usize, end: usize) -> bool {
	let window_start = floor_char_boundary(description, start.saturating_sub(FRUIT_CONTEXT_WINDOW));
	let window_end = floor_char_boundary(description, (end + FRUIT_CONTEXT_WINDOW).min(description.len()));
	let window = description[window_start..window_end].to_lowercase();

	FRUIT_CONTEXT_KEYWORDS.iter().any(|keyword| window.contains(keyword))
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
	while idx > 0 && !text.is_char_boundary(idx) {
		idx -= 1;
	}

	idx
}

/// Final pass over the combined feature list. Idempotent: running it on its
/// own output is a no-op.
pub fn resolve_contradictions(features: &[Feature]) -> Vec<Feature> {
	let mut deduped: Vec<Feature> = Vec::new();

	for feature in features {
		push_unique(&mut deduped, *feature);
	}

	let has_specific_compound = deduped
		.iter()
		.any(|feature| vocab::COMPOUND_LEAF_FEATURES.contains(&feature.name));
	let has_any_compound =
		has_specific_compound || deduped.iter().any(|f| f.name == vocab::GENERIC_COMPOUND_LEAF);
	let has_hairy_variant =
		deduped.iter().any(|feature| vocab::HAIRY_FEATURES.contains(&feature.name));

	deduped.retain(|feature| {
		if has_specific_compound && feature.name == vocab::GENERIC_COMPOUND_LEAF {
			return false;
		}
		if has_any_compound && feature.name == vocab::SIMPLE_LEAF {
			return false;
		}
		if has_hairy_variant && feature.name == vocab::HAIRLESS {
			return false;
		}

		true
	});

	cap_by_category(&deduped)
}

/// Each category keeps its best-ranked features up to the category cap, using
/// the fixed per-category priority orders rather than first-seen order.
fn cap_by_category(features: &[Feature]) -> Vec<Feature> {
	let mut out = Vec::with_capacity(features.len());

	for feature in features {
		let mut competitors: Vec<&Feature> =
			features.iter().filter(|other| other.category == feature.category).collect();

		competitors.sort_by_key(|other| vocab::priority_rank(other));
		competitors.truncate(feature.category.cap());

		if competitors.iter().any(|winner| winner.name == feature.name) {
			out.push(*feature);
		}
	}

	out
}

fn push_unique(features: &mut Vec<Feature>, feature: Feature) {
	if !features.iter().any(|existing| existing.name == feature.name) {
		features.push(feature);
	}
}
