//! The canonical feature vocabulary.
//!
//! One embedded, versioned table maps every raw trait value the vision model
//! may emit to a canonical feature string in the vocabulary the downstream
//! search service indexes. Unmapped raw values are dropped by the normalizer,
//! never forwarded.

use crate::traits::TraitKey;

pub const VOCAB_VERSION: &str = "2026-08";

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Category {
	LifeForm,
	LeafArrangement,
	LeafShape,
	LeafType,
	LeafMargin,
	LeafTexture,
	Phenology,
	InflorescenceType,
	FlowerShape,
	FlowerPosition,
	InflorescenceOrientation,
	FlowerColor,
	FruitType,
	FruitColor,
	FruitCluster,
	FruitSurface,
	Calyx,
	TrunkRoot,
	StemType,
	SurfaceHair,
	Special,
}
impl Category {
	/// Maximum features one category may contribute after normalization.
	pub fn cap(self) -> usize {
		match self {
			Self::Special => 2,
			_ => 1,
		}
	}

	/// Categories whose presence settles an otherwise ambiguous result.
	pub fn is_diagnostic(self) -> bool {
		matches!(self, Self::InflorescenceType | Self::FlowerShape)
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Strength {
	Strong,
	Weak,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Feature {
	pub name: &'static str,
	pub category: Category,
	pub strength: Strength,
}

macro_rules! feature {
	($name:literal, $category:ident, $strength:ident) => {
		Feature { name: $name, category: Category::$category, strength: Strength::$strength }
	};
}

/// Raw value -> canonical feature, scoped by the trait key it belongs to.
pub const ENTRIES: &[(TraitKey, &str, Feature)] = &[
	(TraitKey::LifeForm, "tree", feature!("喬木", LifeForm, Weak)),
	(TraitKey::LifeForm, "shrub", feature!("灌木", LifeForm, Weak)),
	(TraitKey::LifeForm, "herb", feature!("草本", LifeForm, Weak)),
	(TraitKey::LifeForm, "grass", feature!("草本", LifeForm, Weak)),
	(TraitKey::LifeForm, "vine", feature!("藤本", LifeForm, Weak)),
	(TraitKey::LifeForm, "climber", feature!("藤本", LifeForm, Weak)),
	(TraitKey::LifeForm, "palm", feature!("棕櫚", LifeForm, Weak)),
	(TraitKey::LifeForm, "bamboo", feature!("竹類", LifeForm, Weak)),
	(TraitKey::LifeForm, "fern", feature!("蕨類", LifeForm, Weak)),
	(TraitKey::LeafArrangement, "alternate", feature!("互生", LeafArrangement, Weak)),
	(TraitKey::LeafArrangement, "opposite", feature!("對生", LeafArrangement, Weak)),
	(TraitKey::LeafArrangement, "whorled", feature!("輪生", LeafArrangement, Weak)),
	(TraitKey::LeafArrangement, "basal", feature!("基生", LeafArrangement, Weak)),
	(TraitKey::LeafArrangement, "rosette", feature!("基生", LeafArrangement, Weak)),
	(TraitKey::LeafArrangement, "clustered", feature!("叢生", LeafArrangement, Weak)),
	(TraitKey::LeafShape, "ovate", feature!("卵形葉", LeafShape, Weak)),
	(TraitKey::LeafShape, "obovate", feature!("倒卵形葉", LeafShape, Weak)),
	(TraitKey::LeafShape, "elliptic", feature!("橢圓形葉", LeafShape, Weak)),
	(TraitKey::LeafShape, "lanceolate", feature!("披針形葉", LeafShape, Weak)),
	(TraitKey::LeafShape, "oblong", feature!("長橢圓形葉", LeafShape, Weak)),
	(TraitKey::LeafShape, "linear", feature!("線形葉", LeafShape, Weak)),
	(TraitKey::LeafShape, "cordate", feature!("心形葉", LeafShape, Weak)),
	(TraitKey::LeafShape, "needle", feature!("針形葉", LeafShape, Weak)),
	(TraitKey::LeafType, "simple", feature!("單葉", LeafType, Weak)),
	(TraitKey::LeafType, "compound", feature!("複葉", LeafType, Weak)),
	(TraitKey::LeafType, "pinnate", feature!("羽狀複葉", LeafType, Weak)),
	(TraitKey::LeafType, "bipinnate", feature!("二回羽狀複葉", LeafType, Weak)),
	(TraitKey::LeafType, "palmate", feature!("掌狀複葉", LeafType, Weak)),
	(TraitKey::LeafType, "trifoliate", feature!("三出複葉", LeafType, Weak)),
	(TraitKey::LeafMargin, "entire", feature!("全緣", LeafMargin, Weak)),
	(TraitKey::LeafMargin, "serrate", feature!("鋸齒緣", LeafMargin, Weak)),
	(TraitKey::LeafMargin, "serrated", feature!("鋸齒緣", LeafMargin, Weak)),
	(TraitKey::LeafMargin, "dentate", feature!("鋸齒緣", LeafMargin, Weak)),
	(TraitKey::LeafMargin, "wavy", feature!("波狀緣", LeafMargin, Weak)),
	(TraitKey::LeafMargin, "undulate", feature!("波狀緣", LeafMargin, Weak)),
	(TraitKey::LeafMargin, "lobed", feature!("裂葉", LeafMargin, Weak)),
	(TraitKey::LeafMargin, "spiny", feature!("刺狀緣", LeafMargin, Weak)),
	(TraitKey::LeafTexture, "leathery", feature!("革質", LeafTexture, Weak)),
	(TraitKey::LeafTexture, "coriaceous", feature!("革質", LeafTexture, Weak)),
	(TraitKey::LeafTexture, "papery", feature!("紙質", LeafTexture, Weak)),
	(TraitKey::LeafTexture, "succulent", feature!("肉質", LeafTexture, Weak)),
	(TraitKey::Phenology, "evergreen", feature!("常綠", Phenology, Weak)),
	(TraitKey::Phenology, "deciduous", feature!("落葉", Phenology, Weak)),
	(TraitKey::Inflorescence, "raceme", feature!("總狀花序", InflorescenceType, Strong)),
	(TraitKey::Inflorescence, "panicle", feature!("圓錐花序", InflorescenceType, Strong)),
	(TraitKey::Inflorescence, "cyme", feature!("聚繖花序", InflorescenceType, Strong)),
	(TraitKey::Inflorescence, "umbel", feature!("繖形花序", InflorescenceType, Strong)),
	(TraitKey::Inflorescence, "spike", feature!("穗狀花序", InflorescenceType, Strong)),
	(TraitKey::Inflorescence, "head", feature!("頭狀花序", InflorescenceType, Strong)),
	(TraitKey::Inflorescence, "capitulum", feature!("頭狀花序", InflorescenceType, Strong)),
	(TraitKey::Inflorescence, "corymb", feature!("繖房花序", InflorescenceType, Strong)),
	(TraitKey::Inflorescence, "spadix", feature!("佛焰花序", InflorescenceType, Strong)),
	(TraitKey::Inflorescence, "solitary", feature!("單生花", InflorescenceType, Strong)),
	(TraitKey::FlowerColor, "white", feature!("白花", FlowerColor, Strong)),
	(TraitKey::FlowerColor, "yellow", feature!("黃花", FlowerColor, Strong)),
	(TraitKey::FlowerColor, "red", feature!("紅花", FlowerColor, Strong)),
	(TraitKey::FlowerColor, "purple", feature!("紫花", FlowerColor, Strong)),
	(TraitKey::FlowerColor, "pink", feature!("粉紅花", FlowerColor, Strong)),
	(TraitKey::FlowerColor, "orange", feature!("橙花", FlowerColor, Strong)),
	(TraitKey::FlowerColor, "blue", feature!("藍花", FlowerColor, Strong)),
	(TraitKey::FlowerShape, "tubular", feature!("管狀花", FlowerShape, Strong)),
	(TraitKey::FlowerShape, "bell", feature!("鐘形花", FlowerShape, Strong)),
	(TraitKey::FlowerShape, "campanulate", feature!("鐘形花", FlowerShape, Strong)),
	(TraitKey::FlowerShape, "funnel", feature!("漏斗形花", FlowerShape, Strong)),
	(TraitKey::FlowerShape, "papilionaceous", feature!("蝶形花", FlowerShape, Strong)),
	(TraitKey::FlowerShape, "butterfly", feature!("蝶形花", FlowerShape, Strong)),
	(TraitKey::FlowerShape, "labiate", feature!("唇形花", FlowerShape, Strong)),
	(TraitKey::FlowerPosition, "axillary", feature!("腋生花", FlowerPosition, Weak)),
	(TraitKey::FlowerPosition, "terminal", feature!("頂生花", FlowerPosition, Weak)),
	(
		TraitKey::InflorescenceOrientation,
		"erect",
		feature!("直立花序", InflorescenceOrientation, Weak),
	),
	(
		TraitKey::InflorescenceOrientation,
		"upright",
		feature!("直立花序", InflorescenceOrientation, Weak),
	),
	(
		TraitKey::InflorescenceOrientation,
		"drooping",
		feature!("下垂花序", InflorescenceOrientation, Weak),
	),
	(
		TraitKey::InflorescenceOrientation,
		"pendulous",
		feature!("下垂花序", InflorescenceOrientation, Weak),
	),
	(TraitKey::FruitType, "berry", feature!("漿果", FruitType, Strong)),
	(TraitKey::FruitType, "drupe", feature!("核果", FruitType, Strong)),
	(TraitKey::FruitType, "capsule", feature!("蒴果", FruitType, Strong)),
	(TraitKey::FruitType, "pod", feature!("莢果", FruitType, Strong)),
	(TraitKey::FruitType, "legume", feature!("莢果", FruitType, Strong)),
	(TraitKey::FruitType, "nut", feature!("堅果", FruitType, Strong)),
	(TraitKey::FruitType, "samara", feature!("翅果", FruitType, Strong)),
	(TraitKey::FruitType, "follicle", feature!("蓇葖果", FruitType, Strong)),
	(TraitKey::FruitType, "achene", feature!("瘦果", FruitType, Strong)),
	(TraitKey::FruitType, "syconium", feature!("隱花果", FruitType, Strong)),
	(TraitKey::FruitColor, "red", feature!("紅色果實", FruitColor, Weak)),
	(TraitKey::FruitColor, "yellow", feature!("黃色果實", FruitColor, Weak)),
	(TraitKey::FruitColor, "orange", feature!("橙色果實", FruitColor, Weak)),
	(TraitKey::FruitColor, "purple", feature!("紫黑色果實", FruitColor, Weak)),
	(TraitKey::FruitColor, "black", feature!("紫黑色果實", FruitColor, Weak)),
	(TraitKey::FruitColor, "green", feature!("綠色果實", FruitColor, Weak)),
	(TraitKey::FruitColor, "brown", feature!("褐色果實", FruitColor, Weak)),
	(TraitKey::FruitCluster, "clustered", feature!("果實成串", FruitCluster, Weak)),
	(TraitKey::FruitCluster, "paired", feature!("果實成對", FruitCluster, Weak)),
	(TraitKey::FruitSurface, "smooth", feature!("果面光滑", FruitSurface, Weak)),
	(TraitKey::FruitSurface, "warty", feature!("果面疣狀", FruitSurface, Weak)),
	(TraitKey::FruitSurface, "hairy", feature!("果面有毛", FruitSurface, Weak)),
	(TraitKey::FruitSurface, "ribbed", feature!("果面有稜", FruitSurface, Weak)),
	(TraitKey::RootType, "aerial", feature!("氣生根", TrunkRoot, Strong)),
	(TraitKey::RootType, "buttress", feature!("板根", TrunkRoot, Strong)),
	(TraitKey::RootType, "prop", feature!("支柱根", TrunkRoot, Strong)),
	(TraitKey::RootType, "stilt", feature!("支柱根", TrunkRoot, Strong)),
	(TraitKey::StemType, "woody", feature!("木質莖", StemType, Weak)),
	(TraitKey::StemType, "herbaceous", feature!("草質莖", StemType, Weak)),
	(TraitKey::StemType, "square", feature!("方形莖", StemType, Weak)),
	(TraitKey::StemType, "hollow", feature!("中空莖", StemType, Weak)),
	(TraitKey::SurfaceHair, "hairless", feature!("無毛", SurfaceHair, Strong)),
	(TraitKey::SurfaceHair, "glabrous", feature!("無毛", SurfaceHair, Strong)),
	(TraitKey::SurfaceHair, "hairy", feature!("有毛", SurfaceHair, Strong)),
	(TraitKey::SurfaceHair, "pubescent", feature!("柔毛", SurfaceHair, Strong)),
	(TraitKey::SurfaceHair, "velvety", feature!("絨毛", SurfaceHair, Strong)),
	(TraitKey::SurfaceHair, "tomentose", feature!("絨毛", SurfaceHair, Strong)),
	(TraitKey::SurfaceHair, "bristly", feature!("剛毛", SurfaceHair, Strong)),
	(TraitKey::SurfaceHair, "hispid", feature!("剛毛", SurfaceHair, Strong)),
	(TraitKey::Special, "thorns", feature!("有刺", Special, Strong)),
	(TraitKey::Special, "thorny", feature!("有刺", Special, Strong)),
	(TraitKey::Special, "spines", feature!("有刺", Special, Strong)),
	(TraitKey::Special, "latex", feature!("有乳汁", Special, Strong)),
	(TraitKey::Special, "milky_sap", feature!("有乳汁", Special, Strong)),
	(TraitKey::Special, "viviparous", feature!("胎生苗", Special, Strong)),
	(TraitKey::Special, "bract", feature!("苞片顯著", Special, Strong)),
	(TraitKey::Special, "tendril", feature!("有卷鬚", Special, Strong)),
	(TraitKey::Special, "aerial_root", feature!("氣生根", TrunkRoot, Strong)),
	// The extraction prompt has no calyx key; calyx cues arrive under
	// "special" and keep their own category for capping.
	(TraitKey::Special, "persistent", feature!("宿存萼", Calyx, Weak)),
	(TraitKey::Special, "enlarged", feature!("萼片增大", Calyx, Weak)),
];

/// Fixed tie-break orders for the categories where extraction order must not
/// decide the winner. Earlier means more diagnostic value.
const PRIORITY: &[(Category, &[&str])] = &[
	(Category::InflorescenceType, &[
		"繖房花序",
		"聚繖花序",
		"穗狀花序",
		"繖形花序",
		"頭狀花序",
		"總狀花序",
		"圓錐花序",
		"佛焰花序",
		"單生花",
	]),
	(Category::LeafArrangement, &["輪生", "對生", "基生", "叢生", "互生"]),
	(Category::LeafMargin, &["裂葉", "刺狀緣", "波狀緣", "鋸齒緣", "全緣"]),
];

/// Features with low discriminating power; a trait set made mostly of these
/// must not dominate scoring.
pub const GENERIC_FEATURES: &[&str] = &[
	"互生", "對生", "基生", "輪生", "叢生", "喬木", "灌木", "草本", "全緣", "鋸齒緣", "卵形葉",
	"橢圓形葉", "披針形葉", "常綠", "落葉", "革質", "無毛", "木質莖", "草質莖",
];

pub const FRUIT_EVIDENCE_KEYWORDS: &[&str] = &[
	"fruit", "fruiting", "berry", "berries", "drupe", "pod", "capsule", "nut", "果", "結果",
];

/// The closed raw-value vocabulary for `fruit_type`.
pub const FRUIT_TYPE_VALUES: &[&str] = &[
	"berry", "drupe", "capsule", "pod", "legume", "nut", "samara", "follicle", "achene", "syconium",
];

pub const COMPOUND_LEAF_FEATURES: &[&str] = &["羽狀複葉", "二回羽狀複葉", "掌狀複葉", "三出複葉"];
pub const GENERIC_COMPOUND_LEAF: &str = "複葉";
pub const SIMPLE_LEAF: &str = "單葉";
pub const HAIRLESS: &str = "無毛";
pub const HAIRY_FEATURES: &[&str] = &["有毛", "柔毛", "絨毛", "剛毛"];

/// Curated common-name synonyms used by the name-match booster.
pub const NAME_SYNONYMS: &[(&str, &str)] = &[
	("榕樹", "正榕"),
	("樟樹", "本樟"),
	("台灣欒樹", "苦苓舅"),
	("血桐", "流血樹"),
	("構樹", "鹿仔樹"),
	("茄苳", "重陽木"),
	("黃花風鈴木", "風鈴木"),
	("鳳凰木", "金鳳花"),
];

/// Direct lookup -> underscore-segment lookup -> substring lookup, scoped to
/// one trait key. Returns `None` for raw values outside the vocabulary.
pub fn lookup(key: TraitKey, raw: &str) -> Option<Feature> {
	let raw = raw.trim().to_lowercase();

	if raw.is_empty() {
		return None;
	}

	if let Some(found) = direct(key, &raw) {
		return Some(found);
	}

	if raw.contains('_') {
		for segment in raw.split('_') {
			if let Some(found) = direct(key, segment) {
				return Some(found);
			}
		}
	}

	entries_for(key)
		.find(|(value, _)| value.len() >= 4 && raw.contains(value))
		.map(|(_, feature)| feature)
}

/// Canonical feature by its Chinese name, used by the keyword-assist pass and
/// the partial-JSON fallback, which both speak the canonical vocabulary.
pub fn by_name(name: &str) -> Option<Feature> {
	ENTRIES.iter().find(|(_, _, feature)| feature.name == name).map(|(_, _, feature)| *feature)
}

/// Tie-break rank within a category; lower wins. Categories without a fixed
/// order fall back to table order.
pub fn priority_rank(feature: &Feature) -> usize {
	if let Some((_, order)) = PRIORITY.iter().find(|(category, _)| *category == feature.category)
		&& let Some(rank) = order.iter().position(|name| *name == feature.name)
	{
		return rank;
	}

	ENTRIES
		.iter()
		.position(|(_, _, entry)| entry.name == feature.name)
		.map(|idx| idx + PRIORITY.len() * 100)
		.unwrap_or(usize::MAX)
}

pub fn is_generic(feature: &Feature) -> bool {
	GENERIC_FEATURES.contains(&feature.name)
}

fn direct(key: TraitKey, raw: &str) -> Option<Feature> {
	entries_for(key).find(|(value, _)| *value == raw).map(|(_, feature)| feature)
}

fn entries_for(key: TraitKey) -> impl Iterator<Item = (&'static str, Feature)> {
	ENTRIES
		.iter()
		.filter(move |(entry_key, _, _)| *entry_key == key)
		.map(|(_, value, feature)| (*value, *feature))
}
