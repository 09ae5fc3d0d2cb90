//! Pure identification logic: trait extraction, the canonical feature
//! vocabulary, normalization, quality scoring, weight selection, and the
//! multi-round session rules. No I/O lives here.

pub mod normalize;
pub mod quality;
pub mod session;
pub mod traits;
pub mod vocab;
pub mod weights;
