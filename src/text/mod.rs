//! Japanese text handling: normalization and morphological segmentation.

pub mod normalize;
pub mod segment;

pub use normalize::{
    contains_kanji, hiragana_to_katakana, is_pure_hiragana, is_pure_katakana,
    katakana_to_hiragana, normalize_text,
};
pub use segment::{FallbackSegmenter, Morpheme, MorphologicalAnalyzer, Segmenter};
