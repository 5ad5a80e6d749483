//! Character-level normalization and script predicates.
//!
//! Japanese text mixes full-width ASCII, half-width katakana, and three
//! native scripts. The pipeline normalizes width before segmentation so
//! the dictionary and kana tables only ever see one spelling of each
//! codepoint.

const HIRAGANA_START: u32 = 0x3040;
const HIRAGANA_END: u32 = 0x309F;
const KATAKANA_START: u32 = 0x30A0;
const KATAKANA_END: u32 = 0x30FF;
const KANJI_START: u32 = 0x4E00;
const KANJI_END: u32 = 0x9FAF;
const JP_PUNCT_START: u32 = 0x3000;
const JP_PUNCT_END: u32 = 0x303F;

/// Distance between the hiragana and katakana blocks.
const KANA_BLOCK_OFFSET: u32 = 0x60;

pub(crate) fn is_hiragana(ch: char) -> bool {
    (HIRAGANA_START..=HIRAGANA_END).contains(&(ch as u32))
}

pub(crate) fn is_katakana(ch: char) -> bool {
    (KATAKANA_START..=KATAKANA_END).contains(&(ch as u32))
}

pub(crate) fn is_kanji(ch: char) -> bool {
    (KANJI_START..=KANJI_END).contains(&(ch as u32))
}

pub(crate) fn is_jp_punct(ch: char) -> bool {
    (JP_PUNCT_START..=JP_PUNCT_END).contains(&(ch as u32))
}

/// Normalize width variants: full-width ASCII (U+FF01..U+FF5E) becomes
/// half-width, and the ideographic space (U+3000) becomes a plain space.
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .map(|ch| match ch as u32 {
            0xFF01..=0xFF5E => char::from_u32(ch as u32 - 0xFF01 + 0x21).unwrap_or(ch),
            0x3000 => ' ',
            _ => ch,
        })
        .collect()
}

/// Convert every hiragana codepoint to its katakana counterpart.
pub fn hiragana_to_katakana(text: &str) -> String {
    text.chars()
        .map(|ch| {
            if is_hiragana(ch) {
                char::from_u32(ch as u32 + KANA_BLOCK_OFFSET).unwrap_or(ch)
            } else {
                ch
            }
        })
        .collect()
}

/// Convert every katakana codepoint to its hiragana counterpart.
pub fn katakana_to_hiragana(text: &str) -> String {
    text.chars()
        .map(|ch| {
            if is_katakana(ch) {
                char::from_u32(ch as u32 - KANA_BLOCK_OFFSET).unwrap_or(ch)
            } else {
                ch
            }
        })
        .collect()
}

/// True if the text contains at least one kanji codepoint.
pub fn contains_kanji(text: &str) -> bool {
    text.chars().any(is_kanji)
}

/// True if the text is hiragana (Japanese punctuation allowed).
pub fn is_pure_hiragana(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| is_hiragana(ch) || is_jp_punct(ch))
}

/// True if the text is katakana (Japanese punctuation allowed).
pub fn is_pure_katakana(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| is_katakana(ch) || is_jp_punct(ch))
}
