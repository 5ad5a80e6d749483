//! Kana-to-phoneme transliteration.
//!
//! An ordered longest-match rewrite over a fixed table: palatalized
//! two-kana combinations and doubled-vowel sequences match before single
//! kana, the small-tsu becomes the `q` geminate marker, and the long
//! vowel bar becomes the `:` length mark. The table is written in
//! katakana; hiragana keys are derived at startup by shifting the kana
//! block, so readings (katakana) and raw surfaces (either script) go
//! through the same rules.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::text::normalize::is_katakana;

/// Katakana → space-separated phoneme rewrite rows. Longest keys win at
/// match time regardless of row order; rows are grouped for readability.
const KATAKANA_ROWS: &[(&str, &str)] = &[
    // Doubled vowels collapse to a long vowel.
    ("アア", "a :"),
    ("イイ", "i :"),
    ("ウウ", "u :"),
    ("エエ", "e :"),
    ("オオ", "o :"),
    // Palatalized combinations.
    ("キャ", "ky a"),
    ("キュ", "ky u"),
    ("キョ", "ky o"),
    ("ギャ", "gy a"),
    ("ギュ", "gy u"),
    ("ギョ", "gy o"),
    ("シャ", "ʃ a"),
    ("シュ", "ʃ u"),
    ("ショ", "ʃ o"),
    ("シェ", "ʃ e"),
    ("ジャ", "dʒ a"),
    ("ジュ", "dʒ u"),
    ("ジョ", "dʒ o"),
    ("ジェ", "dʒ e"),
    ("チャ", "tɕ a"),
    ("チュ", "tɕ u"),
    ("チョ", "tɕ o"),
    ("チェ", "tɕ e"),
    ("ニャ", "ɲ a"),
    ("ニュ", "ɲ u"),
    ("ニョ", "ɲ o"),
    ("ヒャ", "hy a"),
    ("ヒュ", "hy u"),
    ("ヒョ", "hy o"),
    ("ビャ", "by a"),
    ("ビュ", "by u"),
    ("ビョ", "by o"),
    ("ピャ", "py a"),
    ("ピュ", "py u"),
    ("ピョ", "py o"),
    ("ミャ", "my a"),
    ("ミュ", "my u"),
    ("ミョ", "my o"),
    ("リャ", "ry a"),
    ("リュ", "ry u"),
    ("リョ", "ry o"),
    // Foreign-sound combinations.
    ("ファ", "f a"),
    ("フィ", "f i"),
    ("フェ", "f e"),
    ("フォ", "f o"),
    ("ティ", "t i"),
    ("ディ", "d i"),
    ("ウィ", "w i"),
    ("ウェ", "w e"),
    ("ウォ", "w o"),
    // Base syllabary.
    ("ア", "a"),
    ("イ", "i"),
    ("ウ", "u"),
    ("エ", "e"),
    ("オ", "o"),
    ("カ", "k a"),
    ("キ", "k i"),
    ("ク", "k u"),
    ("ケ", "k e"),
    ("コ", "k o"),
    ("ガ", "g a"),
    ("ギ", "g i"),
    ("グ", "g u"),
    ("ゲ", "g e"),
    ("ゴ", "g o"),
    ("サ", "s a"),
    ("シ", "ʃ i"),
    ("ス", "s u"),
    ("セ", "s e"),
    ("ソ", "s o"),
    ("ザ", "z a"),
    ("ジ", "dʒ i"),
    ("ズ", "z u"),
    ("ゼ", "z e"),
    ("ゾ", "z o"),
    ("タ", "t a"),
    ("チ", "tɕ i"),
    ("ツ", "ts u"),
    ("テ", "t e"),
    ("ト", "t o"),
    ("ダ", "d a"),
    ("ヂ", "dʒ i"),
    ("ヅ", "z u"),
    ("デ", "d e"),
    ("ド", "d o"),
    ("ナ", "n a"),
    ("ニ", "n i"),
    ("ヌ", "n u"),
    ("ネ", "n e"),
    ("ノ", "n o"),
    ("ハ", "h a"),
    ("ヒ", "h i"),
    ("フ", "f u"),
    ("ヘ", "h e"),
    ("ホ", "h o"),
    ("バ", "b a"),
    ("ビ", "b i"),
    ("ブ", "b u"),
    ("ベ", "b e"),
    ("ボ", "b o"),
    ("パ", "p a"),
    ("ピ", "p i"),
    ("プ", "p u"),
    ("ペ", "p e"),
    ("ポ", "p o"),
    ("マ", "m a"),
    ("ミ", "m i"),
    ("ム", "m u"),
    ("メ", "m e"),
    ("モ", "m o"),
    ("ヤ", "y a"),
    ("ユ", "y u"),
    ("ヨ", "y o"),
    ("ラ", "r a"),
    ("リ", "r i"),
    ("ル", "r u"),
    ("レ", "r e"),
    ("ロ", "r o"),
    ("ワ", "w a"),
    ("ヲ", "o"),
    ("ン", "N"),
    // Small kana standing alone.
    ("ッ", "q"),
    ("ャ", "y a"),
    ("ュ", "y u"),
    ("ョ", "y o"),
    ("ァ", "a"),
    ("ィ", "i"),
    ("ゥ", "u"),
    ("ェ", "e"),
    ("ォ", "o"),
    // Length mark.
    ("ー", ":"),
];

/// Combined lookup table with derived hiragana keys.
static RULES: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(KATAKANA_ROWS.len() * 2);
    for &(kana, phonemes) in KATAKANA_ROWS {
        map.insert(kana.to_string(), phonemes);
        let hira: String = kana
            .chars()
            .map(|ch| {
                if is_katakana(ch) && ch != 'ー' {
                    char::from_u32(ch as u32 - 0x60).unwrap_or(ch)
                } else {
                    ch
                }
            })
            .collect();
        map.entry(hira).or_insert(phonemes);
    }
    map
});

const MAX_KEY_CHARS: usize = 2;

/// Transliterate kana text to space-separated phonemes.
///
/// Unmatched codepoints pass through unchanged as their own tokens, which
/// keeps the last-resort path usable on mixed input; the tokenizer maps
/// anything outside the vocabulary to the unknown id.
pub fn transliterate(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() * 2);
    let mut i = 0;

    while i < chars.len() {
        let mut matched = false;
        for len in (1..=MAX_KEY_CHARS.min(chars.len() - i)).rev() {
            let key: String = chars[i..i + len].iter().collect();
            if let Some(&phonemes) = RULES.get(&key) {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(phonemes);
                i += len;
                matched = true;
                break;
            }
        }
        if !matched {
            let ch = chars[i];
            if !ch.is_whitespace() {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push(ch);
            }
            i += 1;
        }
    }

    out
}

/// Every distinct phoneme symbol the rewrite table can emit. Used to
/// seed a vocabulary when no tokenizer file is configured.
pub fn phoneme_inventory() -> Vec<String> {
    let mut symbols: Vec<String> = KATAKANA_ROWS
        .iter()
        .flat_map(|(_, phonemes)| phonemes.split_whitespace())
        .map(str::to_string)
        .collect();
    // Geminate post-processing doubles k/s/t/p/h onsets, so those forms
    // belong in the inventory too.
    let doubled: Vec<String> = symbols
        .iter()
        .filter(|s| s.starts_with(['k', 's', 't', 'p', 'h']))
        .map(|s| format!("{}{}", s.chars().next().unwrap_or_default(), s))
        .collect();
    symbols.extend(doubled);
    symbols.sort_unstable();
    symbols.dedup();
    symbols
}

/// True when every codepoint of `reading` has a rewrite rule, i.e. the
/// transliteration is fully rule-covered.
pub fn fully_covered(reading: &str) -> bool {
    let chars: Vec<char> = reading.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let mut matched = false;
        for len in (1..=MAX_KEY_CHARS.min(chars.len() - i)).rev() {
            let key: String = chars[i..i + len].iter().collect();
            if RULES.contains_key(&key) {
                i += len;
                matched = true;
                break;
            }
        }
        if !matched {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_syllables() {
        assert_eq!(transliterate("カキク"), "k a k i k u");
        assert_eq!(transliterate("アイウエオ"), "a i u e o");
    }

    #[test]
    fn hiragana_uses_the_same_rules() {
        assert_eq!(transliterate("かきく"), "k a k i k u");
        assert_eq!(transliterate("こんにちは"), "k o N n i tɕ i h a");
    }

    #[test]
    fn palatalized_combos_win_over_singles() {
        assert_eq!(transliterate("キャ"), "ky a");
        assert_eq!(transliterate("シャ"), "ʃ a");
        assert_eq!(transliterate("チョ"), "tɕ o");
        assert_eq!(transliterate("ニュ"), "ɲ u");
        // Non-combining small kana still resolve on their own.
        assert_eq!(transliterate("ャ"), "y a");
    }

    #[test]
    fn long_vowels_and_doubles() {
        assert_eq!(transliterate("コーヒー"), "k o : h i :");
        assert_eq!(transliterate("オオサカ"), "o : s a k a");
    }

    #[test]
    fn geminate_marker() {
        assert_eq!(transliterate("ガッコウ"), "g a q k o u");
    }

    #[test]
    fn moraic_nasal() {
        assert_eq!(transliterate("ニッポン"), "n i q p o N");
    }

    #[test]
    fn unmatched_codepoints_pass_through() {
        assert_eq!(transliterate("カX"), "k a X");
        assert_eq!(transliterate("カ 漢"), "k a 漢");
    }

    #[test]
    fn coverage_check() {
        assert!(fully_covered("キョウ"));
        assert!(fully_covered("こんにちは"));
        assert!(!fully_covered("漢字"));
    }
}
