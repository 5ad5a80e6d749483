//! Morphological segmentation.
//!
//! The segmenter runs in one of two modes. When a morphological analyzer
//! is attached (a MeCab binding, typically), its output is used directly.
//! Otherwise a script-boundary fallback splits the text wherever the
//! writing system changes, which is coarse but gives the G2P cascade
//! usable units: hiragana and katakana runs carry their own readings,
//! and kanji runs are left for the dictionary or the neural fallback.

use crate::text::normalize::{
    self, hiragana_to_katakana, is_pure_hiragana, is_pure_katakana,
};

/// One unit of segmented text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Morpheme {
    /// Surface form as written.
    pub surface: String,
    /// Katakana reading. Empty when the segmenter has no coverage
    /// (kanji runs in fallback mode); consumers must tolerate this.
    pub reading: String,
    /// Pronunciation field, usually identical to the reading.
    pub pronunciation: String,
    /// Part of speech tag.
    pub pos: String,
    /// Dictionary base form.
    pub base_form: String,
}

/// External morphological analyzer interface.
///
/// The crate never links an analyzer itself; embedders attach one via
/// [`crate::engine::TtsEngine::set_analyzer`]. Implementations must skip
/// sentence-boundary markers and fill the fields of [`Morpheme`] as far
/// as their dictionary allows.
pub trait MorphologicalAnalyzer: Send + Sync {
    fn parse(&self, text: &str) -> Vec<Morpheme>;
}

/// Script classes the fallback segmenter distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Hiragana,
    Katakana,
    Kanji,
    Other,
}

fn script_of(ch: char) -> Script {
    if normalize::is_hiragana(ch) {
        Script::Hiragana
    } else if normalize::is_katakana(ch) {
        Script::Katakana
    } else if normalize::is_kanji(ch) {
        Script::Kanji
    } else {
        Script::Other
    }
}

fn is_punctuation(ch: char) -> bool {
    (ch as u32) < 0x80 || normalize::is_jp_punct(ch)
}

/// Script-boundary segmenter used when no analyzer is attached.
#[derive(Debug, Default)]
pub struct FallbackSegmenter;

impl FallbackSegmenter {
    fn finish_word(result: &mut Vec<Morpheme>, word: &mut String) {
        if word.is_empty() {
            return;
        }
        let surface = std::mem::take(word);
        let reading = if is_pure_hiragana(&surface) {
            hiragana_to_katakana(&surface)
        } else if is_pure_katakana(&surface) {
            surface.clone()
        } else {
            // Kanji or mixed content: the resolver copes downstream.
            String::new()
        };
        let pos = guess_pos(&surface);
        result.push(Morpheme {
            pronunciation: reading.clone(),
            base_form: surface.clone(),
            surface,
            reading,
            pos,
        });
    }
}

impl MorphologicalAnalyzer for FallbackSegmenter {
    fn parse(&self, text: &str) -> Vec<Morpheme> {
        let mut result = Vec::new();
        let mut current = String::new();
        let mut current_script = Script::Other;

        for ch in text.chars() {
            if is_punctuation(ch) {
                Self::finish_word(&mut result, &mut current);
                if ch.is_whitespace() {
                    continue;
                }
                let surface = ch.to_string();
                result.push(Morpheme {
                    reading: surface.clone(),
                    pronunciation: surface.clone(),
                    base_form: surface.clone(),
                    pos: "symbol".into(),
                    surface,
                });
                continue;
            }

            let script = script_of(ch);
            if script != current_script {
                Self::finish_word(&mut result, &mut current);
            }
            current.push(ch);
            current_script = script;
        }

        Self::finish_word(&mut result, &mut current);
        result
    }
}

fn guess_pos(surface: &str) -> String {
    match surface.chars().next().map(script_of) {
        // Short hiragana runs are most often particles or auxiliaries.
        Some(Script::Hiragana) if surface.chars().count() <= 2 => "particle".into(),
        Some(Script::Hiragana) => "verb".into(),
        Some(Script::Katakana) | Some(Script::Kanji) => "noun".into(),
        _ => "unknown".into(),
    }
}

/// Segmenter facade selecting between an attached analyzer and the
/// script-boundary fallback.
pub struct Segmenter {
    analyzer: Option<Box<dyn MorphologicalAnalyzer>>,
    fallback: FallbackSegmenter,
    normalize: bool,
}

impl Segmenter {
    pub fn new(normalize: bool) -> Self {
        Self {
            analyzer: None,
            fallback: FallbackSegmenter,
            normalize,
        }
    }

    /// Attach an external analyzer. Passing `None` reverts to fallback.
    pub fn set_analyzer(&mut self, analyzer: Option<Box<dyn MorphologicalAnalyzer>>) {
        self.analyzer = analyzer;
    }

    pub fn has_analyzer(&self) -> bool {
        self.analyzer.is_some()
    }

    /// Segment `text` into morphemes, pre-normalizing width if enabled.
    pub fn segment(&self, text: &str) -> Vec<Morpheme> {
        let normalized;
        let input = if self.normalize {
            normalized = normalize::normalize_text(text);
            normalized.as_str()
        } else {
            text
        };

        match &self.analyzer {
            Some(analyzer) => analyzer.parse(input),
            None => self.fallback.parse(input),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surfaces(morphemes: &[Morpheme]) -> Vec<&str> {
        morphemes.iter().map(|m| m.surface.as_str()).collect()
    }

    #[test]
    fn splits_on_script_boundaries() {
        let seg = FallbackSegmenter;
        let morphemes = seg.parse("漢字かなカナ");
        assert_eq!(surfaces(&morphemes), vec!["漢字", "かな", "カナ"]);
    }

    #[test]
    fn hiragana_gets_katakana_reading() {
        let seg = FallbackSegmenter;
        let morphemes = seg.parse("すし");
        assert_eq!(morphemes.len(), 1);
        assert_eq!(morphemes[0].reading, "スシ");
    }

    #[test]
    fn katakana_reading_is_surface() {
        let seg = FallbackSegmenter;
        let morphemes = seg.parse("コーヒー");
        assert_eq!(morphemes.len(), 1);
        assert_eq!(morphemes[0].reading, "コーヒー");
    }

    #[test]
    fn kanji_reading_is_left_empty() {
        let seg = FallbackSegmenter;
        let morphemes = seg.parse("東京");
        assert_eq!(morphemes.len(), 1);
        assert!(morphemes[0].reading.is_empty());
        assert_eq!(morphemes[0].pos, "noun");
    }

    #[test]
    fn each_punctuation_codepoint_is_its_own_morpheme() {
        let seg = FallbackSegmenter;
        let morphemes = seg.parse("はい。。!");
        assert_eq!(surfaces(&morphemes), vec!["はい", "。", "。", "!"]);
        for m in &morphemes[1..] {
            assert_eq!(m.pos, "symbol");
        }
    }

    #[test]
    fn ascii_whitespace_is_dropped() {
        let seg = FallbackSegmenter;
        let morphemes = seg.parse("かな かな");
        assert_eq!(surfaces(&morphemes), vec!["かな", "かな"]);
    }

    #[test]
    fn segmenter_pre_normalizes_width() {
        let seg = Segmenter::new(true);
        let morphemes = seg.segment("かな\u{3000}カナ");
        assert_eq!(surfaces(&morphemes), vec!["かな", "カナ"]);
    }

    #[test]
    fn attached_analyzer_takes_precedence() {
        struct OneToken;
        impl MorphologicalAnalyzer for OneToken {
            fn parse(&self, text: &str) -> Vec<Morpheme> {
                vec![Morpheme {
                    surface: text.to_string(),
                    ..Morpheme::default()
                }]
            }
        }

        let mut seg = Segmenter::new(false);
        seg.set_analyzer(Some(Box::new(OneToken)));
        let morphemes = seg.segment("漢字かな");
        assert_eq!(morphemes.len(), 1);
        assert_eq!(morphemes[0].surface, "漢字かな");
    }
}
