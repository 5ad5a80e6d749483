//! Grapheme-to-phoneme resolution.
//!
//! Each morpheme runs through an ordered cascade of [`PhonemeSource`]
//! strategies: the pronunciation dictionary (reading-conditioned, then
//! flat), the neural fallback model, and finally the kana rewrite rules
//! applied to the reading or the raw surface. The first source with an
//! answer wins; every step is best-effort and an empty input is the only
//! hard failure (it yields empty output).

pub mod dictionary;
pub mod kana;
pub mod neural;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::g2p::dictionary::PhonemeDictionary;
use crate::g2p::neural::NeuralG2p;
use crate::text::segment::Morpheme;

/// Which cascade stage produced a resolution, for statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Dictionary,
    Neural,
    Kana,
}

/// One G2P strategy: resolve a morpheme to space-separated phonemes, or
/// pass. `surrounding` is the full text for context disambiguation.
pub trait PhonemeSource: Send + Sync {
    fn kind(&self) -> SourceKind;
    fn resolve(&self, morpheme: &Morpheme, surrounding: &str) -> Option<String>;
}

/// Dictionary stage: reading-conditioned variants first, then the flat
/// table.
struct DictionarySource {
    dict: Arc<RwLock<PhonemeDictionary>>,
}

impl PhonemeSource for DictionarySource {
    fn kind(&self) -> SourceKind {
        SourceKind::Dictionary
    }

    fn resolve(&self, morpheme: &Morpheme, surrounding: &str) -> Option<String> {
        let dict = self.dict.read().unwrap_or_else(|e| e.into_inner());
        if let Some(phonemes) = dict.lookup_with_reading(
            &morpheme.surface,
            &morpheme.reading,
            &morpheme.pos,
            surrounding,
        ) {
            return Some(phonemes.to_string());
        }
        dict.lookup(&morpheme.surface).map(str::to_string)
    }
}

/// Neural stage: character-level model on the surface form.
struct NeuralSource {
    model: NeuralG2p,
}

impl PhonemeSource for NeuralSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Neural
    }

    fn resolve(&self, morpheme: &Morpheme, _surrounding: &str) -> Option<String> {
        let phonemes = self.model.phonemize(&morpheme.surface);
        if phonemes.is_empty() {
            None
        } else {
            Some(phonemes)
        }
    }
}

/// Rule stage: transliterate the reading when present, the surface
/// otherwise. As the cascade's floor it always answers for non-empty
/// input; unknown codepoints pass through for the tokenizer to map to
/// the unknown id.
struct KanaSource;

impl PhonemeSource for KanaSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Kana
    }

    fn resolve(&self, morpheme: &Morpheme, _surrounding: &str) -> Option<String> {
        let phonemes = if !morpheme.reading.is_empty() {
            kana::transliterate(&morpheme.reading)
        } else {
            kana::transliterate(&morpheme.surface)
        };
        if phonemes.is_empty() {
            None
        } else {
            Some(phonemes)
        }
    }
}

/// Resolver counters exposed as statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct G2pStats {
    pub dictionary_hits: usize,
    pub neural_fallbacks: usize,
    pub total_morphemes: usize,
}

/// The ordered cascade over all configured strategies.
pub struct G2pResolver {
    sources: Vec<Box<dyn PhonemeSource>>,
    dictionary: Arc<RwLock<PhonemeDictionary>>,
    dictionary_hits: AtomicUsize,
    neural_fallbacks: AtomicUsize,
    total_morphemes: AtomicUsize,
}

impl G2pResolver {
    /// Build the cascade. The dictionary is always consulted first (an
    /// empty dictionary simply never answers); the neural stage is
    /// optional; the kana rules are the floor.
    pub fn new(dictionary: PhonemeDictionary, neural: Option<NeuralG2p>) -> Self {
        let dictionary = Arc::new(RwLock::new(dictionary));
        let mut sources: Vec<Box<dyn PhonemeSource>> = vec![Box::new(DictionarySource {
            dict: Arc::clone(&dictionary),
        })];
        if let Some(model) = neural {
            sources.push(Box::new(NeuralSource { model }));
        }
        sources.push(Box::new(KanaSource));

        Self {
            sources,
            dictionary,
            dictionary_hits: AtomicUsize::new(0),
            neural_fallbacks: AtomicUsize::new(0),
            total_morphemes: AtomicUsize::new(0),
        }
    }

    /// Shared handle to the dictionary for runtime additions and export.
    pub fn dictionary(&self) -> Arc<RwLock<PhonemeDictionary>> {
        Arc::clone(&self.dictionary)
    }

    /// Resolve one morpheme through the cascade.
    pub fn resolve_morpheme(&self, morpheme: &Morpheme, surrounding: &str) -> String {
        self.total_morphemes.fetch_add(1, Ordering::Relaxed);

        for source in &self.sources {
            if let Some(phonemes) = source.resolve(morpheme, surrounding) {
                match source.kind() {
                    SourceKind::Dictionary => {
                        self.dictionary_hits.fetch_add(1, Ordering::Relaxed);
                    }
                    SourceKind::Neural => {
                        self.neural_fallbacks.fetch_add(1, Ordering::Relaxed);
                    }
                    SourceKind::Kana => {}
                }
                return phonemes;
            }
        }
        String::new()
    }

    /// Resolve a morpheme sequence and post-process the joined result.
    pub fn resolve(&self, morphemes: &[Morpheme], surrounding: &str) -> String {
        let parts: Vec<String> = morphemes
            .iter()
            .map(|m| self.resolve_morpheme(m, surrounding))
            .filter(|p| !p.is_empty())
            .collect();
        post_process(&parts.join(" "))
    }

    pub fn stats(&self) -> G2pStats {
        G2pStats {
            dictionary_hits: self.dictionary_hits.load(Ordering::Relaxed),
            neural_fallbacks: self.neural_fallbacks.load(Ordering::Relaxed),
            total_morphemes: self.total_morphemes.load(Ordering::Relaxed),
        }
    }

    pub fn reset_stats(&self) {
        self.dictionary_hits.store(0, Ordering::Relaxed);
        self.neural_fallbacks.store(0, Ordering::Relaxed);
        self.total_morphemes.store(0, Ordering::Relaxed);
    }
}

/// Collapse space runs, trim, and realize geminates: a `q` marker followed
/// by a k/s/t/p/h-initial phoneme doubles that consonant.
pub fn post_process(phonemes: &str) -> String {
    let tokens: Vec<&str> = phonemes.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(tokens.len());

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        if token == "q" {
            if let Some(next) = tokens.get(i + 1) {
                let first = next.chars().next().unwrap_or(' ');
                if matches!(first, 'k' | 's' | 't' | 'p' | 'h') {
                    out.push(format!("{first}{next}"));
                    i += 2;
                    continue;
                }
            }
        }
        out.push(token.to_string());
        i += 1;
    }

    out.join(" ")
}
