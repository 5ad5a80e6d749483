//! Neural grapheme-to-phoneme fallback.
//!
//! Surfaces the dictionary cannot resolve (rare kanji compounds, proper
//! nouns) go through a small seq2seq ONNX model: characters are encoded
//! as integer ids over a character vocabulary, bracketed with BOS/EOS and
//! padded to the model's input length, and the integer output is decoded
//! through an id → phoneme map.
//!
//! Both vocabularies load from a JSON artifact shipped next to the model
//! (`{"char_vocab": {...}, "phoneme_vocab": {...}}`). Built-in tables
//! covering the kana ranges, common kanji, and ASCII exist as a fallback
//! for models trained with the historical layout, and their use is logged.

use std::collections::HashMap;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::Deserialize;

use crate::error::TtsError;
use crate::session::{GraphOptions, InferenceGraph, OrtGraph, TensorData, TensorInput};

const PAD_ID: i64 = 0;
const UNK_ID: i64 = 1;
const BOS_ID: i64 = 2;
const EOS_ID: i64 = 3;

const DEFAULT_MAX_INPUT_LEN: usize = 128;

#[derive(Debug, Deserialize)]
struct VocabArtifact {
    char_vocab: HashMap<String, i64>,
    phoneme_vocab: HashMap<String, String>,
    #[serde(default)]
    max_input_length: Option<usize>,
}

/// Built-in character vocabulary: kana ranges, a handful of common kanji,
/// printable ASCII, and Japanese punctuation, in the historical id layout.
static BUILTIN_CHAR_VOCAB: Lazy<HashMap<char, i64>> = Lazy::new(|| {
    let mut map = HashMap::new();
    let mut id = 4i64;
    let push = |ch: char, map: &mut HashMap<char, i64>, id: &mut i64| {
        map.entry(ch).or_insert(*id);
        *id += 1;
    };

    for cp in 0x3042u32..=0x3093 {
        if let Some(ch) = char::from_u32(cp) {
            push(ch, &mut map, &mut id);
        }
    }
    for cp in 0x30A2u32..=0x30F3 {
        if let Some(ch) = char::from_u32(cp) {
            push(ch, &mut map, &mut id);
        }
    }
    for ch in "一二三四五六七八九十百千万円時日月年".chars() {
        push(ch, &mut map, &mut id);
    }
    for cp in 0x20u32..=0x7E {
        if let Some(ch) = char::from_u32(cp) {
            push(ch, &mut map, &mut id);
        }
    }
    for ch in "。、！？「」『』（）・ー".chars() {
        push(ch, &mut map, &mut id);
    }
    map
});

/// Built-in id → phoneme table matching the historical phonemizer head.
static BUILTIN_PHONEME_VOCAB: Lazy<HashMap<i64, String>> = Lazy::new(|| {
    const PHONEMES: &[&str] = &[
        "a", "i", "u", "e", "o", "k a", "k i", "k u", "k e", "k o", "g a", "g i", "g u", "g e",
        "g o", "s a", "ʃ i", "s u", "s e", "s o", "z a", "dʒ i", "z u", "z e", "z o", "t a",
        "tɕ i", "ts u", "t e", "t o", "d a", "d e", "d o", "n a", "n i", "n u", "n e", "n o",
        "h a", "h i", "f u", "h e", "h o", "b a", "b i", "b u", "b e", "b o", "p a", "p i",
        "p u", "p e", "p o", "m a", "m i", "m u", "m e", "m o", "y a", "y u", "y o", "r a",
        "r i", "r u", "r e", "r o", "w a", "o", "N", "ky a", "ky u", "ky o", "gy a", "gy u",
        "gy o", "ʃ a", "ʃ u", "ʃ o", "dʒ a", "dʒ u", "dʒ o", "tɕ a", "tɕ u", "tɕ o", "ɲ a",
        "ɲ u", "ɲ o", "hy a", "hy u", "hy o", "by a", "by u", "by o", "py a", "py u", "py o",
        "my a", "my u", "my o", "ry a", "ry u", "ry o", "q", ":", ".", ",", "!", "?",
    ];
    PHONEMES
        .iter()
        .enumerate()
        .map(|(i, &p)| (i as i64 + 4, p.to_string()))
        .collect()
});

/// ONNX-backed G2P model with its character and phoneme vocabularies.
pub struct NeuralG2p {
    graph: Box<dyn InferenceGraph>,
    char_vocab: HashMap<char, i64>,
    phoneme_vocab: HashMap<i64, String>,
    max_input_len: usize,
}

impl NeuralG2p {
    /// Load the phonemizer model and its vocabulary artifact.
    ///
    /// `vocab_path` of `None` derives `<model-stem>.vocab.json` from the
    /// model path; a missing artifact falls back to the built-in tables.
    pub fn load(
        model_path: &Path,
        vocab_path: Option<&Path>,
        options: GraphOptions,
    ) -> Result<Self, TtsError> {
        let graph = OrtGraph::load(model_path, options)?;
        let derived = model_path.with_extension("vocab.json");
        let artifact_path = vocab_path.unwrap_or(&derived);
        Ok(Self::from_graph(
            Box::new(graph),
            Self::load_artifact(artifact_path),
        ))
    }

    /// Wrap an already-loaded graph. `artifact` of `None` selects the
    /// built-in vocabularies.
    pub fn from_graph(
        graph: Box<dyn InferenceGraph>,
        artifact: Option<(HashMap<char, i64>, HashMap<i64, String>, usize)>,
    ) -> Self {
        let (char_vocab, phoneme_vocab, max_input_len) = match artifact {
            Some(loaded) => loaded,
            None => {
                log::warn!(
                    "phonemizer vocabulary artifact missing; using built-in tables, \
                     which must match the model's training layout"
                );
                (
                    BUILTIN_CHAR_VOCAB.clone(),
                    BUILTIN_PHONEME_VOCAB.clone(),
                    DEFAULT_MAX_INPUT_LEN,
                )
            }
        };
        Self {
            graph,
            char_vocab,
            phoneme_vocab,
            max_input_len,
        }
    }

    fn load_artifact(path: &Path) -> Option<(HashMap<char, i64>, HashMap<i64, String>, usize)> {
        let content = std::fs::read_to_string(path).ok()?;
        let artifact: VocabArtifact = match serde_json::from_str(&content) {
            Ok(artifact) => artifact,
            Err(err) => {
                log::warn!("failed to parse phonemizer vocab {}: {err}", path.display());
                return None;
            }
        };
        let char_vocab = artifact
            .char_vocab
            .iter()
            .filter_map(|(k, &v)| k.chars().next().map(|ch| (ch, v)))
            .collect();
        let phoneme_vocab = artifact
            .phoneme_vocab
            .iter()
            .filter_map(|(k, v)| k.parse::<i64>().ok().map(|id| (id, v.clone())))
            .collect();
        log::info!("Loaded phonemizer vocabularies from {}", path.display());
        Some((
            char_vocab,
            phoneme_vocab,
            artifact.max_input_length.unwrap_or(DEFAULT_MAX_INPUT_LEN),
        ))
    }

    /// Encode text as padded character ids: BOS, chars, EOS, PAD…
    fn encode(&self, text: &str) -> Vec<i64> {
        let mut ids = Vec::with_capacity(self.max_input_len);
        ids.push(BOS_ID);
        for ch in text.chars() {
            ids.push(self.char_vocab.get(&ch).copied().unwrap_or(UNK_ID));
        }
        ids.push(EOS_ID);

        if ids.len() > self.max_input_len {
            ids.truncate(self.max_input_len);
            ids[self.max_input_len - 1] = EOS_ID;
        } else {
            ids.resize(self.max_input_len, PAD_ID);
        }
        ids
    }

    /// Decode model output ids to a space-joined phoneme string.
    fn decode(&self, ids: &[i64]) -> String {
        let mut phonemes = Vec::new();
        for &id in ids {
            if id == EOS_ID {
                break;
            }
            if id == PAD_ID || id == BOS_ID || id == UNK_ID {
                continue;
            }
            if let Some(symbol) = self.phoneme_vocab.get(&id) {
                if !symbol.is_empty() {
                    phonemes.push(symbol.as_str());
                }
            }
        }
        phonemes.join(" ")
    }

    /// Run the model on one surface form. Empty output signals failure
    /// and lets the cascade continue.
    pub fn phonemize(&self, text: &str) -> String {
        if text.is_empty() {
            return String::new();
        }

        let input_name = self
            .graph
            .input_info()
            .first()
            .map(|info| info.name.clone())
            .unwrap_or_else(|| "input_ids".to_string());
        let encoded = self.encode(text);
        let input = TensorInput::i64(input_name, vec![1, encoded.len()], encoded);

        match self.graph.run(&[input]) {
            Ok(TensorData::I64(ids)) => self.decode(&ids),
            Ok(TensorData::F32(_)) => {
                log::warn!("phonemizer graph returned float output; expected ids");
                String::new()
            }
            Err(err) => {
                log::warn!("neural phonemization failed for {text:?}: {err}");
                String::new()
            }
        }
    }
}
