//! Phoneme vocabulary: a bijective symbol ↔ token-id map.
//!
//! Loads from a JSON object (`{"symbol": id}`), a JSON array (implicit
//! positional ids), or a two-column `symbol\tid` text file, and saves back
//! in either format. Four special tokens (pad/unk/bos/eos) are expected at
//! ids 0..3 but may be overridden by the loaded file.

use std::collections::HashMap;
use std::path::Path;

use crate::error::TtsError;

pub const PAD_TOKEN: &str = "<pad>";
pub const UNK_TOKEN: &str = "<unk>";
pub const BOS_TOKEN: &str = "<s>";
pub const EOS_TOKEN: &str = "</s>";

/// Bijective phoneme-symbol ↔ id map.
#[derive(Debug, Clone, Default)]
pub struct Vocabulary {
    symbol_to_id: HashMap<String, i64>,
    id_to_symbol: HashMap<i64, String>,
    next_id: i64,
    pad_id: i64,
    unk_id: i64,
    bos_id: i64,
    eos_id: i64,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self {
            pad_id: 0,
            unk_id: 1,
            bos_id: 2,
            eos_id: 3,
            ..Self::default()
        }
    }

    /// Load a vocabulary file, dispatching on extension: `.json` parses
    /// as an object or array, anything else as two-column text.
    pub fn load(path: &Path) -> Result<Self, TtsError> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| TtsError::FileNotFound(path.display().to_string()))?;

        let mut vocab = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            Self::from_json(&content)?
        } else {
            Self::from_text(&content)?
        };
        vocab.resolve_special_ids();
        log::info!("Loaded vocabulary: {} symbols", vocab.len());
        Ok(vocab)
    }

    /// Parse a JSON vocabulary: `{"symbol": id}`, `["sym0", "sym1", ...]`,
    /// or an object with a `"vocab"` field holding either form.
    pub fn from_json(json_str: &str) -> Result<Self, TtsError> {
        let value: serde_json::Value = serde_json::from_str(json_str)?;
        let body = value.get("vocab").unwrap_or(&value);

        let mut vocab = Self::new();
        match body {
            serde_json::Value::Object(map) => {
                for (symbol, id) in map {
                    let id = id
                        .as_i64()
                        .or_else(|| id.as_str().and_then(|s| s.parse().ok()))
                        .ok_or_else(|| {
                            TtsError::InvalidInput(format!(
                                "non-integer vocab id for symbol {symbol:?}"
                            ))
                        })?;
                    vocab.insert(symbol.clone(), id);
                }
            }
            serde_json::Value::Array(items) => {
                for (id, symbol) in items.iter().enumerate() {
                    let symbol = symbol.as_str().ok_or_else(|| {
                        TtsError::InvalidInput("vocab array entries must be strings".into())
                    })?;
                    vocab.insert(symbol.to_string(), id as i64);
                }
            }
            _ => {
                return Err(TtsError::InvalidInput(
                    "vocab JSON must be an object or array".into(),
                ))
            }
        }
        vocab.resolve_special_ids();
        Ok(vocab)
    }

    /// Parse two-column text: `symbol<tab-or-space>id`, one per line.
    /// Lines without an id column get sequential ids. `#` starts a comment.
    pub fn from_text(text: &str) -> Result<Self, TtsError> {
        let mut vocab = Self::new();
        let mut sequential = 0i64;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let symbol = parts.next().unwrap_or_default();
            match parts.next().and_then(|s| s.parse::<i64>().ok()) {
                Some(id) => vocab.insert(symbol.to_string(), id),
                None => {
                    vocab.insert(line.to_string(), sequential);
                    sequential += 1;
                }
            }
        }

        if vocab.symbol_to_id.is_empty() {
            return Err(TtsError::InvalidInput("empty vocabulary file".into()));
        }
        vocab.resolve_special_ids();
        Ok(vocab)
    }

    /// Build a vocabulary from a corpus of space-separated phoneme strings:
    /// special tokens at 0..3, then sorted-unique symbols.
    pub fn build_from_phonemes<S: AsRef<str>>(corpus: &[S]) -> Self {
        let mut vocab = Self::new();
        vocab.insert(PAD_TOKEN.to_string(), 0);
        vocab.insert(UNK_TOKEN.to_string(), 1);
        vocab.insert(BOS_TOKEN.to_string(), 2);
        vocab.insert(EOS_TOKEN.to_string(), 3);

        let mut symbols: Vec<&str> = corpus
            .iter()
            .flat_map(|s| s.as_ref().split_whitespace())
            .filter(|s| !s.is_empty())
            .collect();
        symbols.sort_unstable();
        symbols.dedup();

        for symbol in symbols {
            if !vocab.contains(symbol) {
                vocab.add_symbol(symbol);
            }
        }
        vocab
    }

    fn insert(&mut self, symbol: String, id: i64) {
        self.id_to_symbol.insert(id, symbol.clone());
        self.symbol_to_id.insert(symbol, id);
        self.next_id = self.next_id.max(id + 1);
    }

    fn resolve_special_ids(&mut self) {
        self.pad_id = self.symbol_to_id.get(PAD_TOKEN).copied().unwrap_or(0);
        self.unk_id = self.symbol_to_id.get(UNK_TOKEN).copied().unwrap_or(1);
        self.bos_id = self.symbol_to_id.get(BOS_TOKEN).copied().unwrap_or(2);
        self.eos_id = self.symbol_to_id.get(EOS_TOKEN).copied().unwrap_or(3);
    }

    /// Add an unknown symbol, assigning the next free id. Returns the id
    /// (existing or new).
    pub fn add_symbol(&mut self, symbol: &str) -> i64 {
        if let Some(&id) = self.symbol_to_id.get(symbol) {
            return id;
        }
        let id = self.next_id;
        self.insert(symbol.to_string(), id);
        id
    }

    /// Id of `symbol`, or the unknown id when absent.
    pub fn id_of(&self, symbol: &str) -> i64 {
        self.symbol_to_id.get(symbol).copied().unwrap_or(self.unk_id)
    }

    /// Symbol for `id`, or empty when absent.
    pub fn symbol_of(&self, id: i64) -> &str {
        self.id_to_symbol.get(&id).map(String::as_str).unwrap_or("")
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbol_to_id.contains_key(symbol)
    }

    pub fn len(&self) -> usize {
        self.symbol_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbol_to_id.is_empty()
    }

    pub fn pad_id(&self) -> i64 {
        self.pad_id
    }

    pub fn unk_id(&self) -> i64 {
        self.unk_id
    }

    pub fn bos_id(&self) -> i64 {
        self.bos_id
    }

    pub fn eos_id(&self) -> i64 {
        self.eos_id
    }

    /// Map a space-separated phoneme string to ids. Unknown symbols map
    /// to the unknown id.
    pub fn tokenize(&self, phonemes: &str) -> Vec<i64> {
        phonemes
            .split_whitespace()
            .map(|symbol| self.id_of(symbol))
            .collect()
    }

    /// Tokenize and bracket with BOS/EOS.
    pub fn tokenize_with_specials(&self, phonemes: &str) -> Vec<i64> {
        let mut ids = Vec::with_capacity(phonemes.len() / 2 + 2);
        ids.push(self.bos_id);
        ids.extend(self.tokenize(phonemes));
        ids.push(self.eos_id);
        ids
    }

    /// Reverse tokenization, skipping special tokens and unknown ids.
    pub fn detokenize(&self, ids: &[i64]) -> String {
        let mut symbols = Vec::with_capacity(ids.len());
        for &id in ids {
            if id == self.pad_id || id == self.bos_id || id == self.eos_id || id == self.unk_id {
                continue;
            }
            let symbol = self.symbol_of(id);
            if !symbol.is_empty() {
                symbols.push(symbol);
            }
        }
        symbols.join(" ")
    }

    /// Pad every sequence in the batch to a common length with the pad id,
    /// truncating sequences longer than `max_length` when it is non-zero.
    pub fn pad_batch(&self, batch: &[Vec<i64>], max_length: usize) -> Vec<Vec<i64>> {
        let longest = batch.iter().map(Vec::len).max().unwrap_or(0);
        let target = if max_length > 0 {
            longest.min(max_length)
        } else {
            longest
        };

        batch
            .iter()
            .map(|tokens| {
                let mut padded: Vec<i64> = tokens.iter().copied().take(target).collect();
                padded.resize(target, self.pad_id);
                padded
            })
            .collect()
    }

    /// Save the vocabulary: `.json` writes an object, anything else writes
    /// two-column text in id order.
    pub fn save(&self, path: &Path) -> Result<(), TtsError> {
        let content = if path.extension().and_then(|e| e.to_str()) == Some("json") {
            let map: serde_json::Map<String, serde_json::Value> = self
                .symbol_to_id
                .iter()
                .map(|(symbol, &id)| (symbol.clone(), serde_json::Value::from(id)))
                .collect();
            serde_json::to_string_pretty(&serde_json::Value::Object(map))?
        } else {
            let mut rows: Vec<(i64, &str)> = self
                .id_to_symbol
                .iter()
                .map(|(&id, symbol)| (id, symbol.as_str()))
                .collect();
            rows.sort_unstable();
            let mut out = String::new();
            for (id, symbol) in rows {
                out.push_str(symbol);
                out.push('\t');
                out.push_str(&id.to_string());
                out.push('\n');
            }
            out
        };
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vocabulary {
        Vocabulary::build_from_phonemes(&["k a", "k i", "ʃ i", "N", "q"])
    }

    #[test]
    fn specials_occupy_first_four_ids() {
        let vocab = sample();
        assert_eq!(vocab.id_of(PAD_TOKEN), 0);
        assert_eq!(vocab.id_of(UNK_TOKEN), 1);
        assert_eq!(vocab.id_of(BOS_TOKEN), 2);
        assert_eq!(vocab.id_of(EOS_TOKEN), 3);
    }

    #[test]
    fn corpus_symbols_are_sorted_unique() {
        let vocab = sample();
        // 4 specials + {N, a, i, k, q, ʃ}
        assert_eq!(vocab.len(), 10);
        assert!(vocab.contains("ʃ"));
        assert!(vocab.id_of("N") >= 4);
    }

    #[test]
    fn unknown_symbol_maps_to_unk() {
        let vocab = sample();
        assert_eq!(vocab.id_of("xyz"), vocab.unk_id());
    }

    #[test]
    fn symbol_of_id_of_is_identity_for_known_symbols() {
        let vocab = sample();
        for symbol in ["k", "a", "i", "N", "q", "ʃ"] {
            assert_eq!(vocab.symbol_of(vocab.id_of(symbol)), symbol);
        }
        assert_eq!(vocab.symbol_of(9999), "");
    }

    #[test]
    fn add_symbol_assigns_next_free_id() {
        let mut vocab = sample();
        let before = vocab.len() as i64;
        let id = vocab.add_symbol("gy");
        assert_eq!(id, before);
        assert_eq!(vocab.add_symbol("gy"), id);
    }

    #[test]
    fn tokenize_brackets_with_specials() {
        let vocab = sample();
        let ids = vocab.tokenize_with_specials("k a");
        assert_eq!(ids.first(), Some(&vocab.bos_id()));
        assert_eq!(ids.last(), Some(&vocab.eos_id()));
        assert_eq!(ids.len(), 4);
    }

    #[test]
    fn detokenize_skips_specials() {
        let vocab = sample();
        let ids = vocab.tokenize_with_specials("k a N");
        assert_eq!(vocab.detokenize(&ids), "k a N");
    }

    #[test]
    fn json_object_and_array_forms_load() {
        let obj = Vocabulary::from_json(r#"{"<pad>":0,"<unk>":1,"<s>":2,"</s>":3,"a":4}"#).unwrap();
        assert_eq!(obj.id_of("a"), 4);

        let arr = Vocabulary::from_json(r#"["<pad>","<unk>","<s>","</s>","a"]"#).unwrap();
        assert_eq!(arr.id_of("a"), 4);

        let nested =
            Vocabulary::from_json(r#"{"vocab":{"<pad>":0,"<unk>":1,"<s>":2,"</s>":3,"o":7}}"#)
                .unwrap();
        assert_eq!(nested.id_of("o"), 7);
        assert_eq!(nested.id_of("missing"), 1);
    }

    #[test]
    fn text_form_loads_with_and_without_ids() {
        let with_ids = Vocabulary::from_text("# comment\n<pad>\t0\n<unk>\t1\na\t4\n").unwrap();
        assert_eq!(with_ids.id_of("a"), 4);

        let bare = Vocabulary::from_text("<pad>\n<unk>\n<s>\n</s>\nka\n").unwrap();
        assert_eq!(bare.id_of("ka"), 4);
    }

    #[test]
    fn save_load_round_trip_preserves_every_pair() {
        let vocab = sample();
        let dir = tempfile::tempdir().unwrap();

        for name in ["vocab.json", "vocab.txt"] {
            let path = dir.path().join(name);
            vocab.save(&path).unwrap();
            let loaded = Vocabulary::load(&path).unwrap();
            assert_eq!(loaded.len(), vocab.len());
            for id in 0..vocab.len() as i64 {
                assert_eq!(loaded.symbol_of(id), vocab.symbol_of(id), "id {id}");
            }
            assert_eq!(loaded.unk_id(), vocab.unk_id());
        }
    }

    #[test]
    fn pad_batch_aligns_lengths() {
        let vocab = sample();
        let batch = vec![vec![4, 5], vec![4, 5, 6, 7]];
        let padded = vocab.pad_batch(&batch, 0);
        assert_eq!(padded[0], vec![4, 5, vocab.pad_id(), vocab.pad_id()]);
        assert_eq!(padded[1], vec![4, 5, 6, 7]);

        let clipped = vocab.pad_batch(&batch, 3);
        assert_eq!(clipped[0].len(), 3);
        assert_eq!(clipped[1], vec![4, 5, 6]);
    }
}
