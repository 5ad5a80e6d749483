//! Pronunciation dictionary with reading/POS/context disambiguation.
//!
//! Two tables back the lookup: a flat `word → phonemes` map and a table of
//! reading-conditioned variants for words whose pronunciation depends on
//! context (e.g. 今日 as キョウ vs コンニチ). The JSON format accepts a
//! plain object, an `{"entries": ...}` / `{"dictionary": ...}` wrapper, or
//! an array of entry objects.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};

use crate::error::TtsError;

/// One reading-conditioned pronunciation variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingEntry {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reading: String,
    pub phonemes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub pos: String,
    /// Substring that must appear in the surrounding text for this
    /// variant to apply.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

/// Dictionary lookup statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DictionaryStats {
    pub total_entries: usize,
    pub words_with_readings: usize,
    pub lookup_hits: usize,
    pub lookup_misses: usize,
}

#[derive(Debug, Default)]
pub struct PhonemeDictionary {
    scalar: HashMap<String, String>,
    readings: HashMap<String, Vec<ReadingEntry>>,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl PhonemeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, TtsError> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| TtsError::FileNotFound(path.display().to_string()))?;
        let dict = Self::from_json(&content)?;
        log::info!(
            "Loaded dictionary: {} words, {} with reading variants",
            dict.scalar.len(),
            dict.readings.len()
        );
        Ok(dict)
    }

    pub fn from_json(json_str: &str) -> Result<Self, TtsError> {
        let value: serde_json::Value = serde_json::from_str(json_str)?;
        let body = value
            .get("dictionary")
            .or_else(|| value.get("entries"))
            .unwrap_or(&value);

        let mut dict = Self::new();
        match body {
            serde_json::Value::Object(map) => {
                for (word, entry) in map {
                    dict.load_entry(word, entry)?;
                }
            }
            serde_json::Value::Array(items) => {
                for item in items {
                    let word = item
                        .get("word")
                        .and_then(|w| w.as_str())
                        .ok_or_else(|| {
                            TtsError::InvalidInput("dictionary array entry without word".into())
                        })?
                        .to_string();
                    dict.load_entry(&word, item)?;
                }
            }
            _ => {
                return Err(TtsError::InvalidInput(
                    "dictionary JSON must be an object or array".into(),
                ))
            }
        }

        // Reading tables may live in a sibling section of the wrapper.
        if let Some(serde_json::Value::Object(map)) = value.get("readings") {
            for (word, variants) in map {
                let entries: Vec<ReadingEntry> = serde_json::from_value(variants.clone())?;
                dict.readings.entry(word.clone()).or_default().extend(entries);
            }
        }
        Ok(dict)
    }

    fn load_entry(&mut self, word: &str, entry: &serde_json::Value) -> Result<(), TtsError> {
        match entry {
            serde_json::Value::String(phonemes) => {
                self.scalar.insert(word.to_string(), phonemes.clone());
            }
            serde_json::Value::Object(_) => {
                if let Some(phonemes) = entry.get("phonemes").and_then(|p| p.as_str()) {
                    self.scalar.insert(word.to_string(), phonemes.to_string());
                }
                if let Some(reading) = entry.get("reading").and_then(|r| r.as_str()) {
                    let phonemes = entry
                        .get("phonemes")
                        .and_then(|p| p.as_str())
                        .unwrap_or_default();
                    self.readings.entry(word.to_string()).or_default().push(ReadingEntry {
                        reading: reading.to_string(),
                        phonemes: phonemes.to_string(),
                        pos: entry
                            .get("pos")
                            .and_then(|p| p.as_str())
                            .unwrap_or_default()
                            .to_string(),
                        context: entry
                            .get("context")
                            .and_then(|c| c.as_str())
                            .unwrap_or_default()
                            .to_string(),
                    });
                }
                if let Some(serde_json::Value::Array(variants)) = entry.get("readings") {
                    for variant in variants {
                        let parsed: ReadingEntry = serde_json::from_value(variant.clone())?;
                        self.readings.entry(word.to_string()).or_default().push(parsed);
                    }
                }
            }
            serde_json::Value::Array(variants) => {
                // Multiple variants; the first string becomes the scalar
                // default.
                for (i, variant) in variants.iter().enumerate() {
                    match variant {
                        serde_json::Value::String(phonemes) => {
                            if i == 0 {
                                self.scalar.insert(word.to_string(), phonemes.clone());
                            }
                            self.readings.entry(word.to_string()).or_default().push(
                                ReadingEntry {
                                    phonemes: phonemes.clone(),
                                    ..ReadingEntry::default()
                                },
                            );
                        }
                        serde_json::Value::Object(_) => self.load_entry(word, variant)?,
                        _ => {
                            return Err(TtsError::InvalidInput(format!(
                                "unsupported dictionary variant for {word:?}"
                            )))
                        }
                    }
                }
            }
            _ => {
                return Err(TtsError::InvalidInput(format!(
                    "unsupported dictionary entry for {word:?}"
                )))
            }
        }
        Ok(())
    }

    /// Flat lookup with a case-insensitive fallback for Latin entries.
    pub fn lookup(&self, word: &str) -> Option<&str> {
        let found = self
            .scalar
            .get(word)
            .or_else(|| self.scalar.get(word.to_lowercase().as_str()));
        match found {
            Some(phonemes) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(phonemes.as_str())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Disambiguated lookup against the reading table.
    ///
    /// Returns the first variant whose reading matches (or is empty), whose
    /// POS matches (or is empty), and whose context substring appears in
    /// `surrounding` (or is empty). When variants exist but none
    /// disambiguates, the first variant wins.
    pub fn lookup_with_reading(
        &self,
        word: &str,
        reading: &str,
        pos: &str,
        surrounding: &str,
    ) -> Option<&str> {
        let variants = self.readings.get(word)?;

        let chosen = variants
            .iter()
            .find(|entry| {
                let reading_ok = entry.reading.is_empty() || entry.reading == reading;
                let pos_ok = entry.pos.is_empty() || pos.is_empty() || entry.pos == pos;
                let context_ok = entry.context.is_empty() || surrounding.contains(&entry.context);
                reading_ok && pos_ok && context_ok
            })
            .or_else(|| variants.first())?;

        if chosen.phonemes.is_empty() {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        }
        self.hits.fetch_add(1, Ordering::Relaxed);
        Some(chosen.phonemes.as_str())
    }

    pub fn contains(&self, word: &str) -> bool {
        self.scalar.contains_key(word) || self.readings.contains_key(word)
    }

    /// Add or replace a flat entry at runtime.
    pub fn add_word(&mut self, word: impl Into<String>, phonemes: impl Into<String>) {
        self.scalar.insert(word.into(), phonemes.into());
    }

    /// Add a reading-conditioned variant. The word also becomes a flat
    /// entry when it has none yet.
    pub fn add_reading_entry(&mut self, word: impl Into<String>, entry: ReadingEntry) {
        let word = word.into();
        if !self.scalar.contains_key(&word) && !entry.phonemes.is_empty() {
            self.scalar.insert(word.clone(), entry.phonemes.clone());
        }
        self.readings.entry(word).or_default().push(entry);
    }

    pub fn len(&self) -> usize {
        self.scalar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scalar.is_empty() && self.readings.is_empty()
    }

    pub fn stats(&self) -> DictionaryStats {
        DictionaryStats {
            total_entries: self.scalar.len(),
            words_with_readings: self.readings.len(),
            lookup_hits: self.hits.load(Ordering::Relaxed),
            lookup_misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Snapshot the dictionary to JSON: `dictionary` and `readings`
    /// sections plus a `metadata` block.
    pub fn save(&self, path: &Path) -> Result<(), TtsError> {
        let mut root = serde_json::Map::new();

        let dict: serde_json::Map<String, serde_json::Value> = self
            .scalar
            .iter()
            .map(|(word, phonemes)| (word.clone(), serde_json::Value::from(phonemes.clone())))
            .collect();
        root.insert("dictionary".into(), serde_json::Value::Object(dict));

        if !self.readings.is_empty() {
            let readings = serde_json::to_value(&self.readings)?;
            root.insert("readings".into(), readings);
        }

        root.insert(
            "metadata".into(),
            serde_json::json!({
                "total_entries": self.scalar.len(),
                "words_with_readings": self.readings.len(),
            }),
        );

        std::fs::write(
            path,
            serde_json::to_string_pretty(&serde_json::Value::Object(root))?,
        )?;
        Ok(())
    }
}
