//! Request, result, and status types shared across the pipeline.

use serde::{Deserialize, Serialize};

use crate::audio::AudioBuffer;

/// Outcome of a synthesis operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Ok,
    InvalidInput,
    FileNotFound,
    NotInitialized,
    InitializationFailed,
    ModelNotLoaded,
    InferenceFailed,
    VoiceNotFound,
    Cancelled,
    Timeout,
    Unknown,
}

/// Voice gender tag carried in voice descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoiceGender {
    Male,
    Female,
    #[default]
    Neutral,
}

/// Request priority. Present in the schema for forward compatibility;
/// the submission queue is strictly FIFO and does not consult it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// A single synthesis request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsRequest {
    /// Input text (Japanese).
    pub text: String,
    /// Voice to use. Empty selects the registry default.
    pub voice_id: String,
    /// Speaking speed multiplier, 0.5–2.0.
    pub speed: f32,
    /// Pitch multiplier, 0.5–2.0.
    pub pitch: f32,
    /// Output volume, 0.0–1.0.
    pub volume: f32,
    pub priority: Priority,
    /// Pre-computed space-separated IPA phonemes. When set, G2P is skipped.
    pub phonemes: Option<String>,
    pub use_cache: bool,
    pub normalize_text: bool,
}

impl Default for TtsRequest {
    fn default() -> Self {
        Self {
            text: String::new(),
            voice_id: String::new(),
            speed: 1.0,
            pitch: 1.0,
            volume: 1.0,
            priority: Priority::Normal,
            phonemes: None,
            use_cache: true,
            normalize_text: true,
        }
    }
}

impl TtsRequest {
    /// Build a request for `text` with default parameters.
    pub fn new(text: impl Into<String>, voice_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice_id: voice_id.into(),
            ..Self::default()
        }
    }
}

/// One resolved phoneme with its position in the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhonemeSpan {
    pub symbol: String,
    pub position: usize,
}

/// Per-request stage timing and size counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub total_ms: u64,
    pub phonemization_ms: u64,
    pub tokenization_ms: u64,
    pub inference_ms: u64,
    pub audio_processing_ms: u64,
    pub text_length: usize,
    pub phoneme_count: usize,
    pub token_count: usize,
    pub audio_samples: usize,
    pub cache_hit: bool,
}

/// Result of one synthesis, successful or not.
///
/// A failed synthesis carries `status != Status::Ok`, an empty sample
/// buffer, and a human-readable `error_message`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsResult {
    pub status: Status,
    pub audio: AudioBuffer,
    pub phonemes: Vec<PhonemeSpan>,
    pub token_ids: Vec<i64>,
    pub stats: ProcessingStats,
    pub error_message: String,
}

impl TtsResult {
    pub fn failure(status: Status, message: impl Into<String>) -> Self {
        Self {
            status,
            audio: AudioBuffer::default(),
            phonemes: Vec::new(),
            token_ids: Vec::new(),
            stats: ProcessingStats::default(),
            error_message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn has_audio(&self) -> bool {
        !self.audio.samples.is_empty()
    }

    /// Approximate heap footprint, used for cache accounting.
    pub(crate) fn memory_footprint(&self) -> usize {
        const ENTRY_OVERHEAD: usize = 256;
        let phoneme_bytes: usize = self
            .phonemes
            .iter()
            .map(|p| p.symbol.len() + std::mem::size_of::<PhonemeSpan>())
            .sum();
        self.audio.samples.len() * 4
            + phoneme_bytes
            + self.token_ids.len() * 8
            + self.error_message.len()
            + ENTRY_OVERHEAD
    }
}
