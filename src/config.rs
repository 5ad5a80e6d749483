//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Configuration for [`crate::engine::TtsEngine`].
///
/// Any field can be omitted from a JSON config; the defaults below apply.
/// Paths left empty disable the corresponding optional component (the
/// neural phonemizer, the pronunciation dictionary, the voices directory).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TtsConfig {
    /// Path to the Kokoro acoustic model (.onnx).
    pub kokoro_model_path: String,
    /// Path to the grapheme-to-phoneme fallback model (.onnx). Optional.
    pub phonemizer_model_path: String,
    /// Path to the char/phoneme vocabulary artifact for the phonemizer
    /// model. Empty derives `<model-stem>.vocab.json` from the model path.
    pub phonemizer_vocab_path: String,
    /// Path to the pronunciation dictionary (.json). Optional.
    pub dictionary_path: String,
    /// Path to the phoneme tokenizer vocabulary (.json or two-column text).
    pub tokenizer_vocab_path: String,
    /// Directory of voice descriptor JSON files. Optional.
    pub voices_dir: String,

    /// Worker threads for async submission. 0 selects the number of
    /// available CPUs.
    pub max_concurrent_requests: usize,
    /// ONNX intra-op threads. 0 = runtime default.
    pub onnx_intra_threads: usize,
    /// ONNX inter-op threads. 0 = runtime default.
    pub onnx_inter_threads: usize,
    /// Request the CUDA execution provider (requires the `cuda` feature).
    pub enable_gpu: bool,

    pub enable_cache: bool,
    /// Cache byte budget in MiB.
    pub max_cache_size_mb: usize,
    /// Cache entry-count ceiling. 0 disables the entry limit.
    pub max_cache_entries: usize,
    /// Cache entry time-to-live in seconds. 0 disables expiry.
    pub cache_ttl_seconds: u64,

    /// Nominal output sample rate. The acoustic model fixes the actual
    /// rate; this value is stamped on produced buffers.
    pub target_sample_rate: u32,
    /// Peak-normalize output to 0.95 before volume clamping.
    pub normalize_audio: bool,

    /// Use an injected morphological analyzer when one is attached.
    pub enable_mecab: bool,
    /// Default for requests that do not override text normalization.
    pub normalize_text: bool,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            kokoro_model_path: String::new(),
            phonemizer_model_path: String::new(),
            phonemizer_vocab_path: String::new(),
            dictionary_path: String::new(),
            tokenizer_vocab_path: String::new(),
            voices_dir: String::new(),
            max_concurrent_requests: 0,
            onnx_intra_threads: 0,
            onnx_inter_threads: 0,
            enable_gpu: false,
            enable_cache: true,
            max_cache_size_mb: 100,
            max_cache_entries: 0,
            cache_ttl_seconds: 0,
            target_sample_rate: 24000,
            normalize_audio: true,
            enable_mecab: true,
            normalize_text: true,
        }
    }
}

impl TtsConfig {
    /// Worker pool size after resolving the 0 = auto convention.
    pub fn worker_count(&self) -> usize {
        if self.max_concurrent_requests > 0 {
            self.max_concurrent_requests
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }

    /// Cache byte budget after MiB conversion.
    pub fn cache_byte_budget(&self) -> usize {
        self.max_cache_size_mb.saturating_mul(1024 * 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = TtsConfig::default();
        assert!(cfg.enable_cache);
        assert_eq!(cfg.max_cache_size_mb, 100);
        assert_eq!(cfg.target_sample_rate, 24000);
        assert_eq!(cfg.cache_ttl_seconds, 0);
        assert!(cfg.worker_count() >= 1);
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let cfg: TtsConfig =
            serde_json::from_str(r#"{"max_cache_size_mb": 1, "enable_gpu": true}"#).unwrap();
        assert_eq!(cfg.max_cache_size_mb, 1);
        assert!(cfg.enable_gpu);
        assert!(cfg.normalize_audio);
        assert_eq!(cfg.cache_byte_budget(), 1024 * 1024);
    }
}
