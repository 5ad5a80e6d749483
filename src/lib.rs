//! # yomiage-rs
//!
//! On-device Japanese text-to-speech built around a Kokoro-style ONNX
//! acoustic model.
//!
//! ## Pipeline
//!
//! Text flows through four stages: morphological segmentation (an
//! attached analyzer or a script-boundary fallback), a hybrid
//! grapheme-to-phoneme cascade (pronunciation dictionary → neural
//! fallback model → kana rewrite rules), phoneme tokenization against the
//! model vocabulary, and acoustic inference conditioned on a per-voice
//! style vector. The engine in front adds a fingerprint-keyed LRU/TTL
//! result cache, single-flight deduplication of identical concurrent
//! requests, and a worker pool behind the asynchronous surface.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! yomiage-rs = "0.1"
//! ```
//!
//! ```no_run
//! use yomiage_rs::{TtsConfig, TtsEngine, TtsRequest};
//!
//! let mut config = TtsConfig::default();
//! config.kokoro_model_path = "models/kokoro-v1.0.onnx".into();
//! config.dictionary_path = "data/ja_phonemes.json".into();
//! config.voices_dir = "models/voices".into();
//!
//! let mut engine = TtsEngine::new(config);
//! engine.initialize()?;
//!
//! let result = engine.synthesize(&TtsRequest::new("今日はいい天気ですね", "jf_alpha"));
//! if result.is_success() {
//!     result.audio.write_wav(std::path::Path::new("output.wav"), false)?;
//! }
//! # Ok::<(), yomiage_rs::TtsError>(())
//! ```
//!
//! ## Model Artifacts
//!
//! ```text
//! models/
//! ├── kokoro-v1.0.onnx          # acoustic model
//! ├── phonemizer.onnx           # optional G2P fallback model
//! ├── phonemizer.vocab.json     # its char/phoneme vocabularies
//! ├── tokenizer_vocab.json      # phoneme → token id map
//! └── voices/
//!     ├── jf_alpha.json         # one descriptor per voice
//!     └── jm_kumo.json
//! ```

pub mod audio;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod g2p;
pub mod session;
pub mod text;
pub mod types;
pub mod vocab;
pub mod voice;

pub use audio::AudioBuffer;
pub use cache::CacheStats;
pub use config::TtsConfig;
pub use engine::{PerformanceStats, SynthesisHandle, TtsEngine};
pub use error::TtsError;
pub use g2p::{G2pResolver, G2pStats};
pub use session::{GraphOptions, InferenceGraph, InferenceSession, SessionStats, TensorInfo};
pub use text::segment::{Morpheme, MorphologicalAnalyzer};
pub use types::{PhonemeSpan, Priority, Status, TtsRequest, TtsResult, VoiceGender};
pub use vocab::Vocabulary;
pub use voice::{Voice, VoiceRegistry};
