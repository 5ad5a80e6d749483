//! The request orchestrator.
//!
//! [`TtsEngine`] owns every pipeline component: segmenter, G2P resolver,
//! vocabulary, voice registry, inference session, result cache, and the
//! worker pool behind the asynchronous surface. The synchronous path runs
//! on the caller's thread; async submissions enqueue onto a FIFO drained
//! by `max_concurrent_requests` workers reusing the same path. Identical
//! concurrent requests are collapsed through single-flight so a
//! fingerprint is only ever computed once at a time.

mod flight;
mod queue;
mod stats;

pub use queue::{AudioCallback, SynthesisHandle};
pub use stats::PerformanceStats;

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::audio::{self, AudioBuffer};
use crate::cache::{CacheStats, ResultCache};
use crate::config::TtsConfig;
use crate::error::TtsError;
use crate::g2p::dictionary::{DictionaryStats, PhonemeDictionary, ReadingEntry};
use crate::g2p::neural::NeuralG2p;
use crate::g2p::{kana, G2pResolver, G2pStats};
use crate::session::{GraphOptions, InferenceGraph, InferenceSession, SessionStats};
use crate::text::normalize::normalize_text;
use crate::text::segment::{Morpheme, MorphologicalAnalyzer, Segmenter};
use crate::types::{PhonemeSpan, ProcessingStats, Status, TtsRequest, TtsResult};
use crate::vocab::Vocabulary;
use crate::voice::{Voice, VoiceRegistry};

use flight::Flight;
use queue::{QueuedTask, TaskQueue, TaskState};

/// Japanese text-to-speech engine.
///
/// Construct with a [`TtsConfig`], call [`initialize`](Self::initialize)
/// (or [`initialize_with_graph`](Self::initialize_with_graph) when the
/// acoustic graph is supplied by the embedder), then synthesize.
///
/// ```no_run
/// use yomiage_rs::{TtsConfig, TtsEngine, TtsRequest};
///
/// let mut config = TtsConfig::default();
/// config.kokoro_model_path = "models/kokoro-v1.0.onnx".into();
/// config.voices_dir = "models/voices".into();
///
/// let mut engine = TtsEngine::new(config);
/// engine.initialize()?;
///
/// let result = engine.synthesize(&TtsRequest::new("こんにちは", "jf_alpha"));
/// assert!(result.is_success());
/// # Ok::<(), yomiage_rs::TtsError>(())
/// ```
pub struct TtsEngine {
    config: TtsConfig,
    core: Option<Arc<EngineCore>>,
    workers: Vec<JoinHandle<()>>,
}

struct EngineCore {
    config: TtsConfig,
    initialized: AtomicBool,
    segmenter: RwLock<Segmenter>,
    resolver: G2pResolver,
    vocabulary: RwLock<Vocabulary>,
    voices: VoiceRegistry,
    session: InferenceSession,
    cache: ResultCache,
    flight: flight::SingleFlight,
    queue: TaskQueue,
    pending: Mutex<HashMap<String, Arc<TaskState>>>,
    counters: stats::RuntimeCounters,
    next_request_id: AtomicU64,
}

/// Stable hash of everything that affects a request's output. Floats are
/// formatted to two decimals so equal-looking requests share a key.
fn fingerprint(request: &TtsRequest) -> u64 {
    let mut hasher = DefaultHasher::new();
    request.text.hash(&mut hasher);
    request.voice_id.hash(&mut hasher);
    format!("{:.2}", request.speed).hash(&mut hasher);
    format!("{:.2}", request.pitch).hash(&mut hasher);
    format!("{:.2}", request.volume).hash(&mut hasher);
    if let Some(phonemes) = &request.phonemes {
        phonemes.hash(&mut hasher);
    }
    hasher.finish()
}

impl TtsEngine {
    pub fn new(config: TtsConfig) -> Self {
        Self {
            config,
            core: None,
            workers: Vec::new(),
        }
    }

    pub fn config(&self) -> &TtsConfig {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.core
            .as_ref()
            .is_some_and(|core| core.initialized.load(Ordering::Acquire))
    }

    /// Load every component from the configured paths and start the
    /// worker pool.
    pub fn initialize(&mut self) -> Result<(), TtsError> {
        if self.config.kokoro_model_path.is_empty() {
            return Err(TtsError::ModelNotLoaded(
                "kokoro_model_path is not set".into(),
            ));
        }
        let session = InferenceSession::load(
            Path::new(&self.config.kokoro_model_path),
            self.graph_options(),
        )?;
        self.finish_initialize(session)
    }

    /// Initialize around an acoustic graph supplied by the embedder
    /// instead of a model path.
    pub fn initialize_with_graph(
        &mut self,
        graph: Box<dyn InferenceGraph>,
    ) -> Result<(), TtsError> {
        self.finish_initialize(InferenceSession::from_graph(graph))
    }

    /// Initialize from an in-memory model buffer.
    pub fn initialize_with_model_bytes(&mut self, model: &[u8]) -> Result<(), TtsError> {
        let session = InferenceSession::load_from_memory(model, self.graph_options())?;
        self.finish_initialize(session)
    }

    fn graph_options(&self) -> GraphOptions {
        GraphOptions {
            intra_threads: self.config.onnx_intra_threads,
            inter_threads: self.config.onnx_inter_threads,
            enable_gpu: self.config.enable_gpu,
        }
    }

    fn finish_initialize(&mut self, session: InferenceSession) -> Result<(), TtsError> {
        if self.core.is_some() {
            return Err(TtsError::InitializationFailed(
                "engine is already initialized".into(),
            ));
        }
        let config = self.config.clone();

        let vocabulary = if config.tokenizer_vocab_path.is_empty() {
            log::warn!("tokenizer_vocab_path not set; building vocabulary from the kana rules");
            Vocabulary::build_from_phonemes(&kana::phoneme_inventory())
        } else {
            Vocabulary::load(Path::new(&config.tokenizer_vocab_path))?
        };

        // Dictionary and phonemizer are optional: a failure to load one
        // degrades the cascade instead of failing initialization.
        let dictionary = if config.dictionary_path.is_empty() {
            PhonemeDictionary::new()
        } else {
            match PhonemeDictionary::load(Path::new(&config.dictionary_path)) {
                Ok(dictionary) => dictionary,
                Err(err) => {
                    log::warn!("dictionary load failed, continuing without: {err}");
                    PhonemeDictionary::new()
                }
            }
        };

        let neural = if config.phonemizer_model_path.is_empty() {
            None
        } else {
            let vocab_path = (!config.phonemizer_vocab_path.is_empty())
                .then(|| Path::new(&config.phonemizer_vocab_path).to_path_buf());
            match NeuralG2p::load(
                Path::new(&config.phonemizer_model_path),
                vocab_path.as_deref(),
                self.graph_options(),
            ) {
                Ok(model) => Some(model),
                Err(err) => {
                    log::warn!("phonemizer model load failed, continuing without: {err}");
                    None
                }
            }
        };

        let voices = VoiceRegistry::new();
        voices.set_expected_style_dim(session.style_dim());
        if !config.voices_dir.is_empty() {
            match voices.load_dir(Path::new(&config.voices_dir)) {
                Ok(count) => log::info!("Loaded {count} voices from {}", config.voices_dir),
                Err(err) => log::warn!("voice directory load failed: {err}"),
            }
        }

        let core = Arc::new(EngineCore {
            cache: ResultCache::new(
                config.cache_byte_budget(),
                config.max_cache_entries,
                config.cache_ttl_seconds,
            ),
            segmenter: RwLock::new(Segmenter::new(config.normalize_text)),
            resolver: G2pResolver::new(dictionary, neural),
            vocabulary: RwLock::new(vocabulary),
            voices,
            session,
            flight: flight::SingleFlight::new(),
            queue: TaskQueue::new(),
            pending: Mutex::new(HashMap::new()),
            counters: stats::RuntimeCounters::new(),
            next_request_id: AtomicU64::new(1),
            initialized: AtomicBool::new(true),
            config,
        });

        for index in 0..self.config.worker_count() {
            let worker_core = Arc::clone(&core);
            let handle = std::thread::Builder::new()
                .name(format!("tts-worker-{index}"))
                .spawn(move || worker_loop(worker_core))?;
            self.workers.push(handle);
        }

        self.core = Some(core);
        Ok(())
    }

    fn core(&self) -> Result<&Arc<EngineCore>, TtsError> {
        match &self.core {
            Some(core) if core.initialized.load(Ordering::Acquire) => Ok(core),
            _ => Err(TtsError::NotInitialized),
        }
    }

    // ------------------------------------------------------------------
    // Synthesis
    // ------------------------------------------------------------------

    /// Synthesize on the calling thread.
    pub fn synthesize(&self, request: &TtsRequest) -> TtsResult {
        match self.core() {
            Ok(core) => core.run_request(request),
            Err(err) => TtsResult::failure(err.status(), err.to_string()),
        }
    }

    /// Synthesize `text` with default parameters. An empty voice id
    /// selects the registry default.
    pub fn synthesize_simple(&self, text: &str, voice_id: &str) -> TtsResult {
        self.synthesize(&TtsRequest::new(text, voice_id))
    }

    /// Sequential batch synthesis.
    pub fn synthesize_batch(&self, requests: &[TtsRequest]) -> Vec<TtsResult> {
        requests.iter().map(|r| self.synthesize(r)).collect()
    }

    /// Enqueue for the worker pool; the handle resolves to the same
    /// result type the synchronous path returns.
    pub fn synthesize_async(&self, request: TtsRequest) -> SynthesisHandle {
        self.enqueue(request, None)
    }

    /// One handle per request, all enqueued up front.
    pub fn synthesize_batch_async(&self, requests: Vec<TtsRequest>) -> Vec<SynthesisHandle> {
        requests
            .into_iter()
            .map(|r| self.synthesize_async(r))
            .collect()
    }

    /// Fire-and-forget submission. The callback, when given, receives the
    /// audio of a successful synthesis. Returns the request id.
    pub fn submit(&self, request: TtsRequest, callback: Option<AudioCallback>) -> String {
        self.enqueue(request, callback).id
    }

    fn enqueue(&self, request: TtsRequest, callback: Option<AudioCallback>) -> SynthesisHandle {
        let state = TaskState::new();
        let core = match self.core() {
            Ok(core) => core,
            Err(err) => {
                state.fulfill(TtsResult::failure(err.status(), err.to_string()));
                return SynthesisHandle {
                    state,
                    id: String::new(),
                };
            }
        };

        let id = format!(
            "req-{}",
            core.next_request_id.fetch_add(1, Ordering::Relaxed)
        );
        {
            let mut pending = core.pending.lock().unwrap_or_else(|e| e.into_inner());
            pending.retain(|_, task| !task.is_complete());
            pending.insert(id.clone(), Arc::clone(&state));
        }
        core.queue.push(QueuedTask {
            id: id.clone(),
            request,
            state: Arc::clone(&state),
            callback,
        });
        SynthesisHandle { state, id }
    }

    /// Cancel a submission that no worker has dequeued yet. In-flight
    /// requests run to completion and deliver normally.
    pub fn cancel(&self, request_id: &str) -> bool {
        match self.core() {
            Ok(core) => core.queue.cancel(request_id),
            Err(_) => false,
        }
    }

    /// Whether a submitted request has resolved. Unknown ids count as
    /// complete.
    pub fn is_complete(&self, request_id: &str) -> bool {
        let Ok(core) = self.core() else {
            return true;
        };
        let pending = core.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending
            .get(request_id)
            .map_or(true, |state| state.is_complete())
    }

    /// Tasks waiting in the submission queue.
    pub fn queue_depth(&self) -> usize {
        self.core().map(|core| core.queue.len()).unwrap_or(0)
    }

    /// Requests currently executing on worker threads.
    pub fn active_count(&self) -> usize {
        self.core()
            .map(|core| core.queue.active_count())
            .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // Voice management
    // ------------------------------------------------------------------

    pub fn load_voice(&self, path: &Path) -> Result<(), TtsError> {
        self.core()?.voices.load_file(path)
    }

    pub fn load_voice_from_memory(
        &self,
        id: &str,
        style_vector: Vec<f32>,
    ) -> Result<(), TtsError> {
        self.core()?.voices.add_from_style(id, style_vector)
    }

    pub fn get_voice(&self, id: &str) -> Option<Voice> {
        self.core().ok()?.voices.get(id)
    }

    pub fn list_voices(&self) -> Vec<Voice> {
        self.core().map(|core| core.voices.list()).unwrap_or_default()
    }

    pub fn set_default_voice(&self, id: &str) -> Result<(), TtsError> {
        self.core()?.voices.set_default(id)
    }

    pub fn default_voice_id(&self) -> String {
        self.core()
            .map(|core| core.voices.default_id())
            .unwrap_or_default()
    }

    pub fn unload_voice(&self, id: &str) -> Result<(), TtsError> {
        self.core()?.voices.unload(id)
    }

    pub fn export_voice(&self, id: &str, path: &Path) -> Result<(), TtsError> {
        self.core()?.voices.export(id, path)
    }

    // ------------------------------------------------------------------
    // Text processing
    // ------------------------------------------------------------------

    /// Attach a morphological analyzer (a MeCab binding, typically).
    /// Ignored when `enable_mecab` is off in the config.
    pub fn set_analyzer(
        &self,
        analyzer: Box<dyn MorphologicalAnalyzer>,
    ) -> Result<(), TtsError> {
        let core = self.core()?;
        if !core.config.enable_mecab {
            log::warn!("enable_mecab is off; analyzer not attached");
            return Ok(());
        }
        core.segmenter
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .set_analyzer(Some(analyzer));
        Ok(())
    }

    /// Run the G2P cascade on `text` without synthesizing.
    pub fn text_to_phonemes(&self, text: &str) -> Vec<PhonemeSpan> {
        let Ok(core) = self.core() else {
            return Vec::new();
        };
        core.phonemize(text)
            .split_whitespace()
            .enumerate()
            .map(|(position, symbol)| PhonemeSpan {
                symbol: symbol.to_string(),
                position,
            })
            .collect()
    }

    /// Tokenize a space-separated phoneme string (without BOS/EOS).
    pub fn phonemes_to_tokens(&self, phonemes: &str) -> Vec<i64> {
        let Ok(core) = self.core() else {
            return Vec::new();
        };
        let vocabulary = core.vocabulary.read().unwrap_or_else(|e| e.into_inner());
        vocabulary.tokenize(phonemes)
    }

    /// Width normalization as applied before segmentation.
    pub fn normalize_text(&self, text: &str) -> String {
        normalize_text(text)
    }

    /// Morpheme surfaces for `text`.
    pub fn segment_text(&self, text: &str) -> Vec<String> {
        let Ok(core) = self.core() else {
            return Vec::new();
        };
        core.segment(text)
            .into_iter()
            .map(|morpheme| morpheme.surface)
            .collect()
    }

    // ------------------------------------------------------------------
    // Dictionary management
    // ------------------------------------------------------------------

    pub fn add_dictionary_word(&self, word: &str, phonemes: &str) -> Result<(), TtsError> {
        let dictionary = self.core()?.resolver.dictionary();
        let mut dictionary = dictionary.write().unwrap_or_else(|e| e.into_inner());
        dictionary.add_word(word, phonemes);
        Ok(())
    }

    pub fn add_dictionary_reading(
        &self,
        word: &str,
        entry: ReadingEntry,
    ) -> Result<(), TtsError> {
        let dictionary = self.core()?.resolver.dictionary();
        let mut dictionary = dictionary.write().unwrap_or_else(|e| e.into_inner());
        dictionary.add_reading_entry(word, entry);
        Ok(())
    }

    pub fn load_dictionary(&self, path: &Path) -> Result<(), TtsError> {
        let loaded = PhonemeDictionary::load(path)?;
        let dictionary = self.core()?.resolver.dictionary();
        let mut dictionary = dictionary.write().unwrap_or_else(|e| e.into_inner());
        *dictionary = loaded;
        Ok(())
    }

    pub fn export_dictionary(&self, path: &Path) -> Result<(), TtsError> {
        let dictionary = self.core()?.resolver.dictionary();
        let dictionary = dictionary.read().unwrap_or_else(|e| e.into_inner());
        dictionary.save(path)
    }

    pub fn dictionary_stats(&self) -> DictionaryStats {
        let Ok(core) = self.core() else {
            return DictionaryStats::default();
        };
        let dictionary = core.resolver.dictionary();
        let stats = dictionary
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .stats();
        stats
    }

    // ------------------------------------------------------------------
    // Cache and statistics
    // ------------------------------------------------------------------

    pub fn clear_cache(&self) {
        if let Ok(core) = self.core() {
            core.cache.clear();
        }
    }

    /// Drop cache entries idle longer than `seconds`.
    pub fn clear_cache_older_than(&self, seconds: u64) {
        if let Ok(core) = self.core() {
            core.cache.clear_older_than(Duration::from_secs(seconds));
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.core()
            .map(|core| core.cache.stats())
            .unwrap_or_default()
    }

    /// Synthesize a set of requests purely to warm the cache. Returns the
    /// number that succeeded.
    pub fn preload_cache(&self, requests: &[TtsRequest]) -> usize {
        requests
            .iter()
            .map(|request| {
                let mut request = request.clone();
                request.use_cache = true;
                self.synthesize(&request)
            })
            .filter(TtsResult::is_success)
            .count()
    }

    pub fn performance_stats(&self) -> PerformanceStats {
        self.core()
            .map(|core| core.counters.snapshot())
            .unwrap_or_default()
    }

    pub fn reset_performance_stats(&self) {
        if let Ok(core) = self.core() {
            core.counters.reset();
            core.session.reset_stats();
            core.resolver.reset_stats();
        }
    }

    pub fn session_stats(&self) -> SessionStats {
        self.core()
            .map(|core| core.session.stats())
            .unwrap_or_default()
    }

    /// Total acoustic-model invocations since the last stats reset.
    pub fn total_inferences(&self) -> u64 {
        self.core()
            .map(|core| core.session.total_inferences())
            .unwrap_or(0)
    }

    pub fn g2p_stats(&self) -> G2pStats {
        self.core()
            .map(|core| core.resolver.stats())
            .unwrap_or_default()
    }

    /// Approximate bytes held by loaded voices and cached results.
    pub fn memory_usage(&self) -> usize {
        self.core()
            .map(|core| core.voices.memory_usage() + core.cache.stats().bytes)
            .unwrap_or(0)
    }

    /// Prime the acoustic model with a dummy inference.
    pub fn warmup(&self) {
        if let Ok(core) = self.core() {
            core.session.warmup();
        }
    }

    /// Stop accepting requests, cancel everything still queued, and join
    /// the worker pool.
    pub fn shutdown(&mut self) {
        if let Some(core) = &self.core {
            core.initialized.store(false, Ordering::Release);
            core.queue.stop();
            core.queue.drain_cancelled();
        }
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for TtsEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(core: Arc<EngineCore>) {
    while let Some(task) = core.queue.pop_blocking() {
        core.queue.begin_work();
        let result = core.run_request(&task.request);
        core.queue.end_work();

        if let Some(callback) = &task.callback {
            if result.is_success() {
                callback(&result.audio);
            }
        }
        task.state.fulfill(result);
    }
}

impl EngineCore {
    fn segment(&self, text: &str) -> Vec<Morpheme> {
        let segmenter = self.segmenter.read().unwrap_or_else(|e| e.into_inner());
        segmenter.segment(text)
    }

    fn phonemize(&self, text: &str) -> String {
        let morphemes = self.segment(text);
        self.resolver.resolve(&morphemes, text)
    }

    /// Cache probe, single-flight, and the synthesis pipeline.
    fn run_request(&self, request: &TtsRequest) -> TtsResult {
        self.counters.count_request();

        let mut request = request.clone();
        request.speed = request.speed.clamp(0.5, 2.0);
        request.pitch = request.pitch.clamp(0.5, 2.0);
        request.volume = request.volume.clamp(0.0, 1.0);
        if request.voice_id.is_empty() {
            request.voice_id = self.voices.default_id();
        }

        if request.text.is_empty() && request.phonemes.as_deref().unwrap_or("").is_empty() {
            self.counters.record_outcome(0, false);
            return TtsResult::failure(Status::InvalidInput, "empty text and no phoneme override");
        }

        let key = fingerprint(&request);
        let use_cache = self.config.enable_cache && request.use_cache;
        if use_cache {
            if let Some(mut result) = self.cache.get(key) {
                result.stats.cache_hit = true;
                return result;
            }
        }

        match self.flight.begin(key) {
            Flight::Joined(result) => result,
            Flight::Leader(leader) => {
                let started = Instant::now();
                let result = self.process(&request);
                let latency_ms = started.elapsed().as_millis() as u64;
                self.counters.record_outcome(latency_ms, result.is_success());
                if use_cache && result.is_success() {
                    self.cache.put(key, result.clone());
                }
                leader.complete(&result);
                result
            }
        }
    }

    /// The pipeline proper: normalize, phonemize, tokenize, infer,
    /// post-process, with per-stage timing.
    fn process(&self, request: &TtsRequest) -> TtsResult {
        let started = Instant::now();
        let mut result = TtsResult {
            status: Status::Ok,
            audio: AudioBuffer::default(),
            phonemes: Vec::new(),
            token_ids: Vec::new(),
            stats: ProcessingStats {
                text_length: request.text.chars().count(),
                ..ProcessingStats::default()
            },
            error_message: String::new(),
        };

        let text = if request.normalize_text {
            normalize_text(&request.text)
        } else {
            request.text.clone()
        };

        let phoneme_started = Instant::now();
        let phoneme_string = match request.phonemes.as_deref() {
            Some(provided) if !provided.trim().is_empty() => provided.trim().to_string(),
            _ => self.phonemize(&text),
        };
        result.stats.phonemization_ms = phoneme_started.elapsed().as_millis() as u64;

        result.phonemes = phoneme_string
            .split_whitespace()
            .enumerate()
            .map(|(position, symbol)| PhonemeSpan {
                symbol: symbol.to_string(),
                position,
            })
            .collect();
        result.stats.phoneme_count = result.phonemes.len();

        let token_started = Instant::now();
        let token_ids = {
            let vocabulary = self.vocabulary.read().unwrap_or_else(|e| e.into_inner());
            vocabulary.tokenize_with_specials(&phoneme_string)
        };
        result.stats.tokenization_ms = token_started.elapsed().as_millis() as u64;
        result.stats.token_count = token_ids.len();
        result.token_ids = token_ids;

        let Some(voice) = self.voices.get(&request.voice_id) else {
            result.status = Status::VoiceNotFound;
            result.error_message = format!("voice not found: {}", request.voice_id);
            return result;
        };

        let inference_started = Instant::now();
        let mut samples = self.session.infer(
            &result.token_ids,
            &voice.style_vector,
            request.speed * voice.default_speed,
            request.pitch * voice.default_pitch,
        );
        result.stats.inference_ms = inference_started.elapsed().as_millis() as u64;

        if samples.is_empty() {
            result.status = Status::InferenceFailed;
            result.error_message = "inference produced no audio".into();
            return result;
        }

        let audio_started = Instant::now();
        audio::post_process(&mut samples, request.volume, self.config.normalize_audio);
        result.stats.audio_processing_ms = audio_started.elapsed().as_millis() as u64;

        result.audio = AudioBuffer::new(samples, self.config.target_sample_rate);
        result.stats.audio_samples = result.audio.samples.len();
        result.stats.total_ms = started.elapsed().as_millis() as u64;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_stable_across_float_noise() {
        let a = TtsRequest {
            text: "こんにちは".into(),
            voice_id: "jf_alpha".into(),
            speed: 1.0,
            ..TtsRequest::default()
        };
        let mut b = a.clone();
        b.speed = 1.0004; // rounds to the same two decimals
        assert_eq!(fingerprint(&a), fingerprint(&b));

        b.speed = 1.25;
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_covers_all_output_inputs() {
        let base = TtsRequest::new("text", "voice");
        let mut other = base.clone();
        other.volume = 0.5;
        assert_ne!(fingerprint(&base), fingerprint(&other));

        let mut other = base.clone();
        other.phonemes = Some("k a".into());
        assert_ne!(fingerprint(&base), fingerprint(&other));

        // use_cache does not affect the output, so it must not affect
        // the key.
        let mut other = base.clone();
        other.use_cache = false;
        assert_eq!(fingerprint(&base), fingerprint(&other));
    }

    #[test]
    fn uninitialized_engine_fails_closed() {
        let engine = TtsEngine::new(TtsConfig::default());
        assert!(!engine.is_initialized());

        let result = engine.synthesize(&TtsRequest::new("こんにちは", "jf_alpha"));
        assert_eq!(result.status, Status::NotInitialized);
        assert!(!result.has_audio());

        let handle = engine.synthesize_async(TtsRequest::new("こんにちは", "jf_alpha"));
        assert_eq!(handle.wait().status, Status::NotInitialized);

        assert!(engine.list_voices().is_empty());
        assert_eq!(engine.queue_depth(), 0);
    }

    #[test]
    fn initialize_requires_a_model_path() {
        let mut engine = TtsEngine::new(TtsConfig::default());
        let err = engine.initialize().unwrap_err();
        assert!(matches!(err, TtsError::ModelNotLoaded(_)));
    }
}
