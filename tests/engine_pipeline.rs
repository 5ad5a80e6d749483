//! End-to-end engine tests against a deterministic stand-in acoustic
//! graph, so they run without model files or ONNX Runtime.

use std::sync::atomic::Ordering;
use std::time::Duration;

use yomiage_rs::session::{TensorData, TensorInfo, TensorInput};
use yomiage_rs::{
    InferenceGraph, Status, TtsConfig, TtsEngine, TtsError, TtsRequest,
};

const STYLE_DIM: usize = 64;

/// Emits a waveform derived purely from the token ids, so identical
/// requests produce byte-identical buffers and distinct requests differ.
struct StubGraph {
    inputs: Vec<TensorInfo>,
    outputs: Vec<TensorInfo>,
    samples_per_token: usize,
    delay: Duration,
}

impl StubGraph {
    fn new(samples_per_token: usize, delay: Duration) -> Self {
        Self {
            inputs: vec![
                TensorInfo {
                    name: "tokens".into(),
                    shape: vec![1, -1],
                },
                TensorInfo {
                    name: "style".into(),
                    shape: vec![1, STYLE_DIM as i64],
                },
                TensorInfo {
                    name: "speed".into(),
                    shape: vec![1],
                },
            ],
            outputs: vec![TensorInfo {
                name: "audio".into(),
                shape: vec![-1],
            }],
            samples_per_token,
            delay,
        }
    }
}

impl InferenceGraph for StubGraph {
    fn input_info(&self) -> &[TensorInfo] {
        &self.inputs
    }

    fn output_info(&self) -> &[TensorInfo] {
        &self.outputs
    }

    fn run(&self, inputs: &[TensorInput]) -> Result<TensorData, TtsError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let tokens = match &inputs[0].data {
            TensorData::I64(tokens) => tokens.clone(),
            _ => return Err(TtsError::InvalidInput("tokens must be int64".into())),
        };
        let seed: i64 = tokens.iter().sum::<i64>() + tokens.len() as i64;
        let n = tokens.len() * self.samples_per_token;
        let samples = (0..n)
            .map(|i| (((seed as usize + i) % 200) as f32 / 200.0) - 0.5)
            .collect();
        Ok(TensorData::F32(samples))
    }
}

fn build_engine(config: TtsConfig, samples_per_token: usize, delay: Duration) -> TtsEngine {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = TtsEngine::new(config);
    engine
        .initialize_with_graph(Box::new(StubGraph::new(samples_per_token, delay)))
        .expect("engine should initialize with a stub graph");
    engine
        .load_voice_from_memory("jf_alpha", vec![0.25; STYLE_DIM])
        .expect("voice should load");
    engine
        .add_dictionary_word("こんにちは", "k o N n i tɕ i w a")
        .expect("dictionary add should succeed");
    engine
}

fn default_engine() -> TtsEngine {
    build_engine(TtsConfig::default(), 100, Duration::ZERO)
}

fn hello_request() -> TtsRequest {
    TtsRequest {
        text: "こんにちは".into(),
        voice_id: "jf_alpha".into(),
        speed: 1.0,
        pitch: 1.0,
        volume: 1.0,
        ..TtsRequest::default()
    }
}

#[test]
fn second_identical_request_is_a_cache_hit() {
    let engine = default_engine();

    let first = engine.synthesize(&hello_request());
    assert_eq!(first.status, Status::Ok, "{}", first.error_message);
    assert!(!first.stats.cache_hit);
    assert!(first.has_audio());

    let second = engine.synthesize(&hello_request());
    assert_eq!(second.status, Status::Ok);
    assert!(second.stats.cache_hit);
    assert_eq!(second.audio.samples, first.audio.samples);

    let stats = engine.cache_stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(engine.total_inferences(), 1);
}

#[test]
fn phoneme_override_bypasses_g2p() {
    let engine = default_engine();
    let morphemes_before = engine.g2p_stats().total_morphemes;

    let request = TtsRequest {
        text: "ignored".into(),
        voice_id: "jf_alpha".into(),
        phonemes: Some("k o N n i tɕ i w a".into()),
        ..TtsRequest::default()
    };
    let result = engine.synthesize(&request);

    assert_eq!(result.status, Status::Ok);
    assert_eq!(engine.g2p_stats().total_morphemes, morphemes_before);
    let symbols: Vec<&str> = result.phonemes.iter().map(|p| p.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["k", "o", "N", "n", "i", "tɕ", "i", "w", "a"]);
    // BOS + 9 phonemes + EOS.
    assert_eq!(result.token_ids.len(), 11);
}

#[test]
fn missing_voice_is_reported_with_its_id() {
    let engine = default_engine();
    let request = TtsRequest {
        text: "こんにちは".into(),
        voice_id: "does_not_exist".into(),
        ..TtsRequest::default()
    };
    let result = engine.synthesize(&request);

    assert_eq!(result.status, Status::VoiceNotFound);
    assert!(result.audio.samples.is_empty());
    assert!(result.error_message.contains("does_not_exist"));
    assert_eq!(engine.total_inferences(), 0);
}

#[test]
fn concurrent_identical_requests_share_one_inference() {
    let engine = build_engine(TtsConfig::default(), 100, Duration::from_millis(40));

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..32)
            .map(|_| scope.spawn(|| engine.synthesize(&hello_request())))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(engine.total_inferences(), 1);
    let reference = &results[0].audio.samples;
    assert!(!reference.is_empty());
    for result in &results {
        assert_eq!(result.status, Status::Ok);
        assert_eq!(&result.audio.samples, reference);
    }
}

#[test]
fn lru_eviction_drops_earliest_entries_first() {
    let config = TtsConfig {
        max_cache_size_mb: 1,
        ..TtsConfig::default()
    };
    // 12 tokens (BOS + 10 + EOS) * 8400 samples * 4 bytes ≈ 403 KB per entry.
    let engine = build_engine(config, 8400, Duration::ZERO);
    let budget = 1024 * 1024;

    let phonemes = "a i u e o a i u e o";
    for i in 0..5 {
        let request = TtsRequest {
            text: format!("phrase-{i}"),
            voice_id: "jf_alpha".into(),
            phonemes: Some(phonemes.into()),
            ..TtsRequest::default()
        };
        let result = engine.synthesize(&request);
        assert_eq!(result.status, Status::Ok);
        assert!(
            engine.cache_stats().bytes <= budget,
            "byte budget violated after put {i}"
        );
    }

    let stats = engine.cache_stats();
    assert_eq!(stats.evictions, 3);
    assert_eq!(stats.entries, 2);

    // The two most recent entries are still hits; the earliest are gone.
    // Probe the survivors first: a miss re-inserts and would evict again.
    for (i, expect_hit) in [(3, true), (4, true), (0, false)] {
        let request = TtsRequest {
            text: format!("phrase-{i}"),
            voice_id: "jf_alpha".into(),
            phonemes: Some(phonemes.into()),
            ..TtsRequest::default()
        };
        let result = engine.synthesize(&request);
        assert_eq!(
            result.stats.cache_hit, expect_hit,
            "unexpected cache state for phrase-{i}"
        );
    }
}

#[test]
fn cancellation_before_dequeue_completes_with_cancelled() {
    let config = TtsConfig {
        max_concurrent_requests: 1,
        ..TtsConfig::default()
    };
    let engine = build_engine(config, 10, Duration::from_millis(20));

    let handles: Vec<_> = (0..100)
        .map(|i| {
            engine.synthesize_async(TtsRequest {
                text: format!("依頼-{i}"),
                voice_id: "jf_alpha".into(),
                ..TtsRequest::default()
            })
        })
        .collect();

    for handle in &handles[50..] {
        assert!(
            engine.cancel(handle.id()),
            "request {} should still be queued",
            handle.id()
        );
    }

    for handle in &handles[..50] {
        assert_eq!(handle.wait().status, Status::Ok);
    }
    for handle in &handles[50..] {
        assert_eq!(handle.wait().status, Status::Cancelled);
    }
    assert!(engine.total_inferences() <= 50);
}

#[test]
fn normalization_targets_the_reference_peak() {
    let engine = default_engine();
    let result = engine.synthesize(&hello_request());
    assert_eq!(result.status, Status::Ok);

    let peak = result
        .audio
        .samples
        .iter()
        .fold(0.0f32, |acc, s| acc.max(s.abs()));
    assert!((peak - 0.95).abs() < 1e-4, "peak was {peak}");
}

#[test]
fn volume_scales_output_and_caches_separately() {
    let engine = build_engine(
        TtsConfig {
            normalize_audio: false,
            ..TtsConfig::default()
        },
        100,
        Duration::ZERO,
    );

    let loud = engine.synthesize(&hello_request());
    let quiet = engine.synthesize(&TtsRequest {
        volume: 0.5,
        ..hello_request()
    });
    assert!(!quiet.stats.cache_hit, "volume must be part of the key");
    for (l, q) in loud.audio.samples.iter().zip(&quiet.audio.samples) {
        assert!((l * 0.5 - q).abs() < 1e-6);
    }
}

#[test]
fn async_submission_resolves_like_sync() {
    let engine = default_engine();

    let sync = engine.synthesize(&TtsRequest {
        use_cache: false,
        ..hello_request()
    });
    let handle = engine.synthesize_async(TtsRequest {
        use_cache: false,
        ..hello_request()
    });
    let async_result = handle.wait();

    assert_eq!(async_result.status, Status::Ok);
    assert_eq!(async_result.audio.samples, sync.audio.samples);
    assert!(handle.is_complete());
}

#[test]
fn submit_callback_fires_on_success() {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    let engine = default_engine();
    let fired = Arc::new(AtomicUsize::new(0));
    let fired_in_callback = Arc::clone(&fired);

    let id = engine.submit(
        hello_request(),
        Some(Box::new(move |audio| {
            assert!(!audio.samples.is_empty());
            fired_in_callback.fetch_add(1, Ordering::SeqCst);
        })),
    );

    while !engine.is_complete(&id) {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(fired.load(Ordering::SeqCst), 1);
}

#[test]
fn shutdown_cancels_queued_work() {
    let config = TtsConfig {
        max_concurrent_requests: 1,
        ..TtsConfig::default()
    };
    let mut engine = build_engine(config, 10, Duration::from_millis(50));

    let handles: Vec<_> = (0..10)
        .map(|i| {
            engine.synthesize_async(TtsRequest {
                text: format!("停止-{i}"),
                voice_id: "jf_alpha".into(),
                ..TtsRequest::default()
            })
        })
        .collect();

    engine.shutdown();
    assert!(!engine.is_initialized());

    let mut cancelled = 0;
    for handle in &handles {
        let result = handle.wait();
        match result.status {
            Status::Ok => {}
            Status::Cancelled => cancelled += 1,
            other => panic!("unexpected status {other:?}"),
        }
    }
    assert!(cancelled > 0, "queued tasks should be drained as cancelled");

    let after = engine.synthesize(&hello_request());
    assert_eq!(after.status, Status::NotInitialized);
}

#[test]
fn text_utilities_run_the_real_pipeline() {
    let engine = default_engine();

    assert_eq!(engine.normalize_text("ＡＢＣ\u{3000}１"), "ABC 1");
    assert_eq!(
        engine.segment_text("漢字かなカナ"),
        vec!["漢字", "かな", "カナ"]
    );

    let spans = engine.text_to_phonemes("こんにちは");
    let symbols: Vec<&str> = spans.iter().map(|p| p.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["k", "o", "N", "n", "i", "tɕ", "i", "w", "a"]);
    assert_eq!(spans[3].position, 3);

    let tokens = engine.phonemes_to_tokens("k o N");
    assert_eq!(tokens.len(), 3);
}

#[test]
fn failed_requests_do_not_poison_the_engine() {
    let engine = default_engine();

    let bad = engine.synthesize(&TtsRequest {
        voice_id: "nope".into(),
        ..hello_request()
    });
    assert_eq!(bad.status, Status::VoiceNotFound);

    let good = engine.synthesize(&hello_request());
    assert_eq!(good.status, Status::Ok);

    let stats = engine.performance_stats();
    assert_eq!(stats.total_requests, 2);
    assert_eq!(stats.successful_requests, 1);
    assert_eq!(stats.failed_requests, 1);
}

#[test]
fn empty_text_without_override_is_invalid_input() {
    let engine = default_engine();
    let result = engine.synthesize(&TtsRequest {
        text: String::new(),
        voice_id: "jf_alpha".into(),
        ..TtsRequest::default()
    });
    assert_eq!(result.status, Status::InvalidInput);
    assert!(!result.has_audio());
}

#[test]
fn empty_voice_id_uses_the_default_voice() {
    let engine = default_engine();
    engine
        .load_voice_from_memory("jm_kumo", vec![0.5; STYLE_DIM])
        .unwrap();

    let result = engine.synthesize(&TtsRequest {
        voice_id: String::new(),
        ..hello_request()
    });
    assert_eq!(result.status, Status::Ok);
    assert_eq!(engine.default_voice_id(), "jf_alpha");
}

#[test]
fn style_dim_mismatch_is_fatal_at_voice_load() {
    let engine = default_engine();
    let err = engine
        .load_voice_from_memory("broken", vec![0.1; STYLE_DIM + 1])
        .unwrap_err();
    assert!(err.to_string().contains(&STYLE_DIM.to_string()));
}

#[test]
fn warmup_runs_a_dummy_inference_and_resets_stats() {
    let engine = default_engine();
    engine.warmup();
    assert_eq!(engine.total_inferences(), 0);
    assert_eq!(engine.session_stats().total_inferences, 0);

    engine.synthesize(&hello_request());
    assert_eq!(engine.total_inferences(), 1);
}
