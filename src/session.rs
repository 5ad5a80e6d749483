//! Acoustic model inference.
//!
//! [`InferenceGraph`] mirrors the runtime interface this crate consumes:
//! a loaded graph declares named inputs/outputs and executes on demand.
//! [`OrtGraph`] implements it over ONNX Runtime; tests substitute
//! deterministic stubs. [`InferenceSession`] owns a graph and handles the
//! Kokoro input contract: `tokens` int64 `[1, T]`, `style` float32
//! `[1, D]`, `speed` float32 `[1]`, and `pitch` float32 `[1]` when the
//! graph declares a fourth input.

use std::borrow::Cow;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use ndarray::{ArrayD, IxDyn};
use ort::execution_providers::CPU as CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::{Session, SessionInputValue};
use ort::value::TensorRef;

use crate::error::TtsError;

/// Declared name and shape of one graph input or output. Dynamic
/// dimensions are reported as -1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TensorInfo {
    pub name: String,
    pub shape: Vec<i64>,
}

/// Flat tensor payload for the two element types the pipeline uses.
#[derive(Debug, Clone)]
pub enum TensorData {
    I64(Vec<i64>),
    F32(Vec<f32>),
}

/// One named input tensor with explicit shape.
#[derive(Debug, Clone)]
pub struct TensorInput {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: TensorData,
}

impl TensorInput {
    pub fn i64(name: impl Into<String>, shape: Vec<usize>, data: Vec<i64>) -> Self {
        Self {
            name: name.into(),
            shape,
            data: TensorData::I64(data),
        }
    }

    pub fn f32(name: impl Into<String>, shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self {
            name: name.into(),
            shape,
            data: TensorData::F32(data),
        }
    }
}

/// The neural inference runtime seam.
///
/// `run` executes the graph and returns the first declared output,
/// flattened. Implementations are responsible for their own internal
/// thread safety.
pub trait InferenceGraph: Send + Sync {
    fn input_info(&self) -> &[TensorInfo];
    fn output_info(&self) -> &[TensorInfo];
    fn run(&self, inputs: &[TensorInput]) -> Result<TensorData, TtsError>;
}

/// Session construction knobs for ONNX Runtime graphs.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphOptions {
    /// Intra-op threads, 0 = runtime default.
    pub intra_threads: usize,
    /// Inter-op threads, 0 = runtime default.
    pub inter_threads: usize,
    pub enable_gpu: bool,
}

/// ONNX Runtime implementation of [`InferenceGraph`].
pub struct OrtGraph {
    session: Mutex<Session>,
    inputs: Vec<TensorInfo>,
    outputs: Vec<TensorInfo>,
}

impl OrtGraph {
    /// Load a graph from a `.onnx` file.
    pub fn load(path: &Path, options: GraphOptions) -> Result<Self, TtsError> {
        if !path.exists() {
            return Err(TtsError::FileNotFound(path.display().to_string()));
        }
        log::info!("Loading ONNX graph from {}", path.display());
        let session = Self::builder(options)?.commit_from_file(path)?;
        Ok(Self::wrap(session))
    }

    /// Load a graph from an in-memory model buffer.
    pub fn load_from_memory(model: &[u8], options: GraphOptions) -> Result<Self, TtsError> {
        let session = Self::builder(options)?.commit_from_memory(model)?;
        Ok(Self::wrap(session))
    }

    fn builder(options: GraphOptions) -> Result<ort::session::builder::SessionBuilder, TtsError> {
        let mut providers = Vec::new();
        #[cfg(feature = "cuda")]
        if options.enable_gpu {
            providers.push(ort::execution_providers::CUDA::default().build());
        }
        #[cfg(not(feature = "cuda"))]
        if options.enable_gpu {
            log::warn!("enable_gpu set but the crate was built without the `cuda` feature");
        }
        providers.push(CPUExecutionProvider::default().build());

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(ort::Error::from)?
            .with_execution_providers(providers)
            .map_err(ort::Error::from)?
            .with_parallel_execution(true)
            .map_err(ort::Error::from)?;

        if options.intra_threads > 0 {
            builder = builder
                .with_intra_threads(options.intra_threads)
                .map_err(ort::Error::from)?;
        }
        if options.inter_threads > 0 {
            builder = builder
                .with_inter_threads(options.inter_threads)
                .map_err(ort::Error::from)?;
        }
        Ok(builder)
    }

    fn wrap(session: Session) -> Self {
        let inputs = session
            .inputs()
            .iter()
            .map(|input| TensorInfo {
                name: input.name().to_string(),
                shape: input
                    .dtype()
                    .tensor_shape()
                    .map(|s| s.to_vec())
                    .unwrap_or_default(),
            })
            .collect();
        let outputs = session
            .outputs()
            .iter()
            .map(|output| TensorInfo {
                name: output.name().to_string(),
                shape: output
                    .dtype()
                    .tensor_shape()
                    .map(|s| s.to_vec())
                    .unwrap_or_default(),
            })
            .collect();
        Self {
            session: Mutex::new(session),
            inputs,
            outputs,
        }
    }
}

impl InferenceGraph for OrtGraph {
    fn input_info(&self) -> &[TensorInfo] {
        &self.inputs
    }

    fn output_info(&self) -> &[TensorInfo] {
        &self.outputs
    }

    fn run(&self, inputs: &[TensorInput]) -> Result<TensorData, TtsError> {
        // The arrays must outlive the tensor views handed to the runtime.
        let mut i64_arrays: Vec<(&str, ArrayD<i64>)> = Vec::new();
        let mut f32_arrays: Vec<(&str, ArrayD<f32>)> = Vec::new();
        for input in inputs {
            match &input.data {
                TensorData::I64(data) => i64_arrays.push((
                    &input.name,
                    ArrayD::from_shape_vec(IxDyn(&input.shape), data.clone())?,
                )),
                TensorData::F32(data) => f32_arrays.push((
                    &input.name,
                    ArrayD::from_shape_vec(IxDyn(&input.shape), data.clone())?,
                )),
            }
        }

        // Inputs are matched by declared name, so the split by element
        // type does not disturb the feed.
        let mut values: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            Vec::with_capacity(inputs.len());
        for (name, array) in &i64_arrays {
            values.push((
                Cow::Borrowed(*name),
                TensorRef::from_array_view(array.view())?.into(),
            ));
        }
        for (name, array) in &f32_arrays {
            values.push((
                Cow::Borrowed(*name),
                TensorRef::from_array_view(array.view())?.into(),
            ));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| TtsError::InferenceFailed("session mutex poisoned".into()))?;
        let outputs = session.run(values)?;
        let (_, first) = outputs
            .iter()
            .next()
            .ok_or_else(|| TtsError::InferenceFailed("graph produced no outputs".into()))?;

        if let Ok(array) = first.try_extract_array::<f32>() {
            return Ok(TensorData::F32(array.iter().copied().collect()));
        }
        let array = first.try_extract_array::<i64>()?;
        Ok(TensorData::I64(array.iter().copied().collect()))
    }
}

/// Latency accumulators, guarded by one mutex.
#[derive(Debug, Clone, Copy, Default)]
struct LatencyAccum {
    count: u64,
    sum_ms: f64,
    min_ms: f64,
    max_ms: f64,
}

/// Snapshot of the session's inference statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionStats {
    pub total_inferences: u64,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Drives the acoustic model.
pub struct InferenceSession {
    graph: Box<dyn InferenceGraph>,
    /// Style vector length declared by the graph's second input, when the
    /// declaration is static.
    style_dim: Option<usize>,
    has_pitch_input: bool,
    stats: Mutex<LatencyAccum>,
    invocations: AtomicU64,
}

impl InferenceSession {
    /// Wrap an already-loaded graph.
    pub fn from_graph(graph: Box<dyn InferenceGraph>) -> Self {
        let inputs = graph.input_info();
        let style_dim = inputs
            .get(1)
            .and_then(|info| info.shape.last())
            .and_then(|&dim| usize::try_from(dim).ok())
            .filter(|&dim| dim > 0);
        let has_pitch_input = inputs.len() > 3;
        log::info!(
            "Inference session ready: {} inputs, style_dim={:?}, pitch_input={}",
            inputs.len(),
            style_dim,
            has_pitch_input
        );
        Self {
            graph,
            style_dim,
            has_pitch_input,
            stats: Mutex::new(LatencyAccum::default()),
            invocations: AtomicU64::new(0),
        }
    }

    /// Load the acoustic model from a file path.
    pub fn load(path: &Path, options: GraphOptions) -> Result<Self, TtsError> {
        Ok(Self::from_graph(Box::new(OrtGraph::load(path, options)?)))
    }

    /// Load the acoustic model from an in-memory buffer.
    pub fn load_from_memory(model: &[u8], options: GraphOptions) -> Result<Self, TtsError> {
        Ok(Self::from_graph(Box::new(OrtGraph::load_from_memory(
            model, options,
        )?)))
    }

    pub fn input_info(&self) -> &[TensorInfo] {
        self.graph.input_info()
    }

    pub fn output_info(&self) -> &[TensorInfo] {
        self.graph.output_info()
    }

    /// Style vector length the graph declares, when static.
    pub fn style_dim(&self) -> Option<usize> {
        self.style_dim
    }

    /// Total number of `run` invocations since the last stats reset.
    pub fn total_inferences(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Run the acoustic model.
    ///
    /// Failures are logged and yield an empty buffer; the orchestrator
    /// promotes an empty buffer to an inference failure status.
    pub fn infer(&self, tokens: &[i64], style: &[f32], speed: f32, pitch: f32) -> Vec<f32> {
        let inputs = self.graph.input_info();
        if inputs.is_empty() {
            log::error!("inference attempted against a graph with no declared inputs");
            return Vec::new();
        }

        let name = |index: usize, fallback: &str| -> String {
            inputs
                .get(index)
                .map(|info| info.name.clone())
                .unwrap_or_else(|| fallback.to_string())
        };

        let mut feed = vec![
            TensorInput::i64(name(0, "tokens"), vec![1, tokens.len()], tokens.to_vec()),
            TensorInput::f32(name(1, "style"), vec![1, style.len()], style.to_vec()),
            TensorInput::f32(name(2, "speed"), vec![1], vec![speed]),
        ];
        if self.has_pitch_input {
            feed.push(TensorInput::f32(name(3, "pitch"), vec![1], vec![pitch]));
        }

        let start = Instant::now();
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let result = self.graph.run(&feed);
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        let samples = match result {
            Ok(TensorData::F32(samples)) => samples,
            Ok(TensorData::I64(values)) => {
                // Unexpected but salvageable: some exported graphs emit
                // int waveforms.
                values.into_iter().map(|v| v as f32 / 32768.0).collect()
            }
            Err(err) => {
                log::error!("inference failed: {err}");
                return Vec::new();
            }
        };

        let mut accum = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        accum.count += 1;
        accum.sum_ms += elapsed_ms;
        accum.min_ms = if accum.count == 1 {
            elapsed_ms
        } else {
            accum.min_ms.min(elapsed_ms)
        };
        accum.max_ms = accum.max_ms.max(elapsed_ms);
        drop(accum);

        samples
    }

    /// Run a dummy inference to page in weights and prime the runtime's
    /// thread pools, then reset latency statistics.
    pub fn warmup(&self) {
        let dummy_tokens = vec![1i64; 10];
        let style = vec![0.0f32; self.style_dim.unwrap_or(128)];
        let _ = self.infer(&dummy_tokens, &style, 1.0, 1.0);
        self.reset_stats();
    }

    pub fn stats(&self) -> SessionStats {
        let accum = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        SessionStats {
            total_inferences: accum.count,
            mean_ms: if accum.count > 0 {
                accum.sum_ms / accum.count as f64
            } else {
                0.0
            },
            min_ms: if accum.count > 0 { accum.min_ms } else { 0.0 },
            max_ms: accum.max_ms,
        }
    }

    pub fn reset_stats(&self) {
        let mut accum = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        *accum = LatencyAccum::default();
        self.invocations.store(0, Ordering::Relaxed);
    }
}
