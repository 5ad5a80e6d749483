//! Audio sample buffers and post-processing.
//!
//! The pipeline produces mono float32 buffers in [-1, 1]. Post-processing
//! applies the request volume, optional peak normalization to 0.95, and a
//! final clamp before any PCM conversion.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::TtsError;

/// Peak level that normalization targets, leaving headroom against
/// clipping after downstream processing.
pub const NORMALIZE_PEAK: f32 = 0.95;

/// Mono audio buffer with sample metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u64,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        let duration_ms = duration_ms(samples.len(), sample_rate);
        Self {
            samples,
            sample_rate,
            channels: 1,
            duration_ms,
        }
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// Convert to interleaved PCM16.
    pub fn to_pcm16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|&s| (s.clamp(-1.0, 1.0) * 32767.0) as i16)
            .collect()
    }

    /// Write the buffer as a WAV file. PCM16 by default; pass
    /// `float = true` for 32-bit float samples.
    pub fn write_wav(&self, path: &Path, float: bool) -> Result<(), TtsError> {
        let spec = hound::WavSpec {
            channels: self.channels.max(1),
            sample_rate: self.sample_rate,
            bits_per_sample: if float { 32 } else { 16 },
            sample_format: if float {
                hound::SampleFormat::Float
            } else {
                hound::SampleFormat::Int
            },
        };
        let mut writer = hound::WavWriter::create(path, spec)?;
        if float {
            for &sample in &self.samples {
                writer.write_sample(sample.clamp(-1.0, 1.0))?;
            }
        } else {
            for sample in self.to_pcm16() {
                writer.write_sample(sample)?;
            }
        }
        writer.finalize()?;
        Ok(())
    }
}

pub(crate) fn duration_ms(sample_count: usize, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    (sample_count as u64 * 1000) / sample_rate as u64
}

/// Scale samples by `volume` in place.
pub fn apply_volume(samples: &mut [f32], volume: f32) {
    if (volume - 1.0).abs() < f32::EPSILON {
        return;
    }
    for sample in samples {
        *sample *= volume;
    }
}

/// Peak-normalize to [`NORMALIZE_PEAK`]. Silent buffers are untouched.
pub fn normalize_peak(samples: &mut [f32]) {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak == 0.0 {
        return;
    }
    let scale = NORMALIZE_PEAK / peak;
    for sample in samples {
        *sample *= scale;
    }
}

/// Clamp every sample to [-1, 1].
pub fn clamp(samples: &mut [f32]) {
    for sample in samples {
        *sample = sample.clamp(-1.0, 1.0);
    }
}

/// Full post-processing chain: volume, optional normalization, clamp.
pub fn post_process(samples: &mut Vec<f32>, volume: f32, normalize: bool) {
    apply_volume(samples, volume);
    if normalize {
        normalize_peak(samples);
    }
    clamp(samples);
}

/// Drop leading and trailing samples below `threshold`.
pub fn trim_silence(samples: &[f32], threshold: f32) -> Vec<f32> {
    let start = samples.iter().position(|s| s.abs() > threshold);
    let end = samples.iter().rposition(|s| s.abs() > threshold);
    match (start, end) {
        (Some(start), Some(end)) if start <= end => samples[start..=end].to_vec(),
        _ => Vec::new(),
    }
}
