//! Voice descriptors and the voice registry.
//!
//! Voices load from JSON descriptor files, one per voice:
//!
//! ```json
//! {
//!     "id": "jf_alpha",
//!     "name": "Alpha",
//!     "language": "ja",
//!     "gender": "female",
//!     "style_vector": [0.01, -0.23, ...],
//!     "default_speed": 1.0,
//!     "default_pitch": 1.0
//! }
//! ```
//!
//! A directory load parses every `.json` file; a descriptor that fails to
//! parse is logged and skipped without aborting the rest. Voices are
//! immutable once loaded.

use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::TtsError;
use crate::types::VoiceGender;

/// One loaded voice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub gender: VoiceGender,
    /// Style embedding conditioning the acoustic model. Its length must
    /// match the model's declared style input.
    #[serde(alias = "style")]
    pub style_vector: Vec<f32>,
    #[serde(default = "default_scalar")]
    pub default_speed: f32,
    #[serde(default = "default_scalar")]
    pub default_pitch: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
}

fn default_language() -> String {
    "ja".to_string()
}

fn default_scalar() -> f32 {
    1.0
}

impl Voice {
    /// Approximate heap footprint for memory accounting.
    fn memory_footprint(&self) -> usize {
        self.id.len()
            + self.name.len()
            + self.language.len()
            + self.style_vector.len() * 4
            + self.description.as_ref().map_or(0, String::len)
            + self.preview_url.as_ref().map_or(0, String::len)
    }
}

/// Thread-safe registry of loaded voices.
///
/// Reads take a shared lock; mutations (load/unload/set-default) take the
/// exclusive lock. The first successfully loaded voice becomes the default
/// unless one is set explicitly.
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    inner: RwLock<RegistryInner>,
    /// Style length the acoustic model expects; descriptors that disagree
    /// are rejected at load.
    expected_style_dim: RwLock<Option<usize>>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    voices: HashMap<String, Voice>,
    default_id: String,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the style length the session declares; subsequent loads
    /// validate against it.
    pub fn set_expected_style_dim(&self, dim: Option<usize>) {
        *self
            .expected_style_dim
            .write()
            .unwrap_or_else(|e| e.into_inner()) = dim;
    }

    fn validate(&self, voice: &Voice) -> Result<(), TtsError> {
        if voice.id.is_empty() {
            return Err(TtsError::InvalidInput("voice descriptor without id".into()));
        }
        if voice.style_vector.is_empty() {
            return Err(TtsError::InvalidInput(format!(
                "voice {} has no style vector",
                voice.id
            )));
        }
        let expected = *self
            .expected_style_dim
            .read()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(dim) = expected {
            if voice.style_vector.len() != dim {
                return Err(TtsError::InvalidInput(format!(
                    "voice {} style vector has {} elements, model expects {}",
                    voice.id,
                    voice.style_vector.len(),
                    dim
                )));
            }
        }
        Ok(())
    }

    /// Register a parsed voice.
    pub fn add(&self, voice: Voice) -> Result<(), TtsError> {
        self.validate(&voice)?;
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.default_id.is_empty() {
            inner.default_id = voice.id.clone();
        }
        log::info!("Loaded voice {} ({} dims)", voice.id, voice.style_vector.len());
        inner.voices.insert(voice.id.clone(), voice);
        Ok(())
    }

    /// Build and register a voice from a bare style vector.
    pub fn add_from_style(&self, id: impl Into<String>, style_vector: Vec<f32>) -> Result<(), TtsError> {
        let id = id.into();
        self.add(Voice {
            name: id.clone(),
            id,
            language: default_language(),
            gender: VoiceGender::Neutral,
            style_vector,
            default_speed: 1.0,
            default_pitch: 1.0,
            description: None,
            preview_url: None,
        })
    }

    /// Load one descriptor file. A descriptor without an `id` field takes
    /// the file stem as its id.
    pub fn load_file(&self, path: &Path) -> Result<(), TtsError> {
        let content = std::fs::read_to_string(path)
            .map_err(|_| TtsError::FileNotFound(path.display().to_string()))?;
        let mut voice: Voice = serde_json::from_str(&content)?;
        if voice.id.is_empty() {
            voice.id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
        }
        if voice.name.is_empty() {
            voice.name = voice.id.clone();
        }
        self.add(voice)
    }

    /// Load every `.json` descriptor in a directory. Returns the number
    /// loaded; individual parse failures are logged and skipped.
    pub fn load_dir(&self, dir: &Path) -> Result<usize, TtsError> {
        if !dir.is_dir() {
            return Err(TtsError::FileNotFound(dir.display().to_string()));
        }
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match self.load_file(&path) {
                Ok(()) => loaded += 1,
                Err(err) => log::warn!("skipping voice {}: {err}", path.display()),
            }
        }
        Ok(loaded)
    }

    pub fn get(&self, id: &str) -> Option<Voice> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.voices.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.voices.contains_key(id)
    }

    /// All voices, sorted by id.
    pub fn list(&self) -> Vec<Voice> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut voices: Vec<Voice> = inner.voices.values().cloned().collect();
        voices.sort_by(|a, b| a.id.cmp(&b.id));
        voices
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn set_default(&self, id: &str) -> Result<(), TtsError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if !inner.voices.contains_key(id) {
            return Err(TtsError::VoiceNotFound(id.to_string()));
        }
        inner.default_id = id.to_string();
        Ok(())
    }

    pub fn default_id(&self) -> String {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.default_id.clone()
    }

    /// Remove a voice. Removing the default promotes an arbitrary
    /// remaining voice.
    pub fn unload(&self, id: &str) -> Result<(), TtsError> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if inner.voices.remove(id).is_none() {
            return Err(TtsError::VoiceNotFound(id.to_string()));
        }
        if inner.default_id == id {
            inner.default_id = inner.voices.keys().next().cloned().unwrap_or_default();
        }
        Ok(())
    }

    /// Serialize one voice back to descriptor JSON.
    pub fn export(&self, id: &str, path: &Path) -> Result<(), TtsError> {
        let voice = self
            .get(id)
            .ok_or_else(|| TtsError::VoiceNotFound(id.to_string()))?;
        std::fs::write(path, serde_json::to_string_pretty(&voice)?)?;
        Ok(())
    }

    /// Approximate bytes held by loaded voices.
    pub fn memory_usage(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .voices
            .values()
            .map(|v| std::mem::size_of::<Voice>() + v.memory_footprint())
            .sum()
    }
}
