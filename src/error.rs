use crate::types::Status;

/// Errors surfaced by loading and configuration APIs.
///
/// Synthesis itself never returns this type across the engine boundary:
/// a failed synthesis produces a [`crate::types::TtsResult`] whose
/// `status` field carries the failure kind. `TtsError` is for the
/// operations that have no result object to attach a status to (model
/// loading, voice parsing, dictionary I/O).
#[derive(thiserror::Error, Debug)]
pub enum TtsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("file not found: {0}")]
    FileNotFound(String),
    #[error("engine not initialized; call initialize() first")]
    NotInitialized,
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
    #[error("model not loaded: {0}")]
    ModelNotLoaded(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("voice not found: {0}")]
    VoiceNotFound(String),
    #[error("request cancelled")]
    Cancelled,
    #[error("operation timed out")]
    Timeout,
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),
    #[error("{0}")]
    Unknown(String),
}

impl TtsError {
    /// Map an error to the status code a synthesis result would carry.
    pub fn status(&self) -> Status {
        match self {
            TtsError::InvalidInput(_) => Status::InvalidInput,
            TtsError::FileNotFound(_) | TtsError::Io(_) => Status::FileNotFound,
            TtsError::NotInitialized => Status::NotInitialized,
            TtsError::InitializationFailed(_) => Status::InitializationFailed,
            TtsError::ModelNotLoaded(_) => Status::ModelNotLoaded,
            TtsError::InferenceFailed(_) | TtsError::Ort(_) | TtsError::Shape(_) => {
                Status::InferenceFailed
            }
            TtsError::VoiceNotFound(_) => Status::VoiceNotFound,
            TtsError::Cancelled => Status::Cancelled,
            TtsError::Timeout => Status::Timeout,
            TtsError::Json(_) => Status::InvalidInput,
            TtsError::Wav(_) | TtsError::Unknown(_) => Status::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_taxonomy() {
        assert_eq!(
            TtsError::VoiceNotFound("jf_alpha".into()).status(),
            Status::VoiceNotFound
        );
        assert_eq!(TtsError::NotInitialized.status(), Status::NotInitialized);
        assert_eq!(TtsError::Cancelled.status(), Status::Cancelled);
        assert_eq!(
            TtsError::InferenceFailed("boom".into()).status(),
            Status::InferenceFailed
        );
    }

    #[test]
    fn messages_name_the_subject() {
        let err = TtsError::VoiceNotFound("does_not_exist".into());
        assert!(err.to_string().contains("does_not_exist"));
    }
}
