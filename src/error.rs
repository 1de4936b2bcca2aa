use thiserror::Error;

/// Central error type for the deep-voice-detector crate.
#[derive(Debug, Error)]
pub enum DetectError {
    // Generic fallback (wraps anyhow)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),

    // Request surface
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("Failed to acquire source: {message}")]
    Acquisition { message: String, retryable: bool },

    // Pipeline
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error("Checksum mismatch for {path}")]
    Checksum { path: String },

    #[error("Failed to decode audio: {0}")]
    Decode(String),

    #[error("Separation failed: {0}")]
    Separation(String),

    #[error("Feature extraction failed: {0}")]
    Feature(String),

    #[error("All inferences failed.")]
    NoValidPredictions,

    #[error("Cache dir not available")]
    CacheDirUnavailable,
}

impl DetectError {
    pub fn acquisition(message: impl Into<String>, retryable: bool) -> Self {
        DetectError::Acquisition {
            message: message.into(),
            retryable,
        }
    }

    /// HTTP-style status a transport should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            DetectError::Validation(_) | DetectError::Unauthorized(_) => 400,
            DetectError::Forbidden(_) => 403,
            DetectError::Acquisition { .. } => 502,
            _ => 500,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, DetectError::Acquisition { retryable: true, .. })
    }
}

/// Failure while scoring a single segment. Never aborts a request; the
/// aggregator records it as a null prediction.
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference failed: {0}")]
    Runtime(String),

    #[error("model returned no output")]
    EmptyOutput,

    #[error("model returned a non-finite score: {0}")]
    NonFinite(f32),
}

// --- Implement From conversions for common errors ---
impl From<std::io::Error> for DetectError {
    fn from(e: std::io::Error) -> Self {
        DetectError::Anyhow(e.into())
    }
}

impl From<serde_json::Error> for DetectError {
    fn from(e: serde_json::Error) -> Self {
        DetectError::Anyhow(e.into())
    }
}

impl From<reqwest::Error> for DetectError {
    fn from(e: reqwest::Error) -> Self {
        let retryable = e.is_timeout()
            || e.is_connect()
            || e.status().map(|s| s.is_server_error()).unwrap_or(false);
        DetectError::Acquisition {
            message: e.to_string(),
            retryable,
        }
    }
}

impl From<hex::FromHexError> for DetectError {
    fn from(e: hex::FromHexError) -> Self {
        DetectError::Anyhow(e.into())
    }
}

pub type Result<T> = std::result::Result<T, DetectError>;
