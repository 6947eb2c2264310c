use thiserror::Error;

/// Session-level errors using thiserror for structured error handling.
///
/// The rule engine itself never fails; these errors belong to its external
/// collaborators (detector, frame source, configuration) and to the
/// orchestration loop that drives them.

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Detection model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Inference failed for frame at {timestamp:.3}s")]
    InferenceFailed {
        timestamp: f64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl DetectorError {
    /// Whether the whole session must stop
    pub fn is_fatal(&self) -> bool {
        matches!(self, DetectorError::ModelUnavailable(_))
    }
}

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("No decodable video track")]
    NoVideoTrack,

    #[error("Failed to decode frame {index}")]
    DecodeFailed {
        index: u64,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed recording at line {line}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Detector failed")]
    Detector(#[from] DetectorError),

    #[error("Frame source failed")]
    Source(#[from] SourceError),

    #[error("Session cancelled")]
    Cancelled,

    #[error("Frame decoder thread terminated unexpectedly")]
    DecoderPanicked,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Could not determine configuration directory")]
    NoConfigDir,
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
