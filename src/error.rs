//! Error types for Splitcast.

use crate::chat::ChatError;
use thiserror::Error;

/// Why acquiring a source failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionKind {
    /// Upstream metadata came back without streaming data. Transient.
    MissingStreamingData,
    /// Metadata or manifest could not be resolved.
    Manifest,
    /// The media download or recording did not complete.
    Download,
}

impl std::fmt::Display for AcquisitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquisitionKind::MissingStreamingData => write!(f, "missing streaming data"),
            AcquisitionKind::Manifest => write!(f, "manifest"),
            AcquisitionKind::Download => write!(f, "download"),
        }
    }
}

/// Library-level error type for Splitcast operations.
#[derive(Error, Debug)]
pub enum SplitcastError {
    #[error("Unsupported platform: {0}. Only YouTube and Twitch links are supported.")]
    UnsupportedPlatform(String),

    #[error("Could not fetch the media ({kind}): {message}")]
    Acquisition { kind: AcquisitionKind, message: String },

    #[error("Invalid media duration: {0}s")]
    InvalidDuration(f64),

    /// `part` is the 1-based segment number shown to users.
    #[error("Encoding part {part} failed: {message}")]
    Encode { part: usize, message: String },

    #[error("None of the {0} parts could be encoded")]
    NothingEncoded(usize),

    #[error("Sending part {part} failed after {attempts} attempts: {message}")]
    Delivery {
        part: usize,
        attempts: u32,
        message: String,
    },

    #[error("Chat error: {0}")]
    Chat(#[from] ChatError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid session transition: {0}")]
    InvalidTransition(String),
}

impl SplitcastError {
    /// Shorthand for an acquisition error.
    pub fn acquisition(kind: AcquisitionKind, message: impl Into<String>) -> Self {
        SplitcastError::Acquisition {
            kind,
            message: message.into(),
        }
    }

    /// Whether this error allows the whole session pipeline to start over.
    pub fn is_pipeline_retryable(&self) -> bool {
        matches!(
            self,
            SplitcastError::Acquisition {
                kind: AcquisitionKind::MissingStreamingData,
                ..
            }
        )
    }
}

/// Result type alias for Splitcast operations.
pub type Result<T> = std::result::Result<T, SplitcastError>;
