//! Error types for the Taleweaver pipeline.
//!
//! Errors are organized by stage so the presentation layer can tell a bad
//! upload apart from an unavailable upstream service, while every message still
//! carries the relevant context (file path, service name, HTTP status).

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Taleweaver operations.
#[derive(Error, Debug)]
pub enum TaleweaverError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A required API token could not be resolved
    #[error("Missing secret {name}: {hint}")]
    MissingSecret { name: String, hint: String },
}

/// Pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Uploaded file does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Upload exceeds the size limit
    #[error("File too large: {path} ({size_mb}MB > {max_mb}MB)")]
    FileTooLarge {
        path: PathBuf,
        size_mb: u64,
        max_mb: u64,
    },

    /// Upload is not a jpg/jpeg/png
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// Upload content does not match its declared format
    #[error("Invalid image {path}: {message}")]
    InvalidImage { path: PathBuf, message: String },

    /// Captioning model failed to load or run
    #[error("Caption error for {path}: {message}")]
    Caption { path: PathBuf, message: String },

    /// Story generation request failed in transport
    #[error("Story generation failed: {message}")]
    Story { message: String },

    /// Speech synthesis request failed in transport
    #[error("Speech synthesis failed: {message}")]
    Speech { message: String },

    /// Upstream service answered with a non-success status
    #[error("{service} service returned HTTP {status}: {body}")]
    Upstream {
        service: String,
        status: u16,
        body: String,
    },

    /// Upstream response body did not have the expected shape
    #[error("Unexpected {service} response: {message}")]
    UnexpectedResponse { service: String, message: String },

    /// A stage did not finish within its time budget
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// Writing a session artifact failed
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    /// True when the failure came from an external service being unreachable,
    /// slow, or answering with something unusable.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            PipelineError::Story { .. }
                | PipelineError::Speech { .. }
                | PipelineError::Upstream { .. }
                | PipelineError::UnexpectedResponse { .. }
                | PipelineError::Timeout { .. }
        )
    }

    /// True when the failure is caused by the uploaded file itself.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            PipelineError::FileNotFound(_)
                | PipelineError::FileTooLarge { .. }
                | PipelineError::UnsupportedFormat { .. }
                | PipelineError::InvalidImage { .. }
        )
    }
}

/// Convenience type alias for Taleweaver results.
pub type Result<T> = std::result::Result<T, TaleweaverError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
