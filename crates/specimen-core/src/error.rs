//! Error types for the Specimen normalization pipeline.
//!
//! Errors are organized by stage. Only a few of them ever reach the caller:
//! most stages degrade instead of failing, and the errors they produce are
//! logged and folded into the stage's own outcome type.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for Specimen operations.
#[derive(Error, Debug)]
pub enum SpecimenError {
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
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image decoding failed
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// Re-encoding the normalized image failed
    #[error("Encode error: {message}")]
    Encode { message: String },

    /// The background-removal service call failed
    #[error("Background removal failed: {message}")]
    Removal {
        message: String,
        status_code: Option<u16>,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// Buffer exceeds size limit
    #[error("Image too large: {size_mb}MB > {max_mb}MB")]
    FileTooLarge { size_mb: u64, max_mb: u64 },

    /// Image dimensions exceed limit
    #[error("Image too large: {width}x{height} > {max_dim}")]
    ImageTooLarge {
        width: u32,
        height: u32,
        max_dim: u32,
    },

    /// Unsupported or unrecognized image format
    #[error("Unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// No canonical output could be produced from the input
    #[error("Unprocessable input: {message}")]
    Unprocessable { message: String },
}

/// Convenience type alias for Specimen results.
pub type Result<T> = std::result::Result<T, SpecimenError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
