//! Error types for quakesplit.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for split operations.
pub type Result<T> = std::result::Result<T, SplitError>;

/// Unified error type for the splitter and its collaborators.
#[derive(Error, Debug)]
pub enum SplitError {
    // Input errors (10-19)
    #[error("schema validation failed: {0}")]
    Schema(String),

    #[error("input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("unexpected file extension for '{}': expected .{expected}", .path.display())]
    InvalidExtension { path: PathBuf, expected: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Processing errors (20-29)
    #[error("cannot finalize statistics: {0}")]
    Finalization(String),

    #[error("split cancelled after {segments} segment(s)")]
    Cancelled { segments: usize },

    #[error("corrupted metadata file: {0}")]
    CorruptedMetadata(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SplitError {
    /// Stable numeric code for this error kind, used as the process exit code.
    pub fn code(&self) -> u8 {
        match self {
            SplitError::Schema(_) => 10,
            SplitError::FileNotFound(_) => 11,
            SplitError::InvalidExtension { .. } => 12,
            SplitError::InvalidConfig(_) => 13,
            SplitError::Finalization(_) => 20,
            SplitError::Cancelled { .. } => 21,
            SplitError::CorruptedMetadata(_) => 22,
            SplitError::Io(_) => 60,
            SplitError::Csv(_) => 61,
            SplitError::Json(_) => 62,
        }
    }
}
