//! Error types for the PSD font finder library

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the PSD font finder library
#[derive(Error, Debug)]
pub enum Error {
    /// Root directory missing or not a directory
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// Output destination could not be created or written
    #[error("Cannot write output file {}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Existing output could not be read back (append mode)
    #[error("Cannot read existing output file {}: {reason}", .path.display())]
    OutputRead { path: PathBuf, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid glob pattern built from the root directory
    #[error("Invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// File does not start with the `8BPS` signature
    #[error("Not a PSD/PSB file (bad signature)")]
    InvalidSignature,

    /// Header version other than 1 (PSD) or 2 (PSB)
    #[error("Unsupported PSD version: {0}")]
    UnsupportedVersion(u16),

    /// A section ended before its declared length
    #[error("Unexpected end of data while reading {0}")]
    Truncated(&'static str),

    /// Layer record does not follow the expected layout
    #[error("Invalid layer record: {0}")]
    InvalidLayerRecord(String),

    /// Text engine data could not be interpreted
    #[error("Malformed text data: {0}")]
    MalformedTextData(String),
}

impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::InvalidGlob(err.to_string())
    }
}
