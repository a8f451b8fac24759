//! Error types for target resolution and document merging.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from normalizing a directive target against its containing
/// document. These are recoverable: the engine logs a warning and leaves
/// the directive unresolved.
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("empty target")]
    EmptyTarget,

    #[error("invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

/// Errors that abort a merge invocation.
///
/// Partial output from a failed merge must not be treated as valid.
#[derive(Debug, Error)]
pub enum MergeError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid document {location}: {message}")]
    InvalidDocument { location: String, message: String },

    #[error("fragment '#{fragment}' not found in {location}")]
    FragmentNotFound { fragment: String, location: String },

    // Structural errors (exit code 2)
    #[error("cannot splice sequence content at '{path}': destination object has other keys")]
    SequenceConflict { path: String },

    #[error("cannot splice scalar content at '{path}': destination object has other keys")]
    ScalarConflict { path: String },
}

impl MergeError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            MergeError::FileNotFound { .. } | MergeError::ReadError { .. } => 3,
            _ => 2,
        }
    }
}
