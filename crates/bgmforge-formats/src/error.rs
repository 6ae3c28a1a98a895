//! Error types for container parsing and header synthesis.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for format operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors that can occur while reading or writing audio containers.
#[derive(Debug, Error)]
pub enum FormatError {
    /// A fixed magic marker was not where the format requires it.
    #[error("malformed container {path}: missing '{marker}' marker")]
    MalformedContainer {
        /// File being parsed.
        path: PathBuf,
        /// The marker that failed to match (e.g. `RIFF`, `fmt `).
        marker: &'static str,
    },

    /// The file ended before a fixed-size structure could be read.
    #[error("truncated container {path}: needed {needed} bytes, {available} available")]
    TruncatedContainer {
        /// File being parsed.
        path: PathBuf,
        /// Bytes required by the structure.
        needed: u64,
        /// Bytes actually present.
        available: u64,
    },

    /// The companion file required by a container is missing.
    #[error("missing companion file: {path}")]
    MissingCompanionFile {
        /// Expected location of the companion file.
        path: PathBuf,
    },

    /// The format fields cannot describe a valid stream.
    #[error("unsupported format: {reason}")]
    UnsupportedFormat {
        /// Why the format was rejected.
        reason: String,
    },

    /// I/O error on a specific file.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl FormatError {
    /// Creates a malformed container error.
    pub fn malformed(path: impl Into<PathBuf>, marker: &'static str) -> Self {
        Self::MalformedContainer {
            path: path.into(),
            marker,
        }
    }

    /// Creates an unsupported format error.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            reason: reason.into(),
        }
    }

    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns a stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            FormatError::MalformedContainer { .. } => "FMT_001",
            FormatError::TruncatedContainer { .. } => "FMT_002",
            FormatError::MissingCompanionFile { .. } => "FMT_003",
            FormatError::UnsupportedFormat { .. } => "FMT_004",
            FormatError::Io { .. } => "FMT_005",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_marker() {
        let err = FormatError::malformed("song.wav", "fmt ");
        assert!(err.to_string().contains("'fmt '"));
        assert!(err.to_string().contains("song.wav"));
        assert_eq!(err.code(), "FMT_001");
    }

    #[test]
    fn test_truncated_display() {
        let err = FormatError::TruncatedContainer {
            path: PathBuf::from("BGM.xwb"),
            needed: 26640,
            available: 100,
        };
        assert!(err.to_string().contains("26640"));
    }
}
