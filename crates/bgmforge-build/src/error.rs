//! Error types for music builds.
//!
//! [`BuildError`] stops a whole run. [`ItemError`] is scoped to one source
//! file and is collected into the build summary while siblings continue.

use std::path::{Path, PathBuf};

use bgmforge_formats::FormatError;
use thiserror::Error;

use crate::encoder::EncodeError;

/// Result type for whole-run operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Result type for per-source operations.
pub type ItemResult<T> = Result<T, ItemError>;

/// Errors that abort a build run.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The encoder executable could not be located.
    #[error("{name} could not be found. Place it in {dependencies_dir}, pass --encoder, or set BGMFORGE_ENCODER")]
    MissingDependency {
        name: String,
        dependencies_dir: PathBuf,
    },

    /// The music data file could not be read or parsed.
    #[error("Failed to parse music data {path}: {source}")]
    MusicData {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The output directory already holds more files than a build produces.
    #[error("Output directory {path} has an unusually large amount of files ({count}), refusing to clear it")]
    SuspiciousOutputDir { path: PathBuf, count: usize },

    /// No profile exists for the requested game.
    #[error("Unsupported game '{key}'. Expected one of: {expected}")]
    UnknownGame { key: String, expected: String },

    /// The worker pool could not be created.
    #[error("Failed to create worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// IO error on a specific path.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Wraps an IO error with the path it happened on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Returns a stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            BuildError::MissingDependency { .. } => "BLD_001",
            BuildError::MusicData { .. } => "BLD_002",
            BuildError::SuspiciousOutputDir { .. } => "BLD_003",
            BuildError::UnknownGame { .. } => "BLD_004",
            BuildError::ThreadPool(_) => "BLD_005",
            BuildError::Io { .. } => "BLD_006",
        }
    }
}

/// Errors scoped to a single source file.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The external encoder failed.
    #[error(transparent)]
    Encoder(#[from] EncodeError),

    /// A WAVE header could not be read.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// The source header yields no usable sample count.
    #[error("Failed to calculate total samples of {path}. Re-converting the file to WAV can sometimes fix this")]
    InvalidSampleCount { path: PathBuf },

    /// A sidecar the step depends on is missing.
    #[error("Expected sidecar file was not found: {path}")]
    MissingSidecar { path: PathBuf },

    /// A sidecar exists but cannot be interpreted.
    #[error("Invalid sidecar file {path}: {reason}")]
    InvalidSidecar { path: PathBuf, reason: String },

    /// The file type is neither encodable nor already encoded.
    #[error("Unknown file type: {path}")]
    UnsupportedInput { path: PathBuf },

    /// Another source already owns this source's cache file name.
    #[error("{path} has the same file name as {other} and would overwrite its cached encode. Rename one of them")]
    CacheNameCollision { path: PathBuf, other: PathBuf },

    /// A song has a replacement but nowhere to put it.
    #[error("Song '{song}' has no output file path")]
    MissingOutputPath { song: String },

    /// IO error on a specific path.
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ItemError {
    /// Wraps an IO error with the path it happened on.
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_count_error_carries_hint() {
        let err = ItemError::InvalidSampleCount {
            path: PathBuf::from("song.wav"),
        };
        assert!(err.to_string().contains("Re-converting the file to WAV"));
    }

    #[test]
    fn test_build_error_codes_are_distinct() {
        let a = BuildError::UnknownGame {
            key: "p9".into(),
            expected: "p4g".into(),
        };
        let b = BuildError::SuspiciousOutputDir {
            path: PathBuf::from("out"),
            count: 101,
        };
        assert_ne!(a.code(), b.code());
        assert!(b.to_string().contains("101"));
    }
}
