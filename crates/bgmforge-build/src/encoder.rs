//! Encoder seam.
//!
//! The codecs themselves are external executables. [`ExternalEncoder`] runs
//! them as subprocesses; tests substitute their own [`Encoder`].

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::config::BuildConfig;
use crate::error::{BuildError, BuildResult};
use crate::music_data::LoopPoints;
use crate::profile::{GameProfile, ARG_INPUT, ARG_LOOP, ARG_OUTPUT};

/// Environment variable naming the encoder executable.
pub const ENCODER_ENV_VAR: &str = "BGMFORGE_ENCODER";

/// One encode job.
#[derive(Debug, Clone, Copy)]
pub struct EncodeRequest<'a> {
    pub input: &'a Path,
    pub output: &'a Path,
    pub loop_points: LoopPoints,
}

/// Errors from a single encoder invocation.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The encoder process could not be started.
    #[error("Failed to spawn encoder {program}: {source}")]
    SpawnFailed {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The encoder exited with non-zero status.
    #[error("Encoder exited with status {exit_code}: {stderr}")]
    ProcessFailed { exit_code: i32, stderr: String },

    /// The encoder exited cleanly without producing its output.
    #[error("Encoder output not found: {path}")]
    OutputNotFound { path: PathBuf },
}

/// Turns a source file into the game's encoded format.
pub trait Encoder: Send + Sync {
    /// Encodes `request.input` into `request.output`.
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<(), EncodeError>;
}

/// Loop arguments understood by the ADX encoder.
pub fn adx_loop_args(points: LoopPoints) -> Vec<String> {
    if points.is_whole_track() {
        vec!["-lpa".to_string()]
    } else {
        vec![
            format!("-lps={}", points.start),
            format!("-lpe={}", points.end),
            "-nodelterm".to_string(),
        ]
    }
}

/// Runs an encoder executable with a profile's argument template.
#[derive(Debug, Clone)]
pub struct ExternalEncoder {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalEncoder {
    /// Creates an encoder running `program` with the argument template `args`.
    pub fn new(
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Locates the profile's encoder and uses its argument template.
    pub fn for_profile(profile: &GameProfile, config: &BuildConfig) -> BuildResult<Self> {
        let program = find_encoder(profile, config)?;
        log::debug!("Using encoder {}", program.display());
        Ok(Self::new(program, profile.encode_args.iter().copied()))
    }

    /// Path of the executable.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Expands the argument template for `request`.
    pub fn command_args(&self, request: &EncodeRequest<'_>) -> Vec<OsString> {
        let mut args = Vec::with_capacity(self.args.len() + 2);
        for arg in &self.args {
            match arg.as_str() {
                ARG_INPUT => args.push(request.input.as_os_str().to_owned()),
                ARG_OUTPUT => args.push(request.output.as_os_str().to_owned()),
                ARG_LOOP => args.extend(
                    adx_loop_args(request.loop_points)
                        .into_iter()
                        .map(OsString::from),
                ),
                other => args.push(OsString::from(other)),
            }
        }
        args
    }
}

impl Encoder for ExternalEncoder {
    fn encode(&self, request: &EncodeRequest<'_>) -> Result<(), EncodeError> {
        log::debug!(
            "Encoding {} -> {}",
            request.input.display(),
            request.output.display()
        );

        let output = Command::new(&self.program)
            .args(self.command_args(request))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| EncodeError::SpawnFailed {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(EncodeError::ProcessFailed {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !request.output.exists() {
            return Err(EncodeError::OutputNotFound {
                path: request.output.to_path_buf(),
            });
        }
        Ok(())
    }
}

/// Finds the encoder executable for `profile`.
///
/// Lookup order: the configured path, [`ENCODER_ENV_VAR`], the
/// dependencies directory, then `PATH`.
pub fn find_encoder(profile: &GameProfile, config: &BuildConfig) -> BuildResult<PathBuf> {
    // Check config override first
    if let Some(ref path) = config.encoder_path {
        if path.exists() {
            return Ok(path.clone());
        }
        log::warn!("Configured encoder {} does not exist", path.display());
    }

    if let Ok(path) = std::env::var(ENCODER_ENV_VAR) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Ok(path);
        }
    }

    let file_name = profile.encoder_file_name();
    let bundled = config.dependencies_dir.join(&file_name);
    if bundled.exists() {
        return Ok(bundled);
    }

    if let Ok(path) = which::which(&file_name) {
        return Ok(path);
    }

    Err(BuildError::MissingDependency {
        name: file_name,
        dependencies_dir: config.dependencies_dir.clone(),
    })
}
