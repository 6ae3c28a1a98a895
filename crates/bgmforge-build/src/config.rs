//! Build configuration.

use std::path::PathBuf;

/// Default cache root, relative to the working directory.
pub const DEFAULT_CACHE_ROOT: &str = "cached";

/// Default directory searched for encoder executables.
pub const DEFAULT_DEPENDENCIES_DIR: &str = "dependencies";

/// How sources are scheduled during a build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Parallelism {
    /// One worker per available core.
    #[default]
    Full,
    /// Strictly sequential, for machines that struggle with the full pool.
    Low,
}

/// Configuration for a music build.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Root of the per-profile cache directories.
    pub cache_root: PathBuf,
    /// Worker scheduling.
    pub parallelism: Parallelism,
    /// Directory holding bundled encoder executables.
    pub dependencies_dir: PathBuf,
    /// Explicit encoder executable, checked before any lookup.
    pub encoder_path: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from(DEFAULT_CACHE_ROOT),
            parallelism: Parallelism::Full,
            dependencies_dir: PathBuf::from(DEFAULT_DEPENDENCIES_DIR),
            encoder_path: None,
        }
    }
}

impl BuildConfig {
    /// Sets the cache root.
    pub fn cache_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_root = path.into();
        self
    }

    /// Sets the worker scheduling.
    pub fn parallelism(mut self, parallelism: Parallelism) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Sets the dependencies directory.
    pub fn dependencies_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.dependencies_dir = path.into();
        self
    }

    /// Sets the encoder executable path.
    pub fn encoder_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.encoder_path = Some(path.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BuildConfig::default();
        assert_eq!(config.cache_root, PathBuf::from("cached"));
        assert_eq!(config.dependencies_dir, PathBuf::from("dependencies"));
        assert_eq!(config.parallelism, Parallelism::Full);
        assert!(config.encoder_path.is_none());
    }

    #[test]
    fn test_builder_setters() {
        let config = BuildConfig::default()
            .cache_root("/tmp/cache")
            .parallelism(Parallelism::Low)
            .encoder_path("bin/AdpcmEncode");
        assert_eq!(config.cache_root, PathBuf::from("/tmp/cache"));
        assert_eq!(config.parallelism, Parallelism::Low);
        assert_eq!(config.encoder_path, Some(PathBuf::from("bin/AdpcmEncode")));
    }
}
