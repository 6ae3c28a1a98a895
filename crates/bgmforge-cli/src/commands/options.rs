//! Options shared by the commands that encode music.

use std::path::PathBuf;

use anyhow::Result;
use bgmforge_build::{BuildConfig, ExternalEncoder, GameProfile, MusicBuilder, Parallelism};

/// Builder settings collected from the command line.
#[derive(Debug, Clone, Default)]
pub struct BuilderOptions {
    /// `--game` key.
    pub game: String,
    /// Run sources sequentially.
    pub low: bool,
    /// Override for the cache root.
    pub cache_dir: Option<PathBuf>,
    /// Explicit encoder executable.
    pub encoder: Option<PathBuf>,
    /// Override for the bundled encoder directory.
    pub dependencies_dir: Option<PathBuf>,
}

impl BuilderOptions {
    /// Build configuration for these options.
    pub fn config(&self) -> BuildConfig {
        let mut config = BuildConfig::default().parallelism(if self.low {
            Parallelism::Low
        } else {
            Parallelism::Full
        });
        if let Some(dir) = &self.cache_dir {
            config = config.cache_root(dir);
        }
        if let Some(dir) = &self.dependencies_dir {
            config = config.dependencies_dir(dir);
        }
        if let Some(path) = &self.encoder {
            config = config.encoder_path(path);
        }
        config
    }

    /// Resolves the game profile and encoder into a ready builder.
    pub fn builder(&self) -> Result<MusicBuilder<ExternalEncoder>> {
        let profile = GameProfile::find(&self.game)?;
        log::debug!("Target game: {}", profile.display_name);
        let config = self.config();
        let encoder = ExternalEncoder::for_profile(profile, &config)?;
        Ok(MusicBuilder::new(profile, config, encoder)?)
    }
}
