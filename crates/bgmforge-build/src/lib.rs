//! bgmforge music builds
//!
//! Incrementally encodes replacement music into a game's native layout:
//!
//! - [`music_data`]: the JSON build description
//! - [`profile`]: per-game codec, encoder and cache settings
//! - [`store`]: checksum and loop sidecars deciding what needs work
//! - [`txth`]: TXTH header-description sidecars for headerless ADPCM
//! - [`encoder`]: the external encoder seam
//! - [`builder`]: build, export and batch orchestration
//!
//! # Example
//!
//! ```no_run
//! use bgmforge_build::{BuildConfig, ExternalEncoder, GameProfile, MusicBuilder, MusicData};
//! use std::path::Path;
//!
//! let profile = GameProfile::find("p4g")?;
//! let config = BuildConfig::default();
//! let encoder = ExternalEncoder::for_profile(profile, &config)?;
//! let builder = MusicBuilder::new(profile, config, encoder)?;
//!
//! let music = MusicData::load(Path::new("music.json"))?;
//! let summary = builder.build(&music, Path::new("build"))?;
//! println!("{} songs copied", summary.outputs_copied);
//! # Ok::<(), bgmforge_build::BuildError>(())
//! ```

pub mod builder;
pub mod config;
pub mod encoder;
pub mod error;
pub mod music_data;
pub mod profile;
pub mod store;
pub mod txth;

pub use builder::{BuildSummary, ItemFailure, MusicBuilder, SourceJob, SourceOutcome};
pub use config::{BuildConfig, Parallelism};
pub use encoder::{EncodeError, EncodeRequest, Encoder, ExternalEncoder};
pub use error::{BuildError, BuildResult, ItemError, ItemResult};
pub use music_data::{LoopPoints, MusicData, Song};
pub use profile::{CodecKind, GameProfile};
pub use store::{CacheDecision, SidecarStore};
