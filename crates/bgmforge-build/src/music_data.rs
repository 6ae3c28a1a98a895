//! Music data model.
//!
//! Music data files are JSON documents written by the companion editor, with
//! camelCase keys:
//!
//! ```json
//! {
//!   "songs": [
//!     {
//!       "id": "0",
//!       "name": "Reach Out To The Truth",
//!       "isEnabled": true,
//!       "originalFile": "bgm_012",
//!       "replacementFilePath": "C:/music/truth.wav",
//!       "loopStartSample": 0,
//!       "loopEndSample": 0,
//!       "outputFilePath": "12.raw",
//!       "extraData": null
//!     }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, BuildResult};

/// A full music build description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MusicData {
    /// Songs in build order.
    #[serde(default)]
    pub songs: Vec<Song>,
}

impl MusicData {
    /// Loads music data from a JSON file.
    pub fn load(path: &Path) -> BuildResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
        let data = Self::from_json(&content).map_err(|source| BuildError::MusicData {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded {} songs from {}", data.songs.len(), path.display());
        Ok(data)
    }

    /// Parses music data from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// One song slot in the game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Whether the replacement is copied into the build.
    #[serde(default)]
    pub is_enabled: bool,
    #[serde(default)]
    pub original_file: Option<String>,
    /// Replacement audio; `None` keeps the original.
    #[serde(default)]
    pub replacement_file_path: Option<String>,
    #[serde(default)]
    pub loop_start_sample: u32,
    #[serde(default)]
    pub loop_end_sample: u32,
    /// Destination relative to the output directory.
    #[serde(default)]
    pub output_file_path: Option<String>,
    /// Opaque editor data, carried through untouched.
    #[serde(default)]
    pub extra_data: Option<String>,
}

impl Song {
    /// Loop points requested for this song.
    pub fn loop_points(&self) -> LoopPoints {
        LoopPoints::new(self.loop_start_sample, self.loop_end_sample)
    }

    /// Name for log messages.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.id.as_deref())
            .unwrap_or("<unnamed>")
    }
}

/// A loop region in samples. `(0, 0)` loops the whole track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LoopPoints {
    pub start: u32,
    pub end: u32,
}

impl LoopPoints {
    /// Creates a loop region.
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Whether this requests a whole-track loop.
    pub fn is_whole_track(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}
