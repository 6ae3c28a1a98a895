//! Per-game build profiles.
//!
//! Games differ only in data: which codec they use, which encoder produces
//! it, where its cache lives and how the encoder is invoked.

use std::path::Path;

use crate::error::{BuildError, BuildResult};

/// Placeholder for the source file in an argument template.
pub const ARG_INPUT: &str = "{input}";
/// Placeholder for the encoder output file.
pub const ARG_OUTPUT: &str = "{output}";
/// Placeholder expanded into zero or more loop arguments.
pub const ARG_LOOP: &str = "{loop}";

/// How a game stores its music streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecKind {
    /// Headerless MS-ADPCM with a TXTH sidecar carrying loop points.
    Adpcm,
    /// CRI ADX with loop points embedded in the stream.
    Adx,
}

impl CodecKind {
    /// Whether loop points are baked into the encoded stream, so changing
    /// them requires a re-encode.
    pub fn embeds_loop(&self) -> bool {
        matches!(self, CodecKind::Adx)
    }

    /// Returns the string identifier for this codec.
    pub fn as_str(&self) -> &'static str {
        match self {
            CodecKind::Adpcm => "adpcm",
            CodecKind::Adx => "adx",
        }
    }
}

/// Everything that varies between supported games.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameProfile {
    /// Key accepted by `--game`.
    pub key: &'static str,
    pub display_name: &'static str,
    pub codec: CodecKind,
    /// Encoder executable name, without platform suffix.
    pub encoder_name: &'static str,
    /// Cache directory below the cache root.
    pub cache_subdir: &'static str,
    /// Source extensions the encoder accepts, with leading dot.
    pub supported_extensions: &'static [&'static str],
    /// Extension of encoded output, with leading dot.
    pub encoded_extension: &'static str,
    /// Encoder argument template, see [`ARG_INPUT`], [`ARG_OUTPUT`] and [`ARG_LOOP`].
    pub encode_args: &'static [&'static str],
}

impl GameProfile {
    pub const P4G: GameProfile = GameProfile {
        key: "p4g",
        display_name: "Persona 4 Golden",
        codec: CodecKind::Adpcm,
        encoder_name: "AdpcmEncode",
        cache_subdir: "adpcm",
        supported_extensions: &[".wav"],
        encoded_extension: ".raw",
        encode_args: &[ARG_INPUT, ARG_OUTPUT],
    };

    pub const P3F: GameProfile = GameProfile {
        key: "p3f",
        display_name: "Persona 3 FES",
        codec: CodecKind::Adx,
        encoder_name: "AtomEncd",
        cache_subdir: "adx",
        supported_extensions: &[".wav"],
        encoded_extension: ".adx",
        encode_args: &[ARG_INPUT, ARG_OUTPUT, "-codec=ADX", ARG_LOOP],
    };

    pub const P4: GameProfile = GameProfile {
        key: "p4",
        display_name: "Persona 4",
        ..GameProfile::P3F
    };

    pub const P3P: GameProfile = GameProfile {
        key: "p3p",
        display_name: "Persona 3 Portable",
        cache_subdir: "adx-p3p",
        encode_args: &[ARG_INPUT, ARG_OUTPUT, "-codec=ADX", "-rate=41000", ARG_LOOP],
        ..GameProfile::P3F
    };

    /// All known profiles.
    pub const ALL: &'static [GameProfile] = &[
        GameProfile::P4G,
        GameProfile::P3F,
        GameProfile::P4,
        GameProfile::P3P,
    ];

    /// Looks up a profile by its `--game` key (case-insensitive).
    pub fn find(key: &str) -> BuildResult<&'static GameProfile> {
        Self::ALL
            .iter()
            .find(|p| p.key.eq_ignore_ascii_case(key))
            .ok_or_else(|| BuildError::UnknownGame {
                key: key.to_string(),
                expected: Self::keys().join(", "),
            })
    }

    /// Keys of all known profiles.
    pub fn keys() -> Vec<&'static str> {
        Self::ALL.iter().map(|p| p.key).collect()
    }

    /// Encoder file name for the current platform.
    pub fn encoder_file_name(&self) -> String {
        if cfg!(windows) {
            format!("{}.exe", self.encoder_name)
        } else {
            self.encoder_name.to_string()
        }
    }

    /// Whether `path` can be handed to the encoder.
    pub fn is_supported(&self, path: &Path) -> bool {
        self.supported_extensions
            .iter()
            .any(|ext| has_extension(path, ext))
    }

    /// Whether `path` is already in the game's encoded format.
    pub fn is_encoded(&self, path: &Path) -> bool {
        has_extension(path, self.encoded_extension)
    }
}

fn has_extension(path: &Path, dotted: &str) -> bool {
    let wanted = dotted.trim_start_matches('.');
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(wanted))
}
