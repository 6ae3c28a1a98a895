//! bgmforge container formats
//!
//! This crate reads and writes the binary containers involved in repackaging
//! console RPG music:
//!
//! - [`wave_props`]: RIFF/WAVE header reader producing normalized [`WaveProps`]
//! - [`wavebank`]: XACT wave bank (XWB) entry tables and bit-packed [`MiniFormat`]s
//! - [`names`]: sound bank (XSB) name tables
//! - [`adpcm`]: MS-ADPCM header synthesis for headerless bank payloads
//! - [`extract`]: bank extraction tying the above together
//!
//! # Example
//!
//! ```no_run
//! use bgmforge_formats::extract::{extract_bank, BankProfile};
//! use std::path::Path;
//!
//! let summary = extract_bank(
//!     Path::new("BGM.xwb"),
//!     Path::new("extracted"),
//!     &BankProfile::P4G_BGM,
//! )?;
//! println!("{} files written", summary.written.len());
//! # Ok::<(), bgmforge_formats::FormatError>(())
//! ```

pub mod adpcm;
pub mod error;
pub mod extract;
pub mod names;
pub mod riff;
pub mod wave_props;
pub mod wavebank;

pub use adpcm::{write_adpcm_wav, write_adpcm_wav_to_vec, AdpcmFormat};
pub use error::{FormatError, FormatResult};
pub use extract::{extract_bank, BankProfile, EntrySelection, ExtractSummary};
pub use names::{read_names, NameTableLayout};
pub use wave_props::WaveProps;
pub use wavebank::{read_entries, MiniFormat, WaveBankEntry, WaveBankLayout};
