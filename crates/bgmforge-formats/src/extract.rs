//! Wave bank extraction.
//!
//! Combines the entry table, the name table and the ADPCM header writer to
//! turn selected bank entries into standalone `.wav` files.

use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::adpcm::{write_adpcm_wav, AdpcmFormat};
use crate::error::{FormatError, FormatResult};
use crate::names::{read_names, NameTableLayout};
use crate::wavebank::{codec, read_entries, WaveBankEntry, WaveBankLayout};

/// Which entries of a bank are worth extracting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntrySelection {
    /// Every entry in the table.
    All,
    /// Entries `0..=last_leading` plus the listed indices.
    Listed {
        /// Highest index of the leading run.
        last_leading: usize,
        /// Additional indices past the leading run.
        extra: &'static [usize],
    },
}

impl EntrySelection {
    /// Whether `index` is selected.
    pub fn contains(&self, index: usize) -> bool {
        match self {
            EntrySelection::All => true,
            EntrySelection::Listed {
                last_leading,
                extra,
            } => index <= *last_leading || extra.contains(&index),
        }
    }
}

/// Everything needed to extract one kind of bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankProfile {
    /// Short identifier used in logs.
    pub name: &'static str,
    /// Entry table placement.
    pub bank: WaveBankLayout,
    /// Name table placement.
    pub names: NameTableLayout,
    /// Entries to extract.
    pub selection: EntrySelection,
}

impl BankProfile {
    /// Persona 4 Golden `BGM.xwb`: the first 61 tracks plus the late-bank
    /// songs, jingles and ambience loops that have no earlier duplicate.
    pub const P4G_BGM: BankProfile = BankProfile {
        name: "p4g-bgm",
        bank: WaveBankLayout::P4G_BGM,
        names: NameTableLayout::P4G_BGM,
        selection: EntrySelection::Listed {
            last_leading: 60,
            extra: &[
                1022, 1023, 1024, 1025, 318, 350, 332, 323, 287, 288, 280, 285, 1028, 1029, 316,
                261, 317, 255, 254,
            ],
        },
    };
}

/// Outcome of an extraction run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Files written, in entry order.
    pub written: Vec<PathBuf>,
    /// Selected entries that were skipped (empty or unsupported).
    pub skipped: usize,
}

/// Extracts the selected entries of the bank at `bank_path` into `out_dir`.
pub fn extract_bank(
    bank_path: &Path,
    out_dir: &Path,
    profile: &BankProfile,
) -> FormatResult<ExtractSummary> {
    fs::create_dir_all(out_dir).map_err(|e| FormatError::io(out_dir, e))?;

    let entries = read_entries(bank_path, &profile.bank)?;
    let names = read_names(bank_path, &profile.names, profile.bank.entry_count)?;

    let file = File::open(bank_path).map_err(|e| FormatError::io(bank_path, e))?;
    let available = file
        .metadata()
        .map_err(|e| FormatError::io(bank_path, e))?
        .len();
    let mut reader = BufReader::new(file);

    let mut summary = ExtractSummary::default();
    let mut used_names = HashSet::new();

    for (index, entry) in entries.iter().enumerate() {
        if !profile.selection.contains(index) {
            continue;
        }

        let format = match entry_format(index, entry) {
            Some(format) => format,
            None => {
                summary.skipped += 1;
                continue;
            }
        };

        let start = profile.bank.data_offset + u64::from(entry.play_region.offset);
        let end = start + u64::from(entry.play_region.length);
        if end > available {
            return Err(FormatError::TruncatedContainer {
                path: bank_path.to_path_buf(),
                needed: end,
                available,
            });
        }

        let mut payload = vec![0u8; entry.play_region.length as usize];
        reader
            .seek(SeekFrom::Start(start))
            .and_then(|_| reader.read_exact(&mut payload))
            .map_err(|e| FormatError::io(bank_path, e))?;

        let stem = unique_stem(&names[index], index, &mut used_names);
        let out_path = out_dir.join(format!("{}.wav", stem));
        write_entry(&out_path, &format, &payload)?;

        log::debug!("Created file: {}", out_path.display());
        summary.written.push(out_path);
    }

    log::info!(
        "Extracted {} files from {} ({} skipped)",
        summary.written.len(),
        bank_path.display(),
        summary.skipped
    );
    Ok(summary)
}

fn entry_format(index: usize, entry: &WaveBankEntry) -> Option<AdpcmFormat> {
    if entry.play_region.length == 0 {
        log::debug!("Entry {} has an empty play region, skipping", index);
        return None;
    }
    if entry.format.format_tag() != codec::ADPCM {
        log::debug!(
            "Entry {} uses codec tag {}, only ADPCM is extracted",
            index,
            entry.format.format_tag()
        );
        return None;
    }
    match AdpcmFormat::from_mini_format(entry.format) {
        Ok(format) => Some(format),
        Err(e) => {
            log::warn!("Entry {}: {}", index, e);
            None
        }
    }
}

fn write_entry(path: &Path, format: &AdpcmFormat, payload: &[u8]) -> FormatResult<()> {
    let file = File::create(path).map_err(|e| FormatError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    write_adpcm_wav(&mut writer, format, payload)
        .and_then(|()| writer.flush())
        .map_err(|e| FormatError::io(path, e))
}

/// File stem for an entry name: path separators and other characters file
/// systems reject become `_`; repeats get the entry index appended.
fn unique_stem(name: &str, index: usize, used: &mut HashSet<String>) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let base = if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        format!("entry_{}", index)
    } else {
        cleaned
    };

    if used.insert(base.clone()) {
        base
    } else {
        let renamed = format!("{}_{}", base, index);
        used.insert(renamed.clone());
        renamed
    }
}
