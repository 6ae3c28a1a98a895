//! Sound bank (XSB) name table reader.
//!
//! Names are packed back-to-back as NUL-terminated ASCII with no offset table,
//! so they can only be read sequentially. A handful of slots in each bank are
//! empty in the source data and must not consume the stream.

use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::error::{FormatError, FormatResult};

/// Name used for slots listed in [`NameTableLayout::overrides`].
pub const PLACEHOLDER_NAME: &str = "Undefined";

/// Extension of the companion name table file.
pub const NAME_TABLE_EXTENSION: &str = "xsb";

/// Placement of the name list inside a sound bank file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameTableLayout {
    /// Absolute offset of the first name.
    pub start_offset: u64,
    /// Slots that hold no name in the file.
    pub overrides: &'static [usize],
}

impl NameTableLayout {
    /// Persona 4 Golden `BGM.xsb`.
    pub const P4G_BGM: NameTableLayout = NameTableLayout {
        start_offset: 0xBDD2,
        overrides: &[855, 857, 1040, 1100],
    };
}

/// Path of the name table that accompanies the wave bank at `bank_path`.
pub fn companion_path(bank_path: &Path) -> PathBuf {
    bank_path.with_extension(NAME_TABLE_EXTENSION)
}

/// Reads `entry_count` names from the sound bank companion of `bank_path`.
pub fn read_names(
    bank_path: &Path,
    layout: &NameTableLayout,
    entry_count: usize,
) -> FormatResult<Vec<String>> {
    let path = companion_path(bank_path);
    if !path.exists() {
        return Err(FormatError::MissingCompanionFile { path });
    }
    log::debug!("Parsing sound bank names from {}", path.display());

    let file = File::open(&path).map_err(|e| FormatError::io(&path, e))?;
    let available = file.metadata().map_err(|e| FormatError::io(&path, e))?.len();
    let mut reader = BufReader::new(file);
    reader
        .seek(SeekFrom::Start(layout.start_offset))
        .map_err(|e| FormatError::io(&path, e))?;

    let mut names = Vec::with_capacity(entry_count);
    let mut buf = Vec::new();
    for index in 0..entry_count {
        if layout.overrides.contains(&index) {
            names.push(PLACEHOLDER_NAME.to_string());
            continue;
        }

        buf.clear();
        let read = reader
            .read_until(0, &mut buf)
            .map_err(|e| FormatError::io(&path, e))?;
        if read == 0 {
            // Ran out of names before the table was filled.
            let position = reader
                .stream_position()
                .map_err(|e| FormatError::io(&path, e))?;
            return Err(FormatError::TruncatedContainer {
                path,
                needed: position + 1,
                available,
            });
        }
        if buf.last() == Some(&0) {
            buf.pop();
        }
        names.push(buf.iter().map(|&b| char::from(b)).collect());
    }

    log::debug!("Parsed {} sound bank names", names.len());
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_table(dir: &Path, offset: usize, names: &[&str]) -> PathBuf {
        let mut bytes = vec![0xAAu8; offset];
        for name in names {
            bytes.extend_from_slice(name.as_bytes());
            bytes.push(0);
        }
        let bank = dir.join("BGM.xwb");
        std::fs::write(companion_path(&bank), bytes).unwrap();
        bank
    }

    #[test]
    fn test_companion_path_replaces_extension() {
        assert_eq!(
            companion_path(Path::new("data/sound/BGM.xwb")),
            PathBuf::from("data/sound/BGM.xsb")
        );
    }

    #[test]
    fn test_reads_packed_names() {
        let dir = tempfile::tempdir().unwrap();
        let bank = write_table(dir.path(), 4, &["intro", "battle", "town"]);
        let layout = NameTableLayout {
            start_offset: 4,
            overrides: &[],
        };

        let names = read_names(&bank, &layout, 3).unwrap();
        assert_eq!(names, vec!["intro", "battle", "town"]);
    }

    #[test]
    fn test_override_slots_do_not_consume_stream() {
        let dir = tempfile::tempdir().unwrap();
        let bank = write_table(dir.path(), 0, &["a", "b", "c"]);
        let layout = NameTableLayout {
            start_offset: 0,
            overrides: &[1],
        };

        let names = read_names(&bank, &layout, 4).unwrap();
        assert_eq!(names, vec!["a", PLACEHOLDER_NAME, "b", "c"]);
    }

    #[test]
    fn test_missing_companion() {
        let dir = tempfile::tempdir().unwrap();
        let bank = dir.path().join("BGM.xwb");
        let err = read_names(&bank, &NameTableLayout::P4G_BGM, 10).unwrap_err();
        assert!(matches!(err, FormatError::MissingCompanionFile { .. }));
    }

    #[test]
    fn test_too_few_names_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let bank = write_table(dir.path(), 0, &["only"]);
        let layout = NameTableLayout {
            start_offset: 0,
            overrides: &[],
        };

        let err = read_names(&bank, &layout, 2).unwrap_err();
        assert!(matches!(err, FormatError::TruncatedContainer { .. }));
    }
}
