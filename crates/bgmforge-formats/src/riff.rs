//! RIFF/WAVE chunk identifiers and low-level read helpers.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{FormatError, FormatResult};

/// RIFF container identifier.
pub const RIFF_TAG: &[u8; 4] = b"RIFF";

/// WAVE form type.
pub const WAVE_TAG: &[u8; 4] = b"WAVE";

/// Format chunk identifier.
pub const FMT_TAG: &[u8; 4] = b"fmt ";

/// Fact chunk identifier (uncompressed sample count for compressed codecs).
pub const FACT_TAG: &[u8; 4] = b"fact";

/// Data chunk identifier.
pub const DATA_TAG: &[u8; 4] = b"data";

/// Size of the minimal PCM-style format chunk.
pub const MIN_FMT_SIZE: u32 = 16;

/// Reads four bytes and checks them against `expected`.
///
/// A short read counts as a missing marker, so truncated headers report the
/// first structure they could not reach.
pub fn expect_tag<R: Read>(
    reader: &mut R,
    expected: &'static [u8; 4],
    path: &Path,
) -> FormatResult<()> {
    let mut tag = [0u8; 4];
    match reader.read_exact(&mut tag) {
        Ok(()) if &tag == expected => Ok(()),
        Ok(()) => Err(FormatError::malformed(path, marker_name(expected))),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(FormatError::malformed(path, marker_name(expected)))
        }
        Err(e) => Err(FormatError::io(path, e)),
    }
}

/// Maps an I/O error from inside a chunk to a format error for that chunk.
pub fn chunk_error(path: &Path, marker: &'static [u8; 4], err: io::Error) -> FormatError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        FormatError::malformed(path, marker_name(marker))
    } else {
        FormatError::io(path, err)
    }
}

/// Skips `size` bytes of chunk body plus the RIFF pad byte for odd sizes.
pub fn skip_chunk<R: Seek>(reader: &mut R, size: u32) -> io::Result<()> {
    let padded = i64::from(size) + i64::from(size & 1);
    reader.seek(SeekFrom::Current(padded))?;
    Ok(())
}

/// Human-readable name of a chunk marker.
pub fn marker_name(tag: &'static [u8; 4]) -> &'static str {
    match tag {
        RIFF_TAG => "RIFF",
        WAVE_TAG => "WAVE",
        FMT_TAG => "fmt ",
        FACT_TAG => "fact",
        DATA_TAG => "data",
        _ => "unknown",
    }
}
