//! XACT wave bank (XWB) entry table reader.
//!
//! Entry tables are read from fixed, bank-specific offsets rather than from the
//! bank header. Each record is 24 bytes, little-endian:
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0  | flags |
//! | 4  | mini format (bit-packed) |
//! | 8  | play region offset |
//! | 12 | play region length |
//! | 16 | loop region start sample |
//! | 20 | loop region total samples |

use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::{FormatError, FormatResult};

/// Size of one entry record in bytes.
pub const ENTRY_SIZE: u64 = 24;

/// Codec tags stored in the low two bits of a mini format.
pub mod codec {
    /// Linear PCM.
    pub const PCM: u32 = 0;
    /// Xbox XMA.
    pub const XMA: u32 = 1;
    /// Microsoft ADPCM.
    pub const ADPCM: u32 = 2;
    /// Windows Media Audio.
    pub const WMA: u32 = 3;
}

const FORMAT_TAG_MASK: u32 = 0x0000_0003;
const CHANNELS_MASK: u32 = 0x0000_001C;
const SAMPLE_RATE_MASK: u32 = 0x007F_FFE0;
const BLOCK_ALIGN_MASK: u32 = 0x7F80_0000;
const BITS_PER_SAMPLE_MASK: u32 = 0x8000_0000;

const CHANNELS_SHIFT: u32 = 2;
const SAMPLE_RATE_SHIFT: u32 = 5;
const BLOCK_ALIGN_SHIFT: u32 = 23;
const BITS_PER_SAMPLE_SHIFT: u32 = 31;

/// Placement of the entry table and data section inside a bank file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveBankLayout {
    /// Absolute offset of the first entry record.
    pub entry_table_offset: u64,
    /// Number of entry records.
    pub entry_count: usize,
    /// Absolute offset of the data section play regions are relative to.
    pub data_offset: u64,
}

impl WaveBankLayout {
    /// Persona 4 Golden `BGM.xwb`.
    pub const P4G_BGM: WaveBankLayout = WaveBankLayout {
        entry_table_offset: 0x94,
        entry_count: 1110,
        data_offset: 0x7000,
    };

    /// Bytes covered by the entry table.
    pub fn table_size(&self) -> u64 {
        self.entry_count as u64 * ENTRY_SIZE
    }
}

/// Bit-packed stream format of a wave bank entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MiniFormat(pub u32);

impl MiniFormat {
    /// Packs the individual fields into a mini format word.
    ///
    /// Values wider than their field are truncated.
    pub fn pack(
        format_tag: u32,
        channels: u32,
        sample_rate: u32,
        block_align: u32,
        bits_per_sample: u32,
    ) -> Self {
        Self(
            (format_tag & FORMAT_TAG_MASK)
                | ((channels << CHANNELS_SHIFT) & CHANNELS_MASK)
                | ((sample_rate << SAMPLE_RATE_SHIFT) & SAMPLE_RATE_MASK)
                | ((block_align << BLOCK_ALIGN_SHIFT) & BLOCK_ALIGN_MASK)
                | ((bits_per_sample << BITS_PER_SAMPLE_SHIFT) & BITS_PER_SAMPLE_MASK),
        )
    }

    /// Codec tag, see [`codec`].
    pub fn format_tag(&self) -> u32 {
        self.0 & FORMAT_TAG_MASK
    }

    /// Channel count.
    pub fn channels(&self) -> u32 {
        (self.0 & CHANNELS_MASK) >> CHANNELS_SHIFT
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        (self.0 & SAMPLE_RATE_MASK) >> SAMPLE_RATE_SHIFT
    }

    /// Raw block align field. For ADPCM this is stored per channel, minus
    /// the conversion offset.
    pub fn block_align(&self) -> u32 {
        (self.0 & BLOCK_ALIGN_MASK) >> BLOCK_ALIGN_SHIFT
    }

    /// Bits-per-sample flag (0 = 8-bit, 1 = 16-bit for PCM).
    pub fn bits_per_sample(&self) -> u32 {
        (self.0 & BITS_PER_SAMPLE_MASK) >> BITS_PER_SAMPLE_SHIFT
    }
}

/// Byte range of an entry's stream within the data section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayRegion {
    /// Offset from the start of the data section.
    pub offset: u32,
    /// Stream length in bytes.
    pub length: u32,
}

/// Loop region of an entry, in samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopRegion {
    /// First sample of the loop.
    pub start_sample: u32,
    /// Number of samples in the loop.
    pub total_samples: u32,
}

/// One record of the entry table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WaveBankEntry {
    /// Entry flags.
    pub flags: u32,
    /// Packed stream format.
    pub format: MiniFormat,
    /// Where the stream lives in the data section.
    pub play_region: PlayRegion,
    /// Loop metadata.
    pub loop_region: LoopRegion,
}

impl WaveBankEntry {
    fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        Ok(Self {
            flags: reader.read_u32::<LittleEndian>()?,
            format: MiniFormat(reader.read_u32::<LittleEndian>()?),
            play_region: PlayRegion {
                offset: reader.read_u32::<LittleEndian>()?,
                length: reader.read_u32::<LittleEndian>()?,
            },
            loop_region: LoopRegion {
                start_sample: reader.read_u32::<LittleEndian>()?,
                total_samples: reader.read_u32::<LittleEndian>()?,
            },
        })
    }
}

/// Reads the full entry table of the bank at `path`.
pub fn read_entries(path: &Path, layout: &WaveBankLayout) -> FormatResult<Vec<WaveBankEntry>> {
    log::debug!("Parsing wave bank entries from {}", path.display());

    let file = File::open(path).map_err(|e| FormatError::io(path, e))?;
    let len = file.metadata().map_err(|e| FormatError::io(path, e))?.len();
    let needed = layout.entry_table_offset + layout.table_size();
    if len < needed {
        return Err(FormatError::TruncatedContainer {
            path: path.to_path_buf(),
            needed,
            available: len,
        });
    }

    let mut reader = BufReader::new(file);
    reader
        .seek(SeekFrom::Start(layout.entry_table_offset))
        .map_err(|e| FormatError::io(path, e))?;

    let mut entries = Vec::with_capacity(layout.entry_count);
    for _ in 0..layout.entry_count {
        let entry = WaveBankEntry::read_from(&mut reader).map_err(|e| FormatError::io(path, e))?;
        entries.push(entry);
    }

    log::debug!("Parsed {} wave bank entries", entries.len());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    #[test]
    fn test_mini_format_fields_do_not_overlap() {
        let masks = [
            FORMAT_TAG_MASK,
            CHANNELS_MASK,
            SAMPLE_RATE_MASK,
            BLOCK_ALIGN_MASK,
            BITS_PER_SAMPLE_MASK,
        ];
        let mut seen = 0u32;
        for mask in masks {
            assert_eq!(seen & mask, 0);
            seen |= mask;
        }
        assert_eq!(seen, u32::MAX);
    }

    #[test]
    fn test_mini_format_decode() {
        let fmt = MiniFormat::pack(codec::ADPCM, 2, 44100, 48, 1);
        assert_eq!(fmt.format_tag(), codec::ADPCM);
        assert_eq!(fmt.channels(), 2);
        assert_eq!(fmt.sample_rate(), 44100);
        assert_eq!(fmt.block_align(), 48);
        assert_eq!(fmt.bits_per_sample(), 1);
    }

    #[test]
    fn test_mini_format_raw_word() {
        // tag=2, channels=1, rate=32000, align=70, bps=0
        let raw = 2 | (1 << 2) | (32000 << 5) | (70 << 23);
        let fmt = MiniFormat(raw);
        assert_eq!(fmt.channels(), 1);
        assert_eq!(fmt.sample_rate(), 32000);
        assert_eq!(fmt.block_align(), 70);
        assert_eq!(fmt.bits_per_sample(), 0);
    }

    #[test]
    fn test_read_entries_small_layout() {
        let layout = WaveBankLayout {
            entry_table_offset: 8,
            entry_count: 2,
            data_offset: 64,
        };
        let mut bytes = vec![0u8; 8];
        for i in 0..2u32 {
            bytes.write_u32::<LittleEndian>(i).unwrap();
            bytes
                .write_u32::<LittleEndian>(MiniFormat::pack(codec::ADPCM, 1, 22050, 14, 1).0)
                .unwrap();
            bytes.write_u32::<LittleEndian>(i * 100).unwrap();
            bytes.write_u32::<LittleEndian>(100).unwrap();
            bytes.write_u32::<LittleEndian>(0).unwrap();
            bytes.write_u32::<LittleEndian>(512).unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bank.xwb");
        std::fs::write(&path, &bytes).unwrap();

        let entries = read_entries(&path, &layout).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].flags, 1);
        assert_eq!(entries[1].play_region, PlayRegion { offset: 100, length: 100 });
        assert_eq!(entries[1].loop_region.total_samples, 512);
        assert_eq!(entries[0].format.sample_rate(), 22050);
    }

    #[test]
    fn test_read_entries_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.xwb");
        std::fs::write(&path, vec![0u8; 200]).unwrap();

        let err = read_entries(&path, &WaveBankLayout::P4G_BGM).unwrap_err();
        match err {
            FormatError::TruncatedContainer {
                needed, available, ..
            } => {
                assert_eq!(needed, 0x94 + 1110 * 24);
                assert_eq!(available, 200);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
