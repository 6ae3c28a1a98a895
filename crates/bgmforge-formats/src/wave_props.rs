//! RIFF/WAVE header reader.
//!
//! Only the fields the build pipeline needs are kept: the stream layout, the
//! codec extra-params blob (MS-ADPCM stores samples-per-block in it) and the
//! location of the data payload.

use byteorder::{LittleEndian, ReadBytesExt};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use crate::error::{FormatError, FormatResult};
use crate::riff::{
    chunk_error, expect_tag, skip_chunk, DATA_TAG, FMT_TAG, MIN_FMT_SIZE, RIFF_TAG, WAVE_TAG,
};

/// Normalized properties of a RIFF/WAVE file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaveProps {
    /// Codec tag from the format chunk (1 = PCM, 2 = MS-ADPCM).
    pub format_tag: u16,
    /// Number of channels.
    pub num_channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Block alignment in bytes.
    pub block_align: u16,
    /// Bits per sample.
    pub bits_per_sample: u16,
    /// Raw codec-specific bytes following the 16-byte format chunk, if any.
    pub extra_params: Option<Vec<u8>>,
    /// Exact length of the data payload.
    pub data_size: u32,
    /// Offset of the first payload byte.
    pub data_start_offset: u64,
}

impl WaveProps {
    /// Parses the header of the WAVE file at `path`.
    pub fn read(path: &Path) -> FormatResult<Self> {
        let file = File::open(path).map_err(|e| FormatError::io(path, e))?;
        Self::from_reader(&mut BufReader::new(file), path)
    }

    /// Parses a WAVE header from `reader`, which must be positioned at the
    /// start of the file. `path` is only used for error reporting.
    pub fn from_reader<R: Read + Seek>(reader: &mut R, path: &Path) -> FormatResult<Self> {
        expect_tag(reader, RIFF_TAG, path)?;
        reader
            .read_u32::<LittleEndian>()
            .map_err(|e| chunk_error(path, RIFF_TAG, e))?;
        expect_tag(reader, WAVE_TAG, path)?;
        expect_tag(reader, FMT_TAG, path)?;

        let fmt = read_fmt_body(reader).map_err(|e| chunk_error(path, FMT_TAG, e))?;

        // Walk to the data chunk, skipping fact/LIST/etc.
        loop {
            let mut id = [0u8; 4];
            reader
                .read_exact(&mut id)
                .map_err(|e| chunk_error(path, DATA_TAG, e))?;
            let size = reader
                .read_u32::<LittleEndian>()
                .map_err(|e| chunk_error(path, DATA_TAG, e))?;

            if &id == DATA_TAG {
                let data_start_offset = reader
                    .stream_position()
                    .map_err(|e| FormatError::io(path, e))?;
                return Ok(Self {
                    format_tag: fmt.format_tag,
                    num_channels: fmt.num_channels,
                    sample_rate: fmt.sample_rate,
                    block_align: fmt.block_align,
                    bits_per_sample: fmt.bits_per_sample,
                    extra_params: fmt.extra_params,
                    data_size: size,
                    data_start_offset,
                });
            }

            skip_chunk(reader, size).map_err(|e| chunk_error(path, DATA_TAG, e))?;
        }
    }

    /// Total samples per channel, or `None` when the header cannot support
    /// the division (zero channels or fewer than 8 bits per sample).
    pub fn total_samples(&self) -> Option<u32> {
        let bytes_per_sample = u32::from(self.bits_per_sample / 8);
        let channels = u32::from(self.num_channels);
        if bytes_per_sample == 0 || channels == 0 {
            return None;
        }
        Some(self.data_size / channels / bytes_per_sample)
    }

    /// Samples per block from the first extra-params byte.
    pub fn samples_per_block(&self) -> Option<u8> {
        self.extra_params
            .as_deref()
            .and_then(|bytes| bytes.first().copied())
    }

    /// Reads the data payload described by these props from `path`.
    pub fn read_payload(&self, path: &Path) -> FormatResult<Vec<u8>> {
        use std::io::SeekFrom;

        let mut file = File::open(path).map_err(|e| FormatError::io(path, e))?;
        file.seek(SeekFrom::Start(self.data_start_offset))
            .map_err(|e| FormatError::io(path, e))?;
        let mut payload = vec![0u8; self.data_size as usize];
        file.read_exact(&mut payload)
            .map_err(|e| chunk_error(path, DATA_TAG, e))?;
        Ok(payload)
    }
}

struct FmtBody {
    format_tag: u16,
    num_channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits_per_sample: u16,
    extra_params: Option<Vec<u8>>,
}

fn read_fmt_body<R: Read + Seek>(reader: &mut R) -> std::io::Result<FmtBody> {
    let fmt_size = reader.read_u32::<LittleEndian>()?;
    let format_tag = reader.read_u16::<LittleEndian>()?;
    let num_channels = reader.read_u16::<LittleEndian>()?;
    let sample_rate = reader.read_u32::<LittleEndian>()?;
    let _byte_rate = reader.read_u32::<LittleEndian>()?;
    let block_align = reader.read_u16::<LittleEndian>()?;
    let bits_per_sample = reader.read_u16::<LittleEndian>()?;

    let mut consumed = MIN_FMT_SIZE;
    let extra_params = if fmt_size > MIN_FMT_SIZE {
        let extra_size = reader.read_u16::<LittleEndian>()?;
        let mut extra = vec![0u8; usize::from(extra_size)];
        reader.read_exact(&mut extra)?;
        consumed += 2 + u32::from(extra_size);
        Some(extra)
    } else {
        None
    };

    // Trailing bytes some encoders leave inside the format chunk.
    let remaining = fmt_size.saturating_sub(consumed) + (fmt_size & 1);
    if remaining > 0 {
        reader.seek(std::io::SeekFrom::Current(i64::from(remaining)))?;
    }

    Ok(FmtBody {
        format_tag,
        num_channels,
        sample_rate,
        block_align,
        bits_per_sample,
        extra_params,
    })
}
