//! MS-ADPCM RIFF/WAVE header synthesis.
//!
//! Wave bank streams are stored headerless. This module wraps an extracted
//! payload in the header a standard MS-ADPCM decoder expects: an extended
//! `fmt ` chunk carrying the coefficient table, a `fact` chunk with the
//! decoded sample count, then the `data` chunk. Decoders read these fields
//! positionally, so the layout is fixed byte-for-byte.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

use crate::error::{FormatError, FormatResult};
use crate::riff::{DATA_TAG, FACT_TAG, FMT_TAG, RIFF_TAG, WAVE_TAG};
use crate::wave_props::WaveProps;
use crate::wavebank::MiniFormat;

/// WAVE format tag for MS-ADPCM.
pub const WAVE_FORMAT_ADPCM: u16 = 0x0002;

/// MS-ADPCM always codes 4 bits per sample.
pub const ADPCM_BITS_PER_SAMPLE: u16 = 4;

/// Offset added to the per-channel block align stored in a mini format.
pub const BLOCK_ALIGN_CONVERSION_OFFSET: u32 = 22;

/// Standard MS-ADPCM predictor coefficient pairs.
pub const COEFFICIENTS: [(i16, i16); 7] = [
    (256, 0),
    (512, -256),
    (0, 0),
    (192, 64),
    (240, 0),
    (460, -208),
    (392, -232),
];

/// Size of the codec extra-params block (samples per block, coefficient
/// count, coefficient pairs).
pub const EXTRA_PARAMS_SIZE: u16 = 32;

/// Format chunk size: base fields, cbSize, extra params.
pub const FMT_CHUNK_SIZE: u32 = 16 + 2 + EXTRA_PARAMS_SIZE as u32;

/// Bytes counted by the RIFF size field besides the payload.
const RIFF_OVERHEAD: u32 = 4 + (8 + FMT_CHUNK_SIZE) + (8 + 4) + 8;

/// Offset of the payload in a synthesized file.
pub const DATA_START_OFFSET: u64 = 8 + RIFF_OVERHEAD as u64;

/// Per-channel block preamble in bytes (predictor, delta, two samples).
const PREAMBLE_BYTES_PER_CHANNEL: u32 = 7;

/// Stream parameters of an MS-ADPCM payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdpcmFormat {
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    samples_per_block: u16,
}

impl AdpcmFormat {
    /// Creates a format, rejecting parameters no decoder could use.
    pub fn new(channels: u16, sample_rate: u32, block_align: u16) -> FormatResult<Self> {
        if channels == 0 {
            return Err(FormatError::unsupported("ADPCM stream has zero channels"));
        }
        let preamble = PREAMBLE_BYTES_PER_CHANNEL * u32::from(channels);
        if u32::from(block_align) <= preamble {
            return Err(FormatError::unsupported(format!(
                "ADPCM block align {} does not exceed the {}-byte block preamble",
                block_align, preamble
            )));
        }
        let coded_bits = (u32::from(block_align) - preamble) * 8;
        let per_block = coded_bits / (u32::from(ADPCM_BITS_PER_SAMPLE) * u32::from(channels)) + 2;
        let samples_per_block = u16::try_from(per_block).map_err(|_| {
            FormatError::unsupported(format!(
                "ADPCM block align {} gives {} samples per block, more than a header can hold",
                block_align, per_block
            ))
        })?;
        Ok(Self {
            channels,
            sample_rate,
            block_align,
            samples_per_block,
        })
    }

    /// Derives the full stream format from a wave bank mini format.
    pub fn from_mini_format(format: MiniFormat) -> FormatResult<Self> {
        let channels = format.channels();
        let block_align = (format.block_align() + BLOCK_ALIGN_CONVERSION_OFFSET) * channels;
        let block_align = u16::try_from(block_align).map_err(|_| {
            FormatError::unsupported(format!("ADPCM block align {} out of range", block_align))
        })?;
        // channels is a 3-bit field
        Self::new(channels as u16, format.sample_rate(), block_align)
    }

    /// Channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Bytes per block across all channels.
    pub fn block_align(&self) -> u16 {
        self.block_align
    }

    fn coded_bits_per_block(&self) -> u32 {
        (u32::from(self.block_align) - PREAMBLE_BYTES_PER_CHANNEL * u32::from(self.channels)) * 8
    }

    /// Decoded samples per channel in one block.
    pub fn samples_per_block(&self) -> u16 {
        self.samples_per_block
    }

    /// Average bytes per second.
    pub fn byte_rate(&self) -> u32 {
        (self.sample_rate / u32::from(self.samples_per_block())) * u32::from(self.block_align)
    }

    /// Value of the `fact` chunk for a payload of `payload_len` bytes.
    pub fn fact_samples(&self, payload_len: u32) -> u32 {
        let per_block = u64::from(self.coded_bits_per_block() / u32::from(ADPCM_BITS_PER_SAMPLE));
        let blocks = u64::from(payload_len / u32::from(self.block_align));
        (per_block * blocks / u64::from(self.channels)) as u32
    }

    /// The 32-byte extra-params block stored after `cbSize`.
    pub fn extra_params(&self) -> Vec<u8> {
        let mut extra = Vec::with_capacity(usize::from(EXTRA_PARAMS_SIZE));
        extra.extend_from_slice(&self.samples_per_block().to_le_bytes());
        extra.extend_from_slice(&(COEFFICIENTS.len() as u16).to_le_bytes());
        for (coef1, coef2) in COEFFICIENTS {
            extra.extend_from_slice(&coef1.to_le_bytes());
            extra.extend_from_slice(&coef2.to_le_bytes());
        }
        extra
    }

    /// Header properties of the file [`write_adpcm_wav`] produces for a
    /// payload of `payload_len` bytes.
    pub fn wave_props(&self, payload_len: u32) -> WaveProps {
        WaveProps {
            format_tag: WAVE_FORMAT_ADPCM,
            num_channels: self.channels,
            sample_rate: self.sample_rate,
            block_align: self.block_align,
            bits_per_sample: ADPCM_BITS_PER_SAMPLE,
            extra_params: Some(self.extra_params()),
            data_size: payload_len,
            data_start_offset: DATA_START_OFFSET,
        }
    }
}

/// Writes a complete MS-ADPCM WAVE file around `payload`.
pub fn write_adpcm_wav<W: Write>(
    writer: &mut W,
    format: &AdpcmFormat,
    payload: &[u8],
) -> io::Result<()> {
    let data_size = u32::try_from(payload.len())
        .ok()
        .filter(|len| len.checked_add(RIFF_OVERHEAD).is_some())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("payload of {} bytes does not fit a RIFF file", payload.len()),
            )
        })?;

    write_header(writer, format, data_size)?;
    writer.write_all(payload)
}

fn write_header<W: Write>(writer: &mut W, format: &AdpcmFormat, data_size: u32) -> io::Result<()> {
    // RIFF header
    writer.write_all(RIFF_TAG)?;
    writer.write_u32::<LittleEndian>(RIFF_OVERHEAD + data_size)?;
    writer.write_all(WAVE_TAG)?;

    // fmt chunk
    writer.write_all(FMT_TAG)?;
    writer.write_u32::<LittleEndian>(FMT_CHUNK_SIZE)?;
    writer.write_u16::<LittleEndian>(WAVE_FORMAT_ADPCM)?;
    writer.write_u16::<LittleEndian>(format.channels)?;
    writer.write_u32::<LittleEndian>(format.sample_rate)?;
    writer.write_u32::<LittleEndian>(format.byte_rate())?;
    writer.write_u16::<LittleEndian>(format.block_align)?;
    writer.write_u16::<LittleEndian>(ADPCM_BITS_PER_SAMPLE)?;
    writer.write_u16::<LittleEndian>(EXTRA_PARAMS_SIZE)?;
    writer.write_all(&format.extra_params())?;

    // fact chunk
    writer.write_all(FACT_TAG)?;
    writer.write_u32::<LittleEndian>(4)?;
    writer.write_u32::<LittleEndian>(format.fact_samples(data_size))?;

    // data chunk
    writer.write_all(DATA_TAG)?;
    writer.write_u32::<LittleEndian>(data_size)?;
    Ok(())
}

/// Writes an MS-ADPCM WAVE file to a byte vector.
pub fn write_adpcm_wav_to_vec(format: &AdpcmFormat, payload: &[u8]) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(DATA_START_OFFSET as usize + payload.len());
    write_adpcm_wav(&mut buffer, format, payload)?;
    Ok(buffer)
}
