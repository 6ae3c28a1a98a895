//! TXTH header-description sidecars.
//!
//! Headerless ADPCM payloads are described to the game-side loader by a
//! plain-text `key = value` file next to the payload. The MS-ADPCM
//! extra-params blob is kept in a binary `<txth>.extra` companion so loop
//! points can be re-aligned later without the original header.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use bgmforge_formats::WaveProps;

use crate::error::{ItemError, ItemResult};
use crate::music_data::LoopPoints;
use crate::store::append_extension;

/// Samples per block assumed when the extra params do not say.
pub const DEFAULT_SAMPLES_PER_BLOCK: u32 = 128;

const EXTRA_EXTENSION: &str = "extra";
const NUM_SAMPLES_KEY: &str = "num_samples";
const LOOP_START_KEY: &str = "loop_start_sample";
const LOOP_END_KEY: &str = "loop_end_sample";

/// Path of the extra-params companion of a TXTH file.
pub fn extra_path(txth_path: &Path) -> PathBuf {
    append_extension(txth_path, EXTRA_EXTENSION)
}

/// Rounds `sample` down to a multiple of `per_block`.
pub fn align_to_block(sample: u32, per_block: u32) -> u32 {
    if per_block == 0 {
        return sample;
    }
    let adjustment = sample % per_block;
    if adjustment != 0 {
        log::trace!(
            "Aligning: {} to {} (-{})",
            sample,
            sample - adjustment,
            adjustment
        );
    }
    sample - adjustment
}

/// Block-aligned loop region for a track of `total` samples.
///
/// `(0, 0)` and any region that does not fit inside the track yield the
/// whole-track loop.
fn resolve_loop(points: LoopPoints, total: u32, per_block: u32) -> (u32, u32) {
    let whole = (0, align_to_block(total, per_block));
    if points.is_whole_track() {
        return whole;
    }

    let start = align_to_block(points.start, per_block);
    let end = align_to_block(points.end, per_block);
    if start > total {
        log::warn!("Loop start sample exceeds total samples: {} > {}", start, total);
    } else if end > total {
        log::warn!("Loop end sample exceeds total samples: {} > {}", end, total);
    } else if start > end {
        log::warn!("Loop start sample is after loop end sample: {} > {}", start, end);
    } else {
        return (start, end);
    }

    log::warn!("Loop points were invalid! Defaulting to full song loop");
    whole
}

fn samples_per_block_from(byte: Option<u8>) -> u32 {
    match byte {
        Some(b) if b != 0 => u32::from(b),
        _ => DEFAULT_SAMPLES_PER_BLOCK,
    }
}

/// Writes a TXTH file describing an MS-ADPCM payload.
///
/// `total_samples` comes from the source the payload was encoded from, since
/// an encoded stream does not carry it.
pub fn write_txth(
    path: &Path,
    props: &WaveProps,
    total_samples: u32,
    points: LoopPoints,
) -> ItemResult<()> {
    let per_block = samples_per_block_from(props.samples_per_block());
    let num_samples = align_to_block(total_samples, per_block);
    let (loop_start, loop_end) = resolve_loop(points, total_samples, per_block);

    let mut txth = String::new();
    txth.push_str(&format!("{} = {}\n", NUM_SAMPLES_KEY, num_samples));
    txth.push_str("codec = MSADPCM\n");
    txth.push_str(&format!("channels = {}\n", props.num_channels));
    txth.push_str(&format!("sample_rate = {}\n", props.sample_rate));
    txth.push_str(&format!("interleave = {}\n", props.block_align));
    txth.push_str(&format!("{} = {}\n", LOOP_START_KEY, loop_start));
    txth.push_str(&format!("{} = {}\n", LOOP_END_KEY, loop_end));

    if let Some(extra) = &props.extra_params {
        let extra_file = extra_path(path);
        fs::write(&extra_file, extra).map_err(|e| ItemError::io(&extra_file, e))?;
    }
    fs::write(path, txth).map_err(|e| ItemError::io(path, e))?;

    log::debug!("Created txth file: {}", path.display());
    Ok(())
}

/// Rewrites only the loop lines of an existing TXTH file.
pub fn update_txth(path: &Path, points: LoopPoints) -> ItemResult<()> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ItemError::MissingSidecar {
                path: path.to_path_buf(),
            })
        }
        Err(e) => return Err(ItemError::io(path, e)),
    };

    let total = content
        .lines()
        .find_map(|line| value_of(line, NUM_SAMPLES_KEY))
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| ItemError::InvalidSidecar {
            path: path.to_path_buf(),
            reason: format!("no numeric '{}' line", NUM_SAMPLES_KEY),
        })?;

    let extra_file = extra_path(path);
    let per_block = match fs::read(&extra_file) {
        Ok(bytes) => samples_per_block_from(bytes.first().copied()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => DEFAULT_SAMPLES_PER_BLOCK,
        Err(e) => return Err(ItemError::io(&extra_file, e)),
    };

    let (loop_start, loop_end) = resolve_loop(points, total, per_block);

    let mut updated = String::with_capacity(content.len());
    for line in content.lines() {
        if value_of(line, LOOP_START_KEY).is_some() {
            updated.push_str(&format!("{} = {}", LOOP_START_KEY, loop_start));
        } else if value_of(line, LOOP_END_KEY).is_some() {
            updated.push_str(&format!("{} = {}", LOOP_END_KEY, loop_end));
        } else {
            updated.push_str(line);
        }
        updated.push('\n');
    }

    fs::write(path, updated).map_err(|e| ItemError::io(path, e))?;
    log::debug!(
        "Updated txth loop to {}..{}: {}",
        loop_start,
        loop_end,
        path.display()
    );
    Ok(())
}

fn value_of<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let (k, v) = line.split_once('=')?;
    (k.trim() == key).then(|| v.trim())
}
