//! Property tests for block alignment and TXTH loop resolution.

use std::fs;

use bgmforge_build::txth::{align_to_block, write_txth};
use bgmforge_build::LoopPoints;
use bgmforge_formats::AdpcmFormat;
use proptest::prelude::*;

fn txth_u32(text: &str, key: &str) -> u32 {
    text.lines()
        .find_map(|line| {
            let (k, v) = line.split_once('=')?;
            (k.trim() == key).then(|| v.trim().parse().unwrap())
        })
        .unwrap()
}

proptest! {
    /// Aligned samples never move forward and always land on a block boundary.
    #[test]
    fn aligned_sample_is_a_lower_block_boundary(
        sample in any::<u32>(),
        per_block in 1u32..=65_535,
    ) {
        let aligned = align_to_block(sample, per_block);
        prop_assert!(aligned <= sample);
        prop_assert_eq!(aligned % per_block, 0);
        prop_assert!(sample - aligned < per_block);
    }

    /// Aligning twice changes nothing.
    #[test]
    fn alignment_is_idempotent(sample in any::<u32>(), per_block in 1u32..4096) {
        let once = align_to_block(sample, per_block);
        prop_assert_eq!(align_to_block(once, per_block), once);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever loop is requested, the written loop stays inside the track.
    #[test]
    fn written_loop_lies_within_num_samples(
        total in 0u32..200_000,
        start in 0u32..250_000,
        end in 0u32..250_000,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.raw.txth");
        // Stereo, block align 140: 128 samples per block.
        let props = AdpcmFormat::new(2, 44100, 140).unwrap().wave_props(1400);

        write_txth(&path, &props, total, LoopPoints::new(start, end)).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let num_samples = txth_u32(&text, "num_samples");
        let loop_start = txth_u32(&text, "loop_start_sample");
        let loop_end = txth_u32(&text, "loop_end_sample");
        prop_assert_eq!(num_samples, align_to_block(total, 128));
        prop_assert!(loop_start <= loop_end);
        prop_assert!(loop_end <= num_samples);
        prop_assert_eq!(loop_start % 128, 0);
        prop_assert_eq!(loop_end % 128, 0);
    }
}
