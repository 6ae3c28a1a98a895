//! End-to-end tests that drive the `bgmforge` binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use bgmforge_formats::wavebank::codec;
use bgmforge_formats::{MiniFormat, NameTableLayout, WaveBankLayout, WaveProps};

/// Result of one CLI invocation.
struct CliResult {
    success: bool,
    stdout: String,
    stderr: String,
}

impl From<Output> for CliResult {
    fn from(out: Output) -> Self {
        Self {
            success: out.status.success(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        }
    }
}

fn run_cli(dir: &Path, args: &[&str]) -> CliResult {
    Command::new(env!("CARGO_BIN_EXE_bgmforge"))
        .args(args)
        .current_dir(dir)
        .env("NO_COLOR", "1")
        .env_remove("BGMFORGE_ENCODER")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch bgmforge")
        .into()
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn write_source(path: &Path, frames: u32) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for i in 0..frames {
        let sample = ((i % 64) as i16 - 32) * 256;
        writer.write_sample(sample).unwrap();
        writer.write_sample(-sample).unwrap();
    }
    writer.finalize().unwrap();
}

/// Writes a full-size P4G bank with a single stereo ADPCM track at entry 5.
fn write_p4g_bank(dir: &Path) -> PathBuf {
    let layout = WaveBankLayout::P4G_BGM;
    let payload_len = 512usize;
    let mut bank = vec![0u8; layout.data_offset as usize + payload_len];

    let at = layout.entry_table_offset as usize + 5 * 24;
    let format = MiniFormat::pack(codec::ADPCM, 2, 44100, 36, 1);
    bank[at + 4..at + 8].copy_from_slice(&format.0.to_le_bytes());
    bank[at + 8..at + 12].copy_from_slice(&0u32.to_le_bytes());
    bank[at + 12..at + 16].copy_from_slice(&(payload_len as u32).to_le_bytes());
    for (i, byte) in bank[layout.data_offset as usize..].iter_mut().enumerate() {
        *byte = (i % 199) as u8;
    }
    let bank_path = dir.join("BGM.xwb");
    fs::write(&bank_path, bank).unwrap();

    let names = NameTableLayout::P4G_BGM;
    let mut xsb = vec![0u8; names.start_offset as usize];
    for index in 0..layout.entry_count {
        if names.overrides.contains(&index) {
            continue;
        }
        let name = if index == 5 {
            "theme01".to_string()
        } else {
            format!("bgm_{:04}", index)
        };
        xsb.extend_from_slice(name.as_bytes());
        xsb.push(0);
    }
    fs::write(dir.join("BGM.xsb"), xsb).unwrap();

    bank_path
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_cli(dir.path(), &["--help"]);
    assert!(result.success);
    for command in ["build", "export", "batch", "extract"] {
        assert!(result.stdout.contains(command), "missing {}", command);
    }
}

#[test]
fn test_unknown_game_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_cli(
        dir.path(),
        &["build", "-g", "p9", "-i", "music.json", "-o", "out"],
    );
    assert!(!result.success);
    assert!(result.stderr.contains("Unsupported game 'p9'"), "{}", result.stderr);
}

#[test]
fn test_missing_encoder_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let deps = dir.path().join("no-deps");
    let result = run_cli(
        dir.path(),
        &[
            "build",
            "-g",
            "p4g",
            "-i",
            "music.json",
            "-o",
            "out",
            "--dependencies-dir",
            path_arg(&deps),
        ],
    );
    assert!(!result.success);
    assert!(result.stderr.contains("AdpcmEncode"), "{}", result.stderr);
    assert!(result.stderr.contains("could not be found"), "{}", result.stderr);
}

#[test]
fn test_extract_missing_bank_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result = run_cli(dir.path(), &["extract", "-i", "nope.xwb", "-o", "out"]);
    assert!(!result.success);
    assert!(result.stderr.contains("nope.xwb"), "{}", result.stderr);
}

#[test]
fn test_extract_writes_named_track() {
    let dir = tempfile::tempdir().unwrap();
    let bank = write_p4g_bank(dir.path());
    let out = dir.path().join("bgm");

    let result = run_cli(dir.path(), &["extract", "-i", path_arg(&bank), "-o", path_arg(&out)]);
    assert!(result.success, "{}", result.stderr);
    assert!(result.stdout.contains("Extracted 1 file"), "{}", result.stdout);

    let wav = out.join("theme01.wav");
    let props = WaveProps::read(&wav).unwrap();
    assert_eq!(props.num_channels, 2);
    assert_eq!(props.sample_rate, 44100);
    assert_eq!(props.block_align, (36 + 22) * 2);
    assert_eq!(props.data_size, 512);
}

#[cfg(unix)]
fn write_copy_encoder(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("AtomEncd");
    fs::write(&path, "#!/bin/sh\ncp \"$1\" \"$2\"\n").unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[cfg(unix)]
#[test]
fn test_build_reuses_cache_on_second_run() {
    let dir = tempfile::tempdir().unwrap();
    let encoder = write_copy_encoder(dir.path());
    let source = dir.path().join("battle.wav");
    write_source(&source, 4096);

    let music = dir.path().join("music.json");
    fs::write(
        &music,
        format!(
            r#"{{"songs":[{{"id":"1","name":"Battle","isEnabled":true,"replacementFilePath":"{}","outputFilePath":"bgm/battle.adx","loopStartSample":0,"loopEndSample":0}}]}}"#,
            path_arg(&source)
        ),
    )
    .unwrap();

    let out = dir.path().join("build");
    let cache = dir.path().join("cache");
    let args = [
        "build",
        "-g",
        "p3f",
        "-i",
        path_arg(&music),
        "-o",
        path_arg(&out),
        "--cache-dir",
        path_arg(&cache),
        "--encoder",
        path_arg(&encoder),
    ];

    let first = run_cli(dir.path(), &args);
    assert!(first.success, "{}", first.stderr);
    assert!(first.stdout.contains("Encoded: 1"), "{}", first.stdout);
    assert_eq!(
        fs::read(out.join("bgm/battle.adx")).unwrap(),
        fs::read(&source).unwrap()
    );

    let second = run_cli(dir.path(), &args);
    assert!(second.success, "{}", second.stderr);
    assert!(second.stdout.contains("Cache hits: 1"), "{}", second.stdout);
    assert!(second.stdout.contains("Encoded: 0"), "{}", second.stdout);
}
