//! Extract command implementation

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use bgmforge_formats::{extract_bank, BankProfile, EntrySelection};
use colored::Colorize;

/// Extracts the music tracks of a wave bank into `.wav` files.
///
/// # Arguments
/// * `input` - Path to the `.xwb` wave bank; its `.xsb` must sit next to it
/// * `output` - Directory for the extracted files
/// * `all` - Extract every entry instead of the curated track list
pub fn run(input: &str, output: &str, all: bool) -> Result<ExitCode> {
    let start = Instant::now();

    let mut profile = BankProfile::P4G_BGM;
    if all {
        profile.selection = EntrySelection::All;
    }

    println!("{}", "Extracting wave bank".cyan().bold());
    println!("  {}: {}", "Bank".dimmed(), input);
    println!("  {}: {}", "Output".dimmed(), output);

    let summary = extract_bank(Path::new(input), Path::new(output), &profile)
        .with_context(|| format!("Failed to extract {}", input))?;

    println!();
    println!(
        "{} Extracted {} {} in {} ms",
        "SUCCESS".green().bold(),
        summary.written.len(),
        if summary.written.len() == 1 { "file" } else { "files" },
        start.elapsed().as_millis()
    );
    if summary.skipped > 0 {
        println!(
            "  {}",
            format!("{} entries skipped (empty or not ADPCM)", summary.skipped).dimmed()
        );
    }

    Ok(ExitCode::SUCCESS)
}
