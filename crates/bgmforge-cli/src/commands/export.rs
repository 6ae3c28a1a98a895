//! Export command implementation

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use bgmforge_build::MusicData;
use colored::Colorize;

use super::options::BuilderOptions;
use super::reporting::print_summary;

/// Encodes the unique enabled songs of a music data file into a flat folder.
pub fn run(options: &BuilderOptions, input: &str, output: &str) -> Result<ExitCode> {
    let start = Instant::now();

    println!("{}", "Exporting music build".cyan().bold());
    println!("  {}: {}", "Game".dimmed(), options.game);
    println!("  {}: {}", "Folder".dimmed(), output);

    let builder = options.builder()?;
    let music = MusicData::load(Path::new(input))
        .with_context(|| format!("Failed to load music data: {}", input))?;

    let summary = builder.export(&music, Path::new(output))?;
    Ok(print_summary("Export finished", &summary, start.elapsed()))
}
