//! Build command implementation

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use bgmforge_build::MusicData;
use colored::Colorize;

use super::options::BuilderOptions;
use super::reporting::print_summary;

/// Generates a music build from a music data file.
///
/// # Arguments
/// * `options` - Game and encoder settings
/// * `input` - Path to the music data JSON
/// * `output` - Directory to generate the build in
pub fn run(options: &BuilderOptions, input: &str, output: &str) -> Result<ExitCode> {
    let start = Instant::now();

    println!("{}", "Generating music build".cyan().bold());
    println!("  {}: {}", "Game".dimmed(), options.game);
    println!("  {}: {}", "Music data".dimmed(), input);
    println!("  {}: {}", "Output".dimmed(), output);

    let builder = options.builder()?;
    let music = MusicData::load(Path::new(input))
        .with_context(|| format!("Failed to load music data: {}", input))?;

    let summary = builder.build(&music, Path::new(output))?;
    Ok(print_summary("Music build generated", &summary, start.elapsed()))
}
