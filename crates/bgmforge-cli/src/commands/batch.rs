//! Batch command implementation

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{bail, Result};
use bgmforge_build::builder::BATCH_OUTPUT_DIR;
use colored::Colorize;

use super::options::BuilderOptions;
use super::reporting::print_summary;

/// Encodes every supported file in `folder` into `folder/encoded`.
pub fn run(options: &BuilderOptions, folder: &str) -> Result<ExitCode> {
    let start = Instant::now();
    let folder = Path::new(folder);
    if !folder.is_dir() {
        bail!("Batch folder does not exist: {}", folder.display());
    }

    println!("{}", "Batch encoding".cyan().bold());
    println!("  {}: {}", "Game".dimmed(), options.game);
    println!("  {}: {}", "Folder".dimmed(), folder.display());

    let builder = options.builder()?;
    let summary = builder.batch(folder)?;

    println!(
        "  {}: {}",
        "Output".dimmed(),
        folder.join(BATCH_OUTPUT_DIR).display()
    );
    Ok(print_summary("Batch encoding finished", &summary, start.elapsed()))
}
