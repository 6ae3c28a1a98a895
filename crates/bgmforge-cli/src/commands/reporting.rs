//! Run summaries printed after the encoding commands.

use std::process::ExitCode;
use std::time::Duration;

use bgmforge_build::BuildSummary;
use colored::Colorize;

/// Prints a run summary and picks the exit code.
pub(super) fn print_summary(title: &str, summary: &BuildSummary, elapsed: Duration) -> ExitCode {
    println!();
    if summary.is_success() {
        println!(
            "{} {} in {} ms",
            "SUCCESS".green().bold(),
            title,
            elapsed.as_millis()
        );
    } else {
        println!(
            "{} {} in {} ms with {} failed {}",
            "PARTIAL".yellow().bold(),
            title,
            elapsed.as_millis(),
            summary.failures.len(),
            if summary.failures.len() == 1 { "file" } else { "files" }
        );
    }

    println!("  {}: {}", "Unique sources".dimmed(), summary.unique_sources);
    println!("  {}: {}", "Encoded".dimmed(), summary.encoded);
    println!("  {}: {}", "Loop refreshed".dimmed(), summary.loop_refreshed);
    println!("  {}: {}", "Cache hits".dimmed(), summary.cache_hits);
    println!("  {}: {}", "Files written".dimmed(), summary.outputs_copied);

    for failure in &summary.failures {
        println!(
            "  {} {}: {}",
            "FAILED".red().bold(),
            failure.source.display(),
            failure.error
        );
    }

    if summary.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
