use std::{
    io::Write,
    path::{Path, PathBuf},
};

use miette::{IntoDiagnostic, WrapErr};
use owo_colors::OwoColorize;

use crate::{
    io::{format_time, now, LOG_TIME},
    result::Result,
    types::{format_duration, RunStats},
};

pub const SUMMARY_FILE: &str = "download_summary.txt";

/// Print the run summary and save it, with every quality choice, next to the videos.
/// Return the path of the summary file.
pub fn report(stats: &RunStats, dir: &Path, out: &mut impl Write) -> Result<PathBuf> {
    let duration = format_duration(stats.elapsed_secs());
    let rule = "=".repeat(60);

    writeln!(out, "\n{rule}")?;
    writeln!(out, "{}", "FINAL DOWNLOAD SUMMARY".bold())?;
    writeln!(out, "{rule}")?;
    writeln!(out, "• Total videos in playlist: {}", stats.total)?;
    writeln!(out, "• Successfully downloaded: {}", stats.downloaded.green())?;
    writeln!(out, "• Failed: {}", stats.failed.red())?;
    writeln!(out, "• Skipped: {}", stats.skipped.yellow())?;
    writeln!(out, "• Total file size: {:.2} MB", stats.total_size_mb)?;
    writeln!(out, "• Total duration: {duration}")?;
    writeln!(out, "• Save location: {}", dir.display())?;
    if let Some(rate) = stats.success_rate() {
        writeln!(out, "• Success rate: {rate:.1}%")?;
    }
    writeln!(out, "{rule}")?;

    let path = dir.join(SUMMARY_FILE);
    std::fs::write(&path, summary_text(stats, &duration))
        .into_diagnostic()
        .wrap_err_with(|| format!("Could not write {}", path.display()))?;

    writeln!(out, "\nSummary saved to: {}", path.display())?;
    Ok(path)
}

fn summary_text(stats: &RunStats, duration: &str) -> String {
    let mut text = String::new();
    text.push_str("Download Summary\n");
    text.push_str(&"=".repeat(40));
    text.push('\n');
    text.push_str(&format!("Date: {}\n", format_time(now(), LOG_TIME)));
    text.push_str(&format!("Started: {}\n", format_time(stats.started_at, LOG_TIME)));
    text.push_str(&format!("Total videos: {}\n", stats.total));
    text.push_str(&format!("Downloaded: {}\n", stats.downloaded));
    text.push_str(&format!("Failed: {}\n", stats.failed));
    text.push_str(&format!("Skipped: {}\n", stats.skipped));
    text.push_str(&format!("Total size: {:.2} MB\n", stats.total_size_mb));
    text.push_str(&format!("Duration: {duration}\n"));
    if let Some(rate) = stats.success_rate() {
        text.push_str(&format!("Success rate: {rate:.1}%\n"));
    }

    text.push_str("\nSelected Qualities:\n");
    for s in &stats.selections {
        text.push_str(&format!(
            "  Video {}: {} (ID: {}) {}\n",
            s.index, s.quality, s.format_id, s.link
        ));
    }
    text
}
