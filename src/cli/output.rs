//! CLI output formatting utilities.

use crate::extractor::{format_duration, TrackRecord};
use crate::retrieval::{Artifact, RetrievalOutcome};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a list item.
    pub fn list_item(msg: &str) {
        println!("  {} {}", style("*").cyan(), msg);
    }

    /// Print numbered search results.
    pub fn tracks(tracks: &[TrackRecord]) {
        for (i, track) in tracks.iter().enumerate() {
            println!(
                "  {} {} {}",
                style(format!("{:>2}.", i + 1)).cyan(),
                style(truncate(track.display_title(), 60)).bold(),
                style(format!("({})", track.uploader)).dim()
            );
            println!(
                "      {}  {}  {}  {}",
                format_duration(track.duration_seconds),
                track
                    .view_count
                    .map(|v| format!("{} views", v))
                    .unwrap_or_else(|| "- views".to_string()),
                track.kind,
                style(track.quality_summary()).dim()
            );
        }
    }

    /// Print every entry of a retrieval outcome followed by a summary line.
    pub fn outcome(outcome: &RetrievalOutcome) {
        for entry in &outcome.entries {
            let title = truncate(entry.track.display_title(), 60);
            match &entry.result {
                Ok(Artifact::File(path)) => {
                    println!("  {} {}", style("ok").green(), style(title).bold());
                    println!("     {}", style(path.display()).dim());
                }
                Ok(Artifact::Link(link)) => {
                    println!(
                        "  {} {} [{}]",
                        style("ok").green(),
                        style(title).bold(),
                        link.label
                    );
                    println!("     {}", link.url);
                    if let Some(expires) = link.expires_at {
                        println!("     {}", style(format!("expires {}", expires.to_rfc3339())).dim());
                    }
                }
                Err(failure) => {
                    println!("  {} {}", style("failed").red(), style(title).bold());
                    println!("     {}", style(failure).dim());
                }
            }
        }

        let summary = format!(
            "{} {}: {} succeeded, {} failed",
            outcome.entries.len(),
            if outcome.entries.len() == 1 { "track" } else { "tracks" },
            outcome.success_count(),
            outcome.failure_count()
        );
        if outcome.is_complete_success() {
            Output::success(&summary);
        } else {
            Output::warning(&summary);
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate on a character boundary with an ellipsis.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("ÅÅÅÅÅÅÅÅÅÅ", 6), "ÅÅÅ...");
    }
}
