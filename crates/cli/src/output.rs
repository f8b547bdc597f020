//! Terminal output utilities
//!
//! Provides consistent formatting for CLI output.

use imgconv_client::{BatchOutcome, PendingArtifact};
use owo_colors::OwoColorize;

/// Status message helpers
pub struct Status;

impl Status {
    /// Print a success message
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Print an error message
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print a warning message
    pub fn warning(message: &str) {
        eprintln!("{} {}", "⚠".yellow(), message);
    }

    /// Print an info message
    pub fn info(message: &str) {
        println!("{} {}", "ℹ".blue(), message);
    }

    /// Print a header
    pub fn header(message: &str) {
        println!();
        println!("{}", message.bold());
        println!("{}", "─".repeat(message.chars().count()));
    }

    /// Print one pending artifact as a numbered line
    pub fn pending(position: usize, artifact: &PendingArtifact) {
        println!(
            "  {} {} {}",
            format!("[{}]", position + 1).dimmed(),
            artifact.download_name,
            format!("({})", format_size(artifact.size as u64)).dimmed()
        );
    }
}

/// One-line summary of a finished batch
pub fn format_outcome(outcome: &BatchOutcome, total: usize) -> String {
    match &outcome.failure {
        None => format!("Converted {}", format_count(outcome.completed, "file", "files")),
        Some(failure) => format!(
            "Converted {} of {} before {} failed",
            outcome.completed,
            total,
            failure.name.as_deref().unwrap_or("an unnamed file")
        ),
    }
}

/// Format a duration for display
pub fn format_duration(duration: std::time::Duration) -> String {
    let secs = duration.as_secs_f32();
    if secs < 1.0 {
        format!("{:.0}ms", secs * 1000.0)
    } else if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs % 60.0;
        format!("{}m {:.0}s", mins, remaining_secs)
    }
}

/// Format a file size for display
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Format a count with singular/plural
pub fn format_count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
