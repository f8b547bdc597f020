//! Progress indicators
//!
//! Renders orchestrator [`BatchEvent`]s as a progress bar.

use imgconv_client::BatchEvent;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files {msg}";

/// Progress bar over one conversion batch
#[derive(Clone)]
pub struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    /// Create a bar for `total` files
    pub fn new(total: u64) -> Self {
        Self::with_bar(ProgressBar::new(total))
    }

    /// Create a bar that draws nothing
    pub fn hidden(total: u64) -> Self {
        Self::with_bar(ProgressBar::with_draw_target(Some(total), ProgressDrawTarget::hidden()))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        let style = ProgressStyle::default_bar()
            .template(BAR_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Advance the bar for one orchestrator event
    pub fn observe(&self, event: &BatchEvent) {
        match event {
            BatchEvent::Started { name, index, .. } => {
                let label = name.clone().unwrap_or_else(|| format!("file {}", index + 1));
                self.bar.set_message(format!("Converting {label}..."));
            }
            BatchEvent::Converted { .. } => self.bar.inc(1),
            BatchEvent::Failed { message, .. } => self.bar.abandon_with_message(format!("✗ {message}")),
        }
    }

    /// Files converted so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Finish with a success message
    pub fn finish(&self, message: &str) {
        if !self.bar.is_finished() {
            self.bar.finish_with_message(format!("✓ {message}"));
        }
    }
}

/// Create a spinner for indeterminate progress
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_progress_counts_conversions() {
        let progress = BatchProgress::hidden(3);
        progress.observe(&BatchEvent::Started {
            index: 0,
            total: 3,
            name: Some("a.png".to_string()),
        });
        progress.observe(&BatchEvent::Converted {
            index: 0,
            bytes: 10,
            pending: false,
        });
        progress.observe(&BatchEvent::Started {
            index: 1,
            total: 3,
            name: None,
        });
        progress.observe(&BatchEvent::Failed {
            index: 1,
            message: "Failed to convert image".to_string(),
        });

        assert_eq!(progress.position(), 1);
        progress.finish("done");
    }

    #[test]
    fn test_spinner_creation() {
        let pb = spinner("Checking server...");
        pb.finish();
    }
}
