//! Progress indication for staging and task waits
//!
//! A bar counts files while staging; a spinner runs while polling tasks.

use std::time::Duration;

use indicatif::ProgressStyle;

use super::OutputConfig;

/// Progress bar wrapper
///
/// Handles progress display based on output configuration.
/// In quiet or JSON mode, progress is suppressed.
#[derive(Debug)]
pub struct ProgressBar {
    bar: Option<indicatif::ProgressBar>,
}

fn hidden(config: &OutputConfig) -> bool {
    config.quiet || config.json || config.no_progress
}

impl ProgressBar {
    /// Create a bar counting `total` files
    pub fn new(config: &OutputConfig, total: u64) -> Self {
        let bar = (!hidden(config)).then(|| {
            let bar = indicatif::ProgressBar::new(total);
            let style = ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .map(|style| style.progress_chars("#>-"))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(style);
            bar
        });

        Self { bar }
    }

    /// Create a spinner for indeterminate progress
    pub fn spinner(config: &OutputConfig, message: &str) -> Self {
        let bar = (!hidden(config)).then(|| {
            let bar = indicatif::ProgressBar::new_spinner();
            let style = ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner());
            bar.set_style(style);
            bar.set_message(message.to_string());
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        });

        Self { bar }
    }

    /// Increment progress
    pub fn inc(&self, delta: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(delta);
        }
    }

    /// Set message
    pub fn set_message(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
        }
    }

    /// Finish and clear the progress bar
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    /// Check if progress bar is visible
    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_bar_quiet_mode() {
        let config = OutputConfig {
            quiet: true,
            ..Default::default()
        };
        let bar = ProgressBar::new(&config, 100);
        assert!(!bar.is_visible());
    }

    #[test]
    fn test_spinner_json_mode() {
        let config = OutputConfig {
            json: true,
            ..Default::default()
        };
        let spinner = ProgressBar::spinner(&config, "Waiting");
        assert!(!spinner.is_visible());
    }

    #[test]
    fn test_progress_bar_no_progress() {
        let config = OutputConfig {
            no_progress: true,
            ..Default::default()
        };
        let bar = ProgressBar::new(&config, 100);
        assert!(!bar.is_visible());
    }

    #[test]
    fn test_progress_bar_normal() {
        let bar = ProgressBar::new(&OutputConfig::default(), 100);
        assert!(bar.is_visible());
        bar.inc(1);
        bar.finish_and_clear();
    }
}
