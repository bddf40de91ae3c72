//! Output formatting utilities
//!
//! This module provides formatters for CLI output in both human-readable
//! and JSON formats. It also handles spinners for task waits and colored
//! output.

mod formatter;
mod progress;

pub use formatter::{Formatter, format_size};
pub use progress::ProgressBar;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Default)]
pub struct OutputConfig {
    /// Use JSON output format
    pub json: bool,
    /// Disable colored output
    pub no_color: bool,
    /// Disable progress bar
    pub no_progress: bool,
    /// Suppress non-error output
    pub quiet: bool,
}
