//! Output formatting and progress indicators
//!
//! Spinners for long-running compiles, status prefixes and the
//! user-facing error display.

use indicatif::{ProgressBar, ProgressStyle};

use crate::core::result_tree::Status;

/// Create a spinner for operations with unknown duration
pub fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
            .template("{spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Status message prefixes
pub mod status {
    /// Success prefix (green checkmark)
    pub const SUCCESS: &str = "✓";

    /// Error prefix (red X)
    pub const ERROR: &str = "✗";

    /// Warning prefix (yellow triangle)
    pub const WARNING: &str = "⚠";

    /// Info prefix (blue circle)
    pub const INFO: &str = "ℹ";
}

/// Prefix matching a result status
pub fn status_prefix(value: &Status) -> &'static str {
    match value {
        Status::Ok => status::SUCCESS,
        Status::Failed => status::ERROR,
        Status::Other(_) => status::WARNING,
    }
}

/// Render an error and its causes, one per line
pub fn format_error(error: &anyhow::Error) -> String {
    let mut out = format!("{} {error}", status::ERROR);
    for cause in error.chain().skip(1) {
        out.push_str(&format!("\n  caused by: {cause}"));
    }
    out
}

/// Print an error and its causes to stderr
pub fn display_error(error: &anyhow::Error) {
    tracing::debug!("{error:?}");
    eprintln!("{}", format_error(error));
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_format_error_includes_chain() {
        let err = std::fs::read_to_string("/nonexistent/release.yaml")
            .context("Failed to load release configuration")
            .unwrap_err();
        let text = format_error(&err);
        assert!(text.starts_with("✗ Failed to load release configuration"));
        assert!(text.contains("caused by:"));
    }

    #[test]
    fn test_status_prefix() {
        assert_eq!(status_prefix(&Status::Ok), status::SUCCESS);
        assert_eq!(status_prefix(&Status::Failed), status::ERROR);
    }
}
