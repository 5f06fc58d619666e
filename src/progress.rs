//! Stage feedback for update runs
//!
//! Shows one spinner per orchestrator stage using indicatif.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner reporter for the update workflow
pub struct Progress {
    /// Disabled in quiet and JSON mode
    enabled: bool,
    spinner: Option<ProgressBar>,
}

impl Progress {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            spinner: None,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    /// Show a spinner for the current stage
    pub fn spinner(&mut self, message: &str) {
        if !self.enabled {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .template("{spinner:.cyan} {msg}")
                .expect("Invalid template"),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        self.spinner = Some(spinner);
    }

    /// Update the spinner message
    pub fn set_message(&self, message: &str) {
        if let Some(ref spinner) = self.spinner {
            spinner.set_message(message.to_string());
        }
    }

    /// Finish and clear the current spinner
    pub fn finish_and_clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    pub fn is_active(&self) -> bool {
        self.spinner.is_some()
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::new(true)
    }
}
