//! Text output formatter for human-readable display
//!
//! This module provides:
//! - One line per committed component with its version change and status
//! - Pinned dependencies under each component
//! - Published packages and the build error, if any

use crate::domain::{BuildStatus, UpdateItem, UpdateOutcome};
use crate::output::{OutputFormatter, Verbosity};
use colored::Colorize;
use std::io::Write;

/// Text formatter for human-readable output
pub struct TextFormatter {
    verbosity: Verbosity,
    /// Whether to use colors
    color: bool,
}

impl TextFormatter {
    /// Create a new text formatter
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            color: true,
        }
    }

    /// Create a new text formatter with color option
    pub fn with_color(verbosity: Verbosity, color: bool) -> Self {
        Self { verbosity, color }
    }

    fn status_label(&self, status: BuildStatus) -> String {
        let label = status.to_string();
        if !self.color {
            return label;
        }
        match status {
            BuildStatus::Succeeded => label.green().to_string(),
            BuildStatus::Failed => label.red().bold().to_string(),
            BuildStatus::Pending => label.yellow().to_string(),
            BuildStatus::None => label.dimmed().to_string(),
        }
    }

    fn write_summary(&self, outcome: &UpdateOutcome, writer: &mut dyn Write) -> std::io::Result<()> {
        let count = outcome.committed_count();
        let noun = if count == 1 { "component" } else { "components" };
        if self.color {
            writeln!(
                writer,
                "{} {} committed ({})",
                count.to_string().bold(),
                noun,
                self.status_label(outcome.build_status())
            )
        } else {
            writeln!(
                writer,
                "{} {} committed ({})",
                count,
                noun,
                outcome.build_status()
            )
        }
    }
}

impl OutputFormatter for TextFormatter {
    fn format(&self, outcome: &UpdateOutcome, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.verbosity != Verbosity::Quiet {
            for item in &outcome.deps_update_items {
                self.format_item(item, writer)?;
            }

            if !outcome.published_packages.is_empty() {
                writeln!(writer)?;
                writeln!(writer, "Published:")?;
                for package in &outcome.published_packages {
                    writeln!(writer, "  {}", package)?;
                }
            }

            if !outcome.deps_update_items.is_empty() {
                writeln!(writer)?;
            }
        }

        self.write_summary(outcome, writer)?;

        if let Some(ref error) = outcome.error {
            self.format_error(error, writer)?;
        }
        Ok(())
    }

    fn format_item(&self, item: &UpdateItem, writer: &mut dyn Write) -> std::io::Result<()> {
        let key = item.id().key().to_string();
        let previous = item
            .previous_version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "new".to_string());
        let next = item
            .id()
            .version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_default();
        let status = self.status_label(item.component.build_status);

        if self.color {
            writeln!(
                writer,
                "{} {} {} {} [{}]",
                key.bold(),
                previous.dimmed(),
                "→".dimmed(),
                next.bright_white().bold(),
                status
            )?;
        } else {
            writeln!(writer, "{} {} -> {} [{}]", key, previous, next, status)?;
        }

        for dependency in &item.dependencies {
            if self.color {
                writeln!(writer, "  {} {}", "↳".dimmed(), dependency)?;
            } else {
                writeln!(writer, "  - {}", dependency)?;
            }
        }

        if self.verbosity == Verbosity::Verbose {
            if let Some(ref log) = item.component.log {
                writeln!(
                    writer,
                    "  by {} <{}>: {}",
                    log.username, log.email, log.message
                )?;
            }
        }
        Ok(())
    }

    fn format_error(&self, message: &str, writer: &mut dyn Write) -> std::io::Result<()> {
        if self.color {
            writeln!(writer, "{} {}", "error:".red().bold(), message)
        } else {
            writeln!(writer, "error: {}", message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Component, LogEntry};
    use chrono::Utc;

    fn outcome(status: BuildStatus, error: Option<&str>) -> UpdateOutcome {
        let mut component = Component::new("scope.a@1.1.0".parse().unwrap());
        component.build_status = status;
        component.log = Some(LogEntry {
            username: "scopeup-bot".to_string(),
            email: "scopeup-bot@users.noreply.local".to_string(),
            message: "update dependencies".to_string(),
            date: Utc::now(),
        });
        let mut item = UpdateItem::new(component, vec!["scope.b@1.1.0".parse().unwrap()], None);
        item.previous_version = Some("1.0.0".parse().unwrap());
        UpdateOutcome {
            deps_update_items: vec![item],
            published_packages: Vec::new(),
            error: error.map(String::from),
        }
    }

    fn render(formatter: &TextFormatter, outcome: &UpdateOutcome) -> String {
        let mut buf = Vec::new();
        formatter.format(outcome, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_format_plain() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, false);
        let text = render(&formatter, &outcome(BuildStatus::Succeeded, None));

        assert!(text.contains("scope.a 1.0.0 -> 1.1.0 [succeeded]"));
        assert!(text.contains("  - scope.b@1.1.0"));
        assert!(text.contains("1 component committed (succeeded)"));
        assert!(!text.contains("error:"));
        assert!(!text.contains("by scopeup-bot"));
    }

    #[test]
    fn test_format_failure() {
        let formatter = TextFormatter::with_color(Verbosity::Normal, false);
        let text = render(&formatter, &outcome(BuildStatus::Failed, Some("compile failed")));

        assert!(text.contains("[failed]"));
        assert!(text.contains("error: compile failed"));
    }

    #[test]
    fn test_format_quiet_only_summary() {
        let formatter = TextFormatter::with_color(Verbosity::Quiet, false);
        let text = render(&formatter, &outcome(BuildStatus::Succeeded, None));

        assert!(!text.contains("scope.b@1.1.0"));
        assert_eq!(text.trim(), "1 component committed (succeeded)");
    }

    #[test]
    fn test_format_verbose_shows_provenance() {
        let formatter = TextFormatter::with_color(Verbosity::Verbose, false);
        let text = render(&formatter, &outcome(BuildStatus::Succeeded, None));
        assert!(text.contains("by scopeup-bot <scopeup-bot@users.noreply.local>: update dependencies"));
    }

    #[test]
    fn test_format_colored_has_content() {
        let formatter = TextFormatter::new(Verbosity::Normal);
        let text = render(&formatter, &outcome(BuildStatus::Succeeded, None));
        assert!(text.contains("scope.a"));
        assert!(text.contains("1.1.0"));
    }
}
