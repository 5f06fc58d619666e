//! Rendering of batch outcomes
//!
//! Text for terminals, JSON (`{depsUpdateItems, publishedPackages, error}`)
//! for scripts.

mod json;
mod text;

pub use json::JsonFormatter;
pub use text::TextFormatter;

use crate::domain::{UpdateItem, UpdateOutcome};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// How much of each committed item is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Summary line only
    Quiet,
    #[default]
    Normal,
    /// Adds provenance (text) or full component records (JSON)
    Verbose,
}

/// Formatter selection derived from the command line
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub verbosity: Verbosity,
    pub color: bool,
}

impl OutputConfig {
    /// `--quiet` wins over `--verbose`; color honours `NO_COLOR`
    pub fn from_cli(json: bool, verbose: bool, quiet: bool) -> Self {
        let verbosity = match (quiet, verbose) {
            (true, _) => Verbosity::Quiet,
            (false, true) => Verbosity::Verbose,
            (false, false) => Verbosity::Normal,
        };

        Self {
            format: if json {
                OutputFormat::Json
            } else {
                OutputFormat::Text
            },
            verbosity,
            color: !json && std::env::var_os("NO_COLOR").is_none(),
        }
    }
}

/// Writes outcomes, single items and fatal errors in one format
pub trait OutputFormatter {
    fn format(&self, outcome: &UpdateOutcome, writer: &mut dyn Write) -> std::io::Result<()>;

    fn format_item(&self, item: &UpdateItem, writer: &mut dyn Write) -> std::io::Result<()>;

    /// Report an error that aborted the batch before commit
    fn format_error(&self, message: &str, writer: &mut dyn Write) -> std::io::Result<()>;
}

pub fn create_formatter(config: OutputConfig) -> Box<dyn OutputFormatter> {
    match config.format {
        OutputFormat::Text => Box::new(TextFormatter::with_color(config.verbosity, config.color)),
        OutputFormat::Json => Box::new(JsonFormatter::new(config.verbosity)),
    }
}
