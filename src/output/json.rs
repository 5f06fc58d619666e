//! JSON output formatter for machine processing

use crate::domain::{Component, UpdateItem, UpdateOutcome};
use crate::output::{OutputFormatter, Verbosity};
use serde::Serialize;
use std::io::Write;

/// JSON formatter for machine-readable output
pub struct JsonFormatter {
    /// Verbose output embeds the full component records
    verbosity: Verbosity,
}

impl JsonFormatter {
    pub fn new(verbosity: Verbosity) -> Self {
        Self { verbosity }
    }

    fn item_to_json<'a>(&self, item: &'a UpdateItem) -> JsonItem<'a> {
        JsonItem {
            component_id: item.id().to_string(),
            previous_version: item.previous_version.as_ref().map(|v| v.to_string()),
            dependencies: item.dependencies.iter().map(|d| d.to_string()).collect(),
            build_status: item.component.build_status.to_string(),
            component: (self.verbosity == Verbosity::Verbose).then_some(&item.component),
        }
    }
}

/// JSON representation of the full outcome
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    deps_update_items: Vec<JsonItem<'a>>,
    published_packages: &'a [String],
    /// Null on full success
    error: Option<&'a str>,
}

/// JSON representation of one committed item
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonItem<'a> {
    component_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_version: Option<String>,
    dependencies: Vec<String>,
    build_status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    component: Option<&'a Component>,
}

fn write_json<T: Serialize>(value: &T, writer: &mut dyn Write) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    writeln!(writer, "{}", json)
}

impl OutputFormatter for JsonFormatter {
    fn format(&self, outcome: &UpdateOutcome, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonOutput {
            deps_update_items: outcome
                .deps_update_items
                .iter()
                .map(|item| self.item_to_json(item))
                .collect(),
            published_packages: &outcome.published_packages,
            error: outcome.error.as_deref(),
        };
        write_json(&output, writer)
    }

    fn format_item(&self, item: &UpdateItem, writer: &mut dyn Write) -> std::io::Result<()> {
        write_json(&self.item_to_json(item), writer)
    }

    fn format_error(&self, message: &str, writer: &mut dyn Write) -> std::io::Result<()> {
        let output = JsonOutput {
            deps_update_items: Vec::new(),
            published_packages: &[],
            error: Some(message),
        };
        write_json(&output, writer)
    }
}
