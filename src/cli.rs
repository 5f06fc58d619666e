//! CLI argument parsing module for scopeup

use crate::domain::{DepUpdateRequestItem, UpdateOptions};
use crate::error::ConfigError;
use clap::Parser;
use std::path::{Path, PathBuf};

/// Batch component updater
#[derive(Parser, Debug, Clone)]
#[command(
    name = "scopeup",
    version,
    about = "Advance components together and pin their dependencies"
)]
pub struct CliArgs {
    /// JSON file with the update request: [{componentId, dependencies, versionToTag}]
    pub request: PathBuf,

    /// Scope snapshot file to read from and commit to
    #[arg(long, default_value = "scope.json")]
    pub scope: PathBuf,

    // Release options
    /// Release semantic versions
    #[arg(long, conflicts_with = "snap")]
    pub tag: bool,

    /// Mint snapshot versions (default)
    #[arg(long)]
    pub snap: bool,

    /// Multi-root update: export the batch instead of clearing remote caches
    #[arg(long)]
    pub multiple: bool,

    /// Identifier for prerelease bumps (e.g. dev, rc)
    #[arg(long)]
    pub pre_release_id: Option<String>,

    // Provenance
    /// Log message recorded on every updated component
    #[arg(short, long)]
    pub message: Option<String>,

    /// Author name recorded on every updated component
    #[arg(long)]
    pub username: Option<String>,

    /// Author email recorded on every updated component
    #[arg(long)]
    pub email: Option<String>,

    // Build
    /// Command run once per updated component (e.g. "npm run build")
    #[arg(long)]
    pub build_cmd: Option<String>,

    // Output options
    /// Output results in JSON format
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable quiet mode - minimal output
    #[arg(short, long)]
    pub quiet: bool,
}

impl CliArgs {
    /// Options for the update run
    pub fn update_options(&self) -> UpdateOptions {
        UpdateOptions {
            tag: self.tag,
            snap: self.snap,
            multiple: self.multiple,
            message: self.message.clone(),
            username: self.username.clone(),
            email: self.email.clone(),
            pre_release_id: self.pre_release_id.clone(),
        }
    }

    /// Whether to show stage spinners
    pub fn show_progress(&self) -> bool {
        !self.quiet && !self.json
    }
}

/// Read an update request file
pub fn read_request(path: &Path) -> Result<Vec<DepUpdateRequestItem>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadRequest {
        path: path.to_path_buf(),
        source,
    })?;
    let items: Vec<DepUpdateRequestItem> =
        serde_json::from_str(&content).map_err(|e| ConfigError::InvalidRequest {
            message: format!("{}: {}", path.display(), e),
        })?;
    if items.is_empty() {
        return Err(ConfigError::InvalidRequest {
            message: format!("{}: no components to update", path.display()),
        });
    }
    Ok(items)
}
