//! Update request payloads and the per-component unit of work

use super::{Component, ComponentId, Version, VersionSpec};
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of an update request as received from a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DepUpdateRequestItem {
    /// Component to advance (`scope.name[@version]`)
    pub component_id: String,
    /// Dependencies to pin (`scope.name[@version-or-range]`)
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Release type or explicit version for the component itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_to_tag: Option<String>,
}

/// How batch members get their own next version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseMode {
    /// Discrete semantic release
    Tag,
    /// Content-addressed snapshot
    Snap,
}

/// Options accompanying an update request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UpdateOptions {
    /// Release a semantic version
    pub tag: bool,
    /// Mint a snapshot (the default when `tag` is not set)
    pub snap: bool,
    /// Multi-root update: import the roots and export instead of clearing caches
    pub multiple: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Identifier for `prerelease` bumps
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_release_id: Option<String>,
}

impl UpdateOptions {
    /// Determines the release mode, rejecting `tag` together with `snap`
    pub fn release_mode(&self) -> Result<ReleaseMode, ConfigError> {
        match (self.tag, self.snap) {
            (true, true) => Err(ConfigError::ConflictingOptions {
                message: "tag and snap cannot be used together".to_string(),
            }),
            (true, false) => Ok(ReleaseMode::Tag),
            (false, _) => Ok(ReleaseMode::Snap),
        }
    }
}

/// A component under update together with the dependencies it is pinned to
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItem {
    /// Working copy of the component
    pub component: Component,
    /// Dependencies resolved to exact versions
    pub dependencies: Vec<ComponentId>,
    /// Requested release type or version for the component itself
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_to_tag: Option<VersionSpec>,
    /// Version the component had before this update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_version: Option<Version>,
}

impl UpdateItem {
    /// Creates an item for a component loaded from a scope
    pub fn new(
        component: Component,
        dependencies: Vec<ComponentId>,
        version_to_tag: Option<VersionSpec>,
    ) -> Self {
        let previous_version = component.id.version.clone();
        Self {
            component,
            dependencies,
            version_to_tag,
            previous_version,
        }
    }

    /// Current identifier of the component (planned version once planned)
    pub fn id(&self) -> &ComponentId {
        &self.component.id
    }
}

impl fmt::Display for UpdateItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let previous = self
            .previous_version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "new".to_string());
        write!(f, "{}: {} → ", self.component.id.key(), previous)?;
        match self.component.id.version {
            Some(ref v) => write!(f, "{}", v),
            None => write!(f, "unplanned"),
        }
    }
}
