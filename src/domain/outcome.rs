//! Result of running an update batch

use super::{BuildStatus, UpdateItem};
use serde::Serialize;

/// Finalized batch, published packages and the build error if any
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    /// Items as committed
    pub deps_update_items: Vec<UpdateItem>,
    /// Package references published by the build
    pub published_packages: Vec<String>,
    /// Formatted build error, `None` on full success
    pub error: Option<String>,
}

impl UpdateOutcome {
    /// Returns true if the build reported no errors
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the number of committed items
    pub fn committed_count(&self) -> usize {
        self.deps_update_items.len()
    }

    /// Returns the final build status shared by the batch
    pub fn build_status(&self) -> BuildStatus {
        self.deps_update_items
            .first()
            .map(|item| item.component.build_status)
            .unwrap_or_default()
    }
}
