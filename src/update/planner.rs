//! Next-version planning for batch members

use super::{Batch, Planned, Resolved, VersionResolver};
use crate::domain::{ReleaseMode, ReleaseType, UpdateItem, Version, VersionSpec};
use crate::error::UpdateError;
use chrono::{DateTime, Utc};
use log::debug;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

static SNAP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Assigns every batch member the version it will be committed as
pub struct BatchVersionPlanner {
    resolver: VersionResolver,
    mode: ReleaseMode,
}

impl BatchVersionPlanner {
    pub fn new(resolver: VersionResolver, mode: ReleaseMode) -> Self {
        Self { resolver, mode }
    }

    /// Plan the batch
    ///
    /// In tag mode each member is released per its `version_to_tag`
    /// (default patch); in snap mode each gets a fresh snapshot token.
    pub async fn plan(&self, mut batch: Batch<Resolved>) -> Result<Batch<Planned>, UpdateError> {
        let now = Utc::now();
        for item in batch.items_mut() {
            let version = match self.mode {
                ReleaseMode::Tag => {
                    let spec = item
                        .version_to_tag
                        .clone()
                        .unwrap_or(VersionSpec::Release(ReleaseType::Patch));
                    self.resolver.next_version(item.id(), &spec).await?
                }
                ReleaseMode::Snap => snap_token(item, now),
            };
            debug!("Planned {} as {}", item.id().key(), version);
            item.component.id = item.component.id.with_version(version);
        }
        Ok(batch.into_planned())
    }
}

/// Mint a snapshot token for an item
///
/// Tokens differ between calls even for identical input.
pub fn snap_token(item: &UpdateItem, now: DateTime<Utc>) -> Version {
    let mut hasher = Sha256::new();
    hasher.update(item.id().key().to_string().as_bytes());
    if let Some(ref previous) = item.previous_version {
        hasher.update(previous.to_string().as_bytes());
    }
    for dependency in &item.dependencies {
        hasher.update(dependency.to_string().as_bytes());
    }
    hasher.update(now.to_rfc3339().as_bytes());
    hasher.update(SNAP_COUNTER.fetch_add(1, Ordering::Relaxed).to_le_bytes());
    Version::Snap(format!("{:x}", hasher.finalize()))
}
