//! Version resolution and batch planning
//!
//! This module provides:
//! - `VersionResolver`: pins a version request to one concrete version
//! - `Batch`: the update items of one request, typed by planning state
//! - `BatchVersionPlanner`: assigns every batch member its next version
//! - `DependencyRewriter`: splices resolved versions into dependency edges

mod batch;
mod planner;
mod rewriter;

pub use batch::{Batch, BatchIndex, Planned, Resolved};
pub use planner::{snap_token, BatchVersionPlanner};
pub use rewriter::{DependencyRewriter, EdgeKind, RewriteChange, RewriteReport};

use crate::domain::{ComponentId, Version, VersionSpec, DEFAULT_PRERELEASE_ID};
use crate::error::{ScopeError, UpdateError};
use crate::scope::Scope;
use log::debug;
use std::sync::Arc;

/// Resolves version requests against a scope's version history
#[derive(Clone)]
pub struct VersionResolver {
    scope: Arc<dyn Scope>,
    prerelease_id: String,
}

impl VersionResolver {
    /// Create a resolver reading history from `scope`
    pub fn new(scope: Arc<dyn Scope>) -> Self {
        Self {
            scope,
            prerelease_id: DEFAULT_PRERELEASE_ID.to_string(),
        }
    }

    /// Set the identifier used by `prerelease` bumps (builder pattern)
    pub fn with_prerelease_id(mut self, prerelease_id: impl Into<String>) -> Self {
        self.prerelease_id = prerelease_id.into();
        self
    }

    /// Resolve a dependency request to an exact version
    ///
    /// Reads the history as it is; callers import first when it may be stale.
    pub async fn resolve_exact_version(
        &self,
        id: &ComponentId,
        spec: &VersionSpec,
    ) -> Result<Version, UpdateError> {
        let history = self.history(id).await?;
        let version = select_version(id, &history, spec, &self.prerelease_id)?;
        debug!("Resolved {}@{} to {}", id.key(), spec, version);
        Ok(version)
    }

    /// Compute the next version a batch member is released as
    ///
    /// A release type bumps the highest known version. An explicit version
    /// is taken as is, provided it does not exist yet. Ranges are rejected.
    pub async fn next_version(
        &self,
        id: &ComponentId,
        spec: &VersionSpec,
    ) -> Result<Version, UpdateError> {
        match spec {
            VersionSpec::Range(req) => Err(UpdateError::invalid_version_spec(
                req.to_string(),
                "a range cannot be released, use a release type or an exact version",
            )),
            VersionSpec::Exact(wanted) => {
                let history = self.history(id).await?;
                if history.contains(wanted) {
                    return Err(UpdateError::VersionAlreadyExists {
                        id: id.key().to_string(),
                        version: wanted.to_string(),
                    });
                }
                Ok(wanted.clone())
            }
            VersionSpec::Release(_) => self.resolve_exact_version(id, spec).await,
        }
    }

    async fn history(&self, id: &ComponentId) -> Result<Vec<Version>, UpdateError> {
        match self.scope.version_history(&id.without_version()).await {
            Ok(history) => Ok(history),
            Err(ScopeError::NotFound { .. }) => Err(UpdateError::component_not_found(
                id.key(),
                self.scope.name(),
            )),
            Err(e) => Err(e.into()),
        }
    }
}

/// Pick the version `spec` asks for out of `history`
pub fn select_version(
    id: &ComponentId,
    history: &[Version],
    spec: &VersionSpec,
    prerelease_id: &str,
) -> Result<Version, UpdateError> {
    match spec {
        VersionSpec::Exact(wanted) => {
            if history.contains(wanted) {
                Ok(wanted.clone())
            } else {
                Err(UpdateError::version_not_found(id.key(), wanted))
            }
        }
        VersionSpec::Range(req) => history
            .iter()
            .filter_map(Version::as_release)
            .filter(|v| req.matches(v))
            .max()
            .map(|v| Version::Release(v.clone()))
            .ok_or_else(|| UpdateError::unsatisfiable_range(id.key(), req)),
        VersionSpec::Release(release) => release
            .bump(highest_release(history), prerelease_id)
            .map(Version::Release),
    }
}

/// Highest semantic version in a history, prereleases included
pub fn highest_release(history: &[Version]) -> Option<&semver::Version> {
    history.iter().filter_map(Version::as_release).max()
}
