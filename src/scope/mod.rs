//! Scope (component store) and remote collaborators
//!
//! This module provides:
//! - The `Scope` trait the update workflow reads from and commits to
//! - Remote resolution and export traits used after commit
//! - `LocalScope`, an in-process store with optional JSON snapshot persistence
//! - `OfflineRemote`, a remote that records actions instead of sending them
//! - `ScopeCommitter`, which persists a finalized batch and notifies remotes

mod committer;
mod local;
mod remote;

pub use committer::ScopeCommitter;
pub use local::LocalScope;
pub use remote::{OfflineRemote, RemoteCall, EXPORT_ACTION};

use crate::domain::{Component, ComponentId, Version};
use crate::error::{RemoteError, ScopeError};
use async_trait::async_trait;
use std::sync::Arc;

/// Remote action that drops cached objects of the given components
pub const CLEAR_CACHE_ACTION: &str = "ClearCache";

/// Trait for component stores
#[async_trait]
pub trait Scope: Send + Sync {
    /// Scope name
    fn name(&self) -> &str;

    /// Fetch a component
    ///
    /// An unversioned id returns the head: the highest release, or the most
    /// recently added snapshot when the component has no release.
    async fn get(&self, id: &ComponentId) -> Result<Option<Component>, ScopeError>;

    /// Make the given components available locally at their latest known
    /// version; with `use_cache` already-present components are not refreshed.
    /// Fetched versions are merged, local versions unknown upstream are kept.
    async fn import(&self, ids: &[ComponentId], use_cache: bool) -> Result<(), ScopeError>;

    /// Known versions of a component, in the order they became known
    async fn version_history(&self, id: &ComponentId) -> Result<Vec<Version>, ScopeError>;

    /// Queue a component version for the next `persist`
    async fn add_to_sources(&self, component: Component) -> Result<(), ScopeError>;

    /// Flush queued writes so they become visible
    async fn persist(&self) -> Result<(), ScopeError>;
}

/// Trait for locating the remote of a scope
#[async_trait]
pub trait RemoteResolver: Send + Sync {
    async fn resolve_remote(&self, scope: &str) -> Result<Arc<dyn RemoteHandle>, RemoteError>;
}

/// Trait for a connection to one remote scope
#[async_trait]
pub trait RemoteHandle: Send + Sync {
    /// Remote scope name
    fn scope(&self) -> &str;

    /// Invoke a named action with a JSON payload
    async fn invoke_action(
        &self,
        action: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError>;
}

/// Options for exporting a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    /// Export only the given versions rather than full histories
    pub heads_only: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { heads_only: true }
    }
}

/// Trait for exporting committed components to their remote scope
#[async_trait]
pub trait Exporter: Send + Sync {
    async fn export_batch(
        &self,
        scope: &str,
        ids: &[ComponentId],
        options: &ExportOptions,
    ) -> Result<(), RemoteError>;
}
