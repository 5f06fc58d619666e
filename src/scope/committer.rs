//! Commit of a finalized batch
//!
//! `commit` writes every component with its final build status and flushes
//! the scope once. `finalize` then either clears the remote caches of each
//! touched scope (single-root updates) or exports the batch to each scope
//! (multi-root updates); one task per destination scope.

use super::{ExportOptions, Exporter, RemoteResolver, Scope, CLEAR_CACHE_ACTION};
use crate::domain::{BuildStatus, ComponentId, UpdateItem};
use crate::error::UpdateError;
use log::{info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Persists finalized components and notifies their remotes
pub struct ScopeCommitter {
    scope: Arc<dyn Scope>,
    remotes: Arc<dyn RemoteResolver>,
    exporter: Arc<dyn Exporter>,
}

impl ScopeCommitter {
    /// Create a committer for the given scope and remotes
    pub fn new(
        scope: Arc<dyn Scope>,
        remotes: Arc<dyn RemoteResolver>,
        exporter: Arc<dyn Exporter>,
    ) -> Self {
        Self {
            scope,
            remotes,
            exporter,
        }
    }

    /// Stamp `status` on every item and persist the batch
    pub async fn commit(
        &self,
        items: &mut [UpdateItem],
        status: BuildStatus,
    ) -> Result<(), UpdateError> {
        for item in items.iter_mut() {
            item.component.build_status = status;
            self.scope.add_to_sources(item.component.clone()).await?;
        }
        self.scope.persist().await?;
        info!(
            "Committed {} components to '{}' ({})",
            items.len(),
            self.scope.name(),
            status
        );
        Ok(())
    }

    /// Clear remote caches or export, grouped by destination scope
    ///
    /// Every scope is attempted; the first failure is returned.
    pub async fn finalize(
        &self,
        ids: &[ComponentId],
        multiple: bool,
        options: &ExportOptions,
    ) -> Result<(), UpdateError> {
        let mut by_scope: BTreeMap<String, Vec<ComponentId>> = BTreeMap::new();
        for id in ids {
            by_scope.entry(id.scope.clone()).or_default().push(id.clone());
        }

        let mut tasks = JoinSet::new();
        for (scope, scope_ids) in by_scope {
            if multiple {
                let exporter = Arc::clone(&self.exporter);
                let options = options.clone();
                tasks.spawn(async move {
                    exporter.export_batch(&scope, &scope_ids, &options).await
                });
            } else {
                let remotes = Arc::clone(&self.remotes);
                tasks.spawn(async move {
                    let remote = remotes.resolve_remote(&scope).await?;
                    let ids: Vec<String> = scope_ids.iter().map(|id| id.to_string()).collect();
                    remote
                        .invoke_action(CLEAR_CACHE_ACTION, serde_json::json!({ "ids": ids }))
                        .await
                        .map(|_| ())
                });
            }
        }

        let mut first_error: Option<UpdateError> = None;
        while let Some(joined) = tasks.join_next().await {
            let result: Result<(), UpdateError> = match joined {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(UpdateError::from(e)),
                Err(e) => Err(UpdateError::TaskFailed {
                    message: e.to_string(),
                }),
            };
            if let Err(e) = result {
                warn!("{}", e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
