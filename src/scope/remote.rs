//! Offline remote
//!
//! Stands in for network remotes when none are configured: every action and
//! export is logged and recorded so callers can inspect what would have been
//! sent. Scopes marked unreachable fail like an unavailable remote would,
//! and unknown action names are rejected.

use super::{ExportOptions, Exporter, RemoteHandle, RemoteResolver, CLEAR_CACHE_ACTION};
use crate::domain::ComponentId;
use crate::error::RemoteError;
use async_trait::async_trait;
use log::info;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Action name recorded for exports
pub const EXPORT_ACTION: &str = "Export";

/// Actions a remote scope understands
const KNOWN_ACTIONS: [&str; 2] = [CLEAR_CACHE_ACTION, EXPORT_ACTION];

/// One recorded remote interaction
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub scope: String,
    pub action: String,
    pub payload: serde_json::Value,
}

/// Remote resolver and exporter that records instead of transmitting
#[derive(Default)]
pub struct OfflineRemote {
    calls: Arc<Mutex<Vec<RemoteCall>>>,
    unreachable: HashSet<String>,
}

impl OfflineRemote {
    /// Create a remote that accepts every scope
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a scope fail to resolve or export (builder pattern)
    pub fn with_unreachable(mut self, scope: impl Into<String>) -> Self {
        self.unreachable.insert(scope.into());
        self
    }

    /// Recorded calls in arrival order
    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().await.clone()
    }

    fn check_reachable(&self, scope: &str) -> Result<(), RemoteError> {
        if self.unreachable.contains(scope) {
            return Err(RemoteError::Unreachable {
                scope: scope.to_string(),
                message: "marked unreachable".to_string(),
            });
        }
        Ok(())
    }
}

struct OfflineHandle {
    scope: String,
    calls: Arc<Mutex<Vec<RemoteCall>>>,
}

#[async_trait]
impl RemoteHandle for OfflineHandle {
    fn scope(&self) -> &str {
        &self.scope
    }

    async fn invoke_action(
        &self,
        action: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, RemoteError> {
        if !KNOWN_ACTIONS.contains(&action) {
            return Err(RemoteError::ActionFailed {
                scope: self.scope.clone(),
                action: action.to_string(),
                message: "unknown action".to_string(),
            });
        }
        info!("Remote '{}': {} {}", self.scope, action, payload);
        self.calls.lock().await.push(RemoteCall {
            scope: self.scope.clone(),
            action: action.to_string(),
            payload,
        });
        Ok(serde_json::Value::Null)
    }
}

#[async_trait]
impl RemoteResolver for OfflineRemote {
    async fn resolve_remote(&self, scope: &str) -> Result<Arc<dyn RemoteHandle>, RemoteError> {
        self.check_reachable(scope)?;
        Ok(Arc::new(OfflineHandle {
            scope: scope.to_string(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

#[async_trait]
impl Exporter for OfflineRemote {
    async fn export_batch(
        &self,
        scope: &str,
        ids: &[ComponentId],
        options: &ExportOptions,
    ) -> Result<(), RemoteError> {
        self.check_reachable(scope).map_err(|e| RemoteError::ExportFailed {
            scope: scope.to_string(),
            message: e.to_string(),
        })?;

        let ids: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
        info!("Exporting {} components to '{}'", ids.len(), scope);
        self.calls.lock().await.push(RemoteCall {
            scope: scope.to_string(),
            action: EXPORT_ACTION.to_string(),
            payload: serde_json::json!({ "ids": ids, "headsOnly": options.heads_only }),
        });
        Ok(())
    }
}
