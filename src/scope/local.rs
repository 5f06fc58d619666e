//! In-process scope
//!
//! Components are kept per identity in insertion (history) order. Writes are
//! queued by `add_to_sources` and only become visible on `persist`, which
//! also rewrites the JSON snapshot file when the scope is file backed.
//! An optional upstream scope serves `import` the way a remote would.

use super::Scope;
use crate::domain::{Component, ComponentId, ComponentKey, Version};
use crate::error::ScopeError;
use async_trait::async_trait;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Default name for a scope without one
const DEFAULT_SCOPE_NAME: &str = "local";

/// On-disk snapshot format
#[derive(Debug, Default, Serialize, Deserialize)]
struct ScopeSnapshot {
    name: String,
    #[serde(default)]
    components: Vec<Component>,
}

#[derive(Debug, Default)]
struct ScopeState {
    objects: BTreeMap<ComponentKey, Vec<Component>>,
    pending: Vec<Component>,
}

impl ScopeState {
    fn insert(&mut self, component: Component) {
        let versions = self.objects.entry(component.id.key()).or_default();
        match versions
            .iter_mut()
            .find(|existing| existing.id.version == component.id.version)
        {
            Some(existing) => *existing = component,
            None => versions.push(component),
        }
    }

    fn snapshot(&self, name: &str) -> ScopeSnapshot {
        ScopeSnapshot {
            name: name.to_string(),
            components: self.objects.values().flatten().cloned().collect(),
        }
    }
}

/// Highest release, or the newest snapshot when there is no release
fn head(versions: &[Component]) -> Option<&Component> {
    versions
        .iter()
        .filter_map(|c| Some((c.id.version.as_ref()?.as_release()?, c)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, c)| c)
        .or_else(|| versions.last())
}

/// Component store held in memory, optionally backed by a JSON file
pub struct LocalScope {
    name: String,
    path: Option<PathBuf>,
    state: RwLock<ScopeState>,
    upstream: Option<Arc<dyn Scope>>,
}

impl LocalScope {
    /// Create an empty in-memory scope
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            state: RwLock::new(ScopeState::default()),
            upstream: None,
        }
    }

    /// Open a file-backed scope; a missing file yields an empty scope
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ScopeError> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if path.exists() {
            let content = std::fs::read_to_string(&path).map_err(|source| ScopeError::Io {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str::<ScopeSnapshot>(&content).map_err(|e| {
                ScopeError::Serialization {
                    path: path.clone(),
                    message: e.to_string(),
                }
            })?
        } else {
            ScopeSnapshot {
                name: DEFAULT_SCOPE_NAME.to_string(),
                components: Vec::new(),
            }
        };

        let mut state = ScopeState::default();
        for component in snapshot.components {
            state.insert(component);
        }
        info!(
            "Opened scope '{}' from {} ({} components)",
            snapshot.name,
            path.display(),
            state.objects.len()
        );

        Ok(Self {
            name: snapshot.name,
            path: Some(path),
            state: RwLock::new(state),
            upstream: None,
        })
    }

    /// Set the scope that `import` fetches from
    pub fn with_upstream(mut self, upstream: Arc<dyn Scope>) -> Self {
        self.upstream = Some(upstream);
        self
    }

    /// Add a component version directly, bypassing the write queue
    pub fn with_component(mut self, component: Component) -> Self {
        self.state.get_mut().insert(component);
        self
    }

    /// Path of the snapshot file, if file backed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of writes waiting for `persist`
    pub async fn pending_count(&self) -> usize {
        self.state.read().await.pending.len()
    }

    async fn write_snapshot(&self, path: &Path, snapshot: &ScopeSnapshot) -> Result<(), ScopeError> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| ScopeError::persistence(&self.name, e.to_string()))?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| ScopeError::persistence(&self.name, format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, path)
            .await
            .map_err(|e| ScopeError::persistence(&self.name, format!("{}: {}", path.display(), e)))
    }
}

#[async_trait]
impl Scope for LocalScope {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, id: &ComponentId) -> Result<Option<Component>, ScopeError> {
        let state = self.state.read().await;
        let Some(versions) = state.objects.get(&id.key()) else {
            return Ok(None);
        };
        let found = match id.version {
            Some(ref version) => versions
                .iter()
                .find(|c| c.id.version.as_ref() == Some(version)),
            None => head(versions),
        };
        Ok(found.cloned())
    }

    async fn import(&self, ids: &[ComponentId], use_cache: bool) -> Result<(), ScopeError> {
        for id in ids {
            let key = id.key();
            let present = self.state.read().await.objects.contains_key(&key);
            if use_cache && present {
                debug!("{} is cached in '{}'", key, self.name);
                continue;
            }

            let Some(ref upstream) = self.upstream else {
                if present {
                    continue;
                }
                return Err(ScopeError::not_found(&key, &self.name));
            };

            let history = match upstream.version_history(&id.without_version()).await {
                Ok(history) => history,
                Err(ScopeError::NotFound { .. }) if present => continue,
                Err(e) => return Err(e),
            };

            let mut fetched = Vec::with_capacity(history.len());
            for version in history {
                if let Some(component) = upstream.get(&id.with_version(version)).await? {
                    fetched.push(component);
                }
            }
            debug!(
                "Imported {} ({} versions) into '{}'",
                key,
                fetched.len(),
                self.name
            );
            // merge: versions committed here but not yet upstream stay
            let mut state = self.state.write().await;
            for component in fetched {
                state.insert(component);
            }
        }
        Ok(())
    }

    async fn version_history(&self, id: &ComponentId) -> Result<Vec<Version>, ScopeError> {
        let state = self.state.read().await;
        let versions = state
            .objects
            .get(&id.key())
            .ok_or_else(|| ScopeError::not_found(id.key(), &self.name))?;
        Ok(versions
            .iter()
            .filter_map(|c| c.id.version.clone())
            .collect())
    }

    async fn add_to_sources(&self, component: Component) -> Result<(), ScopeError> {
        if component.id.version.is_none() {
            return Err(ScopeError::persistence(
                &self.name,
                format!("{} has no version", component.id),
            ));
        }
        self.state.write().await.pending.push(component);
        Ok(())
    }

    async fn persist(&self) -> Result<(), ScopeError> {
        let mut state = self.state.write().await;
        if state.pending.is_empty() {
            return Ok(());
        }

        // Build the next state first so a failed write leaves nothing half applied
        let mut next = ScopeState {
            objects: state.objects.clone(),
            pending: Vec::new(),
        };
        for component in &state.pending {
            next.insert(component.clone());
        }

        if let Some(ref path) = self.path {
            self.write_snapshot(path, &next.snapshot(&self.name)).await?;
        }

        info!(
            "Persisted {} component versions to scope '{}'",
            state.pending.len(),
            self.name
        );
        *state = next;
        Ok(())
    }
}
