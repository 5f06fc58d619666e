//! Update orchestrator for coordinating the entire update workflow
//!
//! This module provides:
//! - Workflow coordination: import → resolve → plan → rewrite → metadata →
//!   stamp → stage → build → commit → export
//! - Concurrent dependency resolution with a concurrency limit
//! - A working set holding finalized components until commit
//! - Abort-on-error before commit; build failures are committed and reported

use crate::build::{BuildOptions, BuildPipeline};
use crate::domain::{
    BuildStatus, Component, ComponentId, ComponentKey, DepUpdateRequestItem, LogEntry,
    UpdateItem, UpdateOptions, UpdateOutcome, VersionSpec, DEFAULT_PRERELEASE_ID,
};
use crate::error::{ScopeError, UpdateError};
use crate::graph::DependencyGraph;
use crate::progress::Progress;
use crate::scope::{ExportOptions, Exporter, RemoteResolver, Scope, ScopeCommitter};
use crate::update::{Batch, BatchVersionPlanner, DependencyRewriter, VersionResolver};
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Default concurrency limit for history fetches
const DEFAULT_CONCURRENCY: usize = 10;

/// Identity recorded when the request names none
const DEFAULT_USERNAME: &str = "scopeup-bot";
const DEFAULT_EMAIL: &str = "scopeup-bot@users.noreply.local";
const DEFAULT_MESSAGE: &str = "update dependencies";

/// Named stages of an update run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Import,
    Resolve,
    Plan,
    Rewrite,
    Metadata,
    Stamp,
    Staging,
    Build,
    Commit,
    Finalize,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            Stage::Import => "Importing components...",
            Stage::Resolve => "Resolving dependency versions...",
            Stage::Plan => "Planning versions...",
            Stage::Rewrite => "Rewriting dependencies...",
            Stage::Metadata => "Updating dependency metadata...",
            Stage::Stamp => "Stamping provenance...",
            Stage::Staging => "Staging components...",
            Stage::Build => "Building components...",
            Stage::Commit => "Committing to scope...",
            Stage::Finalize => "Updating remotes...",
        };
        f.write_str(message)
    }
}

/// Configuration for the orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Maximum concurrent version history fetches
    pub fetch_concurrency: usize,
    /// Author recorded when the request names none
    pub default_username: String,
    pub default_email: String,
    pub default_message: String,
    /// Show a spinner per stage
    pub show_progress: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            fetch_concurrency: DEFAULT_CONCURRENCY,
            default_username: DEFAULT_USERNAME.to_string(),
            default_email: DEFAULT_EMAIL.to_string(),
            default_message: DEFAULT_MESSAGE.to_string(),
            show_progress: false,
        }
    }
}

/// One request item with its strings parsed
struct ParsedRequest {
    root: ComponentId,
    dependencies: Vec<(ComponentId, VersionSpec)>,
    version_to_tag: Option<VersionSpec>,
}

impl ParsedRequest {
    fn parse(item: &DepUpdateRequestItem) -> Result<Self, UpdateError> {
        let root: ComponentId = item.component_id.parse()?;
        let dependencies = item
            .dependencies
            .iter()
            .map(|dep| ComponentId::parse_with_spec(dep))
            .collect::<Result<Vec<_>, _>>()?;
        let version_to_tag = item
            .version_to_tag
            .as_deref()
            .map(str::parse::<VersionSpec>)
            .transpose()?;
        Ok(Self {
            root,
            dependencies,
            version_to_tag,
        })
    }
}

/// Finalized components of the running update
///
/// Reads see staged components first and fall back to the scope.
struct WorkingSet {
    scope: Arc<dyn Scope>,
    staged: BTreeMap<ComponentKey, Component>,
}

impl WorkingSet {
    fn new(scope: Arc<dyn Scope>) -> Self {
        Self {
            scope,
            staged: BTreeMap::new(),
        }
    }

    fn stage(&mut self, component: &Component) {
        self.staged.insert(component.id.key(), component.clone());
    }

    async fn get(&self, id: &ComponentId) -> Result<Option<Component>, ScopeError> {
        if let Some(component) = self.staged.get(&id.key()) {
            if id.version.is_none() || id.version == component.id.version {
                return Ok(Some(component.clone()));
            }
        }
        self.scope.get(id).await
    }

    fn len(&self) -> usize {
        self.staged.len()
    }
}

/// Orchestrator for coordinating the update workflow
pub struct UpdateOrchestrator {
    scope: Arc<dyn Scope>,
    remotes: Arc<dyn RemoteResolver>,
    exporter: Arc<dyn Exporter>,
    pipeline: Arc<dyn BuildPipeline>,
    graph: Arc<dyn DependencyGraph>,
    config: OrchestratorConfig,
}

impl UpdateOrchestrator {
    /// Create a new orchestrator over the given collaborators
    pub fn new(
        scope: Arc<dyn Scope>,
        remotes: Arc<dyn RemoteResolver>,
        exporter: Arc<dyn Exporter>,
        pipeline: Arc<dyn BuildPipeline>,
        graph: Arc<dyn DependencyGraph>,
    ) -> Self {
        Self {
            scope,
            remotes,
            exporter,
            pipeline,
            graph,
            config: OrchestratorConfig::default(),
        }
    }

    /// Replace the configuration (builder pattern)
    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Run the update workflow
    pub async fn run(
        &self,
        request: &[DepUpdateRequestItem],
        options: &UpdateOptions,
    ) -> Result<UpdateOutcome, UpdateError> {
        self.run_with_progress(request, options, self.config.show_progress)
            .await
    }

    /// Run the update workflow with optional progress display
    pub async fn run_with_progress(
        &self,
        request: &[DepUpdateRequestItem],
        options: &UpdateOptions,
        show_progress: bool,
    ) -> Result<UpdateOutcome, UpdateError> {
        let mut progress = Progress::new(show_progress);
        let result = self.execute(request, options, &mut progress).await;
        progress.finish_and_clear();
        result
    }

    async fn execute(
        &self,
        request: &[DepUpdateRequestItem],
        options: &UpdateOptions,
        progress: &mut Progress,
    ) -> Result<UpdateOutcome, UpdateError> {
        let mode = options.release_mode()?;
        let parsed = request
            .iter()
            .map(ParsedRequest::parse)
            .collect::<Result<Vec<_>, _>>()?;
        let prerelease_id = options
            .pre_release_id
            .clone()
            .unwrap_or_else(|| DEFAULT_PRERELEASE_ID.to_string());
        let resolver = VersionResolver::new(Arc::clone(&self.scope)).with_prerelease_id(prerelease_id);

        // Step 1: Import latest histories, bypassing the cache
        self.enter(progress, Stage::Import);
        let mut to_import: Vec<ComponentId> = parsed
            .iter()
            .flat_map(|p| p.dependencies.iter().map(|(id, _)| id.without_version()))
            .collect();
        if options.multiple {
            to_import.extend(parsed.iter().map(|p| p.root.without_version()));
        }
        to_import.sort_by_key(|id| id.key());
        to_import.dedup_by_key(|id| id.key());
        if !to_import.is_empty() {
            self.scope
                .import(&to_import, false)
                .await
                .map_err(|e| self.scope_error(e))?;
        }

        // Step 2: Load roots and pin their dependencies
        self.enter(progress, Stage::Resolve);
        let mut roots = Vec::with_capacity(parsed.len());
        for request in &parsed {
            let component = self
                .scope
                .get(&request.root)
                .await
                .map_err(|e| self.scope_error(e))?
                .ok_or_else(|| UpdateError::component_not_found(&request.root, self.scope.name()))?;
            roots.push(component);
        }
        let pinned = self.resolve_dependencies(&resolver, &parsed).await?;

        let items = roots
            .into_iter()
            .zip(pinned)
            .zip(parsed)
            .map(|((component, dependencies), request)| {
                UpdateItem::new(component, dependencies, request.version_to_tag)
            })
            .collect();
        let batch = Batch::new(items)?;

        // Step 3: Plan next versions
        self.enter(progress, Stage::Plan);
        let mut batch = BatchVersionPlanner::new(resolver, mode).plan(batch).await?;

        // Step 4: Rewrite against the whole batch
        self.enter(progress, Stage::Rewrite);
        let index = batch.index();
        for item in batch.items_mut() {
            progress.set_message(&format!("Rewriting {}", item.id()));
            item.dependencies = item.dependencies.iter().map(|d| index.pin(d)).collect();
            let names = self.graph.get_dependencies(&item.component);
            let report =
                DependencyRewriter::rewrite(&mut item.component, &item.dependencies, &index, &names)?;
            for change in &report.changes {
                debug!("{}: {}", report.component, change);
            }
        }

        // Step 5: Re-derive dependency records
        self.enter(progress, Stage::Metadata);
        for item in batch.items_mut() {
            let records = self.graph.extract_dependencies(&item.component);
            item.component.set_package_dependencies(records.into_vec());
        }

        // Step 6: Provenance and pending status
        self.enter(progress, Stage::Stamp);
        let entry = LogEntry {
            username: options
                .username
                .clone()
                .unwrap_or_else(|| self.config.default_username.clone()),
            email: options
                .email
                .clone()
                .unwrap_or_else(|| self.config.default_email.clone()),
            message: options
                .message
                .clone()
                .unwrap_or_else(|| self.config.default_message.clone()),
            date: Utc::now(),
        };
        for item in batch.items_mut() {
            item.component.log = Some(entry.clone());
            item.component.build_status = BuildStatus::Pending;
        }

        // Step 7: Stage into the working set
        self.enter(progress, Stage::Staging);
        let mut working_set = WorkingSet::new(Arc::clone(&self.scope));
        for item in batch.items() {
            working_set.stage(&item.component);
        }
        debug!("Staged {} components", working_set.len());

        // Step 8: Build the seed components
        self.enter(progress, Stage::Build);
        let mut seeds = Vec::with_capacity(batch.len());
        for id in batch.ids() {
            let seed = working_set
                .get(&id)
                .await?
                .ok_or_else(|| UpdateError::component_not_found(&id, self.scope.name()))?;
            seeds.push(seed);
        }
        let (build_error, published_packages) =
            match self.pipeline.run(&seeds, &BuildOptions { fail_fast: true }).await {
                Ok(output) => {
                    for item in batch.items_mut() {
                        if let Some(artifacts) = output.artifacts_for(item.id()) {
                            if !artifacts.is_empty() {
                                item.component.set_build_artifacts(artifacts.to_vec());
                            }
                        }
                    }
                    (output.format_errors(), output.published_packages)
                }
                Err(e) => (Some(e.to_string()), Vec::new()),
            };

        // Step 9: Final status
        let status = match build_error {
            None => BuildStatus::Succeeded,
            Some(ref error) => {
                warn!("Build failed, committing batch as failed: {}", error);
                BuildStatus::Failed
            }
        };

        // Step 10: Commit, then clear caches or export
        self.enter(progress, Stage::Commit);
        let committer = ScopeCommitter::new(
            Arc::clone(&self.scope),
            Arc::clone(&self.remotes),
            Arc::clone(&self.exporter),
        );
        let mut items = batch.into_items();
        committer.commit(&mut items, status).await?;

        self.enter(progress, Stage::Finalize);
        let ids: Vec<ComponentId> = items.iter().map(|item| item.id().clone()).collect();
        committer
            .finalize(&ids, options.multiple, &ExportOptions::default())
            .await?;

        info!("Updated {} components ({})", items.len(), status);
        Ok(UpdateOutcome {
            deps_update_items: items,
            published_packages,
            error: build_error,
        })
    }

    /// Resolve every requested dependency, fetching histories concurrently
    async fn resolve_dependencies(
        &self,
        resolver: &VersionResolver,
        parsed: &[ParsedRequest],
    ) -> Result<Vec<Vec<ComponentId>>, UpdateError> {
        let semaphore = Arc::new(Semaphore::new(self.config.fetch_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (item_index, request) in parsed.iter().enumerate() {
            for (dep_index, (dep, spec)) in request.dependencies.iter().enumerate() {
                let resolver = resolver.clone();
                let semaphore = Arc::clone(&semaphore);
                let dep = dep.clone();
                let spec = spec.clone();
                tasks.spawn(async move {
                    let _permit = semaphore.acquire().await.map_err(|e| UpdateError::TaskFailed {
                        message: e.to_string(),
                    })?;
                    let version = resolver.resolve_exact_version(&dep, &spec).await?;
                    Ok::<_, UpdateError>((item_index, dep_index, dep.with_version(version)))
                });
            }
        }

        let mut pinned: Vec<Vec<Option<ComponentId>>> = parsed
            .iter()
            .map(|request| vec![None; request.dependencies.len()])
            .collect();
        while let Some(joined) = tasks.join_next().await {
            let (item_index, dep_index, id) = joined.map_err(|e| UpdateError::TaskFailed {
                message: e.to_string(),
            })??;
            pinned[item_index][dep_index] = Some(id);
        }

        Ok(pinned
            .into_iter()
            .map(|deps| deps.into_iter().flatten().collect())
            .collect())
    }

    fn enter(&self, progress: &mut Progress, stage: Stage) {
        debug!("{}", stage);
        progress.finish_and_clear();
        progress.spinner(&stage.to_string());
    }

    fn scope_error(&self, error: ScopeError) -> UpdateError {
        match error {
            ScopeError::NotFound { id, scope } => UpdateError::ComponentNotFound { id, scope },
            other => other.into(),
        }
    }
}
