//! Build pipeline collaborator
//!
//! This module provides:
//! - The `BuildPipeline` trait run against the seed components of a batch
//! - Per-task reports that say whether a step failed and render its error
//! - `CommandPipeline`, which runs an external command per component
//! - `NoopPipeline`, which succeeds without producing artifacts

mod command;

pub use command::CommandPipeline;

use crate::domain::{ArtifactRef, Component, ComponentId};
use crate::error::BuildError;
use async_trait::async_trait;

/// Options passed to a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Stop at the first failing step instead of building the rest
    pub fail_fast: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self { fail_fast: true }
    }
}

/// Artifacts produced for one component
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentArtifacts {
    pub id: ComponentId,
    pub artifacts: Vec<ArtifactRef>,
}

/// Result of one pipeline task on one component
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// Task name
    pub task: String,
    /// Component the task ran for
    pub component: ComponentId,
    /// Error lines, empty on success
    pub errors: Vec<String>,
}

impl PipelineReport {
    /// Create a successful report
    pub fn success(task: impl Into<String>, component: ComponentId) -> Self {
        Self {
            task: task.into(),
            component,
            errors: Vec::new(),
        }
    }

    /// Create a failed report
    pub fn failure(task: impl Into<String>, component: ComponentId, errors: Vec<String>) -> Self {
        Self {
            task: task.into(),
            component,
            errors,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Render the errors as one message, `None` when the task succeeded
    pub fn format_error(&self) -> Option<String> {
        if !self.has_errors() {
            return None;
        }
        Some(format!(
            "task \"{}\" failed for {}:\n  {}",
            self.task,
            self.component,
            self.errors.join("\n  ")
        ))
    }
}

/// Everything a pipeline run returns
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildOutput {
    pub artifacts: Vec<ComponentArtifacts>,
    pub reports: Vec<PipelineReport>,
    /// Package references published by the run
    pub published_packages: Vec<String>,
}

impl BuildOutput {
    /// Returns true if any task reported errors
    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(|r| r.has_errors())
    }

    /// Joins the errors of all failed tasks
    pub fn format_errors(&self) -> Option<String> {
        let errors: Vec<String> = self
            .reports
            .iter()
            .filter_map(|r| r.format_error())
            .collect();
        if errors.is_empty() {
            None
        } else {
            Some(errors.join("\n\n"))
        }
    }

    /// Artifacts recorded for a component, any version
    pub fn artifacts_for(&self, id: &ComponentId) -> Option<&[ArtifactRef]> {
        self.artifacts
            .iter()
            .find(|a| a.id.is_same_component(id))
            .map(|a| a.artifacts.as_slice())
    }
}

/// Trait for build pipelines
#[async_trait]
pub trait BuildPipeline: Send + Sync {
    /// Build the given components
    ///
    /// Step failures are reported in the output; `Err` means the pipeline
    /// itself could not run.
    async fn run(
        &self,
        components: &[Component],
        options: &BuildOptions,
    ) -> Result<BuildOutput, BuildError>;
}

/// Pipeline that builds nothing and always succeeds
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPipeline;

#[async_trait]
impl BuildPipeline for NoopPipeline {
    async fn run(
        &self,
        _components: &[Component],
        _options: &BuildOptions,
    ) -> Result<BuildOutput, BuildError> {
        Ok(BuildOutput::default())
    }
}
