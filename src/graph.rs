//! Package-level dependency records of a component
//!
//! A component's dependency edges name other components; the records here
//! add the package name dependents import each target by, and the version
//! string written to the package manifest.

use crate::domain::{Component, ComponentId, DependencyRef, Lifecycle, PackageDependency};
use log::warn;

/// Dependency records of one component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DependencyList {
    entries: Vec<PackageDependency>,
}

impl DependencyList {
    /// Create a list from records
    pub fn new(entries: Vec<PackageDependency>) -> Self {
        Self { entries }
    }

    /// Find the record of a component, ignoring versions
    pub fn find_by_id(&self, id: &ComponentId) -> Option<&PackageDependency> {
        self.entries
            .iter()
            .find(|entry| entry.component_id.is_same_component(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PackageDependency> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<PackageDependency> {
        self.entries
    }
}

/// Trait for deriving dependency records from a component
pub trait DependencyGraph: Send + Sync {
    /// Records as currently stored with the component
    fn get_dependencies(&self, component: &Component) -> DependencyList;

    /// Records recomputed from the component's current edges
    fn extract_dependencies(&self, component: &Component) -> DependencyList;
}

/// Graph backed by the component's own edges and resolver extension
#[derive(Debug, Clone, Copy, Default)]
pub struct ManifestGraph;

impl ManifestGraph {
    pub fn new() -> Self {
        Self
    }

    fn record(
        edge: &DependencyRef,
        package_name: String,
        lifecycle: Lifecycle,
    ) -> PackageDependency {
        let version = edge
            .id
            .version
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "*".to_string());
        PackageDependency {
            component_id: edge.id.clone(),
            package_name,
            version,
            lifecycle,
        }
    }
}

fn edges(component: &Component) -> impl Iterator<Item = (&DependencyRef, Lifecycle)> {
    component
        .dependencies
        .iter()
        .map(|edge| (edge, Lifecycle::Runtime))
        .chain(
            component
                .dev_dependencies
                .iter()
                .map(|edge| (edge, Lifecycle::Dev)),
        )
}

impl DependencyGraph for ManifestGraph {
    fn get_dependencies(&self, component: &Component) -> DependencyList {
        let mut entries: Vec<PackageDependency> = component
            .dependency_resolver_data()
            .map(|data| data.dependencies.clone())
            .unwrap_or_default();

        // edges carrying their own package name fill gaps in the stored records
        for (edge, lifecycle) in edges(component) {
            let known = entries
                .iter()
                .any(|entry| entry.component_id.is_same_component(&edge.id));
            if known {
                continue;
            }
            if let Some(ref name) = edge.package_name {
                entries.push(Self::record(edge, name.clone(), lifecycle));
            }
        }

        DependencyList::new(entries)
    }

    fn extract_dependencies(&self, component: &Component) -> DependencyList {
        let stored = self.get_dependencies(component);
        let mut entries = Vec::new();

        for (edge, lifecycle) in edges(component) {
            let name = edge.package_name.clone().or_else(|| {
                stored
                    .find_by_id(&edge.id)
                    .map(|entry| entry.package_name.clone())
            });
            match name {
                Some(name) => entries.push(Self::record(edge, name, lifecycle)),
                None => warn!(
                    "No package name for {} in {}, skipping record",
                    edge.id, component.id
                ),
            }
        }

        DependencyList::new(entries)
    }
}
