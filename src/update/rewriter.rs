//! Dependency edge rewriting
//!
//! Every edge whose target is a batch member or a pinned dependency is
//! pointed at the matched version; other edges are left as they are. No
//! edges are added or removed. All changes are computed before any is
//! applied, so a failing component is left untouched.

use super::BatchIndex;
use crate::domain::{Component, ComponentId, Version};
use crate::error::UpdateError;
use crate::graph::DependencyList;
use std::fmt;

/// Which list an edge lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Runtime,
    Dev,
    Extension,
}

impl fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeKind::Runtime => write!(f, "dependency"),
            EdgeKind::Dev => write!(f, "dev dependency"),
            EdgeKind::Extension => write!(f, "extension"),
        }
    }
}

/// One edge pointed at a new version
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteChange {
    /// Edge target after the rewrite
    pub dependency: ComponentId,
    pub from: Option<Version>,
    pub to: Option<Version>,
    pub kind: EdgeKind,
}

impl fmt::Display for RewriteChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: &Option<Version>| {
            v.as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "latest".to_string())
        };
        write!(
            f,
            "{} {}: {} → {}",
            self.kind,
            self.dependency.key(),
            show(&self.from),
            show(&self.to)
        )
    }
}

/// Edges changed in one component
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteReport {
    pub component: ComponentId,
    pub changes: Vec<RewriteChange>,
}

impl RewriteReport {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

struct PendingEdge {
    kind: EdgeKind,
    position: usize,
    target: ComponentId,
    package_name: Option<String>,
}

/// Rewrites dependency edges of one component
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyRewriter;

impl DependencyRewriter {
    /// Point matched edges of `component` at their new versions
    ///
    /// Batch members win over `resolved` when both name a component. Package
    /// names come from `names`, falling back to the name on the edge.
    pub fn rewrite(
        component: &mut Component,
        resolved: &[ComponentId],
        batch: &BatchIndex,
        names: &DependencyList,
    ) -> Result<RewriteReport, UpdateError> {
        let lookup = |id: &ComponentId| -> Option<ComponentId> {
            batch
                .get(id)
                .or_else(|| resolved.iter().find(|r| r.is_same_component(id)))
                .cloned()
        };

        let mut pending = Vec::new();
        let edge_lists = [
            (EdgeKind::Runtime, &component.dependencies),
            (EdgeKind::Dev, &component.dev_dependencies),
        ];
        for (kind, edges) in edge_lists {
            for (position, edge) in edges.iter().enumerate() {
                let Some(target) = lookup(&edge.id) else {
                    continue;
                };
                let package_name = names
                    .find_by_id(&edge.id)
                    .map(|entry| entry.package_name.clone())
                    .or_else(|| edge.package_name.clone())
                    .ok_or_else(|| UpdateError::missing_package_name(&component.id, &target))?;
                pending.push(PendingEdge {
                    kind,
                    position,
                    target,
                    package_name: Some(package_name),
                });
            }
        }
        for (position, extension) in component.extensions.iter().enumerate() {
            let Some(ref ext_id) = extension.component else {
                continue;
            };
            if let Some(target) = lookup(ext_id) {
                pending.push(PendingEdge {
                    kind: EdgeKind::Extension,
                    position,
                    target,
                    package_name: None,
                });
            }
        }

        let mut changes = Vec::new();
        for edge in pending {
            let slot = match edge.kind {
                EdgeKind::Runtime => {
                    let dep = &mut component.dependencies[edge.position];
                    dep.package_name = edge.package_name;
                    &mut dep.id
                }
                EdgeKind::Dev => {
                    let dep = &mut component.dev_dependencies[edge.position];
                    dep.package_name = edge.package_name;
                    &mut dep.id
                }
                EdgeKind::Extension => {
                    let ext = &mut component.extensions[edge.position];
                    match ext.component.as_mut() {
                        Some(id) => id,
                        None => continue,
                    }
                }
            };
            if slot.version != edge.target.version {
                changes.push(RewriteChange {
                    dependency: edge.target.clone(),
                    from: slot.version.clone(),
                    to: edge.target.version.clone(),
                    kind: edge.kind,
                });
            }
            *slot = edge.target;
        }

        Ok(RewriteReport {
            component: component.id.clone(),
            changes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DependencyRef, Extension, Lifecycle, PackageDependency, UpdateItem};
    use crate::update::Batch;
    use serde_json::json;

    fn id(s: &str) -> ComponentId {
        s.parse().unwrap()
    }

    fn names(entries: &[(&str, &str)]) -> DependencyList {
        DependencyList::new(
            entries
                .iter()
                .map(|(dep, name)| PackageDependency {
                    component_id: id(dep),
                    package_name: name.to_string(),
                    version: String::new(),
                    lifecycle: Lifecycle::Runtime,
                })
                .collect(),
        )
    }

    fn index(planned: &[&str]) -> BatchIndex {
        let items = planned
            .iter()
            .map(|p| UpdateItem::new(Component::new(id(p)), Vec::new(), None))
            .collect();
        Batch::new(items).unwrap().into_planned().index()
    }

    #[test]
    fn test_batch_member_gets_new_version() {
        let mut a = Component::new(id("scope.a@1.1.0"))
            .with_dependency(DependencyRef::new(id("scope.b@2.0.0")));

        let report = DependencyRewriter::rewrite(
            &mut a,
            &[],
            &index(&["scope.a@1.1.0", "scope.b@3.0.0"]),
            &names(&[("scope.b", "@scope/b")]),
        )
        .unwrap();

        assert_eq!(a.dependencies[0].id.to_string(), "scope.b@3.0.0");
        assert_eq!(a.dependencies[0].package_name.as_deref(), Some("@scope/b"));
        assert_eq!(report.changes.len(), 1);
        assert_eq!(report.changes[0].from, Some("2.0.0".parse().unwrap()));
    }

    #[test]
    fn test_batch_wins_over_resolved() {
        let mut a = Component::new(id("scope.a@1.1.0"))
            .with_dependency(DependencyRef::new(id("scope.b@2.0.0")).with_package_name("@scope/b"));

        DependencyRewriter::rewrite(
            &mut a,
            &[id("scope.b@2.1.0")],
            &index(&["scope.b@3.0.0"]),
            &DependencyList::default(),
        )
        .unwrap();

        assert_eq!(a.dependencies[0].id.to_string(), "scope.b@3.0.0");
    }

    #[test]
    fn test_resolved_dependency_and_dev_edges() {
        let mut a = Component::new(id("scope.a@1.1.0"))
            .with_dependency(DependencyRef::new(id("scope.b@1.0.0")))
            .with_dev_dependency(DependencyRef::new(id("scope.t@0.1.0")));

        let report = DependencyRewriter::rewrite(
            &mut a,
            &[id("scope.b@1.1.0"), id("scope.t@0.2.0")],
            &index(&["scope.a@1.1.0"]),
            &names(&[("scope.b", "@scope/b"), ("scope.t", "@scope/t")]),
        )
        .unwrap();

        assert_eq!(a.dependencies[0].id.to_string(), "scope.b@1.1.0");
        assert_eq!(a.dev_dependencies[0].id.to_string(), "scope.t@0.2.0");
        assert_eq!(report.changes[1].kind, EdgeKind::Dev);
        assert_eq!(report.changes[1].to_string(), "dev dependency scope.t: 0.1.0 → 0.2.0");
    }

    #[test]
    fn test_unmatched_edges_untouched() {
        let mut a = Component::new(id("scope.a@1.1.0"))
            .with_dependency(DependencyRef::new(id("other.c@4.5.6")));
        let before = a.clone();

        let report = DependencyRewriter::rewrite(
            &mut a,
            &[id("scope.b@1.1.0")],
            &index(&["scope.a@1.1.0"]),
            &DependencyList::default(),
        )
        .unwrap();

        assert_eq!(a, before);
        assert!(report.is_empty());
    }

    #[test]
    fn test_missing_package_name_leaves_component_untouched() {
        let mut a = Component::new(id("scope.a@1.1.0"))
            .with_dependency(DependencyRef::new(id("scope.b@1.0.0")).with_package_name("@scope/b"))
            .with_dependency(DependencyRef::new(id("scope.c@1.0.0")));
        let before = a.clone();

        let err = DependencyRewriter::rewrite(
            &mut a,
            &[id("scope.b@1.1.0"), id("scope.c@1.1.0")],
            &BatchIndex::default(),
            &DependencyList::default(),
        )
        .unwrap_err();

        assert!(matches!(err, UpdateError::MissingPackageName { .. }));
        assert!(err.to_string().contains("scope.c@1.1.0"));
        assert_eq!(a, before);
    }

    #[test]
    fn test_extension_reference_rewritten_without_package_name() {
        let mut a = Component::new(id("scope.a@1.1.0"))
            .with_extension(Extension::from_component(id("scope.env@1.0.0"), json!({})))
            .with_extension(Extension::custom("scope.notes", json!({"x": 1})));

        let report = DependencyRewriter::rewrite(
            &mut a,
            &[],
            &index(&["scope.env@2.0.0"]),
            &DependencyList::default(),
        )
        .unwrap();

        assert_eq!(
            a.extensions[0].component.as_ref().unwrap().to_string(),
            "scope.env@2.0.0"
        );
        assert_eq!(report.changes[0].kind, EdgeKind::Extension);
        assert!(a.extensions[1].component.is_none());
    }

    #[test]
    fn test_no_edges_added_or_removed() {
        let mut a = Component::new(id("scope.a@1.1.0"))
            .with_dependency(DependencyRef::new(id("scope.b@1.0.0")).with_package_name("@scope/b"));

        DependencyRewriter::rewrite(
            &mut a,
            &[id("scope.b@1.1.0"), id("scope.z@9.0.0")],
            &index(&["scope.y@1.0.0"]),
            &DependencyList::default(),
        )
        .unwrap();

        assert_eq!(a.dependencies.len(), 1);
        assert!(a.dev_dependencies.is_empty());
    }
}
