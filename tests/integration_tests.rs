//! Integration tests for scopeup
//!
//! These tests verify:
//! - The full update pipeline against in-process scopes and remotes
//! - Batch members referencing each other's new versions
//! - Abort-before-commit on input errors, commit-with-failure on build errors
//! - Snapshot persistence and remote finalization

use async_trait::async_trait;
use scopeup::build::{BuildOptions, BuildOutput, BuildPipeline, NoopPipeline, PipelineReport};
use scopeup::domain::{
    BuildStatus, Component, ComponentId, DepUpdateRequestItem, DependencyRef, UpdateOptions,
};
use scopeup::error::{BuildError, ScopeError, UpdateError};
use scopeup::graph::ManifestGraph;
use scopeup::orchestrator::UpdateOrchestrator;
use scopeup::scope::{LocalScope, OfflineRemote, Scope, CLEAR_CACHE_ACTION, EXPORT_ACTION};
use std::sync::Arc;
use tempfile::TempDir;

fn id(s: &str) -> ComponentId {
    s.parse().unwrap()
}

fn request(component: &str, deps: &[&str], version_to_tag: Option<&str>) -> DepUpdateRequestItem {
    DepUpdateRequestItem {
        component_id: component.to_string(),
        dependencies: deps.iter().map(|d| d.to_string()).collect(),
        version_to_tag: version_to_tag.map(String::from),
    }
}

fn tag() -> UpdateOptions {
    UpdateOptions {
        tag: true,
        ..Default::default()
    }
}

/// a@1.0.0 depends on b@1.0.0; b has 1.0.0, 1.1.0 and 2.0.0
fn scope_a_b() -> LocalScope {
    LocalScope::in_memory("scope")
        .with_component(
            Component::new(id("scope.a@1.0.0"))
                .with_dependency(DependencyRef::new(id("scope.b@1.0.0")).with_package_name("@scope/b")),
        )
        .with_component(Component::new(id("scope.b@1.0.0")))
        .with_component(Component::new(id("scope.b@1.1.0")))
        .with_component(Component::new(id("scope.b@2.0.0")))
}

fn orchestrator(
    scope: Arc<dyn Scope>,
    remote: Arc<OfflineRemote>,
    pipeline: Arc<dyn BuildPipeline>,
) -> UpdateOrchestrator {
    UpdateOrchestrator::new(
        scope,
        remote.clone(),
        remote,
        pipeline,
        Arc::new(ManifestGraph::new()),
    )
}

/// Pipeline that fails every component with a fixed message
struct FailingPipeline;

#[async_trait]
impl BuildPipeline for FailingPipeline {
    async fn run(
        &self,
        components: &[Component],
        options: &BuildOptions,
    ) -> Result<BuildOutput, BuildError> {
        assert!(options.fail_fast);
        Ok(BuildOutput {
            reports: components
                .iter()
                .map(|c| PipelineReport::failure("test", c.id.clone(), vec!["assertion failed".to_string()]))
                .collect(),
            ..Default::default()
        })
    }
}

/// Pipeline that records the seeds it was given and publishes them
struct PublishingPipeline;

#[async_trait]
impl BuildPipeline for PublishingPipeline {
    async fn run(
        &self,
        components: &[Component],
        _options: &BuildOptions,
    ) -> Result<BuildOutput, BuildError> {
        Ok(BuildOutput {
            reports: components
                .iter()
                .map(|c| PipelineReport::success("pack", c.id.clone()))
                .collect(),
            published_packages: components.iter().map(|c| c.id.to_string()).collect(),
            ..Default::default()
        })
    }
}

mod end_to_end {
    use super::*;

    #[tokio::test]
    async fn test_minor_release_pins_range() {
        let scope = Arc::new(scope_a_b());
        let remote = Arc::new(OfflineRemote::new());
        let outcome = orchestrator(scope.clone(), remote.clone(), Arc::new(NoopPipeline))
            .run(
                &[request("scope.a@latest", &["scope.b@^1.0.0"], Some("minor"))],
                &tag(),
            )
            .await
            .unwrap();

        assert!(outcome.error.is_none());
        let item = &outcome.deps_update_items[0];
        let deps: Vec<String> = item.dependencies.iter().map(|d| d.to_string()).collect();
        assert_eq!(deps, vec!["scope.b@1.1.0"]);
        assert_eq!(item.id().to_string(), "scope.a@1.1.0");
        assert_eq!(item.previous_version, Some("1.0.0".parse().unwrap()));
        assert_eq!(
            item.component.dependencies[0].id.to_string(),
            "scope.b@1.1.0"
        );

        let records = item.component.dependency_resolver_data().unwrap();
        assert_eq!(records.dependencies[0].package_name, "@scope/b");
        assert_eq!(records.dependencies[0].version, "1.1.0");

        let stored = scope.get(&id("scope.a@1.1.0")).await.unwrap().unwrap();
        assert_eq!(stored.build_status, BuildStatus::Succeeded);
        assert!(stored.log.is_some());
        // the previous version is still there
        assert!(scope.get(&id("scope.a@1.0.0")).await.unwrap().is_some());

        let calls = remote.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].action, CLEAR_CACHE_ACTION);
        assert_eq!(calls[0].payload["ids"], serde_json::json!(["scope.a@1.1.0"]));
    }

    #[tokio::test]
    async fn test_published_packages_returned() {
        let scope = Arc::new(scope_a_b());
        let outcome = orchestrator(scope, Arc::new(OfflineRemote::new()), Arc::new(PublishingPipeline))
            .run(&[request("scope.a", &[], None)], &tag())
            .await
            .unwrap();

        assert_eq!(outcome.published_packages, vec!["scope.a@1.0.1"]);
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_custom_provenance() {
        let scope = Arc::new(scope_a_b());
        let options = UpdateOptions {
            tag: true,
            message: Some("pin b".to_string()),
            username: Some("alice".to_string()),
            email: Some("alice@example.com".to_string()),
            ..Default::default()
        };
        let outcome = orchestrator(scope, Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline))
            .run(&[request("scope.a", &[], None)], &options)
            .await
            .unwrap();

        let log = outcome.deps_update_items[0].component.log.clone().unwrap();
        assert_eq!(log.username, "alice");
        assert_eq!(log.email, "alice@example.com");
        assert_eq!(log.message, "pin b");
    }
}

mod batch_consistency {
    use super::*;

    #[tokio::test]
    async fn test_member_references_new_version_of_other_member() {
        let scope = Arc::new(scope_a_b());
        let outcome = orchestrator(scope.clone(), Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline))
            .run(
                &[
                    request("scope.a", &[], Some("patch")),
                    request("scope.b", &[], Some("3.0.0")),
                ],
                &tag(),
            )
            .await
            .unwrap();

        let a = &outcome.deps_update_items[0];
        assert_eq!(a.id().to_string(), "scope.a@1.0.1");
        assert_eq!(a.component.dependencies[0].id.to_string(), "scope.b@3.0.0");

        let stored = scope.get(&id("scope.a@1.0.1")).await.unwrap().unwrap();
        assert_eq!(stored.dependencies[0].id.to_string(), "scope.b@3.0.0");
        assert!(scope.get(&id("scope.b@3.0.0")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_batch_version_wins_over_pinned_dependency() {
        let scope = Arc::new(scope_a_b());
        let outcome = orchestrator(scope, Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline))
            .run(
                &[
                    request("scope.a", &["scope.b@1.0.0"], None),
                    request("scope.b", &[], Some("major")),
                ],
                &tag(),
            )
            .await
            .unwrap();

        let a = &outcome.deps_update_items[0];
        assert_eq!(a.dependencies[0].to_string(), "scope.b@3.0.0");
        assert_eq!(a.component.dependencies[0].id.to_string(), "scope.b@3.0.0");
    }

    #[tokio::test]
    async fn test_unrelated_edges_untouched() {
        let scope = Arc::new(
            scope_a_b().with_component(
                Component::new(id("scope.d@1.0.0"))
                    .with_dependency(DependencyRef::new(id("other.c@4.5.6"))),
            ),
        );
        let outcome = orchestrator(scope, Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline))
            .run(&[request("scope.d", &["scope.b@^1.0.0"], None)], &tag())
            .await
            .unwrap();

        let d = &outcome.deps_update_items[0];
        assert_eq!(d.component.dependencies.len(), 1);
        assert_eq!(d.component.dependencies[0].id.to_string(), "other.c@4.5.6");
    }
}

mod failures {
    use super::*;

    #[tokio::test]
    async fn test_missing_package_name_aborts_before_commit() {
        let scope = Arc::new(
            scope_a_b().with_component(
                Component::new(id("scope.e@1.0.0"))
                    .with_dependency(DependencyRef::new(id("scope.b@1.0.0"))),
            ),
        );
        let remote = Arc::new(OfflineRemote::new());
        let err = orchestrator(scope.clone(), remote.clone(), Arc::new(NoopPipeline))
            .run(
                &[
                    request("scope.a", &["scope.b@^1.0.0"], None),
                    request("scope.e", &["scope.b@^1.0.0"], None),
                ],
                &tag(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, UpdateError::MissingPackageName { .. }));
        assert!(scope.get(&id("scope.a@1.0.1")).await.unwrap().is_none());
        assert_eq!(
            scope.get(&id("scope.a")).await.unwrap().unwrap().id.to_string(),
            "scope.a@1.0.0"
        );
        assert_eq!(scope.pending_count().await, 0);
        assert!(remote.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_unsatisfiable_range() {
        let scope = Arc::new(scope_a_b());
        let err = orchestrator(scope, Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline))
            .run(&[request("scope.a", &["scope.b@^5.0.0"], None)], &tag())
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::UnsatisfiableRange { .. }));
    }

    #[tokio::test]
    async fn test_unknown_dependency() {
        let scope = Arc::new(scope_a_b());
        let err = orchestrator(scope, Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline))
            .run(&[request("scope.a", &["scope.nope"], None)], &tag())
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::ComponentNotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_component() {
        let scope = Arc::new(scope_a_b());
        let err = orchestrator(scope, Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline))
            .run(
                &[request("scope.a", &[], None), request("scope.a@1.0.0", &[], None)],
                &tag(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UpdateError::DuplicateComponent { .. }));
    }

    #[tokio::test]
    async fn test_build_failure_commits_and_finalizes() {
        let scope = Arc::new(scope_a_b());
        let remote = Arc::new(OfflineRemote::new());
        let outcome = orchestrator(scope.clone(), remote.clone(), Arc::new(FailingPipeline))
            .run(&[request("scope.a", &["scope.b@^1.0.0"], None)], &tag())
            .await
            .unwrap();

        let error = outcome.error.clone().unwrap();
        assert!(error.contains("assertion failed"));
        assert_eq!(outcome.build_status(), BuildStatus::Failed);

        let stored = scope.get(&id("scope.a@1.0.1")).await.unwrap().unwrap();
        assert_eq!(stored.build_status, BuildStatus::Failed);
        assert_eq!(remote.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_persist_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("scope.json");
        let scope = Arc::new(
            LocalScope::open(&path)
                .unwrap()
                .with_component(Component::new(id("local.a@1.0.0"))),
        );
        let remote = Arc::new(OfflineRemote::new());

        let err = orchestrator(scope, remote.clone(), Arc::new(NoopPipeline))
            .run(&[request("local.a", &[], None)], &tag())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            UpdateError::Scope(ScopeError::Persistence { .. })
        ));
        assert!(remote.calls().await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_remote_after_commit() {
        let scope = Arc::new(scope_a_b());
        let remote = Arc::new(OfflineRemote::new().with_unreachable("scope"));
        let err = orchestrator(scope.clone(), remote, Arc::new(NoopPipeline))
            .run(&[request("scope.a", &[], None)], &tag())
            .await
            .unwrap_err();

        assert!(matches!(err, UpdateError::Remote(_)));
        // committed before the remote was contacted
        assert!(scope.get(&id("scope.a@1.0.1")).await.unwrap().is_some());
    }
}

mod idempotence {
    use super::*;

    #[tokio::test]
    async fn test_rerun_resolves_same_dependencies() {
        let scope = Arc::new(scope_a_b());
        let orchestrator = orchestrator(scope, Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline));
        let req = [request("scope.a", &["scope.b@^1.0.0"], None)];

        let first = orchestrator.run(&req, &tag()).await.unwrap();
        let second = orchestrator.run(&req, &tag()).await.unwrap();

        assert_eq!(
            first.deps_update_items[0].dependencies,
            second.deps_update_items[0].dependencies
        );
        assert_eq!(second.deps_update_items[0].id().to_string(), "scope.a@1.0.2");
    }

    #[tokio::test]
    async fn test_snap_mints_new_token_each_run() {
        let scope = Arc::new(scope_a_b());
        let orchestrator = orchestrator(scope, Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline));
        let req = [request("scope.a", &["scope.b@^1.0.0"], None)];

        let first = orchestrator.run(&req, &UpdateOptions::default()).await.unwrap();
        let second = orchestrator.run(&req, &UpdateOptions::default()).await.unwrap();

        let first_version = first.deps_update_items[0].id().version.clone().unwrap();
        let second_version = second.deps_update_items[0].id().version.clone().unwrap();
        assert!(first_version.is_snap());
        assert_ne!(first_version, second_version);
        assert_eq!(
            first.deps_update_items[0].dependencies,
            second.deps_update_items[0].dependencies
        );
    }
}

mod snapshots {
    use super::*;

    #[tokio::test]
    async fn test_dependent_pins_to_snapshot() {
        let scope = Arc::new(scope_a_b());
        let orchestrator = orchestrator(scope.clone(), Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline));

        let snapped = orchestrator
            .run(&[request("scope.b", &[], None)], &UpdateOptions::default())
            .await
            .unwrap();
        let b = snapped.deps_update_items[0].id().clone();
        assert!(b.version.as_ref().unwrap().is_snap());

        let pin = b.to_string();
        let outcome = orchestrator
            .run(&[request("scope.a", &[pin.as_str()], Some("minor"))], &tag())
            .await
            .unwrap();

        let item = &outcome.deps_update_items[0];
        assert_eq!(item.dependencies, vec![b.clone()]);
        assert_eq!(item.component.dependencies[0].id, b);

        let stored = scope.get(&id("scope.a@1.1.0")).await.unwrap().unwrap();
        assert_eq!(stored.dependencies[0].id, b);
    }
}

mod multi_root {
    use super::*;

    #[tokio::test]
    async fn test_imports_from_upstream_and_exports() {
        let upstream: Arc<dyn Scope> = Arc::new(scope_a_b());
        let local = Arc::new(LocalScope::in_memory("scope").with_upstream(upstream));
        let remote = Arc::new(OfflineRemote::new());
        let options = UpdateOptions {
            tag: true,
            multiple: true,
            ..Default::default()
        };

        let outcome = orchestrator(local.clone(), remote.clone(), Arc::new(NoopPipeline))
            .run(
                &[request("scope.a", &["scope.b@^1.0.0"], Some("minor"))],
                &options,
            )
            .await
            .unwrap();

        assert_eq!(outcome.deps_update_items[0].id().to_string(), "scope.a@1.1.0");
        assert_eq!(local.version_history(&id("scope.b")).await.unwrap().len(), 3);

        let calls = remote.calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].action, EXPORT_ACTION);
        assert_eq!(calls[0].payload["ids"], serde_json::json!(["scope.a@1.1.0"]));
    }

    #[tokio::test]
    async fn test_consecutive_releases_keep_local_versions() {
        let upstream: Arc<dyn Scope> = Arc::new(scope_a_b());
        let local = Arc::new(LocalScope::in_memory("scope").with_upstream(upstream));
        let orchestrator = orchestrator(local.clone(), Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline));
        let options = UpdateOptions {
            tag: true,
            multiple: true,
            ..Default::default()
        };
        let req = [request("scope.a", &[], Some("minor"))];

        let first = orchestrator.run(&req, &options).await.unwrap();
        let second = orchestrator.run(&req, &options).await.unwrap();

        assert_eq!(first.deps_update_items[0].id().to_string(), "scope.a@1.1.0");
        assert_eq!(second.deps_update_items[0].id().to_string(), "scope.a@1.2.0");

        let history: Vec<String> = local
            .version_history(&id("scope.a"))
            .await
            .unwrap()
            .iter()
            .map(|v| v.to_string())
            .collect();
        assert_eq!(history, vec!["1.0.0", "1.1.0", "1.2.0"]);
    }

    #[tokio::test]
    async fn test_finalizes_per_destination_scope() {
        let scope = Arc::new(
            scope_a_b().with_component(Component::new(id("other.x@0.1.0"))),
        );
        let remote = Arc::new(OfflineRemote::new());
        let options = UpdateOptions {
            tag: true,
            multiple: true,
            ..Default::default()
        };

        orchestrator(scope, remote.clone(), Arc::new(NoopPipeline))
            .run(
                &[request("scope.a", &[], None), request("other.x", &[], None)],
                &options,
            )
            .await
            .unwrap();

        let mut scopes: Vec<String> = remote.calls().await.into_iter().map(|c| c.scope).collect();
        scopes.sort();
        assert_eq!(scopes, vec!["other", "scope"]);
    }
}

mod persistence {
    use super::*;

    #[tokio::test]
    async fn test_committed_batch_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scope.json");
        let seed = LocalScope::open(&path).unwrap();
        for component in [
            Component::new(id("scope.a@1.0.0")).with_dependency(
                DependencyRef::new(id("scope.b@1.0.0")).with_package_name("@scope/b"),
            ),
            Component::new(id("scope.b@1.0.0")),
            Component::new(id("scope.b@1.1.0")),
            Component::new(id("scope.b@2.0.0")),
        ] {
            seed.add_to_sources(component).await.unwrap();
        }
        seed.persist().await.unwrap();

        let scope = Arc::new(LocalScope::open(&path).unwrap());
        orchestrator(scope, Arc::new(OfflineRemote::new()), Arc::new(NoopPipeline))
            .run(
                &[request("scope.a", &["scope.b@^1.0.0"], Some("minor"))],
                &tag(),
            )
            .await
            .unwrap();

        let reopened = LocalScope::open(&path).unwrap();
        let a = reopened.get(&id("scope.a@1.1.0")).await.unwrap().unwrap();
        assert_eq!(a.build_status, BuildStatus::Succeeded);
        assert_eq!(a.dependencies[0].id.to_string(), "scope.b@1.1.0");
        assert_eq!(
            a.dependency_resolver_data().unwrap().dependencies[0].version,
            "1.1.0"
        );
    }
}
