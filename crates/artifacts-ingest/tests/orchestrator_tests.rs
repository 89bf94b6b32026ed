//! Orchestrator integration tests
//!
//! Drive full ingestion runs against the scripted registry and an embedded
//! store in a temporary directory.

mod common;

use std::collections::HashSet;
use std::sync::Arc;

use artifacts_common::config::{FailurePolicy, StoreBackend};
use artifacts_common::{Artifact, Status};
use artifacts_ingest::{IngestError, IngestOrchestrator, OrchestratorConfig};
use artifacts_store::{ArtifactFilter, ArtifactStore, StoreError, StoreResult};
use async_trait::async_trait;
use common::{published, temp_store, FakeRegistry};
use futures::stream::{self, BoxStream, StreamExt};

fn orchestrator(
    registry: FakeRegistry,
    store: &Arc<dyn ArtifactStore>,
    policy: FailurePolicy,
) -> IngestOrchestrator {
    let config = OrchestratorConfig::new()
        .with_page_size(2)
        .with_skip_repository("scratch")
        .with_failure_policy(policy);

    IngestOrchestrator::new(Arc::new(registry), Arc::clone(store), config)
}

async fn stored(store: &Arc<dyn ArtifactStore>) -> Vec<Artifact> {
    store
        .list(&ArtifactFilter::all_statuses())
        .await
        .expect("List should succeed")
}

fn ids(artifacts: &[Artifact]) -> HashSet<String> {
    artifacts.iter().map(|a| a.id.to_string()).collect()
}

/// releases: client:a (3 versions), client:b (5, fails at its second page), client:c (1)
fn registry_with_failing_versions() -> FakeRegistry {
    FakeRegistry::new()
        .repository("releases")
        .package("releases", "client", "a")
        .package("releases", "client", "b")
        .package("releases", "client", "c")
        .versions("releases", "client", "a", published(3))
        .versions("releases", "client", "b", published(5))
        .versions("releases", "client", "c", published(1))
        .fail_versions_at_page("releases", "client", "b", 1)
}

// ============================================================================
// Successful runs
// ============================================================================

#[tokio::test]
async fn test_run_ingests_every_version() {
    let (_dir, store) = temp_store().await;

    let registry = FakeRegistry::new()
        .repository("releases")
        .repository("scratch")
        .package("releases", "client", "of.a.service")
        .package("releases", "client", "lib")
        .package("scratch", "client", "junk")
        .versions(
            "releases",
            "client",
            "of.a.service",
            [("1", "Published"), ("2", "Archived"), ("3", "Published")],
        )
        .versions("releases", "client", "lib", published(5))
        .versions("scratch", "client", "junk", published(2));

    let report = orchestrator(registry, &store, FailurePolicy::FailFast)
        .run()
        .await
        .expect("Run should succeed");

    assert_eq!(report.repositories, 2);
    assert_eq!(report.skipped_repositories, 1);
    assert_eq!(report.packages, 2);
    // ceil(3/2) + ceil(5/2)
    assert_eq!(report.batches, 5);
    assert_eq!(report.artifacts_written, 8);
    assert_eq!(report.artifacts_rejected, 0);
    assert!(report.is_clean());

    let everything = stored(&store).await;
    assert_eq!(everything.len(), 8);
    assert!(everything.iter().all(|a| a.data.repository == "releases"));
    assert!(everything.iter().all(|a| a.data.domain_name == "acme"));

    let service = store
        .list(&ArtifactFilter::default().with_package("of.a.service"))
        .await
        .expect("List should succeed");
    assert_eq!(
        ids(&service),
        HashSet::from(["client:of.a.service:1".to_string(), "client:of.a.service:3".to_string()])
    );

    let archived = store
        .list(&ArtifactFilter::new([Status::Archived], "", ""))
        .await
        .expect("List should succeed");
    assert_eq!(ids(&archived), HashSet::from(["client:of.a.service:2".to_string()]));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let (_dir, store) = temp_store().await;

    let registry = || {
        FakeRegistry::new()
            .repository("releases")
            .package("releases", "client", "a")
            .versions("releases", "client", "a", published(3))
    };

    orchestrator(registry(), &store, FailurePolicy::FailFast)
        .run()
        .await
        .expect("First run should succeed");
    orchestrator(registry(), &store, FailurePolicy::FailFast)
        .run()
        .await
        .expect("Second run should succeed");

    assert_eq!(stored(&store).await.len(), 3);
}

#[tokio::test]
async fn test_invalid_records_are_rejected_not_fatal() {
    let (_dir, store) = temp_store().await;

    let registry = FakeRegistry::new()
        .repository("releases")
        .package("releases", "client", "")
        .package("releases", "client", "ok")
        .versions("releases", "client", "", published(1))
        .versions("releases", "client", "ok", [("1", "Published"), ("2", "Retired")]);

    let report = orchestrator(registry, &store, FailurePolicy::FailFast)
        .run()
        .await
        .expect("Run should succeed");

    assert_eq!(report.artifacts_written, 1);
    assert_eq!(report.artifacts_rejected, 2);
    assert!(!report.is_clean());

    assert_eq!(ids(&stored(&store).await), HashSet::from(["client:ok:1".to_string()]));
}

#[tokio::test]
async fn test_empty_registry() {
    let (_dir, store) = temp_store().await;

    let report = orchestrator(FakeRegistry::new(), &store, FailurePolicy::FailFast)
        .run()
        .await
        .expect("Run should succeed");

    assert_eq!(report.repositories, 0);
    assert_eq!(report.batches, 0);
    assert!(stored(&store).await.is_empty());
}

// ============================================================================
// Fail-fast
// ============================================================================

#[tokio::test]
async fn test_fail_fast_aborts_on_version_listing_failure() {
    let (_dir, store) = temp_store().await;

    let err = orchestrator(registry_with_failing_versions(), &store, FailurePolicy::FailFast)
        .run()
        .await
        .expect_err("Run should abort");

    match err {
        IngestError::Registry { unit, fetched, .. } => {
            assert_eq!(unit, "releases/client:b");
            assert_eq!(fetched, 2);
        },
        other => panic!("Unexpected error: {}", other),
    }

    // a was committed before b failed; nothing of b and nothing after it
    assert_eq!(
        ids(&stored(&store).await),
        HashSet::from(["client:a:1", "client:a:2", "client:a:3"].map(String::from))
    );
}

#[tokio::test]
async fn test_fail_fast_aborts_on_package_listing_failure() {
    let (_dir, store) = temp_store().await;

    let registry = FakeRegistry::new()
        .repository("releases")
        .package("releases", "client", "a")
        .package("releases", "client", "b")
        .package("releases", "client", "c")
        .versions("releases", "client", "a", published(1))
        .fail_packages_at_page("releases", 1);

    let err = orchestrator(registry, &store, FailurePolicy::FailFast)
        .run()
        .await
        .expect_err("Run should abort");

    assert!(matches!(err, IngestError::Registry { fetched: 2, .. }));
    assert!(stored(&store).await.is_empty());
}

#[tokio::test]
async fn test_repository_listing_failure_is_always_fatal() {
    for policy in [FailurePolicy::FailFast, FailurePolicy::Isolate] {
        let (_dir, store) = temp_store().await;

        let registry = FakeRegistry::new()
            .repository("releases")
            .fail_repositories_at_page(0);

        let err = orchestrator(registry, &store, policy)
            .run()
            .await
            .expect_err("Run should abort");

        assert!(matches!(err, IngestError::Registry { ref unit, .. } if unit == "repositories"));
    }
}

// ============================================================================
// Isolate
// ============================================================================

#[tokio::test]
async fn test_isolate_keeps_partial_versions_and_continues() {
    let (_dir, store) = temp_store().await;

    let report = orchestrator(registry_with_failing_versions(), &store, FailurePolicy::Isolate)
        .run()
        .await
        .expect("Run should succeed");

    assert_eq!(report.packages, 3);
    assert_eq!(report.failures.len(), 1);

    let failure = &report.failures[0];
    assert_eq!(failure.repository, "releases");
    assert_eq!(failure.package.as_deref(), Some("client:b"));
    assert_eq!(failure.operation, "list package versions");
    assert_eq!(failure.salvaged, 2);

    // a complete, first page of b salvaged, c after the failure
    assert_eq!(report.artifacts_written, 6);
    assert_eq!(
        ids(&stored(&store).await),
        HashSet::from(
            ["client:a:1", "client:a:2", "client:a:3", "client:b:1", "client:b:2", "client:c:1"]
                .map(String::from)
        )
    );
}

#[tokio::test]
async fn test_isolate_salvaged_versions_fill_whole_batches() {
    let (_dir, store) = temp_store().await;

    let registry = FakeRegistry::new()
        .repository("releases")
        .package("releases", "client", "b")
        .versions("releases", "client", "b", published(5))
        .fail_versions_at_page("releases", "client", "b", 2);

    let report = orchestrator(registry, &store, FailurePolicy::Isolate)
        .run()
        .await
        .expect("Run should succeed");

    // two full batches of two; the failure itself occupies no batch slot
    assert_eq!(report.batches, 2);
    assert_eq!(report.artifacts_written, 4);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].salvaged, 4);
}

#[tokio::test]
async fn test_isolate_keeps_partial_packages() {
    let (_dir, store) = temp_store().await;

    let registry = FakeRegistry::new()
        .repository("releases")
        .repository("other")
        .package("releases", "client", "a")
        .package("releases", "client", "b")
        .package("releases", "client", "c")
        .package("other", "server", "d")
        .versions("releases", "client", "a", published(1))
        .versions("releases", "client", "c", published(1))
        .versions("other", "server", "d", published(1))
        .fail_packages_at_page("releases", 1);

    let report = orchestrator(registry, &store, FailurePolicy::Isolate)
        .run()
        .await
        .expect("Run should succeed");

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].package, None);
    assert_eq!(report.failures[0].salvaged, 2);

    // c sat on the failed page; b has no versions
    assert_eq!(report.packages, 3);
    assert_eq!(
        ids(&stored(&store).await),
        HashSet::from(["client:a:1", "server:d:1"].map(String::from))
    );
}

// ============================================================================
// Store failures
// ============================================================================

/// Store whose every write fails at the storage layer
struct BrokenStore;

#[async_trait]
impl ArtifactStore for BrokenStore {
    async fn insert(&self, _artifacts: Vec<Artifact>) -> StoreResult<Vec<Artifact>> {
        Err(StoreError::MalformedRow("disk full".to_string()))
    }

    async fn list(&self, _filter: &ArtifactFilter) -> StoreResult<Vec<Artifact>> {
        Ok(Vec::new())
    }

    fn changes(&self, _filter: ArtifactFilter) -> BoxStream<'static, Artifact> {
        stream::empty().boxed()
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Embedded
    }
}

#[tokio::test]
async fn test_store_failure_is_fatal_under_every_policy() {
    for policy in [FailurePolicy::FailFast, FailurePolicy::Isolate] {
        let store: Arc<dyn ArtifactStore> = Arc::new(BrokenStore);

        let registry = FakeRegistry::new()
            .repository("releases")
            .package("releases", "client", "a")
            .versions("releases", "client", "a", published(1));

        let err = orchestrator(registry, &store, policy)
            .run()
            .await
            .expect_err("Run should abort");

        assert!(matches!(err, IngestError::Store { ref package, .. } if package == "client:a"));
    }
}
