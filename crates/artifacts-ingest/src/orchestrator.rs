// Artifact ingestion orchestrator
//
// Fans out repositories -> packages -> versions. Each level is listed by its
// own producer task; the orchestrator is the only consumer and writes one
// store transaction per accumulated batch. Packages of a repository are
// processed in listing order, so writes for one package are ordered.

use std::sync::Arc;
use std::time::Instant;

use artifacts_common::config::FailurePolicy;
use artifacts_common::Artifact;
use artifacts_store::ArtifactStore;
use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::batch::accumulate;
use crate::config::OrchestratorConfig;
use crate::error::IngestError;
use crate::models::{normalize, IngestReport, UnitFailure};
use crate::registry::{
    BoxError, PackageSummary, RegistryClient, RegistryResult, RepositorySummary,
};

/// What the package producer hands to the orchestrator
enum Listed<T> {
    Item(T),
    Failed(ListingFailure),
}

/// A failed listing, sent after any salvaged items
struct ListingFailure {
    operation: &'static str,
    fetched: usize,
    salvaged: usize,
    source: BoxError,
}

/// Split a listing into the items to forward and the failure to report.
///
/// Partial pages are forwarded only when `salvage` is set.
fn split_listing<T>(result: RegistryResult<T>, salvage: bool) -> (Vec<T>, Option<ListingFailure>) {
    match result {
        Ok(items) => (items, None),
        Err(e) => {
            let fetched = e.partial.len();
            let items = if salvage { e.partial } else { Vec::new() };
            let failure = ListingFailure {
                operation: e.operation,
                fetched,
                salvaged: items.len(),
                source: e.source,
            };
            (items, Some(failure))
        },
    }
}

/// List the packages of `repository` into `tx`.
async fn produce_packages(
    registry: Arc<dyn RegistryClient>,
    repository: RepositorySummary,
    salvage: bool,
    tx: mpsc::Sender<Listed<PackageSummary>>,
) {
    let start = Instant::now();
    let (packages, failure) = split_listing(registry.list_packages(&repository).await, salvage);

    info!("Found {} packages in {}", packages.len(), repository.name);

    for package in packages {
        if tx.send(Listed::Item(package)).await.is_err() {
            return;
        }
    }
    if let Some(failure) = failure {
        let _ = tx.send(Listed::Failed(failure)).await;
    }

    info!(
        "Finished repository {} in {:.2}s",
        repository.name,
        start.elapsed().as_secs_f64()
    );
}

/// List the versions of `package` into `tx` as normalized artifacts.
///
/// The listing failure, if any, is returned rather than sent, so it never
/// takes a slot in a batch.
async fn produce_versions(
    registry: Arc<dyn RegistryClient>,
    repository: RepositorySummary,
    package: PackageSummary,
    salvage: bool,
    tx: mpsc::Sender<Artifact>,
) -> Option<ListingFailure> {
    let (versions, failure) =
        split_listing(registry.list_versions(&package, &repository).await, salvage);

    if let Some(failure) = &failure {
        warn!(package = %package, error = %failure.source, "Error extracting versions for package");
    }
    info!(package = %package, versions = versions.len(), "Retrieving package");

    for version in versions {
        if tx.send(normalize(&repository, &package, version)).await.is_err() {
            break;
        }
    }

    failure
}

pub struct IngestOrchestrator {
    registry: Arc<dyn RegistryClient>,
    store: Arc<dyn ArtifactStore>,
    config: OrchestratorConfig,
}

impl IngestOrchestrator {
    pub fn new(
        registry: Arc<dyn RegistryClient>,
        store: Arc<dyn ArtifactStore>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            store,
            config,
        }
    }

    /// Run one full ingestion.
    ///
    /// A failed repository listing always aborts the run. Package and
    /// version listing failures abort it under [`FailurePolicy::FailFast`]
    /// and are collected into the report under [`FailurePolicy::Isolate`].
    /// Store failures always abort. Batches committed before an abort stay
    /// committed.
    pub async fn run(&self) -> Result<IngestReport, IngestError> {
        let start_time = Instant::now();

        info!(
            policy = ?self.config.failure_policy,
            page_size = self.config.page_size,
            "Starting artifact ingestion"
        );

        let repositories = self
            .registry
            .list_repositories()
            .await
            .map_err(|e| IngestError::registry("repositories", e))?;

        let mut report = IngestReport::default();

        for repository in repositories {
            report.repositories += 1;

            if self.config.skips(&repository.name) {
                info!("Skipping {}", repository.name);
                report.skipped_repositories += 1;
                continue;
            }

            info!(repository = %repository.name, "Extracting repository");
            self.run_repository(repository, &mut report).await?;
        }

        report.duration_seconds = start_time.elapsed().as_secs_f64();

        info!(
            "Ingestion complete: {} repositories ({} skipped), {} packages, {} batches, {} written, {} rejected, {} failures in {:.2}s",
            report.repositories,
            report.skipped_repositories,
            report.packages,
            report.batches,
            report.artifacts_written,
            report.artifacts_rejected,
            report.failures.len(),
            report.duration_seconds
        );

        Ok(report)
    }

    fn salvage(&self) -> bool {
        self.config.failure_policy == FailurePolicy::Isolate
    }

    #[instrument(skip_all, fields(repository = %repository.name))]
    async fn run_repository(
        &self,
        repository: RepositorySummary,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        let (tx, mut packages) = mpsc::channel(1);
        let producer = tokio::spawn(produce_packages(
            Arc::clone(&self.registry),
            repository.clone(),
            self.salvage(),
            tx,
        ));

        while let Some(listed) = packages.recv().await {
            match listed {
                Listed::Item(package) => {
                    report.packages += 1;
                    self.run_package(&repository, package, report).await?;
                },
                Listed::Failed(failure) => {
                    self.handle_failure(&repository, None, failure, report)?;
                },
            }
        }

        producer.await?;
        Ok(())
    }

    async fn run_package(
        &self,
        repository: &RepositorySummary,
        package: PackageSummary,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        let (tx, rx) = mpsc::channel(self.config.page_size.max(1));
        let producer = tokio::spawn(produce_versions(
            Arc::clone(&self.registry),
            repository.clone(),
            package.clone(),
            self.salvage(),
            tx,
        ));

        let mut batches = accumulate(self.config.page_size, self.config.idle_timeout, rx);

        while let Some(artifacts) = batches.recv().await {
            self.write_batch(&package, artifacts, report).await?;
        }

        if let Some(failure) = producer.await? {
            self.handle_failure(repository, Some(&package), failure, report)?;
        }
        Ok(())
    }

    async fn write_batch(
        &self,
        package: &PackageSummary,
        artifacts: Vec<Artifact>,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        let stored = self
            .store
            .insert(artifacts)
            .await
            .map_err(|source| IngestError::Store {
                package: package.to_string(),
                source,
            })?;

        report.batches += 1;

        for artifact in &stored {
            if artifact.is_rejected() {
                report.artifacts_rejected += 1;
                error!(
                    artifact = %artifact.id,
                    problems = ?artifact.problems,
                    "Rejected artifact"
                );
            } else {
                report.artifacts_written += 1;
            }
        }

        Ok(())
    }

    /// Abort under fail-fast, otherwise record the failure and carry on.
    fn handle_failure(
        &self,
        repository: &RepositorySummary,
        package: Option<&PackageSummary>,
        failure: ListingFailure,
        report: &mut IngestReport,
    ) -> Result<(), IngestError> {
        let unit = match package {
            Some(package) => format!("{}/{}", repository.name, package),
            None => repository.name.clone(),
        };

        match self.config.failure_policy {
            FailurePolicy::FailFast => {
                error!(unit = %unit, operation = failure.operation, error = %failure.source, "Listing failed; aborting run");
                Err(IngestError::Registry {
                    unit,
                    operation: failure.operation,
                    fetched: failure.fetched,
                    source: failure.source,
                })
            },
            FailurePolicy::Isolate => {
                error!(
                    unit = %unit,
                    operation = failure.operation,
                    salvaged = failure.salvaged,
                    error = %failure.source,
                    "Listing failed; continuing"
                );
                report.failures.push(UnitFailure {
                    repository: repository.name.clone(),
                    package: package.map(ToString::to_string),
                    operation: failure.operation.to_string(),
                    salvaged: failure.salvaged,
                    error: failure.source.to_string(),
                });
                Ok(())
            },
        }
    }
}
