// Ingestion run results and record normalization

use artifacts_common::{Artifact, ArtifactData, ArtifactId, Status};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::registry::{PackageSummary, RepositorySummary, VersionSummary};

/// Summary of one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Repositories listed by the registry, skipped ones included
    pub repositories: usize,
    pub skipped_repositories: usize,
    pub packages: usize,
    pub batches: usize,
    pub artifacts_written: usize,
    pub artifacts_rejected: usize,
    /// Units that failed under the isolate policy
    pub failures: Vec<UnitFailure>,
    pub duration_seconds: f64,
}

impl IngestReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.artifacts_rejected == 0
    }
}

/// A repository or package whose listing failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub repository: String,
    /// Set when a version listing failed, unset for a package listing
    pub package: Option<String>,
    pub operation: String,
    /// Items kept from the pages fetched before the failure
    pub salvaged: usize,
    pub error: String,
}

/// Build the artifact record for one registry version.
///
/// `create_time` is stamped here. A status outside [`Status`] leaves the
/// default in place and records a problem, so the record is never stored.
pub fn normalize(
    repository: &RepositorySummary,
    package: &PackageSummary,
    version: VersionSummary,
) -> Artifact {
    let status = version.status.parse::<Status>();

    let mut artifact = Artifact::new(
        ArtifactId::new(package.namespace.as_str(), package.package.as_str(), version.version),
        ArtifactData {
            repository: repository.name.clone(),
            revision: version.revision,
            domain_name: repository.domain_name.clone(),
            format: package.format.clone(),
            status: status.as_ref().copied().unwrap_or_default(),
            create_time: Utc::now(),
        },
    );

    if let Err(e) = status {
        artifact.problems.push(e.to_string());
    }

    artifact
}
