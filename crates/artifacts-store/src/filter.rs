//! Read-side filtering shared by `list` and `changes`

use artifacts_common::{Artifact, ArtifactId, Status};
use serde::{Deserialize, Serialize};

/// Status partitions plus namespace/package substring filters, AND-ed.
///
/// An empty substring matches everything. An empty status list means
/// `Published` only; use [`ArtifactFilter::all_statuses`] to scan every
/// partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFilter {
    pub statuses: Vec<Status>,
    pub namespace: String,
    pub package: String,
}

impl ArtifactFilter {
    pub fn new(
        statuses: impl IntoIterator<Item = Status>,
        namespace: impl Into<String>,
        package: impl Into<String>,
    ) -> Self {
        Self {
            statuses: statuses.into_iter().collect(),
            namespace: namespace.into(),
            package: package.into(),
        }
    }

    pub fn all_statuses() -> Self {
        Self::new(Status::ALL, "", "")
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Partitions to scan, without duplicates, in request order.
    pub fn effective_statuses(&self) -> Vec<Status> {
        if self.statuses.is_empty() {
            return vec![Status::Published];
        }

        let mut statuses = Vec::with_capacity(self.statuses.len());
        for status in &self.statuses {
            if !statuses.contains(status) {
                statuses.push(*status);
            }
        }
        statuses
    }

    pub fn matches_identity(&self, id: &ArtifactId) -> bool {
        id.namespace.contains(self.namespace.as_str()) && id.package.contains(self.package.as_str())
    }

    pub fn matches(&self, artifact: &Artifact) -> bool {
        self.effective_statuses().contains(&artifact.status()) && self.matches_identity(&artifact.id)
    }
}
