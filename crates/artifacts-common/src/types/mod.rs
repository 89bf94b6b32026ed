//! Artifact domain types
//!
//! An [`Artifact`] is one versioned unit published to a registry. Its
//! identity ([`ArtifactId`]) is the physical key in the store, its payload
//! ([`ArtifactData`]) is what gets stored under that key, and its
//! [`Status`] names the partition it lives in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ArtifactsError, ValidationError};

// ============================================================================
// Status
// ============================================================================

/// Package version status as reported by the registry.
///
/// Each status is its own storage partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Status {
    #[default]
    Published,
    Unfinished,
    Unlisted,
    Archived,
    Disposed,
    Deleted,
}

impl Status {
    /// Every status, in partition iteration order.
    pub const ALL: [Status; 6] = [
        Status::Published,
        Status::Unfinished,
        Status::Unlisted,
        Status::Archived,
        Status::Disposed,
        Status::Deleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Published => "Published",
            Status::Unfinished => "Unfinished",
            Status::Unlisted => "Unlisted",
            Status::Archived => "Archived",
            Status::Disposed => "Disposed",
            Status::Deleted => "Deleted",
        }
    }
}

impl std::str::FromStr for Status {
    type Err = ArtifactsError;

    /// Case-insensitive; the registry reports `Published`, the CLI accepts `published`.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Status::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ArtifactsError::UnknownStatus(s.to_string()))
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Identity
// ============================================================================

/// Composite natural identity of an artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId {
    pub namespace: String,
    pub package: String,
    pub version: String,
}

impl ArtifactId {
    pub fn new(
        namespace: impl Into<String>,
        package: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            package: package.into(),
            version: version.into(),
        }
    }

    /// Check every identity constraint and report all violations at once.
    ///
    /// Components must be non-blank and must not contain NUL, which the
    /// store uses as its key separator.
    pub fn validate(&self) -> std::result::Result<(), ValidationError> {
        let mut violations = Vec::new();

        for (field, value) in [
            ("namespace", &self.namespace),
            ("package", &self.package),
            ("version", &self.version),
        ] {
            if value.trim().is_empty() {
                violations.push(format!("{} must not be blank", field));
            } else if value.contains('\0') {
                violations.push(format!("{} must not contain NUL", field));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::new(violations))
        }
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.namespace, self.package, self.version)
    }
}

// ============================================================================
// Payload
// ============================================================================

/// The non-identity payload stored under an [`ArtifactId`].
///
/// Field order is part of the stored value format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactData {
    pub repository: String,
    pub revision: String,
    pub domain_name: String,
    pub format: String,
    pub status: Status,
    /// Set once at normalization, never mutated
    pub create_time: DateTime<Utc>,
}

/// An artifact record flowing through ingestion.
///
/// `problems` is only populated when validation or persistence rejected
/// the record; such a record is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(flatten)]
    pub id: ArtifactId,

    #[serde(flatten)]
    pub data: ArtifactData,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,
}

impl Artifact {
    pub fn new(id: ArtifactId, data: ArtifactData) -> Self {
        Self {
            id,
            data,
            problems: Vec::new(),
        }
    }

    pub fn status(&self) -> Status {
        self.data.status
    }

    pub fn is_rejected(&self) -> bool {
        !self.problems.is_empty()
    }

    /// Attach every violation of a failed validation to this record.
    pub fn reject(&mut self, error: ValidationError) {
        self.problems.extend(error.violations);
    }
}
