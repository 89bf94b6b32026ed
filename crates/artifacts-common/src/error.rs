//! Error types for artifacts

use thiserror::Error;

/// Result type alias for shared operations
pub type Result<T> = std::result::Result<T, ArtifactsError>;

/// Main error type for shared operations
#[derive(Error, Debug)]
pub enum ArtifactsError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown artifact status: {0}")]
    UnknownStatus(String),
}

/// Malformed artifact identity.
///
/// Lists every violated constraint, not only the first one found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid artifact identity: {}", .violations.join("; "))]
pub struct ValidationError {
    pub violations: Vec<String>,
}

impl ValidationError {
    pub fn new(violations: Vec<String>) -> Self {
        Self { violations }
    }
}
