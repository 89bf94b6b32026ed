//! Artifacts Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, settings, logging and error handling for the artifact
//! metadata workspace.
//!
//! # Overview
//!
//! - **Types**: artifact identity, payload and status partitions
//! - **Error Handling**: the shared error type and identity validation errors
//! - **Settings**: environment-driven configuration for registry, ingestion and store
//! - **Logging**: `tracing` subscriber initialisation
//!
//! # Example
//!
//! ```no_run
//! use artifacts_common::types::{ArtifactId, Status};
//!
//! let id = ArtifactId::new("client", "of.a.service", "1");
//! assert!(id.validate().is_ok());
//! assert_eq!(Status::default(), Status::Published);
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{ArtifactsError, Result, ValidationError};
pub use types::{Artifact, ArtifactData, ArtifactId, Status};
