//! Artifacts Ingest
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Pulls repository, package and version listings from a package registry,
//! normalizes versions into artifact records and writes them to an
//! [`artifacts_store::ArtifactStore`] in bounded batches.
//!
//! # Overview
//!
//! - [`registry`]: the registry capability and its CodeArtifact adapter
//! - [`batch`]: size/idle-time batch accumulator
//! - [`orchestrator`]: the three-level fan-out driving one ingestion run
//! - [`models`]: normalization and the run report
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use artifacts_common::config::StoreConfig;
//! use artifacts_ingest::{CodeArtifactRegistry, IngestOrchestrator, OrchestratorConfig};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let registry = CodeArtifactRegistry::connect("us-east-1", "acme", None, 100).await;
//! let store = artifacts_store::open_store(&StoreConfig::embedded("./artifacts.redb")).await?;
//!
//! let orchestrator = IngestOrchestrator::new(Arc::new(registry), store, OrchestratorConfig::new());
//! let report = orchestrator.run().await?;
//! assert!(report.failures.is_empty());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod registry;

pub use config::OrchestratorConfig;
pub use error::IngestError;
pub use models::{IngestReport, UnitFailure};
pub use orchestrator::IngestOrchestrator;
pub use registry::{CodeArtifactRegistry, RegistryClient, RegistryError};
