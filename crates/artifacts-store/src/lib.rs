//! Artifacts Store
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Durable, status-partitioned persistence of artifact records.
//!
//! # Overview
//!
//! - [`ArtifactStore`]: the storage capability (insert, list, changes)
//! - [`EmbeddedStore`]: single-file redb backend, one table per status
//! - [`PgStore`]: PostgreSQL backend, one row per (status, identity)
//! - [`open_store`]: picks a backend from [`StoreConfig`] at startup
//!
//! # Insert semantics
//!
//! 1. Records that already carry problems are skipped.
//! 2. Records with an invalid identity get a problem list and are skipped.
//!    This never aborts the batch.
//! 3. Every remaining record is written under its identity key into its
//!    status partition, all within one transaction. A storage fault rolls
//!    back the whole call and is returned as a [`StoreError`].
//!
//! Re-inserting an identity under the same status overwrites its payload.
//!
//! # Example
//!
//! ```no_run
//! use artifacts_common::config::StoreConfig;
//! use artifacts_store::{open_store, ArtifactFilter};
//!
//! # async fn run() -> Result<(), artifacts_store::StoreError> {
//! let store = open_store(&StoreConfig::embedded("./artifacts.redb")).await?;
//! let clients = store.list(&ArtifactFilter::all_statuses().with_namespace("client")).await?;
//! println!("{} artifacts", clients.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use artifacts_common::config::{StoreBackend, StoreConfig};
use artifacts_common::Artifact;
use async_trait::async_trait;
use futures::stream::BoxStream;

pub mod embedded;
pub mod error;
pub mod feed;
pub mod filter;
pub mod key;
pub mod postgres;
mod validate;

pub use embedded::EmbeddedStore;
pub use error::{StoreError, StoreResult};
pub use filter::ArtifactFilter;
pub use postgres::PgStore;

/// Storage capability shared by every backend.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Validate and upsert a batch in one transaction.
    ///
    /// Returns every input record in input order; rejected ones carry their
    /// problems.
    async fn insert(&self, artifacts: Vec<Artifact>) -> StoreResult<Vec<Artifact>>;

    /// Read every stored record matching `filter`.
    ///
    /// Order is unspecified. A malformed stored record fails the whole call.
    async fn list(&self, filter: &ArtifactFilter) -> StoreResult<Vec<Artifact>>;

    /// Stream records committed by this handle after the call that match `filter`.
    fn changes(&self, filter: ArtifactFilter) -> BoxStream<'static, Artifact>;

    fn backend(&self) -> StoreBackend;
}

/// Open the backend named by `config`.
pub async fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn ArtifactStore>> {
    match config.backend {
        StoreBackend::Embedded => Ok(Arc::new(EmbeddedStore::open(&config.path)?)),
        StoreBackend::Postgres => Ok(Arc::new(PgStore::connect(config).await?)),
    }
}
