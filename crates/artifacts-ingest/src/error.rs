//! Ingestion errors
//!
//! Every variant is fatal to the run that returns it.

use artifacts_store::StoreError;
use thiserror::Error;

use crate::registry::{BoxError, RegistryError};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Registry failure for {unit} ({operation}, {fetched} items fetched): {source}")]
    Registry {
        /// Repository or package whose listing failed
        unit: String,
        operation: &'static str,
        fetched: usize,
        #[source]
        source: BoxError,
    },

    #[error("Store failure while writing {package}: {source}")]
    Store {
        package: String,
        #[source]
        source: StoreError,
    },

    #[error("Producer task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IngestError {
    pub fn registry<T>(unit: impl Into<String>, error: RegistryError<T>) -> Self {
        IngestError::Registry {
            unit: unit.into(),
            operation: error.operation,
            fetched: error.partial.len(),
            source: error.source,
        }
    }
}
