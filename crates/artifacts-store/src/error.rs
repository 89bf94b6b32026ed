//! Store error types

use thiserror::Error;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Storage-layer failure.
///
/// Any of these aborts the enclosing `insert` transaction or fails the
/// whole `list` call. Per-record identity problems are not errors; they are
/// attached to the record instead.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to encode payload for {id}: {source}")]
    Encode {
        id: String,
        #[source]
        source: bincode::Error,
    },

    #[error("Malformed key in partition {partition}: {reason}")]
    MalformedKey { partition: String, reason: String },

    #[error("Malformed value for {id} in partition {partition}: {source}")]
    MalformedValue {
        partition: String,
        id: String,
        #[source]
        source: bincode::Error,
    },

    #[error("Malformed row: {0}")]
    MalformedRow(String),

    #[error("Embedded store error: {0}")]
    Embedded(#[from] redb::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
