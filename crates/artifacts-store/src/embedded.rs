//! Embedded single-file backend
//!
//! One redb table per status. Keys are the canonical identity encoding from
//! [`crate::key`], values are bincode-encoded [`ArtifactData`]. Tables are
//! created lazily by the first write into that status.

use std::path::Path;
use std::sync::Arc;

use artifacts_common::config::StoreBackend;
use artifacts_common::{Artifact, ArtifactData, Status};
use async_trait::async_trait;
use futures::stream::BoxStream;
use redb::{Database, ReadableTable, TableDefinition, TableError};
use tracing::{debug, info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::feed::ChangeFeed;
use crate::filter::ArtifactFilter;
use crate::key::{decode_key, encode_key};
use crate::validate::screen;
use crate::ArtifactStore;

type Partition = TableDefinition<'static, &'static [u8], &'static [u8]>;

fn partition(status: Status) -> Partition {
    TableDefinition::new(status.as_str())
}

/// redb-backed [`ArtifactStore`].
///
/// redb serialises write transactions itself, so concurrent `insert` calls
/// on a shared handle are safe; a `list` sees the last committed state.
#[derive(Clone)]
pub struct EmbeddedStore {
    db: Arc<Database>,
    feed: ChangeFeed,
}

impl EmbeddedStore {
    /// Open the store file, creating it if missing.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        let db = Database::create(path).map_err(redb::Error::from)?;

        info!(path = %path.display(), "Opened embedded artifact store");

        Ok(Self {
            db: Arc::new(db),
            feed: ChangeFeed::new(),
        })
    }
}

/// Write every unrejected record in one transaction.
///
/// Returning early drops the transaction, which aborts it: either all
/// writes land or none do.
fn write_batch(db: &Database, artifacts: &[Artifact]) -> StoreResult<usize> {
    let txn = db.begin_write().map_err(redb::Error::from)?;
    let mut written = 0;

    for status in Status::ALL {
        let mut records = artifacts
            .iter()
            .filter(|a| !a.is_rejected() && a.status() == status)
            .peekable();

        if records.peek().is_none() {
            continue;
        }

        let mut table = txn.open_table(partition(status)).map_err(redb::Error::from)?;

        for artifact in records {
            let key = encode_key(&artifact.id);
            let value = bincode::serialize(&artifact.data).map_err(|source| StoreError::Encode {
                id: artifact.id.to_string(),
                source,
            })?;

            table
                .insert(key.as_slice(), value.as_slice())
                .map_err(redb::Error::from)?;
            written += 1;
        }
    }

    txn.commit().map_err(redb::Error::from)?;
    Ok(written)
}

/// Decode every pair of every requested partition and keep the matches.
fn read_partitions(db: &Database, filter: &ArtifactFilter) -> StoreResult<Vec<Artifact>> {
    let txn = db.begin_read().map_err(redb::Error::from)?;
    let mut found = Vec::new();

    for status in filter.effective_statuses() {
        let table = match txn.open_table(partition(status)) {
            Ok(table) => table,
            // Nothing has ever been written with this status
            Err(TableError::TableDoesNotExist(_)) => continue,
            Err(e) => return Err(redb::Error::from(e).into()),
        };

        for entry in table.iter().map_err(redb::Error::from)? {
            let (key, value) = entry.map_err(redb::Error::from)?;

            let id = decode_key(key.value()).map_err(|reason| StoreError::MalformedKey {
                partition: status.to_string(),
                reason,
            })?;
            let data: ArtifactData =
                bincode::deserialize(value.value()).map_err(|source| StoreError::MalformedValue {
                    partition: status.to_string(),
                    id: id.to_string(),
                    source,
                })?;

            if filter.matches_identity(&id) {
                found.push(Artifact::new(id, data));
            }
        }
    }

    Ok(found)
}

#[async_trait]
impl ArtifactStore for EmbeddedStore {
    #[instrument(skip_all, fields(records = artifacts.len()))]
    async fn insert(&self, mut artifacts: Vec<Artifact>) -> StoreResult<Vec<Artifact>> {
        if screen(&mut artifacts) == 0 {
            return Ok(artifacts);
        }

        let db = Arc::clone(&self.db);
        let (artifacts, written) = tokio::task::spawn_blocking(move || {
            let written = write_batch(&db, &artifacts)?;
            Ok::<_, StoreError>((artifacts, written))
        })
        .await??;

        debug!(written, "Committed batch");

        self.feed.publish(artifacts.iter().filter(|a| !a.is_rejected()));
        Ok(artifacts)
    }

    async fn list(&self, filter: &ArtifactFilter) -> StoreResult<Vec<Artifact>> {
        let db = Arc::clone(&self.db);
        let filter = filter.clone();

        tokio::task::spawn_blocking(move || read_partitions(&db, &filter)).await?
    }

    fn changes(&self, filter: ArtifactFilter) -> BoxStream<'static, Artifact> {
        self.feed.subscribe(filter)
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Embedded
    }
}
