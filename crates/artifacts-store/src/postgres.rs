//! PostgreSQL backend
//!
//! Keeps the status-partitioned identity model of the embedded store: the
//! primary key is (status, namespace, package, version), so the same
//! identity under two statuses is two rows, and re-inserting under the same
//! status overwrites the payload.

use std::time::Duration;

use artifacts_common::config::{StoreBackend, StoreConfig};
use artifacts_common::{Artifact, ArtifactData, ArtifactId, Status};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use crate::error::{StoreError, StoreResult};
use crate::feed::ChangeFeed;
use crate::filter::ArtifactFilter;
use crate::validate::screen;
use crate::ArtifactStore;

const CONNECT_TIMEOUT_SECS: u64 = 10;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS artifacts (
        status      TEXT        NOT NULL,
        namespace   TEXT        NOT NULL,
        package     TEXT        NOT NULL,
        version     TEXT        NOT NULL,
        repository  TEXT        NOT NULL,
        revision    TEXT        NOT NULL,
        domain_name TEXT        NOT NULL,
        format      TEXT        NOT NULL,
        create_time TIMESTAMPTZ NOT NULL,
        PRIMARY KEY (status, namespace, package, version)
    )
"#;

const UPSERT: &str = r#"
    INSERT INTO artifacts (
        status, namespace, package, version,
        repository, revision, domain_name, format, create_time
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
    ON CONFLICT (status, namespace, package, version)
    DO UPDATE SET
        repository = EXCLUDED.repository,
        revision = EXCLUDED.revision,
        domain_name = EXCLUDED.domain_name,
        format = EXCLUDED.format,
        create_time = EXCLUDED.create_time
"#;

// strpos(x, '') = 1, so an empty substring matches every row
const SELECT_FILTERED: &str = r#"
    SELECT status, namespace, package, version,
           repository, revision, domain_name, format, create_time
    FROM artifacts
    WHERE status = ANY($1)
      AND strpos(namespace, $2) > 0
      AND strpos(package, $3) > 0
"#;

#[derive(Debug, sqlx::FromRow)]
struct ArtifactRow {
    status: String,
    namespace: String,
    package: String,
    version: String,
    repository: String,
    revision: String,
    domain_name: String,
    format: String,
    create_time: DateTime<Utc>,
}

impl ArtifactRow {
    fn into_artifact(self) -> StoreResult<Artifact> {
        let status: Status = self
            .status
            .parse()
            .map_err(|_| StoreError::MalformedRow(format!("unknown status '{}'", self.status)))?;

        Ok(Artifact::new(
            ArtifactId::new(self.namespace, self.package, self.version),
            ArtifactData {
                repository: self.repository,
                revision: self.revision,
                domain_name: self.domain_name,
                format: self.format,
                status,
                create_time: self.create_time,
            },
        ))
    }
}

/// PostgreSQL-backed [`ArtifactStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    feed: ChangeFeed,
}

impl PgStore {
    /// Connect and make sure the artifacts table exists.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .connect(&config.database_url)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: PgPool) -> StoreResult<Self> {
        sqlx::query(CREATE_TABLE).execute(&pool).await?;

        info!("Connected to PostgreSQL artifact store");

        Ok(Self {
            pool,
            feed: ChangeFeed::new(),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl ArtifactStore for PgStore {
    #[instrument(skip_all, fields(records = artifacts.len()))]
    async fn insert(&self, mut artifacts: Vec<Artifact>) -> StoreResult<Vec<Artifact>> {
        if screen(&mut artifacts) == 0 {
            return Ok(artifacts);
        }

        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for artifact in artifacts.iter().filter(|a| !a.is_rejected()) {
            sqlx::query(UPSERT)
                .bind(artifact.status().as_str())
                .bind(&artifact.id.namespace)
                .bind(&artifact.id.package)
                .bind(&artifact.id.version)
                .bind(&artifact.data.repository)
                .bind(&artifact.data.revision)
                .bind(&artifact.data.domain_name)
                .bind(&artifact.data.format)
                .bind(artifact.data.create_time)
                .execute(&mut *tx)
                .await?;
            written += 1;
        }

        tx.commit().await?;

        debug!(written, "Committed batch");

        self.feed.publish(artifacts.iter().filter(|a| !a.is_rejected()));
        Ok(artifacts)
    }

    async fn list(&self, filter: &ArtifactFilter) -> StoreResult<Vec<Artifact>> {
        let statuses: Vec<String> = filter
            .effective_statuses()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let rows: Vec<ArtifactRow> = sqlx::query_as(SELECT_FILTERED)
            .bind(&statuses)
            .bind(&filter.namespace)
            .bind(&filter.package)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(ArtifactRow::into_artifact).collect()
    }

    fn changes(&self, filter: ArtifactFilter) -> BoxStream<'static, Artifact> {
        self.feed.subscribe(filter)
    }

    fn backend(&self) -> StoreBackend {
        StoreBackend::Postgres
    }
}
