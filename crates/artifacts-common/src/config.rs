//! Configuration management
//!
//! Settings come from the process environment (a `.env` file is honoured)
//! with the defaults below.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ArtifactsError, Result};

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default registry region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Default registry page size, also the accumulator batch size.
pub const DEFAULT_PAGE_SIZE: i64 = 100;

/// Largest page the registry accepts, also the largest batch.
pub const MAX_PAGE_SIZE: i64 = 1000;

/// Default idle window after which a partial batch is flushed.
pub const DEFAULT_BATCH_IDLE_SECS: u64 = 5;

/// Default path of the embedded store file.
pub const DEFAULT_STORE_PATH: &str = "./artifacts.redb";

/// Default database URL for the relational backend.
pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/artifacts";

/// Default maximum connections in the relational backend pool.
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

/// How the orchestrator reacts to a failed package or version listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Abort the whole run on the first listing failure
    #[default]
    FailFast,
    /// Record the failed unit, keep whatever pages were fetched, continue
    Isolate,
}

impl std::str::FromStr for FailurePolicy {
    type Err = ArtifactsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "fail-fast" | "failfast" => Ok(FailurePolicy::FailFast),
            "isolate" => Ok(FailurePolicy::Isolate),
            other => Err(ArtifactsError::Config(format!(
                "Invalid failure policy: {}. Must be 'fail-fast' or 'isolate'",
                other
            ))),
        }
    }
}

/// Which persistence implementation backs the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Single-file embedded key-value store
    #[default]
    Embedded,
    /// Networked PostgreSQL database
    Postgres,
}

impl std::str::FromStr for StoreBackend {
    type Err = ArtifactsError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "embedded" | "redb" => Ok(StoreBackend::Embedded),
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            other => Err(ArtifactsError::Config(format!(
                "Invalid store backend: {}. Must be 'embedded' or 'postgres'",
                other
            ))),
        }
    }
}

/// Top-level settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    pub registry: RegistrySettings,
    pub ingest: IngestSettings,
    pub store: StoreConfig,
}

/// Registry connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrySettings {
    pub domain: String,
    pub domain_owner: Option<String>,
    pub region: String,
    pub page_size: i64,
}

/// Ingestion run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSettings {
    /// Repository names never extracted
    pub skip_repositories: Vec<String>,
    pub batch_idle_secs: u64,
    pub failure_policy: FailurePolicy,
}

/// Store settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub path: PathBuf,
    pub database_url: String,
    pub max_connections: u32,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            domain: String::new(),
            domain_owner: None,
            region: DEFAULT_REGION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            skip_repositories: Vec::new(),
            batch_idle_secs: DEFAULT_BATCH_IDLE_SECS,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Embedded,
            path: PathBuf::from(DEFAULT_STORE_PATH),
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
        }
    }
}

impl StoreConfig {
    pub fn embedded(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::Embedded,
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn postgres(database_url: impl Into<String>) -> Self {
        Self {
            backend: StoreBackend::Postgres,
            database_url: database_url.into(),
            ..Self::default()
        }
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| ArtifactsError::Config(format!("{}: {}", name, e))),
        _ => Ok(None),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Settings {
    /// Load settings from environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Settings::default();

        let settings = Settings {
            registry: RegistrySettings {
                domain: std::env::var("ARTIFACTS_DOMAIN").unwrap_or_default(),
                domain_owner: std::env::var("ARTIFACTS_DOMAIN_OWNER")
                    .ok()
                    .filter(|s| !s.trim().is_empty()),
                region: std::env::var("ARTIFACTS_REGION")
                    .unwrap_or_else(|_| DEFAULT_REGION.to_string()),
                page_size: env_parse("ARTIFACTS_PAGE_SIZE")?.unwrap_or(DEFAULT_PAGE_SIZE),
            },
            ingest: IngestSettings {
                skip_repositories: std::env::var("ARTIFACTS_SKIP_REPOS")
                    .map(|raw| split_list(&raw))
                    .unwrap_or_default(),
                batch_idle_secs: env_parse("ARTIFACTS_BATCH_IDLE_SECS")?
                    .unwrap_or(DEFAULT_BATCH_IDLE_SECS),
                failure_policy: env_parse("ARTIFACTS_FAILURE_POLICY")?
                    .unwrap_or(defaults.ingest.failure_policy),
            },
            store: StoreConfig {
                backend: env_parse("ARTIFACTS_STORE_BACKEND")?.unwrap_or(defaults.store.backend),
                path: std::env::var("ARTIFACTS_STORE_PATH")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.store.path),
                database_url: std::env::var("DATABASE_URL")
                    .unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string()),
                max_connections: env_parse("ARTIFACTS_DB_MAX_CONNECTIONS")?
                    .unwrap_or(DEFAULT_DATABASE_MAX_CONNECTIONS),
            },
        };

        settings.validate()?;

        tracing::debug!(settings = ?settings, "Loaded settings");

        Ok(settings)
    }

    /// Validate settings that are required regardless of the command run
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.registry.page_size) {
            return Err(ArtifactsError::Config(format!(
                "ARTIFACTS_PAGE_SIZE must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.registry.page_size
            )));
        }

        if self.ingest.batch_idle_secs == 0 {
            return Err(ArtifactsError::Config(
                "ARTIFACTS_BATCH_IDLE_SECS must be greater than 0".to_string(),
            ));
        }

        match self.store.backend {
            StoreBackend::Embedded if self.store.path.as_os_str().is_empty() => {
                return Err(ArtifactsError::Config(
                    "ARTIFACTS_STORE_PATH cannot be empty".to_string(),
                ));
            },
            StoreBackend::Postgres if self.store.database_url.is_empty() => {
                return Err(ArtifactsError::Config("DATABASE_URL cannot be empty".to_string()));
            },
            StoreBackend::Postgres if self.store.max_connections == 0 => {
                return Err(ArtifactsError::Config(
                    "ARTIFACTS_DB_MAX_CONNECTIONS must be greater than 0".to_string(),
                ));
            },
            _ => {},
        }

        Ok(())
    }

    /// Validate settings needed to talk to the registry
    pub fn require_registry(&self) -> Result<()> {
        if self.registry.domain.trim().is_empty() {
            return Err(ArtifactsError::Config(
                "ARTIFACTS_DOMAIN must be set to import from the registry".to_string(),
            ));
        }
        Ok(())
    }
}
