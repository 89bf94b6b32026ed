// Ingestion run configuration

use std::time::Duration;

use artifacts_common::config::{FailurePolicy, Settings, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

use crate::batch::DEFAULT_IDLE_FLUSH;

fn clamp_page_size(page_size: i64) -> usize {
    // in 1..=MAX_PAGE_SIZE after the clamp
    page_size.clamp(1, MAX_PAGE_SIZE) as usize
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Accumulator batch size and version channel capacity, within `1..=MAX_PAGE_SIZE`
    pub page_size: usize,

    /// Repository names never extracted
    pub skip_repositories: Vec<String>,

    /// Idle window before a partial batch is flushed
    pub idle_timeout: Duration,

    /// Reaction to a failed package or version listing
    pub failure_policy: FailurePolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE as usize,
            skip_repositories: Vec::new(),
            idle_timeout: DEFAULT_IDLE_FLUSH,
            failure_policy: FailurePolicy::FailFast,
        }
    }
}

impl OrchestratorConfig {
    /// Create new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the registry page size, skip-list, idle window and failure policy from settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            page_size: clamp_page_size(settings.registry.page_size),
            skip_repositories: settings.ingest.skip_repositories.clone(),
            idle_timeout: Duration::from_secs(settings.ingest.batch_idle_secs),
            failure_policy: settings.ingest.failure_policy,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = clamp_page_size(i64::try_from(page_size).unwrap_or(MAX_PAGE_SIZE));
        self
    }

    /// Add a repository to the skip-list
    pub fn with_skip_repository(mut self, name: impl Into<String>) -> Self {
        self.skip_repositories.push(name.into());
        self
    }

    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn skips(&self, repository: &str) -> bool {
        self.skip_repositories.iter().any(|skip| skip == repository)
    }
}
