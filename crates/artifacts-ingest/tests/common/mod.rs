//! Scripted in-memory registry for orchestrator tests
//!
//! Listings are served through the real pagination helper in pages of
//! [`PAGE_SIZE`], so a failure "at page N" keeps the items of pages
//! `0..N` as the partial result.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use artifacts_common::config::StoreConfig;
use artifacts_ingest::registry::{
    collect_pages, BoxError, Page, PackageSummary, RegistryClient, RegistryResult, RepositorySummary,
    VersionSummary,
};
use artifacts_store::{open_store, ArtifactStore};
use async_trait::async_trait;
use tempfile::TempDir;

pub const PAGE_SIZE: usize = 2;

#[derive(Debug, Clone)]
struct Script<T> {
    items: Vec<T>,
    fail_at_page: Option<usize>,
}

impl<T> Default for Script<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            fail_at_page: None,
        }
    }
}

async fn serve<T: Clone>(operation: &'static str, script: Option<&Script<T>>) -> RegistryResult<T> {
    let script = script.cloned().unwrap_or_default();

    collect_pages(operation, |token| {
        let page: usize = token.and_then(|t| t.parse().ok()).unwrap_or(0);
        let result: Result<Page<T>, BoxError> = if script.fail_at_page == Some(page) {
            Err("registry unavailable".into())
        } else {
            let start = (page * PAGE_SIZE).min(script.items.len());
            let end = (start + PAGE_SIZE).min(script.items.len());
            let next = (end < script.items.len()).then(|| (page + 1).to_string());
            Ok(Page::new(script.items[start..end].to_vec(), next))
        };
        std::future::ready(result)
    })
    .await
}

fn version_key(repository: &str, namespace: &str, package: &str) -> String {
    format!("{}/{}:{}", repository, namespace, package)
}

#[derive(Debug, Default)]
pub struct FakeRegistry {
    repositories: Script<RepositorySummary>,
    packages: HashMap<String, Script<PackageSummary>>,
    versions: HashMap<String, Script<VersionSummary>>,
}

impl FakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repository(mut self, name: &str) -> Self {
        self.repositories.items.push(RepositorySummary {
            name: name.to_string(),
            domain_name: "acme".to_string(),
            domain_owner: None,
        });
        self
    }

    pub fn package(mut self, repository: &str, namespace: &str, package: &str) -> Self {
        self.packages
            .entry(repository.to_string())
            .or_default()
            .items
            .push(PackageSummary {
                namespace: namespace.to_string(),
                package: package.to_string(),
                format: "maven".to_string(),
            });
        self
    }

    pub fn versions<V, S>(
        mut self,
        repository: &str,
        namespace: &str,
        package: &str,
        versions: impl IntoIterator<Item = (V, S)>,
    ) -> Self
    where
        V: ToString,
        S: ToString,
    {
        let script = self
            .versions
            .entry(version_key(repository, namespace, package))
            .or_default();
        for (version, status) in versions {
            let version = version.to_string();
            script.items.push(VersionSummary {
                revision: format!("rev-{}", version),
                version,
                status: status.to_string(),
            });
        }
        self
    }

    pub fn fail_repositories_at_page(mut self, page: usize) -> Self {
        self.repositories.fail_at_page = Some(page);
        self
    }

    pub fn fail_packages_at_page(mut self, repository: &str, page: usize) -> Self {
        self.packages
            .entry(repository.to_string())
            .or_default()
            .fail_at_page = Some(page);
        self
    }

    pub fn fail_versions_at_page(
        mut self,
        repository: &str,
        namespace: &str,
        package: &str,
        page: usize,
    ) -> Self {
        self.versions
            .entry(version_key(repository, namespace, package))
            .or_default()
            .fail_at_page = Some(page);
        self
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn list_repositories(&self) -> RegistryResult<RepositorySummary> {
        serve("list repositories", Some(&self.repositories)).await
    }

    async fn list_packages(&self, repository: &RepositorySummary) -> RegistryResult<PackageSummary> {
        serve("list packages", self.packages.get(&repository.name)).await
    }

    async fn list_versions(
        &self,
        package: &PackageSummary,
        repository: &RepositorySummary,
    ) -> RegistryResult<VersionSummary> {
        let key = version_key(&repository.name, &package.namespace, &package.package);
        serve("list package versions", self.versions.get(&key)).await
    }
}

/// `n` published versions named "1".."n"
pub fn published(n: usize) -> Vec<(String, &'static str)> {
    (1..=n).map(|v| (v.to_string(), "Published")).collect()
}

/// Fresh embedded store in a temporary directory
pub async fn temp_store() -> (TempDir, Arc<dyn ArtifactStore>) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = open_store(&StoreConfig::embedded(dir.path().join("artifacts.redb")))
        .await
        .expect("Failed to open store");
    (dir, store)
}
