//! Registry capability
//!
//! Paginated read access to repositories, packages and package versions.
//! Each listing walks the continuation token until it is exhausted and
//! returns every page at once; a failing page yields a [`RegistryError`]
//! that keeps the items from the pages fetched before it.

pub mod codeartifact;

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use codeartifact::CodeArtifactRegistry;

/// Boxed cause of a registry failure
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub name: String,
    pub domain_name: String,
    pub domain_owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub namespace: String,
    pub package: String,
    pub format: String,
}

impl fmt::Display for PackageSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.package)
    }
}

/// One version as reported by the registry; `status` is not yet checked
/// against the known statuses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version: String,
    pub revision: String,
    pub status: String,
}

/// A listing that failed part way through.
#[derive(Debug)]
pub struct RegistryError<T> {
    pub operation: &'static str,
    /// Items from every page fetched before the failure
    pub partial: Vec<T>,
    pub source: BoxError,
}

impl<T> RegistryError<T> {
    pub fn new(operation: &'static str, partial: Vec<T>, source: impl Into<BoxError>) -> Self {
        Self {
            operation,
            partial,
            source: source.into(),
        }
    }
}

impl<T> fmt::Display for RegistryError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed after {} items: {}",
            self.operation,
            self.partial.len(),
            self.source
        )
    }
}

impl<T: fmt::Debug> std::error::Error for RegistryError<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

pub type RegistryResult<T> = Result<Vec<T>, RegistryError<T>>;

/// Read access to a package registry.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    async fn list_repositories(&self) -> RegistryResult<RepositorySummary>;

    async fn list_packages(&self, repository: &RepositorySummary) -> RegistryResult<PackageSummary>;

    async fn list_versions(
        &self,
        package: &PackageSummary,
        repository: &RepositorySummary,
    ) -> RegistryResult<VersionSummary>;
}

/// One page of a listing.
#[derive(Debug)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self { items, next_token }
    }
}

/// Fetch pages until the continuation token runs out.
///
/// `fetch` receives the token of the previous page (`None` for the first).
/// An empty token ends the listing the same way a missing one does.
pub async fn collect_pages<T, F, Fut>(operation: &'static str, mut fetch: F) -> RegistryResult<T>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, BoxError>>,
{
    let mut items = Vec::new();
    let mut token = None;

    loop {
        match fetch(token.take()).await {
            Ok(page) => {
                items.extend(page.items);
                match page.next_token {
                    Some(next) if !next.is_empty() => token = Some(next),
                    _ => return Ok(items),
                }
            },
            Err(source) => return Err(RegistryError::new(operation, items, source)),
        }
    }
}
