//! AWS CodeArtifact adapter

use artifacts_common::config::MAX_PAGE_SIZE;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_codeartifact::{config::Region, types::PackageFormat, Client};
use tracing::info;

use super::{
    collect_pages, BoxError, Page, PackageSummary, RegistryClient, RegistryResult,
    RepositorySummary, VersionSummary,
};

/// [`RegistryClient`] over one CodeArtifact domain.
#[derive(Clone)]
pub struct CodeArtifactRegistry {
    client: Client,
    domain: String,
    domain_owner: Option<String>,
    page_size: i32,
}

impl CodeArtifactRegistry {
    /// Build a client from the default AWS credential chain.
    pub async fn connect(
        region: impl Into<String>,
        domain: impl Into<String>,
        domain_owner: Option<String>,
        page_size: i64,
    ) -> Self {
        let region = region.into();
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .load()
            .await;

        let domain = domain.into();
        info!(region = %region, domain = %domain, "Connected to CodeArtifact");

        Self::from_client(Client::new(&sdk_config), domain, domain_owner, page_size)
    }

    pub fn from_client(
        client: Client,
        domain: impl Into<String>,
        domain_owner: Option<String>,
        page_size: i64,
    ) -> Self {
        Self {
            client,
            domain: domain.into(),
            domain_owner,
            // in range after the clamp
            page_size: page_size.clamp(1, MAX_PAGE_SIZE) as i32,
        }
    }
}

#[async_trait]
impl RegistryClient for CodeArtifactRegistry {
    async fn list_repositories(&self) -> RegistryResult<RepositorySummary> {
        collect_pages("list repositories", |token| async move {
            let response = self
                .client
                .list_repositories_in_domain()
                .domain(&self.domain)
                .set_domain_owner(self.domain_owner.clone())
                .max_results(self.page_size)
                .set_next_token(token)
                .send()
                .await
                .map_err(BoxError::from)?;

            let items = response
                .repositories()
                .iter()
                .map(|r| RepositorySummary {
                    name: r.name().unwrap_or_default().to_string(),
                    domain_name: r.domain_name().unwrap_or(self.domain.as_str()).to_string(),
                    domain_owner: r.domain_owner().map(str::to_string),
                })
                .collect();

            Ok(Page::new(items, response.next_token().map(str::to_string)))
        })
        .await
    }

    async fn list_packages(&self, repository: &RepositorySummary) -> RegistryResult<PackageSummary> {
        collect_pages("list packages", |token| async move {
            let response = self
                .client
                .list_packages()
                .domain(&self.domain)
                .set_domain_owner(self.domain_owner.clone())
                .repository(&repository.name)
                .max_results(self.page_size)
                .set_next_token(token)
                .send()
                .await
                .map_err(BoxError::from)?;

            let items = response
                .packages()
                .iter()
                .map(|p| PackageSummary {
                    namespace: p.namespace().unwrap_or_default().to_string(),
                    package: p.package().unwrap_or_default().to_string(),
                    format: p.format().map(|f| f.as_str()).unwrap_or_default().to_string(),
                })
                .collect();

            Ok(Page::new(items, response.next_token().map(str::to_string)))
        })
        .await
    }

    async fn list_versions(
        &self,
        package: &PackageSummary,
        repository: &RepositorySummary,
    ) -> RegistryResult<VersionSummary> {
        let namespace = Some(package.namespace.clone()).filter(|ns| !ns.is_empty());

        collect_pages("list package versions", |token| {
            let namespace = namespace.clone();
            async move {
                let response = self
                    .client
                    .list_package_versions()
                    .domain(&self.domain)
                    .set_domain_owner(self.domain_owner.clone())
                    .repository(&repository.name)
                    .format(PackageFormat::from(package.format.as_str()))
                    .set_namespace(namespace)
                    .package(&package.package)
                    .max_results(self.page_size)
                    .set_next_token(token)
                    .send()
                    .await
                    .map_err(BoxError::from)?;

                let items = response
                    .versions()
                    .iter()
                    .map(|v| VersionSummary {
                        version: v.version().to_string(),
                        revision: v.revision().unwrap_or_default().to_string(),
                        status: v.status().as_str().to_string(),
                    })
                    .collect();

                Ok(Page::new(items, response.next_token().map(str::to_string)))
            }
        })
        .await
    }
}
