//! HTTP client for the product catalog API
//!
//! [`PivnetClient`] implements [`CatalogClient`] against the v2 REST API with
//! token authentication, rate limiting and retries.
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `auth`: legacy token and UAA refresh token handling
//! - `http`: request execution with rate limiting and backoff
//! - `download`: streaming file bodies into a sink

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};
use url::Url;

use crate::app::catalog::CatalogClient;
use crate::app::models::{ArtifactFile, Release};
use crate::constants::catalog;
use crate::errors::{CatalogError, CatalogResult};

pub mod auth;
pub mod config;
pub mod download;
pub mod http;

pub use config::ClientConfig;

use auth::AuthHandler;
use http::{CatalogRequest, HttpHandler};

#[derive(Debug, Deserialize)]
struct ReleasesResponse {
    #[serde(default)]
    releases: Vec<ApiRelease>,
}

#[derive(Debug, Deserialize)]
struct ApiRelease {
    id: u64,
    version: String,
}

#[derive(Debug, Deserialize)]
struct ProductFilesResponse {
    #[serde(default)]
    product_files: Vec<ApiProductFile>,
}

#[derive(Debug, Deserialize)]
struct FileGroupsResponse {
    #[serde(default)]
    file_groups: Vec<ApiFileGroup>,
}

#[derive(Debug, Deserialize)]
struct ApiFileGroup {
    #[serde(default)]
    product_files: Vec<ApiProductFile>,
}

#[derive(Debug, Deserialize)]
struct ApiProductFile {
    id: u64,
    #[serde(default)]
    name: String,
    #[serde(default)]
    aws_object_key: String,
    #[serde(default)]
    file_type: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    sha256: Option<String>,
}

impl ApiProductFile {
    /// Installable software, or anything backed by an object in storage
    fn is_downloadable(&self) -> bool {
        self.file_type == catalog::SOFTWARE_FILE_TYPE || !self.aws_object_key.is_empty()
    }

    fn into_artifact(self) -> ArtifactFile {
        ArtifactFile {
            id: self.id,
            name: self.name,
            aws_object_key: self.aws_object_key,
            size: self.size,
            sha256: self.sha256.filter(|digest| !digest.trim().is_empty()),
        }
    }
}

/// Merge release files with file-group files, keeping downloadable ones
fn collect_artifacts(
    files: Vec<ApiProductFile>,
    groups: Vec<ApiFileGroup>,
) -> Vec<ArtifactFile> {
    files
        .into_iter()
        .chain(groups.into_iter().flat_map(|group| group.product_files))
        .filter(ApiProductFile::is_downloadable)
        .map(ApiProductFile::into_artifact)
        .collect()
}

/// Catalog API client
#[derive(Debug)]
pub struct PivnetClient {
    http_handler: HttpHandler,
    auth: AuthHandler,
    base_url: Url,
    config: ClientConfig,
}

impl PivnetClient {
    /// Creates a client for `token` using `config`
    ///
    /// No request is made until the first catalog call.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the token is empty, the host is not a valid
    /// URL, or the HTTP client cannot be built
    pub fn new(config: ClientConfig, token: &str) -> CatalogResult<Self> {
        let auth = AuthHandler::new(token)?;
        let base_url = Url::parse(&config.host).map_err(|e| CatalogError::InvalidUrl {
            url: config.host.clone(),
            error: e.to_string(),
        })?;
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps, config.max_retries)?;

        info!("Created catalog client for {}", base_url);

        Ok(Self {
            http_handler,
            auth,
            base_url,
            config,
        })
    }

    /// Catalog host this client talks to
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> CatalogResult<Url> {
        let full = format!("{}{}", catalog::PRODUCTS_PATH, path);
        self.base_url
            .join(&full)
            .map_err(|e| CatalogError::InvalidUrl {
                url: full,
                error: e.to_string(),
            })
    }

    async fn authorization(&self) -> CatalogResult<String> {
        self.auth
            .authorization_header(self.http_handler.client(), &self.base_url)
            .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> CatalogResult<T> {
        let url = self.api_url(path)?;
        let authorization = self.authorization().await?;
        self.http_handler
            .execute_json(&CatalogRequest {
                method: Method::GET,
                url: &url,
                authorization: &authorization,
                timeout: self.config.request_timeout,
            })
            .await
    }
}

#[async_trait]
impl CatalogClient for PivnetClient {
    async fn list_releases(&self, product_slug: &str) -> CatalogResult<Vec<Release>> {
        let response: ReleasesResponse = self
            .get_json(&format!("/{}/releases", product_slug))
            .await?;

        debug!(
            "Catalog lists {} releases for {}",
            response.releases.len(),
            product_slug
        );
        Ok(response
            .releases
            .into_iter()
            .map(|r| Release::new(r.id, r.version))
            .collect())
    }

    async fn list_files(
        &self,
        product_slug: &str,
        release_id: u64,
    ) -> CatalogResult<Vec<ArtifactFile>> {
        let files: ProductFilesResponse = self
            .get_json(&format!(
                "/{}/releases/{}/product_files",
                product_slug, release_id
            ))
            .await?;

        // Some products only publish files through groups; the endpoint is optional.
        let groups = match self
            .get_json::<FileGroupsResponse>(&format!(
                "/{}/releases/{}/file_groups",
                product_slug, release_id
            ))
            .await
        {
            Ok(groups) => groups.file_groups,
            Err(e) => {
                warn!("Ignoring file groups for release {}: {}", release_id, e);
                Vec::new()
            }
        };

        let artifacts = collect_artifacts(files.product_files, groups);
        debug!(
            "Release {} of {} has {} downloadable files",
            release_id,
            product_slug,
            artifacts.len()
        );
        Ok(artifacts)
    }

    async fn accept_eula(&self, product_slug: &str, release_id: u64) -> CatalogResult<()> {
        let url = self.api_url(&format!(
            "/{}/releases/{}/pivnet_resource_eula_acceptance",
            product_slug, release_id
        ))?;
        let authorization = self.authorization().await?;

        self.http_handler
            .execute(&CatalogRequest {
                method: Method::POST,
                url: &url,
                authorization: &authorization,
                timeout: self.config.request_timeout,
            })
            .await?;

        info!("Accepted EULA for {} release {}", product_slug, release_id);
        Ok(())
    }

    async fn download(
        &self,
        product_slug: &str,
        release_id: u64,
        file_id: u64,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> CatalogResult<u64> {
        let url = self.api_url(&format!(
            "/{}/releases/{}/product_files/{}/download",
            product_slug, release_id, file_id
        ))?;
        let authorization = self.authorization().await?;

        // The API answers with a redirect to object storage.
        let response = self
            .http_handler
            .execute(&CatalogRequest {
                method: Method::POST,
                url: &url,
                authorization: &authorization,
                timeout: self.config.download_timeout,
            })
            .await?;

        download::stream_to_sink(response, sink).await
    }
}
