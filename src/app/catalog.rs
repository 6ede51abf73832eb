//! Remote catalog capability
//!
//! The download pipeline only needs four catalog operations. They are
//! expressed as the [`CatalogClient`] trait so the orchestrator can run
//! against the real HTTP client or a test double.

use async_trait::async_trait;
use tokio::io::AsyncWrite;

use crate::app::models::{ArtifactFile, Release};
use crate::constants::catalog;
use crate::errors::CatalogResult;

/// Operations the download pipeline needs from the catalog
#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// All releases of a product, newest first
    async fn list_releases(&self, product_slug: &str) -> CatalogResult<Vec<Release>>;

    /// Downloadable files attached to a release
    async fn list_files(&self, product_slug: &str, release_id: u64)
        -> CatalogResult<Vec<ArtifactFile>>;

    /// Accept the release's EULA on the user's behalf
    async fn accept_eula(&self, product_slug: &str, release_id: u64) -> CatalogResult<()>;

    /// Stream a file's bytes into `sink`, returning the number of bytes written
    async fn download(
        &self,
        product_slug: &str,
        release_id: u64,
        file_id: u64,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> CatalogResult<u64>;

    /// Page where a human can read and accept the release's EULA
    fn eula_url(&self, product_slug: &str, release_id: u64) -> String {
        eula_url(product_slug, release_id)
    }
}

/// Public EULA page for a release
pub fn eula_url(product_slug: &str, release_id: u64) -> String {
    format!(
        "{}/products/{}/releases/{}",
        catalog::EULA_PAGE_HOST,
        product_slug,
        release_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eula_url() {
        assert_eq!(
            eula_url("cf", 1234),
            "https://network.pivotal.io/products/cf/releases/1234"
        );
    }
}
