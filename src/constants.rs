//! Application constants for Tile Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// Environment variable names
pub mod env {
    /// Catalog API token (legacy or UAA refresh token)
    pub const TOKEN: &str = "PIVNET_TOKEN";

    /// Overrides the download cache directory
    pub const CACHE_DIR: &str = "PIVNET_CACHE_DIR";

    /// Overrides the EULA acceptance ledger path
    pub const EULA_FILE: &str = "PIVNET_EULA_FILE";
}

/// Catalog service URLs and endpoints
pub mod catalog {
    /// Default catalog API host
    pub const DEFAULT_HOST: &str = "https://network.tanzu.vmware.com";

    /// Public EULA page host
    pub const EULA_PAGE_HOST: &str = "https://network.pivotal.io";

    /// Endpoint exchanging a UAA refresh token for an access token
    pub const ACCESS_TOKEN_PATH: &str = "/api/v2/authentication/access_tokens";

    /// Product API prefix
    pub const PRODUCTS_PATH: &str = "/api/v2/products";

    /// Legacy API tokens are exactly this long; longer tokens are UAA refresh tokens
    pub const LEGACY_TOKEN_LENGTH: usize = 20;

    /// File type marking installable software
    pub const SOFTWARE_FILE_TYPE: &str = "Software";
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = "tile-fetcher/0.1.0";

    /// Default HTTP request timeout for API calls
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum number of redirects to follow (downloads redirect to object storage)
    pub const MAX_REDIRECTS: usize = 10;
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Default rate limit for catalog requests (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 5;

    /// Maximum retry attempts for failed requests
    pub const MAX_RETRIES: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;

    /// Maximum backoff delay (milliseconds)
    pub const MAX_BACKOFF_MS: u64 = 30_000;

    /// Jitter factor for randomizing delays (0.0-1.0)
    pub const BACKOFF_JITTER_FACTOR: f64 = 0.1;
}

/// File naming
pub mod files {
    /// Suffix for in-flight downloads
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Cache manifest file name inside the cache directory
    pub const MANIFEST_FILE_NAME: &str = "manifest.json";

    /// EULA ledger file name inside the cache directory
    pub const EULA_FILE_NAME: &str = "eula_acceptance.json";

    /// Application directory under the user's home
    pub const HOME_APP_DIR: &str = ".tile-diff";

    /// Cache subdirectory under the application directory
    pub const CACHE_SUBDIR: &str = "cache";

    /// Configuration directory name under the OS config dir
    pub const CONFIG_DIR_NAME: &str = "tile-fetcher";

    /// Configuration file name
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

/// Cache retention policy
pub mod cache {
    /// Entries older than this are evicted when space runs short
    pub const CLEANUP_MAX_AGE_DAYS: u32 = 7;
}

/// Disk space policy
pub mod disk {
    /// Bytes in one GiB
    pub const BYTES_PER_GIB: u64 = 1024 * 1024 * 1024;

    /// Free space that must remain after a download
    pub const DEFAULT_MIN_FREE_SPACE_GB: u64 = 20;
}

/// Interactive selection
pub mod selection {
    /// File suggested first when a release publishes several
    pub const RECOMMENDED_FILE_NAME: &str = "TAS for VMs";

    /// Marker appended to the newest release in selection lists
    pub const LATEST_MARKER: &str = " (latest)";

    /// Marker appended to the recommended file in selection lists
    pub const RECOMMENDED_MARKER: &str = " [Recommended]";
}

/// Progress display
pub mod progress {
    /// Progress bar template for transfers
    pub const TRANSFER_TEMPLATE: &str =
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, ETA {eta})";

    /// Progress bar characters
    pub const PROGRESS_CHARS: &str = "##-";
}

/// Logging configuration
pub mod logging {
    /// Default log level
    pub const DEFAULT_LEVEL: &str = "warn";

    /// Verbose log level
    pub const VERBOSE_LEVEL: &str = "info";

    /// Very verbose log level
    pub const VERY_VERBOSE_LEVEL: &str = "debug";
}

// Convenience re-exports for commonly used constants
pub use disk::{BYTES_PER_GIB, DEFAULT_MIN_FREE_SPACE_GB};
pub use files::{EULA_FILE_NAME, MANIFEST_FILE_NAME, TEMP_FILE_SUFFIX};
pub use http::USER_AGENT;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disk_constants() {
        assert_eq!(BYTES_PER_GIB, 1_073_741_824);
        assert_eq!(DEFAULT_MIN_FREE_SPACE_GB, 20);
    }

    #[test]
    fn test_file_names() {
        assert_eq!(MANIFEST_FILE_NAME, "manifest.json");
        assert!(TEMP_FILE_SUFFIX.starts_with('.'));
    }

    #[test]
    fn test_retry_limits_are_bounded() {
        assert!(limits::MAX_RETRIES > 0);
        assert!(limits::RETRY_BASE_DELAY_MS <= limits::MAX_BACKOFF_MS);
    }
}
