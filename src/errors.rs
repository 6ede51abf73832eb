//! Error types for Tile Fetcher
//!
//! This module defines the error types for every component of the download
//! pipeline. Each component has its own error enum; [`AppError`] wraps them all
//! and exposes a stable [`ErrorKind`] so callers can branch on the failure
//! class without matching on individual variants or message text.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Version resolution errors
#[derive(Error, Debug)]
pub enum ResolveError {
    /// No release version equals or starts with the specifier
    #[error("No releases found matching version {specifier}")]
    NoMatchingRelease { specifier: String },

    /// Several releases match and no prompt is allowed
    #[error(
        "Multiple releases match version {specifier} ({}). Use an exact version string in non-interactive mode",
        candidates.join(", ")
    )]
    Ambiguous {
        specifier: String,
        candidates: Vec<String>,
    },
}

/// Product file selection errors
#[derive(Error, Debug)]
pub enum SelectionError {
    /// The release publishes no downloadable files
    #[error("No product files found for release {version}")]
    NoFiles { version: String },

    /// The requested file name is not part of the release
    #[error("Product file '{name}' not found. Available: {}", available.join(", "))]
    FileNotFound {
        name: String,
        available: Vec<String>,
    },

    /// Several files are available and no prompt is allowed
    #[error("Release {version} has {count} product files. Use --product-file to pick one")]
    AmbiguousFile { version: String, count: usize },

    /// Neither the object key nor the display name yields a usable file name
    #[error("Product file '{name}' has no usable local file name")]
    InvalidFileName { name: String },
}

/// Human interaction errors
#[derive(Error, Debug)]
pub enum InteractionError {
    /// A prompt was requested while running non-interactively
    #[error("Interactive input required but running in non-interactive mode: {prompt}")]
    NonInteractive { prompt: String },

    /// No options were offered to choose from
    #[error("Nothing to select for: {prompt}")]
    NoOptions { prompt: String },

    /// The answer is outside the offered options
    #[error("Selection {index} is out of range (1-{len})")]
    InvalidChoice { index: usize, len: usize },

    /// A scripted interaction ran out of canned answers
    #[error("No scripted answer left for: {prompt}")]
    Exhausted { prompt: String },

    /// Terminal I/O failed
    #[error("Terminal I/O error")]
    Io(#[from] std::io::Error),
}

/// Remote catalog errors
#[derive(Error, Debug)]
pub enum CatalogError {
    /// HTTP request error
    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),

    /// Server returned error status
    #[error("Catalog server error: HTTP {status} for {url}")]
    ServerError { status: u16, url: String },

    /// Token rejected or missing
    #[error("Catalog rejected the API token (HTTP {status}). Check PIVNET_TOKEN")]
    Unauthorized { status: u16 },

    /// Resource does not exist upstream
    #[error("Not found in catalog: {resource}")]
    NotFound { resource: String },

    /// The API token is empty
    #[error("Catalog API token is empty. Set PIVNET_TOKEN or pass --pivnet-token")]
    MissingToken,

    /// Invalid URL built from configuration
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Response body was not the expected JSON
    #[error("Unexpected catalog response: {reason}")]
    Decode { reason: String },

    /// Rate limit exceeded
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded,

    /// Maximum retries exceeded
    #[error("Maximum retry attempts ({max_retries}) exceeded for catalog request")]
    MaxRetriesExceeded { max_retries: u32 },

    /// Writing the streamed body failed
    #[error("Failed to write downloaded data")]
    Sink(#[from] std::io::Error),
}

/// Manifest and ledger persistence errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Directory for a store file could not be created
    #[error("Cannot create directory {path}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading a store file failed
    #[error("Failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing a store file failed
    #[error("Failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A store file is not valid JSON
    #[error("Corrupted store file {path}")]
    Corrupted {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serializing the in-memory map failed
    #[error("Failed to serialize store contents")]
    Serialize(#[from] serde_json::Error),

    /// Deleting an evicted file failed
    #[error("Failed to remove cached file {path}")]
    RemoveFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Free-space query errors
#[derive(Error, Debug)]
pub enum DiskSpaceError {
    /// Neither the path nor any ancestor exists
    #[error("No existing directory found in path hierarchy of {path}")]
    NoExistingAncestor { path: PathBuf },

    /// The platform query failed
    #[error("Failed to check disk space for {path}")]
    Query {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Transfer and commit errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// EULA has not been accepted and cannot be accepted here
    #[error("EULA not accepted for {product} {version}. Review {eula_url} and re-run with --accept-eula")]
    EulaNotAccepted {
        product: String,
        version: String,
        eula_url: String,
    },

    /// Not enough space even after evicting old cache entries
    #[error("Insufficient disk space even after cleanup. Required: {required} bytes, available: {available} bytes")]
    InsufficientSpace { required: u64, available: u64 },

    /// File size mismatch
    #[error("File size mismatch. Expected: {expected} bytes, got: {actual} bytes")]
    SizeMismatch { expected: u64, actual: u64 },

    /// SHA-256 digest mismatch
    #[error("Checksum mismatch. Expected: {expected}, got: {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// Atomic file operation failed
    #[error("Atomic file operation failed: could not rename {temp_path} to {final_path}")]
    AtomicOperationFailed {
        temp_path: PathBuf,
        final_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Cancellation was requested
    #[error("Download cancelled")]
    Cancelled,

    /// I/O error during file operations
    #[error("File I/O error")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Writing a configuration file failed
    #[error("Failed to serialize configuration")]
    Serialize(#[from] toml::ser::Error),

    /// Home directory could not be determined
    #[error("Cannot determine the home directory for default paths")]
    NoHomeDirectory,

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Stable failure classes reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AmbiguousSelection,
    EulaNotAccepted,
    InsufficientSpace,
    Integrity,
    Persistence,
    Catalog,
    Interaction,
    Cancelled,
    Config,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::AmbiguousSelection => "ambiguous_selection",
            ErrorKind::EulaNotAccepted => "eula_not_accepted",
            ErrorKind::InsufficientSpace => "insufficient_space",
            ErrorKind::Integrity => "integrity",
            ErrorKind::Persistence => "persistence",
            ErrorKind::Catalog => "catalog",
            ErrorKind::Interaction => "interaction",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Config => "config",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Version resolution error
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// File selection error
    #[error(transparent)]
    Selection(#[from] SelectionError),

    /// Interaction error
    #[error(transparent)]
    Interaction(#[from] InteractionError),

    /// Catalog client error
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Manifest or ledger error
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Disk space query error
    #[error(transparent)]
    DiskSpace(#[from] DiskSpaceError),

    /// Transfer error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Stable failure class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Resolve(ResolveError::NoMatchingRelease { .. })
            | AppError::Selection(SelectionError::NoFiles { .. })
            | AppError::Selection(SelectionError::FileNotFound { .. }) => ErrorKind::NotFound,

            AppError::Resolve(ResolveError::Ambiguous { .. })
            | AppError::Selection(SelectionError::AmbiguousFile { .. }) => {
                ErrorKind::AmbiguousSelection
            }

            AppError::Download(DownloadError::EulaNotAccepted { .. }) => ErrorKind::EulaNotAccepted,
            AppError::Download(DownloadError::InsufficientSpace { .. }) => {
                ErrorKind::InsufficientSpace
            }
            AppError::Download(DownloadError::SizeMismatch { .. })
            | AppError::Download(DownloadError::ChecksumMismatch { .. }) => ErrorKind::Integrity,
            AppError::Download(DownloadError::Cancelled) => ErrorKind::Cancelled,
            AppError::Download(DownloadError::AtomicOperationFailed { .. })
            | AppError::Download(DownloadError::Io(_)) => ErrorKind::Io,

            AppError::Persistence(_) => ErrorKind::Persistence,
            AppError::Catalog(_) | AppError::Selection(SelectionError::InvalidFileName { .. }) => {
                ErrorKind::Catalog
            }
            AppError::Interaction(_) => ErrorKind::Interaction,
            AppError::DiskSpace(_) | AppError::Io(_) => ErrorKind::Io,
            AppError::Config(_) | AppError::Generic { .. } => ErrorKind::Config,
        }
    }

    /// Remediation hint for the user, if one applies
    pub fn remediation(&self) -> Option<String> {
        match self {
            AppError::Download(DownloadError::EulaNotAccepted { eula_url, .. }) => Some(format!(
                "Review the EULA at {} and re-run with --accept-eula",
                eula_url
            )),
            AppError::Resolve(ResolveError::Ambiguous { candidates, .. }) => {
                candidates.first().map(|latest| {
                    format!("Pass an exact version string, for example {}", latest)
                })
            }
            AppError::Selection(SelectionError::AmbiguousFile { .. })
            | AppError::Selection(SelectionError::FileNotFound { .. }) => {
                Some("Pass the exact file name with --product-file".to_string())
            }
            AppError::Download(DownloadError::InsufficientSpace { required, .. }) => Some(format!(
                "Free at least {} bytes or point --cache-dir at a larger volume",
                required
            )),
            AppError::Catalog(CatalogError::Unauthorized { .. })
            | AppError::Catalog(CatalogError::MissingToken) => {
                Some("Set PIVNET_TOKEN or pass --pivnet-token".to_string())
            }
            AppError::Interaction(InteractionError::NonInteractive { .. }) => {
                Some("Supply the choice up front or drop --non-interactive".to_string())
            }
            _ => None,
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Catalog(CatalogError::Http(_))
            | AppError::Catalog(CatalogError::RateLimitExceeded)
            | AppError::Catalog(CatalogError::MaxRetriesExceeded { .. })
            | AppError::Download(DownloadError::InsufficientSpace { .. }) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Resolve(_) => "resolve",
            AppError::Selection(_) => "selection",
            AppError::Interaction(_) => "interaction",
            AppError::Catalog(_) => "catalog",
            AppError::Persistence(_) => "persistence",
            AppError::DiskSpace(_) => "disk_space",
            AppError::Download(_) => "download",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Catalog result type alias
pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

/// Persistence result type alias
pub type PersistenceResult<T> = std::result::Result<T, PersistenceError>;

/// Disk space result type alias
pub type DiskSpaceResult<T> = std::result::Result<T, DiskSpaceError>;

/// Interaction result type alias
pub type InteractionResult<T> = std::result::Result<T, InteractionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let err = AppError::from(ResolveError::NoMatchingRelease {
            specifier: "9.9".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let err = AppError::from(SelectionError::AmbiguousFile {
            version: "10.2.5".to_string(),
            count: 3,
        });
        assert_eq!(err.kind(), ErrorKind::AmbiguousSelection);

        let err = AppError::from(DownloadError::SizeMismatch {
            expected: 10,
            actual: 4,
        });
        assert_eq!(err.kind(), ErrorKind::Integrity);
        assert_eq!(err.category(), "download");
    }

    #[test]
    fn test_eula_remediation_names_url_and_flag() {
        let err = AppError::from(DownloadError::EulaNotAccepted {
            product: "cf".to_string(),
            version: "10.2.5".to_string(),
            eula_url: "https://network.pivotal.io/products/cf/releases/42".to_string(),
        });

        assert_eq!(err.kind(), ErrorKind::EulaNotAccepted);
        let hint = err.remediation().unwrap();
        assert!(hint.contains("https://network.pivotal.io/products/cf/releases/42"));
        assert!(hint.contains("--accept-eula"));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = ResolveError::Ambiguous {
            specifier: "6.0".to_string(),
            candidates: vec!["6.0.22".to_string(), "6.0.21".to_string()],
        };
        let message = err.to_string();
        assert!(message.contains("6.0.22, 6.0.21"));

        let app_err = AppError::from(err);
        assert_eq!(
            app_err.remediation().as_deref(),
            Some("Pass an exact version string, for example 6.0.22")
        );
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(AppError::from(CatalogError::RateLimitExceeded).is_recoverable());
        assert!(AppError::from(DownloadError::InsufficientSpace {
            required: 10,
            available: 4,
        })
        .is_recoverable());

        let invalid_name = AppError::from(SelectionError::InvalidFileName {
            name: "..".to_string(),
        });
        assert!(!invalid_name.is_recoverable());
        assert_eq!(invalid_name.kind(), ErrorKind::Catalog);
        assert!(!AppError::from(ResolveError::NoMatchingRelease {
            specifier: "9.9".to_string(),
        })
        .is_recoverable());
        assert!(!AppError::from(DownloadError::Cancelled).is_recoverable());
    }

    #[test]
    fn test_error_kind_display() {
        assert_eq!(ErrorKind::InsufficientSpace.to_string(), "insufficient_space");
        assert_eq!(ErrorKind::Persistence.to_string(), "persistence");
    }
}
