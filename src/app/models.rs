//! Data models for catalog releases and download requests
//!
//! This module contains the value types exchanged between the catalog client,
//! the version resolver and the download orchestrator.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::SelectionError;

/// A named, versioned publication of a product in the catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Catalog identifier for the release
    pub id: u64,
    /// Version string as published (e.g. "10.2.5" or "6.0.22+LTS-T")
    pub version: String,
}

impl Release {
    /// Create a new release value
    pub fn new(id: u64, version: impl Into<String>) -> Self {
        Self {
            id,
            version: version.into(),
        }
    }
}

/// One downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    /// Catalog identifier for the file
    pub id: u64,
    /// Display name (e.g. "TAS for VMs")
    pub name: String,
    /// Object storage key; its basename becomes the local file name
    pub aws_object_key: String,
    /// Size in bytes as reported by the catalog
    pub size: u64,
    /// Hex encoded SHA-256 digest when the catalog publishes one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl ArtifactFile {
    /// Local file name derived from the object key
    ///
    /// Falls back to the basename of the display name when the key has none.
    /// Only the final path component is ever used, so the result always stays
    /// inside the directory it is joined onto.
    pub fn storage_file_name(&self) -> Result<String, SelectionError> {
        [self.aws_object_key.as_str(), self.name.as_str()]
            .into_iter()
            .find_map(|candidate| {
                Path::new(candidate)
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .filter(|name| !name.is_empty() && name != "." && name != "..")
            })
            .ok_or_else(|| SelectionError::InvalidFileName {
                name: self.name.clone(),
            })
    }

    /// Human readable label used in selection lists
    pub fn display_label(&self) -> String {
        format!("{} ({})", self.name, format_bytes(self.size))
    }
}

/// Options for a single download request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Catalog product identifier (e.g. "cf")
    pub product_slug: String,
    /// Exact version or version prefix
    pub version: String,
    /// Exact product file name to download
    pub product_file: Option<String>,
    /// Accept the EULA without prompting
    pub accept_eula: bool,
    /// Fail instead of prompting
    pub non_interactive: bool,
    /// Directory holding downloaded files
    pub cache_dir: PathBuf,
}

impl DownloadOptions {
    /// Create options for a product and version specifier
    pub fn new(
        product_slug: impl Into<String>,
        version: impl Into<String>,
        cache_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            product_slug: product_slug.into(),
            version: version.into(),
            product_file: None,
            accept_eula: false,
            non_interactive: false,
            cache_dir: cache_dir.into(),
        }
    }

    /// Request a specific product file by name
    pub fn with_product_file(mut self, name: impl Into<String>) -> Self {
        self.product_file = Some(name.into());
        self
    }

    /// Pre-authorize EULA acceptance
    pub fn with_accept_eula(mut self, accept: bool) -> Self {
        self.accept_eula = accept;
        self
    }

    /// Disable all prompts
    pub fn with_non_interactive(mut self, non_interactive: bool) -> Self {
        self.non_interactive = non_interactive;
        self
    }
}

/// Composite key for cache entries: `product-version-fileID`
pub fn cache_key(product_slug: &str, version: &str, product_file_id: u64) -> String {
    format!("{}-{}-{}", product_slug, version, product_file_id)
}

/// Composite key for EULA records: `product-version`
pub fn eula_key(product_slug: &str, version: &str) -> String {
    format!("{}-{}", product_slug, version)
}

/// Format bytes in human-readable format
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB", "PB"];
    const THRESHOLD: u64 = 1024;

    if bytes < THRESHOLD {
        return format!("{} B", bytes);
    }

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= THRESHOLD as f64 && unit_index < UNITS.len() - 1 {
        size /= THRESHOLD as f64;
        unit_index += 1;
    }

    format!("{:.1} {}", size, UNITS[unit_index])
}
