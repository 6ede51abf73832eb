//! Option lists shown when a release or file must be picked

use crate::app::models::{ArtifactFile, Release};
use crate::constants::selection;
use crate::errors::SelectionError;

pub const RELEASE_PROMPT: &str = "Multiple releases found. Select version:";
pub const FILE_PROMPT: &str = "Multiple product files found. Select file:";

/// Release labels; the first (newest) is marked as latest
pub fn release_options(releases: &[Release]) -> Vec<String> {
    releases
        .iter()
        .enumerate()
        .map(|(i, release)| {
            if i == 0 {
                format!("{}{}", release.version, selection::LATEST_MARKER)
            } else {
                release.version.clone()
            }
        })
        .collect()
}

/// File labels with sizes, marking the recommended file
pub fn file_options(files: &[ArtifactFile], recommended: &str) -> Vec<String> {
    files
        .iter()
        .map(|file| {
            if file.name == recommended {
                format!("{}{}", file.display_label(), selection::RECOMMENDED_MARKER)
            } else {
                file.display_label()
            }
        })
        .collect()
}

/// Index of the recommended file, or the first file
pub fn recommended_index(files: &[ArtifactFile], recommended: &str) -> usize {
    files
        .iter()
        .position(|file| file.name == recommended)
        .unwrap_or(0)
}

/// Exact name match
pub fn find_by_name<'a>(
    files: &'a [ArtifactFile],
    name: &str,
) -> Result<&'a ArtifactFile, SelectionError> {
    files
        .iter()
        .find(|file| file.name == name)
        .ok_or_else(|| SelectionError::FileNotFound {
            name: name.to_string(),
            available: files.iter().map(|f| f.name.clone()).collect(),
        })
}
