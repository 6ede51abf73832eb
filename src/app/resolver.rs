//! Version resolution for catalog releases
//!
//! Turns a user supplied version specifier into a single release. A release
//! matches when its version equals the specifier or starts with it, so "10.2"
//! selects every 10.2.x release. Matches keep catalog order, which the catalog
//! publishes newest first.

use crate::app::models::Release;
use crate::errors::ResolveError;

/// Outcome of a successful resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveResult {
    /// The chosen release when exactly one candidate matched
    pub selected: Option<Release>,
    /// Every matching release in catalog order
    pub matches: Vec<Release>,
}

impl ResolveResult {
    /// Whether a selection is still required from the caller
    pub fn needs_selection(&self) -> bool {
        self.selected.is_none()
    }
}

/// Resolves version specifiers against a release list
#[derive(Debug, Clone)]
pub struct VersionResolver {
    releases: Vec<Release>,
    non_interactive: bool,
}

impl VersionResolver {
    /// Create a resolver over releases in catalog order
    pub fn new(releases: Vec<Release>, non_interactive: bool) -> Self {
        Self {
            releases,
            non_interactive,
        }
    }

    /// Resolve a version specifier
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::NoMatchingRelease` if nothing matches, and
    /// `ResolveError::Ambiguous` if several releases match in non-interactive mode.
    pub fn resolve(&self, specifier: &str) -> Result<ResolveResult, ResolveError> {
        let matches: Vec<Release> = self
            .releases
            .iter()
            .filter(|release| matches_version(&release.version, specifier))
            .cloned()
            .collect();

        match matches.len() {
            0 => Err(ResolveError::NoMatchingRelease {
                specifier: specifier.to_string(),
            }),
            1 => Ok(ResolveResult {
                selected: matches.first().cloned(),
                matches,
            }),
            _ if self.non_interactive => Err(ResolveError::Ambiguous {
                specifier: specifier.to_string(),
                candidates: matches.into_iter().map(|r| r.version).collect(),
            }),
            _ => Ok(ResolveResult {
                selected: None,
                matches,
            }),
        }
    }

    /// Releases this resolver was built from
    pub fn releases(&self) -> &[Release] {
        &self.releases
    }
}

/// Exact match or prefix match
fn matches_version(full_version: &str, specifier: &str) -> bool {
    full_version == specifier || full_version.starts_with(specifier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn releases(versions: &[&str]) -> Vec<Release> {
        versions
            .iter()
            .enumerate()
            .map(|(i, v)| Release::new(100 + i as u64, *v))
            .collect()
    }

    #[test]
    fn test_exact_match_wins_over_shared_prefix() {
        let resolver = VersionResolver::new(
            releases(&["6.0.22+LTS-T", "6.0.21+LTS-T", "6.0.20+LTS-T"]),
            true,
        );

        let result = resolver.resolve("6.0.22+LTS-T").unwrap();
        assert_eq!(result.selected.unwrap().version, "6.0.22+LTS-T");
        assert_eq!(result.matches.len(), 1);
    }

    #[test]
    fn test_ambiguous_non_interactive_fails() {
        let resolver = VersionResolver::new(releases(&["6.0.22", "6.0.21", "6.0.20"]), true);

        match resolver.resolve("6.0") {
            Err(ResolveError::Ambiguous {
                specifier,
                candidates,
            }) => {
                assert_eq!(specifier, "6.0");
                assert_eq!(candidates, vec!["6.0.22", "6.0.21", "6.0.20"]);
            }
            other => panic!("Expected ResolveError::Ambiguous, got {:?}", other),
        }
    }

    #[test]
    fn test_ambiguous_interactive_returns_all_matches() {
        let resolver = VersionResolver::new(releases(&["6.0.22", "6.0.21", "6.0.20"]), false);

        let result = resolver.resolve("6.0").unwrap();
        assert!(result.needs_selection());
        let versions: Vec<_> = result.matches.iter().map(|r| r.version.as_str()).collect();
        assert_eq!(versions, vec!["6.0.22", "6.0.21", "6.0.20"]);
    }

    #[test]
    fn test_no_match() {
        let resolver = VersionResolver::new(releases(&["10.2.5", "10.2.4"]), true);
        assert!(matches!(
            resolver.resolve("11"),
            Err(ResolveError::NoMatchingRelease { .. })
        ));
    }

    #[test]
    fn test_empty_catalog() {
        let resolver = VersionResolver::new(Vec::new(), false);
        assert!(matches!(
            resolver.resolve("1.0"),
            Err(ResolveError::NoMatchingRelease { .. })
        ));
    }

    #[test]
    fn test_fuzzy_prefix_single_match() {
        let resolver = VersionResolver::new(releases(&["10.2.5", "6.0.22"]), true);
        let result = resolver.resolve("10").unwrap();
        assert_eq!(result.selected.unwrap().id, 100);
    }

    #[test]
    fn test_duplicate_versions_are_not_collapsed() {
        let resolver = VersionResolver::new(releases(&["10.2.5", "10.2.5"]), true);
        assert!(matches!(
            resolver.resolve("10.2.5"),
            Err(ResolveError::Ambiguous { .. })
        ));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let resolver = VersionResolver::new(releases(&["6.0.22", "6.0.21", "5.0.1"]), false);

        let first = resolver.resolve("6.0").unwrap();
        let _ = resolver.resolve("5").unwrap();
        let second = resolver.resolve("6.0").unwrap();
        assert_eq!(first, second);
    }
}
