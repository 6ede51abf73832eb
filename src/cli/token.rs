//! API token lookup
//!
//! The token comes from `--pivnet-token`, then `PIVNET_TOKEN` (a `.env` file
//! is loaded at startup), then a hidden prompt when stdin is a terminal.

use std::io;

use tracing::debug;

use crate::constants::env as env_constants;
use crate::errors::{CatalogError, InteractionError, Result};

/// Find the catalog token without prompting
pub fn lookup_token(
    flag: Option<&str>,
    env_lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    if let Some(token) = flag.map(str::trim).filter(|t| !t.is_empty()) {
        debug!("Using API token from command line");
        return Some(token.to_string());
    }

    env_lookup(env_constants::TOKEN)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .map(|token| {
            debug!("Using API token from {}", env_constants::TOKEN);
            token
        })
}

/// Find the catalog token, prompting for it when allowed
pub fn resolve_token(flag: Option<&str>, allow_prompt: bool) -> Result<String> {
    if let Some(token) = lookup_token(flag, |key| std::env::var(key).ok()) {
        return Ok(token);
    }

    if !allow_prompt || !atty::is(atty::Stream::Stdin) {
        return Err(CatalogError::MissingToken.into());
    }

    let token = rpassword::prompt_password("Tanzu Network API token: ").map_err(|e| {
        InteractionError::Io(io::Error::new(io::ErrorKind::Other, e.to_string()))
    })?;

    let token = token.trim().to_string();
    if token.is_empty() {
        return Err(CatalogError::MissingToken.into());
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_wins_over_environment() {
        let token = lookup_token(Some("flag-token"), |_| Some("env-token".to_string()));
        assert_eq!(token.as_deref(), Some("flag-token"));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let token = lookup_token(Some("  "), |key| {
            (key == "PIVNET_TOKEN").then(|| "env-token".to_string())
        });
        assert_eq!(token.as_deref(), Some("env-token"));

        assert_eq!(lookup_token(None, |_| Some(String::new())), None);
    }

    #[test]
    fn test_missing_token_without_prompt() {
        let result = resolve_token(None, false);
        // PIVNET_TOKEN may be set on a developer machine
        if std::env::var("PIVNET_TOKEN").map(|t| t.trim().is_empty()).unwrap_or(true) {
            assert!(matches!(
                result,
                Err(crate::errors::AppError::Catalog(CatalogError::MissingToken))
            ));
        }
    }
}
