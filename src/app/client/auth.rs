//! Catalog API authentication
//!
//! The catalog accepts two token styles. Legacy API tokens are exactly 20
//! characters and are sent as `Authorization: Token <t>`. Anything longer is
//! a UAA refresh token, exchanged once per process for a short-lived access
//! token sent as `Authorization: Bearer <t>`.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use tracing::{debug, info};
use url::Url;

use crate::constants::catalog;
use crate::errors::{CatalogError, CatalogResult};

/// Kind of API token supplied by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Legacy,
    UaaRefresh,
}

impl TokenKind {
    /// Classify a token by its length
    pub fn classify(token: &str) -> Self {
        if token.len() > catalog::LEGACY_TOKEN_LENGTH {
            TokenKind::UaaRefresh
        } else {
            TokenKind::Legacy
        }
    }
}

#[derive(Serialize)]
struct AccessTokenRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

/// Produces the `Authorization` header for catalog requests
#[derive(Debug)]
pub struct AuthHandler {
    token: String,
    kind: TokenKind,
    header: OnceCell<String>,
}

impl AuthHandler {
    /// Create a handler for a user supplied token
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MissingToken` for an empty token
    pub fn new(token: impl Into<String>) -> CatalogResult<Self> {
        let token = token.into().trim().to_string();
        if token.is_empty() {
            return Err(CatalogError::MissingToken);
        }

        let kind = TokenKind::classify(&token);
        debug!("Using {:?} catalog token", kind);

        Ok(Self {
            token,
            kind,
            header: OnceCell::new(),
        })
    }

    /// Kind of the configured token
    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    /// Header value, exchanging a refresh token on first use
    pub async fn authorization_header(&self, client: &Client, base: &Url) -> CatalogResult<String> {
        self.header
            .get_or_try_init(|| async {
                match self.kind {
                    TokenKind::Legacy => Ok(format!("Token {}", self.token)),
                    TokenKind::UaaRefresh => {
                        let access = Self::exchange_refresh_token(client, base, &self.token).await?;
                        Ok(format!("Bearer {}", access))
                    }
                }
            })
            .await
            .cloned()
    }

    async fn exchange_refresh_token(
        client: &Client,
        base: &Url,
        refresh_token: &str,
    ) -> CatalogResult<String> {
        let url = base
            .join(catalog::ACCESS_TOKEN_PATH)
            .map_err(|e| CatalogError::InvalidUrl {
                url: format!("{}{}", base, catalog::ACCESS_TOKEN_PATH),
                error: e.to_string(),
            })?;

        let response = client
            .post(url)
            .json(&AccessTokenRequest { refresh_token })
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(CatalogError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(CatalogError::ServerError {
                status: status.as_u16(),
                url: catalog::ACCESS_TOKEN_PATH.to_string(),
            });
        }

        let body: AccessTokenResponse =
            response.json().await.map_err(|e| CatalogError::Decode {
                reason: format!("access token response: {}", e),
            })?;

        info!("Exchanged refresh token for catalog access token");
        Ok(body.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_classification() {
        assert_eq!(TokenKind::classify("abcdefghij0123456789"), TokenKind::Legacy);
        assert_eq!(
            TokenKind::classify("0123456789abcdef0123456789abcdef-r"),
            TokenKind::UaaRefresh
        );
    }

    #[test]
    fn test_empty_token_rejected() {
        assert!(matches!(
            AuthHandler::new("   "),
            Err(CatalogError::MissingToken)
        ));
    }

    #[tokio::test]
    async fn test_legacy_header_needs_no_exchange() {
        let handler = AuthHandler::new("abcdefghij0123456789").unwrap();
        let client = Client::new();
        let base = Url::parse("http://127.0.0.1:1").unwrap();

        let header = handler.authorization_header(&client, &base).await.unwrap();
        assert_eq!(header, "Token abcdefghij0123456789");
    }
}
