//! Catalog HTTP requests with rate limiting and retry logic
//!
//! Every request waits on a shared governor quota. Transport failures, HTTP 429
//! and 5xx responses are retried with capped exponential backoff and jitter.
//! Authentication and not-found statuses fail immediately.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Jitter, Quota, RateLimiter};
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, Response, StatusCode};
use tracing::{debug, error, warn};
use url::Url;

use crate::constants::limits;
use crate::errors::{CatalogError, CatalogResult};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// What to do with a response status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusAction {
    Accept,
    Retry,
    Fail,
}

fn classify_status(status: StatusCode) -> StatusAction {
    if status.is_success() {
        StatusAction::Accept
    } else if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusAction::Retry
    } else {
        StatusAction::Fail
    }
}

/// Map a final non-success status to a catalog error
fn status_error(status: StatusCode, url: &Url) -> CatalogError {
    match status.as_u16() {
        401 | 403 => CatalogError::Unauthorized {
            status: status.as_u16(),
        },
        404 => CatalogError::NotFound {
            resource: url.path().to_string(),
        },
        429 => CatalogError::RateLimitExceeded,
        code => CatalogError::ServerError {
            status: code,
            url: url.to_string(),
        },
    }
}

/// Delay before retry number `attempt` (1-based)
///
/// Doubles from the base delay, capped at the maximum, with symmetric jitter.
pub fn retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    let exponential = limits::RETRY_BASE_DELAY_MS.saturating_mul(1u64 << exponent);
    let capped = exponential.min(limits::MAX_BACKOFF_MS);

    let jitter_range = (capped as f64 * limits::BACKOFF_JITTER_FACTOR) as u64;
    let jittered = if jitter_range > 0 {
        capped
            .saturating_add(fastrand::u64(0..=jitter_range * 2))
            .saturating_sub(jitter_range)
    } else {
        capped
    };

    Duration::from_millis(jittered)
}

/// A single catalog request, rebuilt for each attempt
#[derive(Debug, Clone)]
pub struct CatalogRequest<'a> {
    pub method: Method,
    pub url: &'a Url,
    pub authorization: &'a str,
    pub timeout: Duration,
}

/// HTTP operations handler with resilience patterns
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectRateLimiter,
    max_retries: u32,
}

impl HttpHandler {
    /// Creates a handler for `client` allowing `rate_limit_rps` requests per second
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Decode` if the rate limit is zero
    pub fn new(client: Client, rate_limit_rps: u32, max_retries: u32) -> CatalogResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            max_retries,
        })
    }

    fn build_rate_limiter(rate_limit_rps: u32) -> CatalogResult<DirectRateLimiter> {
        let rps = NonZeroU32::new(rate_limit_rps).ok_or_else(|| CatalogError::Decode {
            reason: "rate limit must be non-zero".to_string(),
        })?;
        Ok(RateLimiter::direct(Quota::per_second(rps)))
    }

    /// Sends a request, retrying transient failures
    ///
    /// Returns the response only for a 2xx status.
    pub async fn execute(&self, request: &CatalogRequest<'_>) -> CatalogResult<Response> {
        let mut attempt = 0;
        loop {
            self.rate_limiter
                .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
                .await;

            let builder = self
                .client
                .request(request.method.clone(), request.url.clone())
                .header(AUTHORIZATION, request.authorization)
                .header(ACCEPT, "application/json")
                .timeout(request.timeout);

            match builder.send().await {
                Ok(response) => {
                    let status = response.status();
                    match classify_status(status) {
                        StatusAction::Accept => {
                            debug!("{} {} -> {}", request.method, request.url, status);
                            return Ok(response);
                        }
                        StatusAction::Retry if attempt < self.max_retries => {
                            attempt += 1;
                            let delay = retry_delay(attempt);
                            warn!(
                                "Catalog returned {} for {} (attempt {}/{}). Backing off for {}ms",
                                status,
                                request.url,
                                attempt,
                                self.max_retries,
                                delay.as_millis()
                            );
                            tokio::time::sleep(delay).await;
                        }
                        _ => return Err(status_error(status, request.url)),
                    }
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let delay = retry_delay(attempt);
                    warn!(
                        "Request to {} failed (attempt {}/{}): {}. Retrying in {}ms",
                        request.url,
                        attempt,
                        self.max_retries,
                        e,
                        delay.as_millis()
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(
                        "Request to {} failed after {} retries: {}",
                        request.url, self.max_retries, e
                    );
                    return Err(CatalogError::MaxRetriesExceeded {
                        max_retries: self.max_retries,
                    });
                }
            }
        }
    }

    /// Sends a request and decodes the JSON body
    pub async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: &CatalogRequest<'_>,
    ) -> CatalogResult<T> {
        let response = self.execute(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| CatalogError::Decode {
            reason: format!("{} {}: {}", request.method, request.url.path(), e),
        })
    }

    /// Underlying HTTP client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::config::ClientConfig;

    #[tokio::test]
    async fn test_rate_limiter_creation() {
        let rate_limiter = HttpHandler::build_rate_limiter(5).unwrap();
        rate_limiter.until_ready().await;
    }

    #[test]
    fn test_rate_limiter_zero_fails() {
        assert!(HttpHandler::build_rate_limiter(0).is_err());
    }

    #[test]
    fn test_http_handler_creation() {
        let config = ClientConfig::default();
        let client = config.build_http_client().unwrap();
        assert!(HttpHandler::new(client, 5, 3).is_ok());
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(StatusCode::OK), StatusAction::Accept);
        assert_eq!(classify_status(StatusCode::NO_CONTENT), StatusAction::Accept);
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            StatusAction::Retry
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            StatusAction::Retry
        );
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), StatusAction::Fail);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), StatusAction::Fail);
    }

    #[test]
    fn test_status_errors() {
        let url = Url::parse("https://example.test/api/v2/products/cf/releases").unwrap();

        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, &url),
            CatalogError::Unauthorized { status: 403 }
        ));
        match status_error(StatusCode::NOT_FOUND, &url) {
            CatalogError::NotFound { resource } => {
                assert_eq!(resource, "/api/v2/products/cf/releases")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            status_error(StatusCode::BAD_GATEWAY, &url),
            CatalogError::ServerError { status: 502, .. }
        ));
    }

    #[test]
    fn test_retry_delay_grows_and_caps() {
        let first = retry_delay(1).as_millis() as u64;
        let second = retry_delay(2).as_millis() as u64;
        let late = retry_delay(20).as_millis() as u64;

        let tolerance = |ms: u64| (ms as f64 * limits::BACKOFF_JITTER_FACTOR) as u64;
        let base = limits::RETRY_BASE_DELAY_MS;

        assert!(first.abs_diff(base) <= tolerance(base));
        assert!(second.abs_diff(base * 2) <= tolerance(base * 2));
        assert!(late <= limits::MAX_BACKOFF_MS + tolerance(limits::MAX_BACKOFF_MS));
    }
}
