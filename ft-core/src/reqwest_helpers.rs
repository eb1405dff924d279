use std::sync::Arc;
use std::time::{Duration, Instant};

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use http::Extensions;
use reqwest::{Client, Request, Response, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, Middleware, Next};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use tracing::{debug, error};

/// Build the http client every api call goes through: retries with
/// exponential backoff, request logging, client-side rate limiting and the
/// bearer token header when we have one.
pub fn create_client(maybe_bearer_token: Option<String>, requests_per_second: u32) -> ClientWithMiddleware {
    let reqwest_client = Client::builder().build().unwrap_or_default();

    let quota = Quota::per_second(std::num::NonZeroU32::new(requests_per_second.max(1)).unwrap_or(std::num::NonZeroU32::MIN));
    let limiter = RateLimiter::direct(quota);

    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(Duration::from_millis(50), Duration::from_secs(120))
        .build_with_total_retry_duration_and_max_retries(Duration::from_secs(120));

    let client_builder = ClientBuilder::new(reqwest_client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .with(ErrorLoggingMiddleware)
        .with(RateLimitingMiddleware { limiter: Arc::new(limiter) });

    match maybe_bearer_token {
        None => client_builder.build(),
        Some(token) => client_builder
            .with(AuthenticatedHeaderMiddleware::new(token))
            .build(),
    }
}

struct AuthenticatedHeaderMiddleware {
    bearer_token: String,
}

impl AuthenticatedHeaderMiddleware {
    pub fn new(bearer_token: String) -> Self {
        Self { bearer_token }
    }
}

#[async_trait::async_trait]
impl Middleware for AuthenticatedHeaderMiddleware {
    async fn handle(&self, mut req: Request, extensions: &mut Extensions, next: Next<'_>) -> reqwest_middleware::Result<Response> {
        if let Ok(header_value) = format!("Bearer {}", self.bearer_token).parse() {
            req.headers_mut().insert(reqwest::header::AUTHORIZATION, header_value);
        }

        next.run(req, extensions).await
    }
}

struct RateLimitingMiddleware {
    limiter: Arc<DefaultDirectRateLimiter>,
}

#[async_trait::async_trait]
impl Middleware for RateLimitingMiddleware {
    async fn handle(&self, req: Request, extensions: &mut Extensions, next: Next<'_>) -> reqwest_middleware::Result<Response> {
        self.limiter.until_ready().await;

        next.run(req, extensions).await
    }
}

pub struct ErrorLoggingMiddleware;

#[async_trait::async_trait]
impl Middleware for ErrorLoggingMiddleware {
    async fn handle(&self, req: Request, extensions: &mut Extensions, next: Next<'_>) -> reqwest_middleware::Result<Response> {
        let start = Instant::now();
        let method = req.method().clone();
        let url = req.url().clone();

        let result = next.run(req, extensions).await;

        let duration = start.elapsed();

        match &result {
            Ok(resp) if !resp.status().is_success() => {
                let status = resp.status();

                // reduce log-spam / false-positives with these conditions
                match status {
                    StatusCode::BAD_REQUEST if url.path().ends_with("/survey") => {
                        debug!(
                            "Survey-related request failed with 400. This happens when a survey is exhausted or expired: {} {} - Status: {}, Duration: {:?}.",
                            method, url, status, duration
                        );
                    }
                    StatusCode::TOO_MANY_REQUESTS => {
                        debug!(
                            "Request failed due to rate-limit {} {} - Status: {}, Duration: {:?}",
                            method, url, status, duration
                        )
                    }
                    _ => error!("Request failed: {} {} - Status: {}, Duration: {:?}", method, url, status, duration),
                }
            }
            Err(e) => {
                error!("Request error: {} {} - Error: {}, Duration: {:?}", method, url, e, duration);
            }
            _ => {
                debug!("Request succeeded: {} {} - Duration: {:?}", method, url, duration);
            }
        }

        result
    }
}
