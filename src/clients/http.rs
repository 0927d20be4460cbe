//! Shared HTTP plumbing for remote service clients

use std::time::{Duration, Instant};

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use tracing::debug;

use crate::config::ServicesConfig;
use crate::{CarbonTripError, Result};

const USER_AGENT: &str = concat!("CarbonTrip/", env!("CARGO_PKG_VERSION"));

/// Build the reqwest client shared by all service clients, with timeout and
/// exponential-backoff retries on transient failures.
pub fn build_client(config: &ServicesConfig) -> Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds.into()))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| CarbonTripError::config(format!("Failed to create HTTP client: {e}")))?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
    debug!(
        "HTTP client ready (timeout {}s, max retries {})",
        config.timeout_seconds, config.max_retries
    );

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// Sliding one-minute window rate limiter for outbound requests
#[derive(Debug)]
pub struct RateLimiter {
    max_requests_per_minute: u32,
    request_times: Vec<Instant>,
}

impl RateLimiter {
    pub fn new(max_requests_per_minute: u32) -> Self {
        Self {
            max_requests_per_minute,
            request_times: Vec::new(),
        }
    }

    /// Check if a request is allowed and record it
    pub fn allow_request(&mut self) -> bool {
        self.cleanup_old_requests();

        if self.request_times.len() >= self.max_requests_per_minute as usize {
            false
        } else {
            self.request_times.push(Instant::now());
            true
        }
    }

    /// Time until the oldest request in the window expires
    pub fn time_until_next_request(&mut self) -> Duration {
        self.cleanup_old_requests();

        if self.request_times.len() < self.max_requests_per_minute as usize {
            return Duration::ZERO;
        }
        self.request_times
            .first()
            .map(|oldest| Duration::from_secs(60).saturating_sub(oldest.elapsed()))
            .unwrap_or(Duration::ZERO)
    }

    fn cleanup_old_requests(&mut self) {
        let window = Duration::from_secs(60);
        self.request_times.retain(|time| time.elapsed() < window);
    }
}

/// Serialize a JSON body for `reqwest_middleware` request builders
pub(crate) fn json_body<T: serde::Serialize>(body: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(body)
        .map_err(|e| CarbonTripError::general(format!("Failed to encode request body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter() {
        let mut limiter = RateLimiter::new(2);

        assert!(limiter.allow_request());
        assert!(limiter.allow_request());
        assert!(!limiter.allow_request());

        let wait_time = limiter.time_until_next_request();
        assert!(wait_time > Duration::ZERO);
    }

    #[test]
    fn test_rate_limiter_under_limit_has_no_wait() {
        let mut limiter = RateLimiter::new(5);
        assert!(limiter.allow_request());
        assert_eq!(limiter.time_until_next_request(), Duration::ZERO);
    }

    #[test]
    fn test_json_body() {
        let body = json_body(&serde_json::json!({"coordinates": [[2.35, 48.85]]})).unwrap();
        assert_eq!(body, br#"{"coordinates":[[2.35,48.85]]}"#.to_vec());
    }
}
