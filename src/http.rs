//! Shared HTTP retry loop for upstream API calls.
//!
//! Both the embedding providers and the Anthropic client send JSON `POST`
//! requests that can be rate limited or hit transient server failures.
//! [`send_with_retry`] applies one policy to all of them:
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use std::time::Duration;

/// Backoff before retry number `attempt` (1-based).
pub fn backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt.saturating_sub(1)).min(5))
}

/// Send the request built by `build`, retrying up to `max_retries` times.
///
/// `build` is called once per attempt because a [`reqwest::RequestBuilder`]
/// is consumed by `send`. On success the response is returned unread so the
/// caller can either parse JSON or consume the body as a stream. `label`
/// names the upstream in error messages (`"Voyage"`, `"Anthropic"`).
pub async fn send_with_retry<F>(
    label: &str,
    max_retries: u32,
    build: F,
) -> Result<reqwest::Response>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut last_err = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = backoff(attempt);
            tracing::debug!(upstream = label, attempt, ?delay, "retrying request");
            tokio::time::sleep(delay).await;
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    return Ok(response);
                }

                let body_text = response.text().await.unwrap_or_default();

                if status.as_u16() == 429 || status.is_server_error() {
                    tracing::warn!(upstream = label, %status, "transient API error");
                    last_err = Some(anyhow::anyhow!(
                        "{} API error {}: {}",
                        label,
                        status,
                        body_text
                    ));
                    continue;
                }

                bail!("{} API error {}: {}", label, status, body_text);
            }
            Err(e) => {
                tracing::warn!(upstream = label, error = %e, "request failed");
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("{} request failed after retries", label)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(4), Duration::from_secs(8));
        assert_eq!(backoff(6), Duration::from_secs(32));
        assert_eq!(backoff(12), Duration::from_secs(32));
    }

    #[tokio::test]
    async fn test_network_error_exhausts_retries() {
        let client = reqwest::Client::new();
        // Port 9 on localhost is discard; nothing listens there in CI.
        let err = send_with_retry("Test", 0, || client.post("http://127.0.0.1:9/"))
            .await
            .unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
