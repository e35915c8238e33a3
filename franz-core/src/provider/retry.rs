//! Bounded retry with exponential backoff for completion calls

use super::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::error::{Error, ErrorStatus, Result};
use std::time::Duration;

/// How hard to try before giving up on the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total calls, including the first one
    pub max_attempts: u32,
    /// Wait after the first failure
    pub initial_delay: Duration,
    /// Ceiling for the doubling
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Same attempt budget, no waiting
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Wait after the `failures`-th consecutive failure (1-based)
    pub fn delay_after(&self, failures: u32) -> Duration {
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..failures {
            delay = delay.saturating_mul(2).min(self.max_delay);
        }
        delay
    }

    /// Every wait a fully failing call sequence goes through
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts.max(1)).map(|n| self.delay_after(n)).collect()
    }
}

/// Call `provider` until it answers or the policy runs out.
///
/// Only failures whose [`ProviderError::status`] is retryable are tried again.
/// A malformed answer, or the last retryable failure once attempts are
/// exhausted, comes back as `InferenceFailed` with the provider error as
/// source.
///
/// [`ProviderError::status`]: super::ProviderError::status
pub async fn complete_with_retry<P: LlmProvider>(
    provider: &P,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> Result<CompletionResponse> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;
        let err = match provider.complete(request.clone()).await {
            Ok(response) => {
                if attempt > 1 {
                    tracing::info!(provider = provider.name(), attempt, "provider recovered after retries");
                }
                return Ok(response);
            }
            Err(err) => err,
        };

        let status = err.status();
        if !status.is_retryable() {
            return Err(Error::inference_failed(format!("VLM returned an unusable response: {}", err))
                .with_status(status)
                .with_operation("provider::complete_with_retry")
                .with_context("provider", provider.name())
                .with_context("attempt", attempt.to_string())
                .set_source(err));
        }

        if attempt >= max_attempts {
            return Err(Error::inference_failed(format!(
                "VLM request failed after {} attempts: {}",
                attempt, err
            ))
            .with_status(ErrorStatus::Persistent)
            .with_operation("provider::complete_with_retry")
            .with_context("provider", provider.name())
            .with_context("attempts", attempt.to_string())
            .set_source(err));
        }

        let delay = policy.delay_after(attempt);
        tracing::warn!(
            provider = provider.name(),
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "provider call failed, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
