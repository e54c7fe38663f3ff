use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::client::{CompletionRequest, StructuredCompletion};
use crate::error::LlmError;

/// Bounded exponential backoff schedule for transient LLM failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts; used by tests
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let doubled = self
            .initial_delay
            .checked_mul(1u32 << attempt.min(31))
            .unwrap_or(self.max_delay);
        doubled.min(self.max_delay)
    }
}

/// Call the client, retrying transient failures on the policy's schedule.
///
/// Terminal failures (auth, permission, invalid request) surface
/// immediately. The last transient error surfaces once retries are
/// exhausted.
pub fn complete_with_retry(
    client: &dyn StructuredCompletion,
    request: &CompletionRequest,
    policy: &RetryPolicy,
) -> std::result::Result<serde_json::Value, LlmError> {
    let mut attempt = 0;
    loop {
        match client.complete_structured(request) {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retriable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient LLM failure, retrying"
                );
                if !delay.is_zero() {
                    std::thread::sleep(delay);
                }
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Interpret a completion reply as a typed value.
///
/// A shape mismatch is an `InvalidResponse`, which callers may retry with
/// a fresh completion.
pub fn parse_structured<T: DeserializeOwned>(
    value: serde_json::Value,
) -> std::result::Result<T, LlmError> {
    serde_json::from_value(value).map_err(|e| LlmError::InvalidResponse(e.to_string()))
}
