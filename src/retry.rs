//! Conflict retries with exponential backoff and jitter
//!
//! Writes that race with the control plane's own reconciliation fail with
//! 409 Conflict. Those are retried until the operation's deadline or until the
//! caller cancels; every other failure is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use metakube_client::{ApiError, ApiResult};
use rand::Rng;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::error::{classify, CallKind, ErrorClass};

/// Backoff settings for retried writes
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts (0 = until the deadline)
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for a single delay
    pub max_delay: Duration,
    /// Multiplier applied after every retry
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    fn next_delay(&self, delay: Duration) -> Duration {
        Duration::from_secs_f64(
            (delay.as_secs_f64() * self.backoff_multiplier).min(self.max_delay.as_secs_f64()),
        )
    }
}

/// Scale `delay` by a random factor in 0.5..1.5
fn jittered(delay: Duration) -> Duration {
    Duration::from_secs_f64(delay.as_secs_f64() * rand::thread_rng().gen_range(0.5..1.5))
}

/// Why a retried write gave up
#[derive(Debug)]
pub enum RetryError {
    /// The last error the API returned
    Api(ApiError),
    /// `cancel` fired while backing off
    Cancelled,
}

impl From<ApiError> for RetryError {
    fn from(err: ApiError) -> Self {
        Self::Api(err)
    }
}

/// Run a mutating API call, retrying conflicts until `deadline`
///
/// The last conflict is returned once attempts or time run out. Cancellation
/// is observed between attempts; a call already in flight is not aborted.
pub async fn retry_conflicts<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    deadline: Instant,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
{
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt = attempt.saturating_add(1);
        let err: ApiError = match operation().await {
            Ok(result) => return Ok(result),
            Err(e) if classify(&e, CallKind::Mutate) != ErrorClass::Retryable => return Err(e.into()),
            Err(e) => e,
        };

        let exhausted = config.max_attempts > 0 && attempt >= config.max_attempts;
        let wait = jittered(delay);
        if exhausted || Instant::now() + wait >= deadline {
            error!(
                operation = %operation_name,
                attempt,
                error = %err,
                "giving up on conflicting write"
            );
            return Err(err.into());
        }

        warn!(
            operation = %operation_name,
            attempt,
            delay_ms = wait.as_millis(),
            "write conflicted, retrying"
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!(operation = %operation_name, attempt, "cancelled while retrying a conflicting write");
                return Err(RetryError::Cancelled);
            }
            _ = tokio::time::sleep(wait) => {}
        }
        delay = config.next_delay(delay);
    }
}
