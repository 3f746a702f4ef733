//! Readiness polling
//!
//! Waits for a resource to converge by calling a poll function until it reports
//! [`Poll::Ready`], the deadline passes, or the caller cancels. The poll
//! function decides what "ready" means and which API failures only mean
//! "not yet"; any error it returns ends the wait immediately.

use std::future::Future;
use std::time::Duration;

use metakube_client::ApiError;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{classify, error_message, CallKind, ErrorClass};
use crate::{Error, Result};

/// Minimum delay between two polls
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// State reported by a single poll
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Poll<T> {
    /// The condition holds; stop waiting
    Ready(T),
    /// Not there yet, with a short description of the current state
    Pending(String),
}

/// Poll with the default interval until ready, timed out, or cancelled
pub async fn poll_until<T, F, Fut>(
    description: &str,
    timeout: Duration,
    cancel: &CancellationToken,
    poll_fn: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Poll<T>>>,
{
    poll_with_interval(description, timeout, POLL_INTERVAL, cancel, poll_fn).await
}

/// Poll with a custom interval
///
/// The deadline is hard: a poll still in flight when it passes is abandoned.
pub async fn poll_with_interval<T, F, Fut>(
    description: &str,
    timeout: Duration,
    interval: Duration,
    cancel: &CancellationToken,
    mut poll_fn: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Poll<T>>>,
{
    let deadline = Instant::now() + timeout;
    let mut last_state: Option<String> = None;

    let timed_out = |last_state: Option<String>| Error::Timeout {
        description: description.to_string(),
        timeout,
        last_state,
    };
    let cancelled = || Error::Cancelled {
        description: description.to_string(),
    };

    loop {
        let next_poll = Instant::now() + interval;

        let state = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = sleep_until(deadline) => return Err(timed_out(last_state)),
            state = poll_fn() => state?,
        };

        match state {
            Poll::Ready(value) => return Ok(value),
            Poll::Pending(reason) => {
                debug!(state = %reason, "Still waiting for {}", description);
                last_state = Some(reason);
            }
        }

        if next_poll >= deadline {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled()),
                _ = sleep_until(deadline) => return Err(timed_out(last_state)),
            }
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = sleep_until(next_poll) => {}
        }
    }
}

/// Map an API failure seen while waiting for convergence onto a poll state
///
/// Transient and not-yet-visible responses keep the wait going; anything else
/// is fatal.
pub fn pending_or_fail<T>(context: &str, err: ApiError) -> Result<Poll<T>> {
    match classify(&err, CallKind::Wait) {
        ErrorClass::Retryable => Ok(Poll::Pending(error_message(&err))),
        ErrorClass::Gone | ErrorClass::Fatal => Err(Error::api(context, &err)),
    }
}

/// Map an API failure seen while waiting for deletion onto a poll state
///
/// A resource that can no longer be found is deleted.
pub fn deleted_or_fail(context: &str, err: ApiError) -> Result<Poll<()>> {
    match classify(&err, CallKind::WaitForDeletion) {
        ErrorClass::Gone => Ok(Poll::Ready(())),
        ErrorClass::Retryable => Ok(Poll::Pending(error_message(&err))),
        ErrorClass::Fatal => Err(Error::api(context, &err)),
    }
}
