//! Deadline race combinator for calls to slow external systems.
//!
//! Every external call in the pipeline (remote execution, code-review push,
//! AI provider, node-metadata lookup) goes through [`with_deadline`] so the
//! race-against-a-timer pattern lives in exactly one place. The underlying
//! `tokio::time::timeout` drops the pending timer as soon as either side
//! resolves, so no timer leaks on the winning path.
//!
//! There is no cancellation propagated to the losing operation: on timeout
//! the caller simply abandons the future. If the operation was spawned
//! elsewhere it may keep running unobserved.

use std::future::Future;
use std::time::Duration;

/// Result of racing an operation against a timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadlineOutcome<T> {
    /// The operation finished before the timer.
    Completed(T),
    /// The timer won; the operation's result was abandoned.
    TimedOut,
}

impl<T> DeadlineOutcome<T> {
    /// Convert a timeout into the caller's own error type.
    pub fn or_timeout<E>(self, err: impl FnOnce() -> E) -> Result<T, E> {
        match self {
            Self::Completed(v) => Ok(v),
            Self::TimedOut => Err(err()),
        }
    }
}

/// Race `operation` against a `deadline` timer.
pub async fn with_deadline<F>(deadline: Duration, operation: F) -> DeadlineOutcome<F::Output>
where
    F: Future,
{
    match tokio::time::timeout(deadline, operation).await {
        Ok(value) => DeadlineOutcome::Completed(value),
        Err(_elapsed) => DeadlineOutcome::TimedOut,
    }
}
