//! Race Executor — a single call raced against a deadline.
//!
//! ```text
//! with_deadline(call, 15s)
//!   ├─ call resolves first  → Raced::Finished(value)
//!   ├─ deadline fires first → Raced::TimedOut   (call keeps running, detached)
//!   └─ call task panics     → Raced::Aborted(reason)
//! ```
//!
//! The call is never cancelled. It runs on its own task; when the deadline
//! wins, the join handle is dropped, which detaches the task instead of
//! aborting it. Whatever the loser eventually produces is dropped together
//! with the detached task and can no longer be observed by the caller.
//! Callers must accept that a losing provider still consumes its quota.

use std::future::Future;
use std::time::Duration;

/// Outcome of racing a call against its deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Raced<T> {
    /// The call completed before the deadline.
    Finished(T),
    /// The deadline elapsed first.
    TimedOut,
    /// The call's task panicked before producing a value.
    Aborted(String),
}

impl<T> Raced<T> {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    /// Convert into an `Option`, discarding the failure reason.
    pub fn finished(self) -> Option<T> {
        match self {
            Self::Finished(value) => Some(value),
            Self::TimedOut | Self::Aborted(_) => None,
        }
    }
}

/// Race `call` against `deadline`.
///
/// Must be called from within a Tokio runtime.
pub async fn with_deadline<F>(call: F, deadline: Duration) -> Raced<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    let handle = tokio::spawn(call);

    match tokio::time::timeout(deadline, handle).await {
        Ok(Ok(value)) => Raced::Finished(value),
        Ok(Err(join_err)) => {
            tracing::warn!(error = %join_err, "raced call panicked");
            Raced::Aborted(join_err.to_string())
        }
        // Dropping the elapsed JoinHandle detaches the task.
        Err(_elapsed) => Raced::TimedOut,
    }
}
