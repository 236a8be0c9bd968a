//! Cooperative cancellation (§4.9): an [`CancellationToken`] that a caller
//! holds and can cancel at any time, raced against execution at every
//! suspension point so an in-flight run notices promptly rather than only
//! at its next field boundary.
//!
//! Grounded on `tokio::sync::Notify`, already part of the `tokio` "sync"
//! feature this crate depends on for its other synchronization (see
//! `executor`'s error collector): a plain `Arc<AtomicBool>` flag gives the
//! cheap check, `Notify` gives the prompt wakeup, and `tokio::select!`
//! polls the watched future against it so every time that future is
//! resumed after an internal `.await`, cancellation gets a chance to win.

use std::{
    fmt,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tokio::sync::Notify;

/// A shared handle that can cancel one or more in-flight executions.
///
/// Cloning shares the same underlying cancellation state -- every clone
/// observes and can trigger the same cancellation.
#[derive(Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
    reason: Arc<std::sync::Mutex<Option<String>>>,
    notify: Arc<Notify>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Message used for a [`Cancelled`] error when [`CancellationToken::cancel`]
/// was called with no reason, per §8 property 6 ("a canonical abort message
/// when reason is absent").
pub const CANCELLED_CANONICAL_MESSAGE: &str = "Execution was cancelled.";

impl CancellationToken {
    /// Constructs a fresh, not-yet-cancelled token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            reason: Arc::new(std::sync::Mutex::new(None)),
            notify: Arc::new(Notify::new()),
        }
    }

    /// Marks this token (and all of its clones) as cancelled, waking any
    /// execution currently racing against it, with no specific reason
    /// (observers get [`CANCELLED_CANONICAL_MESSAGE`]).
    pub fn cancel(&self) {
        self.cancel_with_reason(None);
    }

    /// Marks this token as cancelled with a specific `reason`, which
    /// becomes the message of the [`Cancelled`] error every waiter
    /// observes (§4.9, §8 property 6's "abort reason").
    pub fn cancel_with_reason(&self, reason: Option<String>) {
        *self.reason.lock().unwrap() = reason;
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// The reason this token was cancelled with, if any and if it has been
    /// cancelled at all.
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().unwrap().clone()
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Runs `future` to completion, unless this token is (or becomes)
    /// cancelled first, in which case the race resolves to
    /// [`Cancelled`] and `future` is dropped.
    pub async fn race<Fut: Future>(&self, future: Fut) -> Result<Fut::Output, Cancelled> {
        if self.is_cancelled() {
            return Err(self.cancelled_error());
        }
        tokio::select! {
            biased;
            () = self.cancelled_fut() => Err(self.cancelled_error()),
            output = future => Ok(output),
        }
    }

    fn cancelled_error(&self) -> Cancelled {
        Cancelled {
            reason: self.reason(),
        }
    }

    async fn cancelled_fut(&self) {
        while !self.is_cancelled() {
            self.notify.notified().await;
        }
    }
}

/// Raised in place of whatever a field, or a whole operation, was in the
/// middle of producing when its [`CancellationToken`] was cancelled.
///
/// Already-completed sibling fields and already-delivered incremental
/// records are left alone (§4.9 edge case): only the in-flight work that
/// lost the race is replaced with this error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Cancelled {
    reason: Option<String>,
}

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => f.write_str(reason),
            None => f.write_str(CANCELLED_CANONICAL_MESSAGE),
        }
    }
}

impl std::error::Error for Cancelled {}

impl From<Cancelled> for crate::error::FieldError {
    fn from(c: Cancelled) -> Self {
        crate::error::FieldError::wrap(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn race_returns_output_when_not_cancelled() {
        let token = CancellationToken::new();
        let result = token.race(async { 42 }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn race_returns_cancelled_when_token_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let result = token.race(async { 42 }).await;
        assert_eq!(result, Err(Cancelled::default()));
    }

    #[tokio::test]
    async fn cancelled_error_carries_the_given_reason() {
        let token = CancellationToken::new();
        token.cancel_with_reason(Some("Aborted".to_owned()));
        let result = token.race(async { 42 }).await;
        assert_eq!(result.unwrap_err().to_string(), "Aborted");
    }

    #[tokio::test]
    async fn cancelled_error_uses_canonical_message_without_a_reason() {
        let token = CancellationToken::new();
        token.cancel();
        let result = token.race(async { 42 }).await;
        assert_eq!(result.unwrap_err().to_string(), CANCELLED_CANONICAL_MESSAGE);
    }

    #[tokio::test]
    async fn race_is_interrupted_by_a_concurrent_cancel() {
        let token = CancellationToken::new();
        let racer = token.clone();
        let handle = tokio::spawn(async move {
            racer
                .race(async {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    "finished"
                })
                .await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
        let result = handle.await.unwrap();
        assert_eq!(result, Err(Cancelled::default()));
    }
}
