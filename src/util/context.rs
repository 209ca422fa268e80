//! Per-call cancellation and deadline handling.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::LlmuxError;

/// Cancellation scope for one logical call.
///
/// Cloning shares the underlying token, so cancelling any clone cancels them
/// all. A deadline, when set, behaves like a cancellation that fires on its
/// own and surfaces as [`LlmuxError::DeadlineExceeded`].
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Wrap an existing token, e.g. one shared with other tasks.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// The cancellation error, if this context is already done.
    pub fn err(&self) -> Option<LlmuxError> {
        if self.token.is_cancelled() {
            return Some(LlmuxError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(LlmuxError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> LlmuxError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => LlmuxError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => LlmuxError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                LlmuxError::Cancelled
            }
        }
    }

    /// Drive `future` unless the context finishes first, in which case the
    /// future is dropped without being polled again.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, LlmuxError> {
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = future => Ok(output),
        }
    }

    /// Sleep for `duration`, returning early with an error on cancellation.
    pub async fn sleep(&self, duration: Duration) -> Result<(), LlmuxError> {
        if duration.is_zero() {
            return self.err().map_or(Ok(()), Err);
        }
        self.run(tokio::time::sleep(duration)).await
    }
}
