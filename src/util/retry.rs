//! Retry with exponential backoff and jitter.
//!
//! Attempt `n` (zero-based) waits `base_delay * 3^n`, scaled by a uniform
//! jitter in `[0.9, 1.1]`. The first attempt never waits.

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::rngs::{OsRng, StdRng};
use rand::{Rng, SeedableRng};

use crate::error::LlmuxError;
use crate::util::context::CallContext;

/// Hard ceiling on retries, regardless of what the caller asks for.
pub const MAX_RETRIES: u32 = 5;

const BACKOFF_FACTOR: f64 = 3.0;
const JITTER_MIN: f64 = 0.9;
const JITTER_MAX: f64 = 1.1;

/// Whether an HTTP status is worth another attempt.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..=599).contains(&status)
}

/// Result of a single attempt, as seen by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The service answered with this status.
    Status(u16),
    /// No response at all (DNS, refused connection, reset).
    Transport,
}

/// What to do after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub should_retry: bool,
    pub wait: Duration,
}

/// Why [`RetryPolicy::execute`] gave up without a response.
#[derive(Debug)]
pub enum RetryError {
    /// The call context was cancelled or timed out.
    Cancelled(LlmuxError),
    /// Every attempt failed at the transport level; holds the last failure.
    Exhausted(LlmuxError),
}

impl RetryError {
    pub fn into_inner(self) -> LlmuxError {
        match self {
            Self::Cancelled(err) | Self::Exhausted(err) => err,
        }
    }
}

/// A response the retry engine can inspect and throw away.
#[async_trait]
pub trait AttemptResponse: Send + Sized {
    fn status(&self) -> u16;

    /// Drain and release the response so its connection can be reused.
    async fn discard(self);
}

#[async_trait]
impl AttemptResponse for reqwest::Response {
    fn status(&self) -> u16 {
        reqwest::Response::status(self).as_u16()
    }

    async fn discard(self) {
        let _ = self.bytes().await;
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_RETRIES)
    }
}

impl RetryPolicy {
    /// Policy allowing `max_retries` retries after the first attempt.
    ///
    /// Values above [`MAX_RETRIES`] are clamped; `0` means a single attempt.
    pub fn new(max_retries: u32) -> Self {
        if max_retries > MAX_RETRIES {
            tracing::warn!(
                requested = max_retries,
                ceiling = MAX_RETRIES,
                "Retry count clamped"
            );
        }
        Self {
            max_retries: max_retries.min(MAX_RETRIES),
            base_delay: Duration::from_secs(1),
        }
    }

    /// Scale the whole backoff schedule. The default unit is one second.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Delay before attempt `attempt`; zero for the first attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * BACKOFF_FACTOR.powi(exponent) * jitter_factor();
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Classify the outcome of attempt `attempt` (zero-based).
    pub fn decide(&self, attempt: u32, outcome: Outcome) -> RetryDecision {
        let retryable = match outcome {
            Outcome::Status(status) => is_retryable_status(status),
            Outcome::Transport => true,
        };
        if !retryable || attempt >= self.max_retries {
            return RetryDecision {
                should_retry: false,
                wait: Duration::ZERO,
            };
        }
        RetryDecision {
            should_retry: true,
            wait: self.backoff(attempt + 1),
        }
    }

    /// Run `operation` until it yields a final response, the attempt budget is
    /// spent, or `ctx` is done.
    ///
    /// A response with a retryable status is returned as-is once retries are
    /// exhausted, so the caller can still read its body.
    pub async fn execute<F, Fut, R, E>(
        &self,
        ctx: &CallContext,
        mut operation: F,
    ) -> Result<R, RetryError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<R, E>>,
        R: AttemptResponse,
        E: Into<LlmuxError>,
    {
        let mut attempt = 0;
        loop {
            if let Some(err) = ctx.err() {
                return Err(RetryError::Cancelled(err));
            }

            let result = ctx.run(operation()).await.map_err(RetryError::Cancelled)?;
            if let Some(err) = ctx.err() {
                return Err(RetryError::Cancelled(err));
            }

            let decision = match &result {
                Ok(response) => self.decide(attempt, Outcome::Status(response.status())),
                Err(_) => self.decide(attempt, Outcome::Transport),
            };

            match result {
                Ok(response) if !decision.should_retry => return Ok(response),
                Ok(response) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        status = response.status(),
                        wait_ms = decision.wait.as_millis() as u64,
                        "Retrying after retryable status"
                    );
                    ctx.run(response.discard())
                        .await
                        .map_err(RetryError::Cancelled)?;
                }
                Err(err) => {
                    let err: LlmuxError = err.into();
                    if !decision.should_retry {
                        return Err(RetryError::Exhausted(err));
                    }
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %err,
                        wait_ms = decision.wait.as_millis() as u64,
                        "Retrying after transport error"
                    );
                }
            }

            ctx.sleep(decision.wait)
                .await
                .map_err(RetryError::Cancelled)?;
            attempt += 1;
        }
    }
}

fn jitter_factor() -> f64 {
    jitter_rng().gen_range(JITTER_MIN..=JITTER_MAX)
}

/// OS-seeded generator, falling back to a clock-derived seed.
fn jitter_rng() -> StdRng {
    StdRng::from_rng(OsRng).unwrap_or_else(|_| {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        StdRng::seed_from_u64(nanos as u64)
    })
}
