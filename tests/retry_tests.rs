//! Tests for retry classification, backoff and the retry engine.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use llmux::error::LlmuxError;
use llmux::util::context::CallContext;
use llmux::util::retry::{
    is_retryable_status, AttemptResponse, Outcome, RetryError, RetryPolicy, MAX_RETRIES,
};
use tokio::time::Instant;

/// Canned response that records whether it was discarded.
#[derive(Debug)]
struct FakeResponse {
    status: u16,
    discarded: Arc<AtomicUsize>,
}

#[async_trait]
impl AttemptResponse for FakeResponse {
    fn status(&self) -> u16 {
        self.status
    }

    async fn discard(self) {
        self.discarded.fetch_add(1, Ordering::SeqCst);
    }
}

/// Serves a scripted sequence of attempt results, counting calls.
#[derive(Clone)]
struct Script {
    steps: Arc<Mutex<VecDeque<Option<u16>>>>,
    calls: Arc<AtomicUsize>,
    discarded: Arc<AtomicUsize>,
}

impl Script {
    /// `None` entries simulate transport failures.
    fn new(steps: &[Option<u16>]) -> Self {
        Self {
            steps: Arc::new(Mutex::new(steps.iter().copied().collect())),
            calls: Arc::new(AtomicUsize::new(0)),
            discarded: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn attempt(&self) -> impl std::future::Future<Output = Result<FakeResponse, LlmuxError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front().flatten();
        let discarded = self.discarded.clone();
        async move {
            match step {
                Some(status) => Ok(FakeResponse { status, discarded }),
                None => Err(LlmuxError::Configuration("simulated transport failure".into())),
            }
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[test]
fn classifies_statuses() {
    for status in [429, 500, 502, 503, 504, 599] {
        assert!(is_retryable_status(status), "{status} should retry");
    }
    for status in [200, 201, 301, 400, 401, 403, 404, 422, 600] {
        assert!(!is_retryable_status(status), "{status} should not retry");
    }
}

#[test]
fn retry_count_is_clamped() {
    assert_eq!(RetryPolicy::new(10).max_retries(), MAX_RETRIES);
    assert_eq!(RetryPolicy::new(2).max_retries(), 2);
    assert_eq!(RetryPolicy::default().max_retries(), 3);
}

#[test]
fn first_attempt_never_waits() {
    assert_eq!(RetryPolicy::default().backoff(0), Duration::ZERO);
}

#[test]
fn backoff_grows_by_three_with_bounded_jitter() {
    let policy = RetryPolicy::default();
    for attempt in 1..=4u32 {
        let nominal = 3f64.powi(attempt as i32);
        for _ in 0..50 {
            let wait = policy.backoff(attempt).as_secs_f64();
            assert!(
                wait >= nominal * 0.9 - 1e-9 && wait <= nominal * 1.1 + 1e-9,
                "attempt {attempt}: {wait}s outside [{}, {}]",
                nominal * 0.9,
                nominal * 1.1
            );
        }
    }
}

#[test]
fn backoff_scales_with_base_delay() {
    let policy = RetryPolicy::new(3).with_base_delay(Duration::from_millis(10));
    let wait = policy.backoff(2);
    assert!(wait >= Duration::from_millis(80) && wait <= Duration::from_millis(100));
}

#[test]
fn decide_honours_budget_and_classification() {
    let policy = RetryPolicy::new(2);

    assert!(policy.decide(0, Outcome::Status(503)).should_retry);
    assert!(policy.decide(1, Outcome::Transport).should_retry);
    assert!(!policy.decide(2, Outcome::Status(503)).should_retry);
    assert!(!policy.decide(0, Outcome::Status(400)).should_retry);

    let stop = policy.decide(0, Outcome::Status(200));
    assert!(!stop.should_retry);
    assert_eq!(stop.wait, Duration::ZERO);
}

#[test]
fn zero_retries_means_one_attempt() {
    let policy = RetryPolicy::new(0);
    assert!(!policy.decide(0, Outcome::Status(503)).should_retry);
    assert!(!policy.decide(0, Outcome::Transport).should_retry);
}

#[tokio::test(start_paused = true)]
async fn retries_until_a_final_status() {
    let script = Script::new(&[Some(503), Some(429), Some(200)]);
    let policy = RetryPolicy::new(3);

    let response = policy
        .execute(&CallContext::new(), || script.attempt())
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(script.calls(), 3);
    assert_eq!(script.discarded.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn exhausted_status_is_returned_not_discarded() {
    let script = Script::new(&[Some(500), Some(500), Some(500)]);
    let policy = RetryPolicy::new(2);

    let response = policy
        .execute(&CallContext::new(), || script.attempt())
        .await
        .unwrap();

    assert_eq!(response.status, 500);
    assert_eq!(script.calls(), 3);
    assert_eq!(script.discarded.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_status_returns_immediately() {
    let script = Script::new(&[Some(404), Some(200)]);

    let response = RetryPolicy::new(5)
        .execute(&CallContext::new(), || script.attempt())
        .await
        .unwrap();

    assert_eq!(response.status, 404);
    assert_eq!(script.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn transport_failures_exhaust_with_last_error() {
    let script = Script::new(&[None, None]);

    let err = RetryPolicy::new(1)
        .execute(&CallContext::new(), || script.attempt())
        .await
        .unwrap_err();

    assert!(matches!(err, RetryError::Exhausted(LlmuxError::Configuration(_))));
    assert_eq!(script.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn waits_follow_the_backoff_schedule() {
    let script = Script::new(&[Some(503), Some(503), Some(200)]);
    let started = Instant::now();

    RetryPolicy::new(3)
        .execute(&CallContext::new(), || script.attempt())
        .await
        .unwrap();

    // 3s and 9s nominal, each within +/-10%.
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs_f64(10.8), "{elapsed:?}");
    assert!(elapsed <= Duration::from_secs_f64(13.2), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn cancelled_context_makes_no_attempt() {
    let script = Script::new(&[Some(200)]);
    let ctx = CallContext::new();
    ctx.cancel();

    let err = RetryPolicy::default()
        .execute(&ctx, || script.attempt())
        .await
        .unwrap_err();

    assert!(matches!(err, RetryError::Cancelled(LlmuxError::Cancelled)));
    assert_eq!(script.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_during_backoff_stops_retrying() {
    let script = Script::new(&[Some(503), Some(200)]);
    let ctx = CallContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let err = RetryPolicy::new(3)
        .execute(&ctx, || script.attempt())
        .await
        .unwrap_err();

    assert!(matches!(err, RetryError::Cancelled(LlmuxError::Cancelled)));
    assert_eq!(script.calls(), 1);
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn deadline_during_backoff_reports_deadline() {
    let script = Script::new(&[Some(503), Some(200)]);
    let ctx = CallContext::with_timeout(Duration::from_secs(1));

    let err = RetryPolicy::new(3)
        .execute(&ctx, || script.attempt())
        .await
        .unwrap_err();

    assert!(matches!(err.into_inner(), LlmuxError::DeadlineExceeded));
    assert_eq!(script.calls(), 1);
}
