use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use swapkit_sdk::retry::{
    Attempt, IdempotencyKey, Operation, PolicyError, RetryError, RetryPolicy, Submitter, Tolerance,
};

fn bps(values: &Mutex<Vec<u16>>) -> Vec<u16> {
    values.lock().unwrap().clone()
}

#[tokio::test(start_paused = true)]
async fn succeeds_on_third_attempt_with_escalated_tolerance() {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let submitter = Submitter::new(RetryPolicy::default());

    let result = submitter
        .submit_with("swap", |attempt| {
            let calls = calls.clone();
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(attempt.tolerance.bps());
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(format!("slippage exceeded on attempt {n}"))
                } else {
                    Ok("sig-3")
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), "sig-3");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(bps(&seen), vec![50, 100, 150]);
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_wrap_the_last_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let submitter = Submitter::new(RetryPolicy::default());

    let result: Result<(), _> = submitter
        .submit_with("swap", |attempt| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(format!("rejected at {}", attempt.number))
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    match result {
        Err(RetryError::RetriesExhausted { operation, attempts, last_tolerance, source }) => {
            assert_eq!(operation, "swap");
            assert_eq!(attempts, 3);
            assert_eq!(last_tolerance, Tolerance::from_bps(150));
            assert_eq!(source, "rejected at 3");
        }
        other => panic!("expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn first_success_is_returned_without_delay() {
    let calls = Arc::new(AtomicUsize::new(0));
    let submitter = Submitter::new(RetryPolicy::default());
    let start = tokio::time::Instant::now();

    let result = submitter
        .submit_with("swap", |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, String>(7)
            }
        })
        .await;

    assert_eq!(result.unwrap(), 7);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn waits_the_fixed_delay_between_attempts_only() {
    let submitter = Submitter::new(RetryPolicy::new(4).with_delay_ms(2_000));
    let start = tokio::time::Instant::now();

    let _: Result<(), _> = submitter
        .submit_with("swap", |_| async { Err("busy") })
        .await;

    // Three gaps between four attempts, none after the last.
    assert_eq!(start.elapsed(), Duration::from_millis(6_000));
}

#[tokio::test(start_paused = true)]
async fn tolerance_is_capped_at_the_ceiling() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let policy = RetryPolicy::new(6)
        .with_base_tolerance(Tolerance::from_pct(1.0))
        .with_tolerance_step(Tolerance::from_pct(1.5))
        .with_max_tolerance(Tolerance::from_pct(5.0))
        .with_delay_ms(10);

    let result: Result<(), _> = Submitter::new(policy)
        .submit_with("swap", |attempt| {
            let seen = seen.clone();
            async move {
                seen.lock().unwrap().push(attempt.tolerance.bps());
                Err("slippage")
            }
        })
        .await;

    assert_eq!(bps(&seen), vec![100, 250, 400, 500, 500, 500]);
    assert!(matches!(
        result,
        Err(RetryError::RetriesExhausted { attempts: 6, last_tolerance, .. })
            if last_tolerance == Tolerance::from_bps(500)
    ));
}

#[tokio::test(start_paused = true)]
async fn single_attempt_policy_never_sleeps() {
    let calls = Arc::new(AtomicUsize::new(0));
    let start = tokio::time::Instant::now();

    let result: Result<(), _> = Submitter::new(RetryPolicy::new(1))
        .submit_with("swap", |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("nope")
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(start.elapsed(), Duration::ZERO);
    assert_eq!(result.unwrap_err().into_last_error(), Some("nope"));
}

#[tokio::test]
async fn invalid_policy_fails_before_any_attempt() {
    let calls = Arc::new(AtomicUsize::new(0));

    let result: Result<(), RetryError<&str>> = Submitter::new(RetryPolicy::new(0))
        .submit_with("swap", |_| {
            let calls = calls.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(matches!(result, Err(RetryError::InvalidPolicy(PolicyError::ZeroAttempts))));
}

// ─── Operation + reconcile ────────────────────────────────────────────────────

/// Every send "times out", but the send at index `lands_on` really landed.
struct FlakySend {
    lands_on: usize,
    sends:    AtomicUsize,
    keys:     Mutex<Vec<IdempotencyKey>>,
}

impl FlakySend {
    fn new(lands_on: usize) -> Self {
        Self { lands_on, sends: AtomicUsize::new(0), keys: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl Operation for FlakySend {
    type Output = String;
    type Error = String;

    fn label(&self) -> &str {
        "flaky_send"
    }

    async fn attempt(&self, attempt: Attempt) -> Result<String, String> {
        self.keys.lock().unwrap().push(attempt.key);
        self.sends.fetch_add(1, Ordering::SeqCst);
        Err(format!("confirmation timed out (attempt {})", attempt.number))
    }

    async fn reconcile(&self) -> Result<Option<String>, String> {
        let sends = self.sends.load(Ordering::SeqCst);
        if sends >= self.lands_on {
            Ok(Some(format!("sig-{}", self.lands_on)))
        } else {
            Ok(None)
        }
    }
}

#[tokio::test(start_paused = true)]
async fn reconcile_returns_landed_result_instead_of_resending() {
    let op = FlakySend::new(1);
    let result = Submitter::new(RetryPolicy::default()).submit(&op).await;

    assert_eq!(result.unwrap(), "sig-1");
    assert_eq!(op.sends.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn reconcile_miss_leads_to_next_attempt_with_same_key() {
    let op = FlakySend::new(2);
    let result = Submitter::new(RetryPolicy::default()).submit(&op).await;

    assert_eq!(result.unwrap(), "sig-2");
    assert_eq!(op.sends.load(Ordering::SeqCst), 2);
    let keys = op.keys.lock().unwrap();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], keys[1]);
}

#[tokio::test(start_paused = true)]
async fn reconcile_is_not_consulted_after_the_last_attempt() {
    // Would land after the third send, but there is no retry left to check it.
    let op = FlakySend::new(3);
    let result = Submitter::new(RetryPolicy::default()).submit(&op).await;

    assert_eq!(op.sends.load(Ordering::SeqCst), 3);
    let err = result.unwrap_err();
    assert_eq!(err.last_error().map(String::as_str), Some("confirmation timed out (attempt 3)"));
    assert!(err.to_string().starts_with("flaky_send failed after 3 attempts"));
}

#[tokio::test(start_paused = true)]
async fn separate_submissions_get_separate_keys() {
    let first = FlakySend::new(1);
    let second = FlakySend::new(1);
    let submitter = Submitter::new(RetryPolicy::default());
    submitter.submit(&first).await.unwrap();
    submitter.submit(&second).await.unwrap();

    assert_ne!(first.keys.lock().unwrap()[0], second.keys.lock().unwrap()[0]);
}
