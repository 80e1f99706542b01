//! Retrying, tolerance-escalating submission.
//!
//! A [`Submitter`] runs one operation up to [`RetryPolicy::max_attempts`] times.
//! Every failed attempt widens the slippage [`Tolerance`] by a fixed step (capped
//! at a ceiling) and waits a fixed delay before the next one. The first success
//! is returned as-is; when every attempt fails the last error comes back wrapped
//! in [`RetryError::RetriesExhausted`].
//!
//! Attempts are strictly sequential. Both the submission and the delay are
//! `.await` points, so a submitter never blocks its executor thread.
//!
//! ```rust
//! # use swapkit_sdk::retry::{RetryPolicy, Submitter, Tolerance};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let policy = RetryPolicy::new(3).with_delay_ms(0);
//! let submitter = Submitter::new(policy);
//! let sig = submitter
//!     .submit_with("swap", |attempt| async move {
//!         if attempt.tolerance < Tolerance::from_bps(100) {
//!             Err("slippage exceeded")
//!         } else {
//!             Ok("5h3Vw…signature")
//!         }
//!     })
//!     .await
//!     .unwrap();
//! assert_eq!(sig, "5h3Vw…signature");
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

// ─── Tolerance ────────────────────────────────────────────────────────────────

/// Basis-point denominator: 10 000 bps = 100 %.
pub const BPS_PER_UNIT: u16 = 10_000;

/// A slippage tolerance in basis points (1 bp = 0.01 %).
///
/// Integer bps keep the escalation schedule exact: 0.5 % + 0.5 % is always
/// 1.0 %, never 0.9999….
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Tolerance(u16);

impl Tolerance {
    pub const ZERO: Tolerance = Tolerance(0);
    pub const MAX: Tolerance = Tolerance(BPS_PER_UNIT);

    /// Build from basis points, clamped to 100 %.
    pub const fn from_bps(bps: u16) -> Self {
        if bps > BPS_PER_UNIT {
            Tolerance(BPS_PER_UNIT)
        } else {
            Tolerance(bps)
        }
    }

    /// Build from a percentage (`0.5` → 50 bps), rounded to the nearest bp.
    ///
    /// Negative and NaN inputs become zero; anything above 100 % is clamped.
    pub fn from_pct(pct: f64) -> Self {
        if pct.is_nan() || pct <= 0.0 {
            return Tolerance::ZERO;
        }
        let bps = (pct * 100.0).round();
        if bps >= BPS_PER_UNIT as f64 {
            Tolerance::MAX
        } else {
            Tolerance(bps as u16)
        }
    }

    pub const fn bps(self) -> u16 {
        self.0
    }

    pub fn pct(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.pct())
    }
}

// ─── Policy ───────────────────────────────────────────────────────────────────

/// How many times to try, how far to widen tolerance, and how long to wait.
///
/// Deserializes with defaults for any missing field, so an agent config can
/// override just `max_attempts` or just `delay_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts:   u32,
    pub base_tolerance: Tolerance,
    pub tolerance_step: Tolerance,
    pub max_tolerance:  Tolerance,
    pub delay_ms:       u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts:   3,
            base_tolerance: Tolerance::from_bps(50),
            tolerance_step: Tolerance::from_bps(50),
            max_tolerance:  Tolerance::from_bps(500),
            delay_ms:       2_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts, ..Default::default() }
    }

    pub fn with_base_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.base_tolerance = tolerance;
        self
    }

    pub fn with_tolerance_step(mut self, step: Tolerance) -> Self {
        self.tolerance_step = step;
        self
    }

    pub fn with_max_tolerance(mut self, ceiling: Tolerance) -> Self {
        self.max_tolerance = ceiling;
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Sub-millisecond precision is dropped.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.with_delay_ms(delay.as_millis().min(u64::MAX as u128) as u64)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Reject policies that could never submit, would retry at an unchanged
    /// tolerance, or could never honour the ceiling.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.max_attempts == 0 {
            return Err(PolicyError::ZeroAttempts);
        }
        if self.max_attempts > 1 && self.tolerance_step == Tolerance::ZERO {
            return Err(PolicyError::ZeroStep);
        }
        if self.max_tolerance < self.base_tolerance {
            return Err(PolicyError::CeilingBelowBase {
                base:    self.base_tolerance,
                ceiling: self.max_tolerance,
            });
        }
        Ok(())
    }

    /// Tolerance used on the 1-based `attempt`.
    ///
    /// `base + step × (attempt − 1)`, capped at `max_tolerance`.
    pub fn tolerance_for(&self, attempt: u32) -> Tolerance {
        let widened = (self.tolerance_step.bps() as u64)
            .saturating_mul(attempt.saturating_sub(1) as u64)
            .saturating_add(self.base_tolerance.bps() as u64);
        let capped = widened.min(self.max_tolerance.bps() as u64);
        Tolerance::from_bps(capped as u16)
    }
}

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("max_attempts must be at least 1")]
    ZeroAttempts,

    #[error("tolerance_step must be above zero when retrying")]
    ZeroStep,

    #[error("max tolerance {ceiling} is below the base tolerance {base}")]
    CeilingBelowBase { base: Tolerance, ceiling: Tolerance },
}

/// Failure surfaced by a [`Submitter`].
///
/// Intermediate failures never reach the caller; they are logged and retried.
#[derive(Debug, thiserror::Error)]
pub enum RetryError<E> {
    #[error("invalid retry policy: {0}")]
    InvalidPolicy(#[from] PolicyError),

    #[error("{operation} failed after {attempts} attempts (last tolerance {last_tolerance}): {source}")]
    RetriesExhausted {
        operation:      String,
        attempts:       u32,
        last_tolerance: Tolerance,
        #[source]
        source:         E,
    },
}

impl<E> RetryError<E> {
    /// The last underlying failure, if retries were actually attempted.
    pub fn last_error(&self) -> Option<&E> {
        match self {
            RetryError::RetriesExhausted { source, .. } => Some(source),
            RetryError::InvalidPolicy(_) => None,
        }
    }

    pub fn into_last_error(self) -> Option<E> {
        match self {
            RetryError::RetriesExhausted { source, .. } => Some(source),
            RetryError::InvalidPolicy(_) => None,
        }
    }
}

// ─── Attempt context ──────────────────────────────────────────────────────────

/// Per-call key shared by every attempt of one [`Submitter`] invocation.
///
/// Operations can attach it to whatever they submit (memo, client order id,
/// log field) so duplicates of the same logical request can be recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdempotencyKey(u128);

impl IdempotencyKey {
    pub fn generate() -> Self {
        IdempotencyKey(rand::random())
    }

    pub const fn from_u128(raw: u128) -> Self {
        IdempotencyKey(raw)
    }

    pub const fn as_u128(self) -> u128 {
        self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// What an operation sees on each try.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number:       u32,
    pub max_attempts: u32,
    pub tolerance:    Tolerance,
    pub key:          IdempotencyKey,
}

impl Attempt {
    pub fn is_last(&self) -> bool {
        self.number >= self.max_attempts
    }
}

// ─── Operation ────────────────────────────────────────────────────────────────

/// A unit of work the [`Submitter`] can retry.
#[async_trait]
pub trait Operation: Send + Sync {
    type Output: Send;
    type Error: fmt::Display + Send;

    /// Short name used in logs and in [`RetryError::RetriesExhausted`].
    fn label(&self) -> &str {
        "operation"
    }

    /// Build and submit the work at `attempt.tolerance`.
    async fn attempt(&self, attempt: Attempt) -> Result<Self::Output, Self::Error>;

    /// Called before every retry. Return `Some` if an earlier attempt that
    /// reported failure actually took effect remotely; the submitter then
    /// returns it instead of submitting a duplicate.
    async fn reconcile(&self) -> Result<Option<Self::Output>, Self::Error> {
        Ok(None)
    }
}

// ─── Submitter ────────────────────────────────────────────────────────────────

/// Runs operations under a [`RetryPolicy`]. Holds no per-call state.
#[derive(Debug, Clone, Default)]
pub struct Submitter {
    policy: RetryPolicy,
}

impl Submitter {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Retry an [`Operation`], consulting its `reconcile` hook between attempts.
    pub async fn submit<O>(&self, op: &O) -> Result<O::Output, RetryError<O::Error>>
    where
        O: Operation,
    {
        self.drive(op.label(), |attempt| op.attempt(attempt), || op.reconcile())
            .await
    }

    /// Retry a closure. There is no reconcile step.
    pub async fn submit_with<T, E, F, Fut>(
        &self,
        label: &str,
        operation: F,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
    {
        self.drive(label, operation, || async { Ok(None) }).await
    }

    async fn drive<T, E, A, AF, R, RF>(
        &self,
        label: &str,
        mut operation: A,
        mut reconcile: R,
    ) -> Result<T, RetryError<E>>
    where
        A: FnMut(Attempt) -> AF,
        AF: Future<Output = Result<T, E>>,
        R: FnMut() -> RF,
        RF: Future<Output = Result<Option<T>, E>>,
        E: fmt::Display,
    {
        self.policy.validate()?;

        let max_attempts = self.policy.max_attempts;
        let key = IdempotencyKey::generate();
        let mut number = 1;

        loop {
            let tolerance = self.policy.tolerance_for(number);
            info!(
                operation = label,
                attempt = number,
                max_attempts,
                tolerance_bps = tolerance.bps(),
                %key,
                "submitting {label} (attempt {number}/{max_attempts}, tolerance {tolerance})"
            );

            let attempt = Attempt { number, max_attempts, tolerance, key };
            let err = match operation(attempt).await {
                Ok(value) => {
                    if number > 1 {
                        info!(operation = label, attempt = number, %key, "{label} succeeded on attempt {number}");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            if number >= max_attempts {
                error!(
                    operation = label,
                    attempts = number,
                    tolerance_bps = tolerance.bps(),
                    %key,
                    "{label} failed after {number} attempts: {err}"
                );
                return Err(RetryError::RetriesExhausted {
                    operation:      label.to_string(),
                    attempts:       number,
                    last_tolerance: tolerance,
                    source:         err,
                });
            }

            let delay = self.policy.delay();
            warn!(
                operation = label,
                attempt = number,
                max_attempts,
                tolerance_bps = tolerance.bps(),
                %key,
                "{label} attempt {number}/{max_attempts} failed: {err}; retrying in {delay:?}"
            );
            tokio::time::sleep(delay).await;

            match reconcile().await {
                Ok(Some(value)) => {
                    info!(operation = label, attempt = number, %key, "earlier {label} attempt landed; not resubmitting");
                    return Ok(value);
                }
                Ok(None) => {}
                Err(e) => debug!(operation = label, %key, "reconcile check failed, resubmitting: {e}"),
            }

            number += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerance_from_pct_rounds_and_clamps() {
        assert_eq!(Tolerance::from_pct(0.5).bps(), 50);
        assert_eq!(Tolerance::from_pct(1.234).bps(), 123);
        assert_eq!(Tolerance::from_pct(-1.0), Tolerance::ZERO);
        assert_eq!(Tolerance::from_pct(f64::NAN), Tolerance::ZERO);
        assert_eq!(Tolerance::from_pct(250.0), Tolerance::MAX);
        assert_eq!(Tolerance::from_bps(20_000), Tolerance::MAX);
    }

    #[test]
    fn tolerance_displays_as_percent() {
        assert_eq!(Tolerance::from_bps(150).to_string(), "1.50%");
    }

    #[test]
    fn schedule_steps_then_caps() {
        let policy = RetryPolicy::new(20);
        let bps: Vec<u16> = (1..=12).map(|n| policy.tolerance_for(n).bps()).collect();
        assert_eq!(bps, vec![50, 100, 150, 200, 250, 300, 350, 400, 450, 500, 500, 500]);
        assert_eq!(policy.tolerance_for(u32::MAX), Tolerance::from_bps(500));
    }

    #[test]
    fn validate_rejects_unusable_policies() {
        assert_eq!(RetryPolicy::new(0).validate(), Err(PolicyError::ZeroAttempts));
        let inverted = RetryPolicy::default()
            .with_base_tolerance(Tolerance::from_bps(600))
            .with_max_tolerance(Tolerance::from_bps(500));
        assert!(matches!(inverted.validate(), Err(PolicyError::CeilingBelowBase { .. })));
        assert!(RetryPolicy::default().validate().is_ok());
    }

    #[test]
    fn zero_step_is_only_allowed_without_retries() {
        let flat = RetryPolicy::new(3).with_tolerance_step(Tolerance::ZERO);
        assert_eq!(flat.validate(), Err(PolicyError::ZeroStep));
        let single = RetryPolicy::new(1).with_tolerance_step(Tolerance::ZERO);
        assert!(single.validate().is_ok());
    }

    #[test]
    fn schedule_strictly_widens_until_the_ceiling() {
        let policy = RetryPolicy::new(8)
            .with_base_tolerance(Tolerance::from_bps(10))
            .with_tolerance_step(Tolerance::from_bps(1))
            .with_max_tolerance(Tolerance::from_bps(14));
        policy.validate().unwrap();
        let bps: Vec<u16> = (1..=8).map(|n| policy.tolerance_for(n).bps()).collect();
        assert_eq!(bps, vec![10, 11, 12, 13, 14, 14, 14, 14]);
    }

    #[test]
    fn policy_deserializes_with_defaults() {
        let policy: RetryPolicy = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_tolerance, Tolerance::from_bps(50));
        assert_eq!(policy.delay(), Duration::from_millis(2_000));
    }

    #[test]
    fn idempotency_key_is_fixed_width_hex() {
        assert_eq!(IdempotencyKey::from_u128(0xab).to_string().len(), 32);
    }
}
