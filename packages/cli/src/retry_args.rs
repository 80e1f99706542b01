use anyhow::{anyhow, Result};
use clap::Args;
use swapkit_sdk::{RetryPolicy, Tolerance};

/// Retry and slippage-escalation flags shared by `convert` and `provide`.
#[derive(Debug, Clone, Args)]
pub struct RetryArgs {
    /// Attempts before giving up (1 = send once, no retry)
    #[arg(long, value_name = "N", default_value_t = 3, env = "SWAPKIT_MAX_ATTEMPTS")]
    pub max_attempts: u32,

    /// Slippage tolerance of the first attempt, in percent
    #[arg(long, value_name = "PCT", default_value_t = 0.5, env = "SWAPKIT_SLIPPAGE")]
    pub slippage: f64,

    /// Added to the tolerance after each failed attempt, in percent (above 0 when retrying)
    #[arg(long, value_name = "PCT", default_value_t = 0.5, env = "SWAPKIT_SLIPPAGE_STEP")]
    pub slippage_step: f64,

    /// Tolerance never escalates past this, in percent
    #[arg(long, value_name = "PCT", default_value_t = 5.0, env = "SWAPKIT_MAX_SLIPPAGE")]
    pub max_slippage: f64,

    /// Pause between attempts, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 2_000, env = "SWAPKIT_RETRY_DELAY_MS")]
    pub retry_delay_ms: u64,
}

impl RetryArgs {
    pub fn policy(&self) -> Result<RetryPolicy> {
        for (flag, pct) in [
            ("--slippage", self.slippage),
            ("--slippage-step", self.slippage_step),
            ("--max-slippage", self.max_slippage),
        ] {
            if !(0.0..=100.0).contains(&pct) {
                return Err(anyhow!("{flag} {pct} is out of range. Use 0–100 (percent)."));
            }
        }
        let policy = RetryPolicy::new(self.max_attempts)
            .with_base_tolerance(Tolerance::from_pct(self.slippage))
            .with_tolerance_step(Tolerance::from_pct(self.slippage_step))
            .with_max_tolerance(Tolerance::from_pct(self.max_slippage))
            .with_delay_ms(self.retry_delay_ms);
        policy.validate()?;
        Ok(policy)
    }
}
