//! Parameter and result types for [`crate::SwapClient`].
//!
//! Result types serialize with keys as base-58 strings so they can be printed
//! straight to JSON by agents and the CLI.

use serde::{Serialize, Serializer};
use solana_sdk::pubkey::Pubkey;

use crate::retry::Tolerance;

fn base58<S: Serializer>(key: &Pubkey, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(key)
}

// ─── Pool creation ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CreatePoolParams {
    pub mint_a:       Pubkey,
    pub mint_b:       Pubkey,
    /// LP fee, 1–100 bps.
    pub fee_rate_bps: u16,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatePoolResult {
    pub signature:      String,
    #[serde(serialize_with = "base58")]
    pub pool:           Pubkey,
    #[serde(serialize_with = "base58")]
    pub pool_authority: Pubkey,
    #[serde(serialize_with = "base58")]
    pub vault_a:        Pubkey,
    #[serde(serialize_with = "base58")]
    pub vault_b:        Pubkey,
    #[serde(serialize_with = "base58")]
    pub mint_a:         Pubkey,
    #[serde(serialize_with = "base58")]
    pub mint_b:         Pubkey,
    pub fee_rate_bps:   u16,
}

// ─── Liquidity ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ProvideParams {
    pub mint_a:             Pubkey,
    pub mint_b:             Pubkey,
    pub amount_a:           u64,
    /// `None` → computed from live reserves (required for the first deposit).
    pub amount_b:           Option<u64>,
    /// Minimum LP shares to accept. Overridden per attempt by the retrying path.
    pub min_lp:             u64,
    pub auto_compound:      bool,
    pub compound_threshold: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvideResult {
    pub signature:   String,
    #[serde(serialize_with = "base58")]
    pub pool:        Pubkey,
    #[serde(serialize_with = "base58")]
    pub position:    Pubkey,
    pub amount_a:    u64,
    pub amount_b:    u64,
    pub expected_lp: u64,
    pub min_lp:      u64,
}

#[derive(Debug, Clone)]
pub struct RemoveLiquidityParams {
    pub mint_a:    Pubkey,
    pub mint_b:    Pubkey,
    pub lp_shares: u64,
    /// Slippage floor applied to both expected withdrawal amounts.
    pub tolerance: Tolerance,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveLiquidityResult {
    pub signature:  String,
    #[serde(serialize_with = "base58")]
    pub pool:       Pubkey,
    #[serde(serialize_with = "base58")]
    pub position:   Pubkey,
    pub lp_shares:  u64,
    pub expected_a: u64,
    pub expected_b: u64,
    pub min_a:      u64,
    pub min_b:      u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClaimFeesResult {
    /// `None` when there was nothing to claim and no transaction was sent.
    pub signature:     Option<String>,
    #[serde(serialize_with = "base58")]
    pub pool:          Pubkey,
    #[serde(serialize_with = "base58")]
    pub position:      Pubkey,
    pub fees_a:        u64,
    pub fees_b:        u64,
    pub auto_compound: bool,
}

// ─── Swap ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SwapParams {
    pub mint_in:      Pubkey,
    pub mint_out:     Pubkey,
    pub amount_in:    u64,
    /// Slippage accepted below the pre-flight estimate. Overridden per attempt
    /// by the retrying path.
    pub max_slippage: Tolerance,
}

#[derive(Debug, Clone, Serialize)]
pub struct SwapResult {
    pub signature:      String,
    #[serde(serialize_with = "base58")]
    pub pool:           Pubkey,
    pub amount_in:      u64,
    pub estimated_out:  u64,
    pub min_amount_out: u64,
    pub slippage_bps:   u16,
    pub a_to_b:         bool,
}

#[derive(Debug, Clone)]
pub struct SimulateParams {
    pub mint_in:   Pubkey,
    pub mint_out:  Pubkey,
    pub amount_in: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulateResult {
    #[serde(serialize_with = "base58")]
    pub pool:             Pubkey,
    pub a_to_b:           bool,
    pub amount_in:        u64,
    /// 0.020 % of `amount_in`, sent to the treasury.
    pub protocol_fee:     u64,
    pub net_pool_input:   u64,
    pub lp_fee:           u64,
    /// The amount that actually moves the curve.
    pub after_fees:       u64,
    pub estimated_out:    u64,
    pub effective_rate:   f64,
    pub price_impact_pct: f64,
    pub fee_rate_bps:     u16,
    pub reserve_in:       u64,
    pub reserve_out:      u64,
}

// ─── Read-only views ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct PoolInfo {
    #[serde(serialize_with = "base58")]
    pub pool:         Pubkey,
    #[serde(serialize_with = "base58")]
    pub mint_a:       Pubkey,
    #[serde(serialize_with = "base58")]
    pub mint_b:       Pubkey,
    #[serde(serialize_with = "base58")]
    pub vault_a:      Pubkey,
    #[serde(serialize_with = "base58")]
    pub vault_b:      Pubkey,
    pub reserve_a:    u64,
    pub reserve_b:    u64,
    pub lp_supply:    u64,
    pub fee_rate_bps: u16,
    /// Token B per token A, raw units.
    pub spot_price:   f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PositionInfo {
    #[serde(serialize_with = "base58")]
    pub address:            Pubkey,
    #[serde(serialize_with = "base58")]
    pub pool:               Pubkey,
    #[serde(serialize_with = "base58")]
    pub owner:              Pubkey,
    pub lp_shares:          u64,
    pub fees_owed_a:        u64,
    pub fees_owed_b:        u64,
    pub pending_fees_a:     u64,
    pub pending_fees_b:     u64,
    pub total_fees_a:       u64,
    pub total_fees_b:       u64,
    pub auto_compound:      bool,
    pub compound_threshold: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeeSummary {
    pub positions:    Vec<PositionInfo>,
    pub total_fees_a: u64,
    pub total_fees_b: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_serialize_as_base58() {
        let pool = Pubkey::new_unique();
        let result = SwapResult {
            signature:      "sig".into(),
            pool,
            amount_in:      10,
            estimated_out:  9,
            min_amount_out: 8,
            slippage_bps:   50,
            a_to_b:         true,
        };
        let v = serde_json::to_value(&result).unwrap();
        assert_eq!(v["pool"], pool.to_string());
        assert_eq!(v["slippage_bps"], 50);
    }
}
