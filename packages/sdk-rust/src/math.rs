//! Fee constants, simulation and position math.
//!
//! Mirrors the on-chain arithmetic so off-chain estimates match on-chain results.
//! Nothing here touches the network.

use crate::error::{Error, Result};
use crate::retry::{Tolerance, BPS_PER_UNIT};
use crate::state::{PoolState, PositionState};
use crate::types::SimulateResult;
use solana_sdk::pubkey::Pubkey;

// ─── Constants ────────────────────────────────────────────────────────────────

/// Protocol fee numerator: 0.020% = 20 / 100_000.
pub const PROTOCOL_FEE_BPS: u128 = 20;
/// Protocol fee denominator.
pub const PROTOCOL_FEE_DENOMINATOR: u128 = 100_000;
/// Basis-point denominator for LP fee.
pub const BPS_DENOMINATOR: u128 = BPS_PER_UNIT as u128;

// ─── Simulation ───────────────────────────────────────────────────────────────

/// Full fee and slippage breakdown for a hypothetical swap.
///
/// All inputs are pre-fetched on-chain values; no RPC calls are made here.
pub fn simulate_detailed(
    pool_addr:   Pubkey,
    pool:        &PoolState,
    reserve_in:  u64,
    reserve_out: u64,
    amount_in:   u64,
    a_to_b:      bool,
) -> Result<SimulateResult> {
    let in_u128 = amount_in as u128;

    if reserve_in == 0 || reserve_out == 0 {
        return Err(Error::NoLiquidity);
    }

    let protocol_fee = in_u128
        .checked_mul(PROTOCOL_FEE_BPS)
        .ok_or(Error::MathOverflow)?
        / PROTOCOL_FEE_DENOMINATOR;

    let net_pool_input = in_u128
        .checked_sub(protocol_fee)
        .ok_or(Error::MathOverflow)?;

    let lp_fee = net_pool_input
        .checked_mul(pool.fee_rate_bps as u128)
        .ok_or(Error::MathOverflow)?
        / BPS_DENOMINATOR;

    let after_fees = net_pool_input
        .checked_sub(lp_fee)
        .ok_or(Error::MathOverflow)?;

    let r_in  = reserve_in  as u128;
    let r_out = reserve_out as u128;

    let estimated_out = r_out
        .checked_mul(after_fees)
        .ok_or(Error::MathOverflow)?
        .checked_div(r_in.checked_add(after_fees).ok_or(Error::MathOverflow)?)
        .ok_or(Error::MathOverflow)? as u64;

    let effective_rate = if amount_in == 0 {
        0.0
    } else {
        estimated_out as f64 / amount_in as f64
    };

    let price_impact_pct =
        after_fees as f64 / (r_in as f64 + after_fees as f64) * 100.0;

    Ok(SimulateResult {
        pool: pool_addr,
        a_to_b,
        amount_in,
        protocol_fee:    protocol_fee as u64,
        net_pool_input:  net_pool_input as u64,
        lp_fee:          lp_fee as u64,
        after_fees:      after_fees as u64,
        estimated_out,
        effective_rate,
        price_impact_pct,
        fee_rate_bps:    pool.fee_rate_bps,
        reserve_in,
        reserve_out,
    })
}

// ─── Slippage ─────────────────────────────────────────────────────────────────

/// Lowest acceptable amount for an `expected` quantity at `tolerance`.
///
/// `expected × (10_000 − bps) / 10_000`, rounded down. Zero tolerance returns
/// `expected` unchanged; 100 % returns 0 (no guard).
pub fn min_amount_out(expected: u64, tolerance: Tolerance) -> u64 {
    let keep = (BPS_PER_UNIT - tolerance.bps()) as u128;
    (expected as u128 * keep / BPS_DENOMINATOR) as u64
}

/// Tolerance that a caller-chosen `min` represents against `expected`,
/// rounded up to the next bp. A floor at or above `expected` is zero.
pub fn implied_tolerance(expected: u64, min: u64) -> Tolerance {
    if expected == 0 || min >= expected {
        return Tolerance::ZERO;
    }
    let bps = ((expected - min) as u128 * BPS_DENOMINATOR).div_ceil(expected as u128);
    Tolerance::from_bps(bps.min(BPS_DENOMINATOR) as u16)
}

// ─── Impermanent loss ─────────────────────────────────────────────────────────

/// Impermanent loss of a 50/50 constant-product position versus holding,
/// for a price that moved by `price_ratio` (new price / entry price).
///
/// `IL = 2·√r / (1 + r) − 1`, returned as a fraction: `-0.2` means the LP
/// position is worth 20 % less than the held tokens.
pub fn impermanent_loss(price_ratio: f64) -> Result<f64> {
    if !price_ratio.is_finite() || price_ratio <= 0.0 {
        return Err(Error::InvalidArgument(format!(
            "price ratio must be a positive finite number, got {price_ratio}"
        )));
    }
    Ok(2.0 * price_ratio.sqrt() / (1.0 + price_ratio) - 1.0)
}

// ─── Liquidity ────────────────────────────────────────────────────────────────

/// Integer square root (Babylonian method), floor.
pub fn isqrt(n: u128) -> u128 {
    if n == 0 {
        return 0;
    }
    let mut x = n;
    let mut y = (x + 1) >> 1;
    while y < x {
        x = y;
        y = (y + n / y) >> 1;
    }
    x
}

/// LP shares the program will mint for a deposit.
///
/// First deposit mints `√(a·b)`; later deposits mint the smaller of the two
/// proportional shares so a lopsided deposit cannot dilute existing LPs.
pub fn expected_lp_minted(
    amount_a:  u64,
    amount_b:  u64,
    reserve_a: u64,
    reserve_b: u64,
    lp_supply: u64,
) -> Result<u64> {
    if lp_supply == 0 {
        let product = (amount_a as u128)
            .checked_mul(amount_b as u128)
            .ok_or(Error::MathOverflow)?;
        return Ok(isqrt(product) as u64);
    }
    if reserve_a == 0 || reserve_b == 0 {
        return Err(Error::NoLiquidity);
    }
    let lp_a = (amount_a as u128)
        .checked_mul(lp_supply as u128)
        .ok_or(Error::MathOverflow)?
        / reserve_a as u128;
    let lp_b = (amount_b as u128)
        .checked_mul(lp_supply as u128)
        .ok_or(Error::MathOverflow)?
        / reserve_b as u128;
    Ok(lp_a.min(lp_b) as u64)
}

/// Tokens returned when burning `lp_shares`: `(shares × reserve / lp_supply)` per side.
pub fn expected_withdrawal(
    lp_shares: u64,
    reserve_a: u64,
    reserve_b: u64,
    lp_supply: u64,
) -> (u64, u64) {
    if lp_supply == 0 {
        return (0, 0);
    }
    let a = lp_shares as u128 * reserve_a as u128 / lp_supply as u128;
    let b = lp_shares as u128 * reserve_b as u128 / lp_supply as u128;
    (a as u64, b as u64)
}

/// Compute proportional `amount_b` for `provide_liquidity`.
///
/// - If `amount_b` is `Some`, return it unchanged.
/// - If the pool is empty (`lp_supply == 0`), `amount_b` is required.
/// - Otherwise, compute proportionally: `amount_b = amount_a × reserve_b / reserve_a`.
pub fn compute_amount_b(
    amount_a:  u64,
    amount_b:  Option<u64>,
    reserve_a: u64,
    reserve_b: u64,
    lp_supply: u64,
) -> Result<u64> {
    if let Some(b) = amount_b {
        return Ok(b);
    }
    if lp_supply == 0 {
        return Err(Error::AmountBRequired);
    }
    if reserve_a == 0 {
        return Err(Error::NoLiquidity);
    }
    let b = (amount_a as u128)
        .checked_mul(reserve_b as u128)
        .ok_or(Error::MathOverflow)?
        / reserve_a as u128;
    if b == 0 {
        return Err(Error::AmountBZero);
    }
    Ok(b as u64)
}

// ─── Pending fees ─────────────────────────────────────────────────────────────

/// Compute `(pending_a, pending_b)` accrued since the position was last synced.
///
/// Mirrors the on-chain `accrue_fees` function:
/// `pending = lp_shares × (fee_growth_global − checkpoint) >> 64`
pub fn pending_fees_for_position(pos: &PositionState, pool: &PoolState) -> (u64, u64) {
    let delta_a = pool
        .fee_growth_global_a
        .saturating_sub(pos.fee_growth_checkpoint_a);
    let delta_b = pool
        .fee_growth_global_b
        .saturating_sub(pos.fee_growth_checkpoint_b);

    let pending_a = ((pos.lp_shares as u128).saturating_mul(delta_a) >> 64) as u64;
    let pending_b = ((pos.lp_shares as u128).saturating_mul(delta_b) >> 64) as u64;
    (pending_a, pending_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool(fee_rate_bps: u16) -> PoolState {
        PoolState {
            token_a_mint:        Pubkey::new_unique(),
            token_b_mint:        Pubkey::new_unique(),
            token_a_vault:       Pubkey::new_unique(),
            token_b_vault:       Pubkey::new_unique(),
            lp_supply:           1_000_000,
            fee_rate_bps,
            fee_growth_global_a: 0,
            fee_growth_global_b: 0,
        }
    }

    #[test]
    fn simulate_charges_protocol_then_lp_fee() {
        let p = pool(30);
        let sim = simulate_detailed(Pubkey::new_unique(), &p, 1_000_000, 2_000_000, 100_000, true)
            .unwrap();
        assert_eq!(sim.protocol_fee, 20);
        assert_eq!(sim.net_pool_input, 99_980);
        assert_eq!(sim.lp_fee, 299);
        assert_eq!(sim.after_fees, 99_681);
        // 2_000_000 × 99_681 / 1_099_681
        assert_eq!(sim.estimated_out, 181_290);
        assert!(sim.price_impact_pct > 9.0 && sim.price_impact_pct < 9.1);
    }

    #[test]
    fn simulate_rejects_empty_pool() {
        let p = pool(30);
        let err = simulate_detailed(Pubkey::new_unique(), &p, 0, 5, 10, true).unwrap_err();
        assert!(matches!(err, Error::NoLiquidity));
    }

    #[test]
    fn min_amount_out_applies_tolerance() {
        assert_eq!(min_amount_out(10_000, Tolerance::from_bps(50)), 9_950);
        assert_eq!(min_amount_out(10_000, Tolerance::ZERO), 10_000);
        assert_eq!(min_amount_out(10_000, Tolerance::MAX), 0);
        assert_eq!(min_amount_out(u64::MAX, Tolerance::ZERO), u64::MAX);
    }

    #[test]
    fn implied_tolerance_reads_back_the_floor() {
        assert_eq!(implied_tolerance(10_000, 9_950).bps(), 50);
        assert_eq!(implied_tolerance(10_000, 10_000), Tolerance::ZERO);
        assert_eq!(implied_tolerance(10_000, 12_000), Tolerance::ZERO);
        assert_eq!(implied_tolerance(10_000, 0), Tolerance::MAX);
        assert_eq!(implied_tolerance(3, 2).bps(), 3_334);
        assert_eq!(implied_tolerance(0, 0), Tolerance::ZERO);
    }

    #[test]
    fn impermanent_loss_matches_known_points() {
        assert!(impermanent_loss(1.0).unwrap().abs() < 1e-12);
        assert!((impermanent_loss(4.0).unwrap() + 0.2).abs() < 1e-12);
        // Symmetric in r and 1/r.
        let up = impermanent_loss(2.0).unwrap();
        let down = impermanent_loss(0.5).unwrap();
        assert!((up - down).abs() < 1e-12);
        assert!(impermanent_loss(0.0).is_err());
        assert!(impermanent_loss(f64::INFINITY).is_err());
    }

    #[test]
    fn first_deposit_mints_geometric_mean() {
        assert_eq!(expected_lp_minted(400, 100, 0, 0, 0).unwrap(), 200);
    }

    #[test]
    fn later_deposit_mints_smaller_share() {
        // 10% of A side, 5% of B side → 5% of supply.
        let lp = expected_lp_minted(100, 50, 1_000, 1_000, 10_000).unwrap();
        assert_eq!(lp, 500);
    }

    #[test]
    fn withdrawal_is_proportional() {
        assert_eq!(expected_withdrawal(250, 1_000, 4_000, 1_000), (250, 1_000));
        assert_eq!(expected_withdrawal(250, 1_000, 4_000, 0), (0, 0));
    }

    #[test]
    fn amount_b_rules() {
        assert_eq!(compute_amount_b(10, Some(7), 0, 0, 0).unwrap(), 7);
        assert!(matches!(compute_amount_b(10, None, 0, 0, 0), Err(Error::AmountBRequired)));
        assert_eq!(compute_amount_b(100, None, 1_000, 3_000, 5).unwrap(), 300);
        assert!(matches!(compute_amount_b(1, None, 1_000, 3, 5), Err(Error::AmountBZero)));
    }

    #[test]
    fn isqrt_floors() {
        assert_eq!(isqrt(0), 0);
        assert_eq!(isqrt(15), 3);
        assert_eq!(isqrt(16), 4);
        assert_eq!(isqrt(u64::MAX as u128 * u64::MAX as u128), u64::MAX as u128);
    }
}
