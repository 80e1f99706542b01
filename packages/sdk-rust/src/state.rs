//! On-chain account deserialization.
//!
//! Byte offsets follow the Anchor `#[account]` layout of the AMM program:
//!
//! ```text
//! Pool (212 bytes, after the 8-byte discriminator)
//!   authority(32) authority_bump(1) token_a_mint(32) token_b_mint(32)
//!   token_a_vault(32) token_b_vault(32) lp_supply(8) fee_rate_bps(2)
//!   fee_growth_global_a(16) fee_growth_global_b(16) bump(1)
//!
//! Position (138 bytes, after the 8-byte discriminator)
//!   owner(32) pool(32) lp_shares(8)
//!   fee_growth_checkpoint_a(16) fee_growth_checkpoint_b(16)
//!   fees_owed_a(8) fees_owed_b(8) auto_compound(1) compound_threshold(8) bump(1)
//! ```

use solana_sdk::pubkey::Pubkey;

use crate::error::{Error, Result};

pub const POOL_ACCOUNT_LEN: usize = 212;
pub const POSITION_ACCOUNT_LEN: usize = 138;
/// SPL token account prefix we need: `mint(32) owner(32) amount(8)`.
pub const TOKEN_ACCOUNT_MIN_LEN: usize = 72;

#[derive(Debug, Clone)]
pub struct PoolState {
    pub token_a_mint:        Pubkey,
    pub token_b_mint:        Pubkey,
    pub token_a_vault:       Pubkey,
    pub token_b_vault:       Pubkey,
    pub lp_supply:           u64,
    pub fee_rate_bps:        u16,
    /// Cumulative fee-per-LP-share for token A, Q64.64 fixed-point.
    pub fee_growth_global_a: u128,
    /// Cumulative fee-per-LP-share for token B, Q64.64 fixed-point.
    pub fee_growth_global_b: u128,
}

#[derive(Debug, Clone)]
pub struct PositionState {
    pub owner:                   Pubkey,
    pub pool:                    Pubkey,
    pub lp_shares:               u64,
    pub fee_growth_checkpoint_a: u128,
    pub fee_growth_checkpoint_b: u128,
    /// Fees already accounted for on-chain but not yet transferred.
    pub fees_owed_a:             u64,
    pub fees_owed_b:             u64,
    pub auto_compound:           bool,
    pub compound_threshold:      u64,
}

pub fn parse_pool(data: &[u8]) -> Result<PoolState> {
    let r = Bytes::expect(data, POOL_ACCOUNT_LEN, "Pool")?;
    Ok(PoolState {
        token_a_mint:        r.pubkey(41)?,
        token_b_mint:        r.pubkey(73)?,
        token_a_vault:       r.pubkey(105)?,
        token_b_vault:       r.pubkey(137)?,
        lp_supply:           r.u64(169)?,
        fee_rate_bps:        r.u16(177)?,
        fee_growth_global_a: r.u128(179)?,
        fee_growth_global_b: r.u128(195)?,
    })
}

pub fn parse_position(data: &[u8]) -> Result<PositionState> {
    let r = Bytes::expect(data, POSITION_ACCOUNT_LEN, "Position")?;
    Ok(PositionState {
        owner:                   r.pubkey(8)?,
        pool:                    r.pubkey(40)?,
        lp_shares:               r.u64(72)?,
        fee_growth_checkpoint_a: r.u128(80)?,
        fee_growth_checkpoint_b: r.u128(96)?,
        fees_owed_a:             r.u64(112)?,
        fees_owed_b:             r.u64(120)?,
        auto_compound:           r.array::<1>(128)?[0] != 0,
        compound_threshold:      r.u64(129)?,
    })
}

/// Read the `amount` field from a packed SPL token account.
pub fn parse_token_amount(data: &[u8]) -> Result<u64> {
    Bytes::expect(data, TOKEN_ACCOUNT_MIN_LEN, "Token")?.u64(64)
}

// ─── Bounds-checked little-endian reads ───────────────────────────────────────

struct Bytes<'a>(&'a [u8]);

impl<'a> Bytes<'a> {
    fn expect(data: &'a [u8], min_len: usize, what: &str) -> Result<Self> {
        if data.len() < min_len {
            return Err(Error::ParseError {
                offset: 0,
                reason: format!("{what} account is {} bytes; expected at least {min_len}", data.len()),
            });
        }
        Ok(Bytes(data))
    }

    fn array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        self.0
            .get(offset..offset + N)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| Error::ParseError {
                offset,
                reason: format!("need {N} bytes, account has {}", self.0.len()),
            })
    }

    fn pubkey(&self, offset: usize) -> Result<Pubkey> {
        self.array::<32>(offset).map(Pubkey::from)
    }

    fn u16(&self, offset: usize) -> Result<u16> {
        self.array(offset).map(u16::from_le_bytes)
    }

    fn u64(&self, offset: usize) -> Result<u64> {
        self.array(offset).map(u64::from_le_bytes)
    }

    fn u128(&self, offset: usize) -> Result<u128> {
        self.array(offset).map(u128::from_le_bytes)
    }
}
