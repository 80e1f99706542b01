//! Low-level Anchor instruction builders and PDA derivation.
//!
//! Each builder returns a [`solana_sdk::instruction::Instruction`] ready for
//! signing. Account order follows the program's `#[derive(Accounts)]` structs.
//!
//! Anchor discriminators are `sha256("{namespace}:{name}")[..8]` with
//! `global` for instructions and `account` for account types.

use solana_sdk::{
    hash::hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    sysvar,
};

// ─── Well-known program IDs ───────────────────────────────────────────────────

pub const SPL_TOKEN_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");
pub const ATA_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("ATokenGPvbdGVxr1b2hvZbsiqW5xWH25efTNsLJA8knL");
/// The system program's ID is the all-zero key.
pub const SYSTEM_PROGRAM_ID: Pubkey = Pubkey::new_from_array([0; 32]);

// ─── PDA seeds ────────────────────────────────────────────────────────────────

pub const POOL_SEED:           &[u8] = b"pool";
pub const POSITION_SEED:       &[u8] = b"position";
pub const POOL_AUTHORITY_SEED: &[u8] = b"pool_authority";
pub const TREASURY_SEED:       &[u8] = b"treasury";

pub fn derive_pool(mint_a: &Pubkey, mint_b: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POOL_SEED, mint_a.as_ref(), mint_b.as_ref()], program_id)
}

/// The PDA that signs for vault transfers.
pub fn derive_pool_authority(pool: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POOL_AUTHORITY_SEED, pool.as_ref()], program_id)
}

pub fn derive_position(pool: &Pubkey, owner: &Pubkey, program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[POSITION_SEED, pool.as_ref(), owner.as_ref()], program_id)
}

pub fn derive_treasury(program_id: &Pubkey) -> (Pubkey, u8) {
    Pubkey::find_program_address(&[TREASURY_SEED], program_id)
}

/// Associated Token Account for a wallet + mint.
pub fn derive_ata(wallet: &Pubkey, mint: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(
        &[wallet.as_ref(), SPL_TOKEN_PROGRAM_ID.as_ref(), mint.as_ref()],
        &ATA_PROGRAM_ID,
    )
    .0
}

pub fn anchor_discriminator(namespace: &str, name: &str) -> [u8; 8] {
    let h = hash(format!("{namespace}:{name}").as_bytes());
    let mut d = [0u8; 8];
    d.copy_from_slice(&h.to_bytes()[..8]);
    d
}

fn ix_data(name: &str) -> Vec<u8> {
    anchor_discriminator("global", name).to_vec()
}

// ─── Accounts shared by the position-scoped instructions ─────────────────────

/// Accounts for `remove_liquidity` and `claim_fees`, which take the same list.
#[derive(Debug, Clone, Copy)]
pub struct PositionAccounts {
    pub agent:          Pubkey,
    pub pool:           Pubkey,
    pub pool_authority: Pubkey,
    pub position:       Pubkey,
    pub vault_a:        Pubkey,
    pub vault_b:        Pubkey,
    pub agent_token_a:  Pubkey,
    pub agent_token_b:  Pubkey,
}

impl PositionAccounts {
    fn metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new(self.agent,                  true),
            AccountMeta::new(self.pool,                   false),
            AccountMeta::new_readonly(self.pool_authority, false),
            AccountMeta::new(self.position,               false),
            AccountMeta::new(self.vault_a,                false),
            AccountMeta::new(self.vault_b,                false),
            AccountMeta::new(self.agent_token_a,          false),
            AccountMeta::new(self.agent_token_b,          false),
            AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID, false),
        ]
    }
}

// ─── initialize_pool ─────────────────────────────────────────────────────────

/// `vault_a` / `vault_b` are fresh keypairs initialised as token accounts owned
/// by the pool authority; both must co-sign.
pub fn initialize_pool_ix(
    program_id:   &Pubkey,
    creator:      &Pubkey,
    mint_a:       &Pubkey,
    mint_b:       &Pubkey,
    vault_a:      &Pubkey,
    vault_b:      &Pubkey,
    fee_rate_bps: u16,
) -> Instruction {
    let (pool, _)           = derive_pool(mint_a, mint_b, program_id);
    let (pool_authority, _) = derive_pool_authority(&pool, program_id);

    let mut data = ix_data("initialize_pool");
    data.extend_from_slice(&fee_rate_bps.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*creator,                true),
            AccountMeta::new_readonly(*mint_a,        false),
            AccountMeta::new_readonly(*mint_b,        false),
            AccountMeta::new(pool,                    false),
            AccountMeta::new_readonly(pool_authority, false),
            AccountMeta::new(*vault_a,                true),
            AccountMeta::new(*vault_b,                true),
            AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
        ],
        data,
    }
}

// ─── provide_liquidity ────────────────────────────────────────────────────────

/// `agent_token_a` / `agent_token_b` hold the pool's token A / token B mints.
#[allow(clippy::too_many_arguments)]
pub fn provide_liquidity_ix(
    program_id:         &Pubkey,
    agent:              &Pubkey,
    pool:               &Pubkey,
    pool_authority:     &Pubkey,
    position:           &Pubkey,
    vault_a:            &Pubkey,
    vault_b:            &Pubkey,
    agent_token_a:      &Pubkey,
    agent_token_b:      &Pubkey,
    amount_a:           u64,
    amount_b:           u64,
    min_lp:             u64,
    auto_compound:      bool,
    compound_threshold: u64,
) -> Instruction {
    let mut data = ix_data("provide_liquidity");
    data.extend_from_slice(&amount_a.to_le_bytes());
    data.extend_from_slice(&amount_b.to_le_bytes());
    data.extend_from_slice(&min_lp.to_le_bytes());
    data.push(auto_compound as u8);
    data.extend_from_slice(&compound_threshold.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*agent,                   true),
            AccountMeta::new(*pool,                    false),
            AccountMeta::new_readonly(*pool_authority, false),
            AccountMeta::new(*position,                false),  // init_if_needed
            AccountMeta::new(*vault_a,                 false),
            AccountMeta::new(*vault_b,                 false),
            AccountMeta::new(*agent_token_a,           false),
            AccountMeta::new(*agent_token_b,           false),
            AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(sysvar::rent::ID, false),
        ],
        data,
    }
}

// ─── swap ─────────────────────────────────────────────────────────────────────

/// Pass the pool's vault A and vault B regardless of direction; `a_to_b`
/// selects which way tokens move.
#[allow(clippy::too_many_arguments)]
pub fn swap_ix(
    program_id:        &Pubkey,
    agent:             &Pubkey,
    pool:              &Pubkey,
    pool_authority:    &Pubkey,
    vault_a:           &Pubkey,
    vault_b:           &Pubkey,
    agent_token_in:    &Pubkey,
    agent_token_out:   &Pubkey,
    treasury:          &Pubkey,
    treasury_token_in: &Pubkey,
    amount_in:         u64,
    min_amount_out:    u64,
    a_to_b:            bool,
) -> Instruction {
    let mut data = ix_data("swap");
    data.extend_from_slice(&amount_in.to_le_bytes());
    data.extend_from_slice(&min_amount_out.to_le_bytes());
    data.push(a_to_b as u8);

    Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::new(*agent,                   true),
            AccountMeta::new(*pool,                    false),  // fee_growth update
            AccountMeta::new_readonly(*pool_authority, false),
            AccountMeta::new(*vault_a,                 false),
            AccountMeta::new(*vault_b,                 false),
            AccountMeta::new(*agent_token_in,          false),
            AccountMeta::new(*agent_token_out,         false),
            AccountMeta::new_readonly(*treasury,       false),
            AccountMeta::new(*treasury_token_in,       false),
            AccountMeta::new_readonly(SPL_TOKEN_PROGRAM_ID, false),
        ],
        data,
    }
}

// ─── remove_liquidity / claim_fees ────────────────────────────────────────────

/// Burn `lp_shares`; the program rejects the withdrawal if either side
/// returns less than `min_a` / `min_b`.
pub fn remove_liquidity_ix(
    program_id: &Pubkey,
    accounts:   &PositionAccounts,
    lp_shares:  u64,
    min_a:      u64,
    min_b:      u64,
) -> Instruction {
    let mut data = ix_data("remove_liquidity");
    data.extend_from_slice(&lp_shares.to_le_bytes());
    data.extend_from_slice(&min_a.to_le_bytes());
    data.extend_from_slice(&min_b.to_le_bytes());
    Instruction { program_id: *program_id, accounts: accounts.metas(), data }
}

/// Pay out (or auto-compound) accrued LP fees. Takes no arguments.
pub fn claim_fees_ix(program_id: &Pubkey, accounts: &PositionAccounts) -> Instruction {
    Instruction { program_id: *program_id, accounts: accounts.metas(), data: ix_data("claim_fees") }
}
