//! [`SwapClient`], the main entry point for agent integrations.

use std::collections::HashMap;
use std::str::FromStr;

use async_trait::async_trait;
use solana_client::{
    client_error::ClientError,
    nonblocking::rpc_client::RpcClient,
    rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig},
    rpc_filter::{Memcmp, MemcmpEncodedBytes, RpcFilterType},
};
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::{Instruction, InstructionError},
    pubkey::Pubkey,
    signature::{Keypair, Signature, Signer},
    transaction::{Transaction, TransactionError},
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{
    error::{Error, Result},
    instructions::{
        anchor_discriminator, claim_fees_ix, derive_ata, derive_pool, derive_pool_authority,
        derive_position, derive_treasury, initialize_pool_ix, provide_liquidity_ix,
        remove_liquidity_ix, swap_ix, PositionAccounts,
    },
    math::{
        compute_amount_b, expected_lp_minted, expected_withdrawal, implied_tolerance,
        min_amount_out, pending_fees_for_position, simulate_detailed,
    },
    retry::{Attempt, Operation, RetryError, RetryPolicy, Submitter, Tolerance},
    state::{parse_pool, parse_position, parse_token_amount, PoolState, PositionState, POSITION_ACCOUNT_LEN},
    types::{
        ClaimFeesResult, CreatePoolParams, CreatePoolResult, FeeSummary, PoolInfo, PositionInfo,
        ProvideParams, ProvideResult, RemoveLiquidityParams, RemoveLiquidityResult,
        SimulateParams, SimulateResult, SwapParams, SwapResult,
    },
};

// ─── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("8XJfG4mHqRZjByAd7HxHdEALfB8jVtJVQsdhGEmysTFq");
pub const DEVNET_RPC:  &str = "https://api.devnet.solana.com";
pub const MAINNET_RPC: &str = "https://api.mainnet-beta.solana.com";

/// Anchor custom error code for the program's `SlippageExceeded` (6000 + index 1).
const PROGRAM_ERR_SLIPPAGE_EXCEEDED: u32 = 6001;

// ─── Client ───────────────────────────────────────────────────────────────────

/// Async AMM client for Solana.
///
/// ```rust,no_run
/// # use swapkit_sdk::{RetryPolicy, SwapClient, SwapParams, Tolerance};
/// # use solana_sdk::{pubkey::Pubkey, signature::Keypair};
/// # use std::str::FromStr;
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SwapClient::devnet();
/// let payer  = Keypair::new();
/// let sol  = Pubkey::from_str("So11111111111111111111111111111111111111112")?;
/// let usdc = Pubkey::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")?;
/// let swap = client.convert_with_retry(&payer, SwapParams {
///     mint_in: sol, mint_out: usdc, amount_in: 1_000_000_000,
///     max_slippage: Tolerance::from_pct(0.5),
/// }, RetryPolicy::default()).await?;
/// println!("swapped at {}bps: {}", swap.slippage_bps, swap.signature);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SwapClient {
    rpc_url:    String,
    program_id: Pubkey,
    commitment: CommitmentConfig,
}

impl SwapClient {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url:    rpc_url.into(),
            program_id: DEFAULT_PROGRAM_ID,
            commitment: CommitmentConfig::confirmed(),
        }
    }

    pub fn devnet() -> Self {
        Self::new(DEVNET_RPC)
    }

    pub fn mainnet() -> Self {
        Self::new(MAINNET_RPC)
    }

    /// Override the program ID (useful for locally deployed programs in tests).
    pub fn with_program_id(mut self, program_id: Pubkey) -> Self {
        self.program_id = program_id;
        self
    }

    pub fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.commitment = commitment;
        self
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    pub fn program_id(&self) -> Pubkey {
        self.program_id
    }

    // ── Write operations ──────────────────────────────────────────────────────

    /// Create a new constant-product pool. Vault keypairs are generated here.
    pub async fn create_pool(
        &self,
        payer:  &Keypair,
        params: CreatePoolParams,
    ) -> Result<CreatePoolResult> {
        if !(1..=100).contains(&params.fee_rate_bps) {
            return Err(Error::InvalidArgument(format!(
                "fee_rate_bps must be 1–100, got {}",
                params.fee_rate_bps
            )));
        }
        let rpc = self.rpc();

        let vault_a = Keypair::new();
        let vault_b = Keypair::new();
        let (pool, _)           = derive_pool(&params.mint_a, &params.mint_b, &self.program_id);
        let (pool_authority, _) = derive_pool_authority(&pool, &self.program_id);

        let ix = initialize_pool_ix(
            &self.program_id,
            &payer.pubkey(),
            &params.mint_a,
            &params.mint_b,
            &vault_a.pubkey(),
            &vault_b.pubkey(),
            params.fee_rate_bps,
        );
        let tx = sign(&rpc, &[ix], payer, &[&vault_a, &vault_b]).await?;
        let sig = rpc.send_and_confirm_transaction(&tx).await?;
        info!(%pool, %sig, "pool created");

        Ok(CreatePoolResult {
            signature:    sig.to_string(),
            pool,
            pool_authority,
            vault_a:      vault_a.pubkey(),
            vault_b:      vault_b.pubkey(),
            mint_a:       params.mint_a,
            mint_b:       params.mint_b,
            fee_rate_bps: params.fee_rate_bps,
        })
    }

    /// Deposit tokens and receive LP shares, guarded by `params.min_lp`. One attempt.
    pub async fn provide_liquidity(
        &self,
        payer:  &Keypair,
        params: ProvideParams,
    ) -> Result<ProvideResult> {
        let op = ProvideAttempt::new(self, payer, params);
        op.send(None).await
    }

    /// Like [`provide_liquidity`](Self::provide_liquidity), but retried under
    /// `policy`. Each attempt re-reads reserves and sets `min_lp` from the
    /// expected LP shares at that attempt's tolerance.
    pub async fn provide_with_retry(
        &self,
        payer:  &Keypair,
        params: ProvideParams,
        policy: RetryPolicy,
    ) -> std::result::Result<ProvideResult, RetryError<Error>> {
        let op = ProvideAttempt::new(self, payer, params);
        Submitter::new(policy).submit(&op).await
    }

    /// Swap one token for another at `params.max_slippage`. One attempt.
    pub async fn convert(&self, payer: &Keypair, params: SwapParams) -> Result<SwapResult> {
        let tolerance = params.max_slippage;
        let op = SwapAttempt::new(self, payer, params);
        op.send(tolerance).await
    }

    /// Swap with retries: each attempt re-quotes the pool and widens slippage
    /// along `policy`'s schedule. `params.max_slippage` is ignored.
    ///
    /// Between attempts the previous transaction's signature is checked; if it
    /// landed after all, that result is returned instead of swapping twice.
    pub async fn convert_with_retry(
        &self,
        payer:  &Keypair,
        params: SwapParams,
        policy: RetryPolicy,
    ) -> std::result::Result<SwapResult, RetryError<Error>> {
        let op = SwapAttempt::new(self, payer, params);
        Submitter::new(policy).submit(&op).await
    }

    /// Burn LP shares; both withdrawal sides are floored at `params.tolerance`.
    pub async fn remove_liquidity(
        &self,
        payer:  &Keypair,
        params: RemoveLiquidityParams,
    ) -> Result<RemoveLiquidityResult> {
        if params.lp_shares == 0 {
            return Err(Error::InvalidArgument("lp_shares must be > 0".into()));
        }
        let rpc = self.rpc();
        let (pool_addr, pool_state, _) =
            self.find_pool_inner(&rpc, &params.mint_a, &params.mint_b).await?;
        let (accounts, position) = self.position_accounts(&rpc, payer, pool_addr, &pool_state).await?;

        if position.lp_shares < params.lp_shares {
            return Err(Error::InsufficientShares {
                requested: params.lp_shares,
                held:      position.lp_shares,
            });
        }

        let (reserve_a, reserve_b) = self.reserves(&rpc, &pool_state).await?;
        let (expected_a, expected_b) =
            expected_withdrawal(params.lp_shares, reserve_a, reserve_b, pool_state.lp_supply);
        let min_a = min_amount_out(expected_a, params.tolerance);
        let min_b = min_amount_out(expected_b, params.tolerance);

        let ix = remove_liquidity_ix(&self.program_id, &accounts, params.lp_shares, min_a, min_b);
        let tx = sign(&rpc, &[ix], payer, &[]).await?;
        let sig = rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|e| classify_send_error(e, expected_a.min(expected_b), min_a.min(min_b), params.tolerance))?;
        info!(pool = %pool_addr, lp_shares = params.lp_shares, %sig, "liquidity removed");

        Ok(RemoveLiquidityResult {
            signature: sig.to_string(),
            pool:      pool_addr,
            position:  accounts.position,
            lp_shares: params.lp_shares,
            expected_a,
            expected_b,
            min_a,
            min_b,
        })
    }

    /// Claim (or auto-compound) accrued LP fees. Sends nothing when there are none.
    pub async fn claim_fees(
        &self,
        payer:  &Keypair,
        mint_a: Pubkey,
        mint_b: Pubkey,
    ) -> Result<ClaimFeesResult> {
        let rpc = self.rpc();
        let (pool_addr, pool_state, _) = self.find_pool_inner(&rpc, &mint_a, &mint_b).await?;
        let (accounts, position) = self.position_accounts(&rpc, payer, pool_addr, &pool_state).await?;

        let (pending_a, pending_b) = pending_fees_for_position(&position, &pool_state);
        let fees_a = position.fees_owed_a.saturating_add(pending_a);
        let fees_b = position.fees_owed_b.saturating_add(pending_b);

        let mut result = ClaimFeesResult {
            signature:     None,
            pool:          pool_addr,
            position:      accounts.position,
            fees_a,
            fees_b,
            auto_compound: position.auto_compound,
        };
        if fees_a == 0 && fees_b == 0 {
            debug!(pool = %pool_addr, "no fees to claim");
            return Ok(result);
        }

        let ix = claim_fees_ix(&self.program_id, &accounts);
        let tx = sign(&rpc, &[ix], payer, &[]).await?;
        let sig = rpc.send_and_confirm_transaction(&tx).await?;
        info!(pool = %pool_addr, fees_a, fees_b, %sig, "fees claimed");
        result.signature = Some(sig.to_string());
        Ok(result)
    }

    // ── Read operations ───────────────────────────────────────────────────────

    /// Fee and slippage breakdown for a swap, without sending anything.
    pub async fn simulate(&self, params: SimulateParams) -> Result<SimulateResult> {
        let rpc = self.rpc();
        let (pool_addr, pool_state, a_to_b) =
            self.find_pool_inner(&rpc, &params.mint_in, &params.mint_out).await?;
        let (reserve_in, reserve_out) = self.directed_reserves(&rpc, &pool_state, a_to_b).await?;
        simulate_detailed(pool_addr, &pool_state, reserve_in, reserve_out, params.amount_in, a_to_b)
    }

    pub async fn pool_info(&self, mint_a: Pubkey, mint_b: Pubkey) -> Result<PoolInfo> {
        let rpc = self.rpc();
        let (pool_addr, pool_state, _) = self.find_pool_inner(&rpc, &mint_a, &mint_b).await?;
        let (reserve_a, reserve_b) = self.reserves(&rpc, &pool_state).await?;

        let spot_price = if reserve_a == 0 { 0.0 } else { reserve_b as f64 / reserve_a as f64 };

        Ok(PoolInfo {
            pool:         pool_addr,
            mint_a:       pool_state.token_a_mint,
            mint_b:       pool_state.token_b_mint,
            vault_a:      pool_state.token_a_vault,
            vault_b:      pool_state.token_b_vault,
            reserve_a,
            reserve_b,
            lp_supply:    pool_state.lp_supply,
            fee_rate_bps: pool_state.fee_rate_bps,
            spot_price,
        })
    }

    /// All LP positions owned by `owner`, with pending fees.
    pub async fn my_positions(&self, owner: &Pubkey) -> Result<Vec<PositionInfo>> {
        let rpc = self.rpc();
        let positions = self.fetch_positions(&rpc, owner).await?;

        // One batched fetch for the distinct pools.
        let pool_keys: Vec<Pubkey> = {
            let mut v: Vec<Pubkey> = positions.iter().map(|(_, p)| p.pool).collect();
            v.sort();
            v.dedup();
            v
        };
        let pools: HashMap<Pubkey, PoolState> = if pool_keys.is_empty() {
            HashMap::new()
        } else {
            let accounts = rpc.get_multiple_accounts(&pool_keys).await?;
            pool_keys
                .iter()
                .zip(accounts.iter())
                .filter_map(|(k, maybe)| {
                    let acc = maybe.as_ref()?;
                    parse_pool(&acc.data).ok().map(|p| (*k, p))
                })
                .collect()
        };

        Ok(positions
            .into_iter()
            .map(|(addr, pos)| {
                let (pending_a, pending_b) = pools
                    .get(&pos.pool)
                    .map(|pool| pending_fees_for_position(&pos, pool))
                    .unwrap_or((0, 0));
                PositionInfo {
                    address:            addr,
                    pool:               pos.pool,
                    owner:              pos.owner,
                    lp_shares:          pos.lp_shares,
                    fees_owed_a:        pos.fees_owed_a,
                    fees_owed_b:        pos.fees_owed_b,
                    pending_fees_a:     pending_a,
                    pending_fees_b:     pending_b,
                    total_fees_a:       pos.fees_owed_a.saturating_add(pending_a),
                    total_fees_b:       pos.fees_owed_b.saturating_add(pending_b),
                    auto_compound:      pos.auto_compound,
                    compound_threshold: pos.compound_threshold,
                }
            })
            .collect())
    }

    pub async fn my_fees(&self, owner: &Pubkey) -> Result<FeeSummary> {
        let positions = self.my_positions(owner).await?;
        let total_fees_a = positions.iter().map(|p| p.total_fees_a).sum();
        let total_fees_b = positions.iter().map(|p| p.total_fees_b).sum();
        Ok(FeeSummary { positions, total_fees_a, total_fees_b })
    }

    // ── Private helpers ───────────────────────────────────────────────────────

    fn rpc(&self) -> RpcClient {
        RpcClient::new_with_commitment(self.rpc_url.clone(), self.commitment)
    }

    async fn reserves(&self, rpc: &RpcClient, pool: &PoolState) -> Result<(u64, u64)> {
        let a = parse_token_amount(&rpc.get_account_data(&pool.token_a_vault).await?)?;
        let b = parse_token_amount(&rpc.get_account_data(&pool.token_b_vault).await?)?;
        Ok((a, b))
    }

    /// `(reserve_in, reserve_out)` for the swap direction.
    async fn directed_reserves(
        &self,
        rpc:    &RpcClient,
        pool:   &PoolState,
        a_to_b: bool,
    ) -> Result<(u64, u64)> {
        let (a, b) = self.reserves(rpc, pool).await?;
        Ok(if a_to_b { (a, b) } else { (b, a) })
    }

    /// Try both PDA orderings for a mint pair; return `(pool_addr, state, a_to_b)`.
    ///
    /// `a_to_b = true` means the first mint is the pool's `token_a_mint`.
    async fn find_pool_inner(
        &self,
        rpc:      &RpcClient,
        mint_in:  &Pubkey,
        mint_out: &Pubkey,
    ) -> Result<(Pubkey, PoolState, bool)> {
        if mint_in == mint_out {
            return Err(Error::InvalidArgument("the two mints must differ".into()));
        }
        for (first, second, a_to_b) in [(mint_in, mint_out, true), (mint_out, mint_in, false)] {
            let (pda, _) = derive_pool(first, second, &self.program_id);
            if let Ok(data) = rpc.get_account_data(&pda).await {
                if let Ok(state) = parse_pool(&data) {
                    return Ok((pda, state, a_to_b));
                }
            }
        }
        Err(Error::PoolNotFound(*mint_in, *mint_out))
    }

    /// Accounts for position-scoped instructions plus the current position state.
    async fn position_accounts(
        &self,
        rpc:   &RpcClient,
        payer: &Keypair,
        pool:  Pubkey,
        state: &PoolState,
    ) -> Result<(PositionAccounts, PositionState)> {
        let owner = payer.pubkey();
        let (position, _)       = derive_position(&pool, &owner, &self.program_id);
        let (pool_authority, _) = derive_pool_authority(&pool, &self.program_id);
        let data = rpc
            .get_account_data(&position)
            .await
            .map_err(|_| Error::PositionNotFound { pool, owner })?;
        let position_state = parse_position(&data)?;

        let accounts = PositionAccounts {
            agent: owner,
            pool,
            pool_authority,
            position,
            vault_a:       state.token_a_vault,
            vault_b:       state.token_b_vault,
            agent_token_a: derive_ata(&owner, &state.token_a_mint),
            agent_token_b: derive_ata(&owner, &state.token_b_mint),
        };
        Ok((accounts, position_state))
    }

    /// All `Position` accounts owned by `owner` via `getProgramAccounts`.
    async fn fetch_positions(
        &self,
        rpc:   &RpcClient,
        owner: &Pubkey,
    ) -> Result<Vec<(Pubkey, PositionState)>> {
        let disc = anchor_discriminator("account", "Position");

        let config = RpcProgramAccountsConfig {
            filters: Some(vec![
                RpcFilterType::DataSize(POSITION_ACCOUNT_LEN as u64),
                RpcFilterType::Memcmp(Memcmp::new(0, MemcmpEncodedBytes::Bytes(disc.to_vec()))),
                RpcFilterType::Memcmp(Memcmp::new(
                    8,
                    MemcmpEncodedBytes::Bytes(owner.to_bytes().to_vec()),
                )),
            ]),
            account_config: RpcAccountInfoConfig::default(),
            ..Default::default()
        };

        let raw = rpc
            .get_program_accounts_with_config(&self.program_id, config)
            .await?;

        Ok(raw
            .into_iter()
            .filter_map(|(pk, acc)| match parse_position(&acc.data) {
                Ok(p) => Some((pk, p)),
                Err(e) => {
                    debug!(position = %pk, "skipping malformed position: {e}");
                    None
                }
            })
            .collect())
    }
}

// ─── Retryable operations ─────────────────────────────────────────────────────

/// One swap request. The last signed-and-sent result is kept so a retry can
/// first check whether it landed.
struct SwapAttempt<'a> {
    client:    &'a SwapClient,
    payer:     &'a Keypair,
    params:    SwapParams,
    rpc:       RpcClient,
    in_flight: Mutex<Option<SwapResult>>,
}

impl<'a> SwapAttempt<'a> {
    fn new(client: &'a SwapClient, payer: &'a Keypair, params: SwapParams) -> Self {
        Self { client, payer, params, rpc: client.rpc(), in_flight: Mutex::new(None) }
    }

    async fn send(&self, tolerance: Tolerance) -> Result<SwapResult> {
        let client = self.client;
        let params = &self.params;
        if params.amount_in == 0 {
            return Err(Error::InvalidArgument("amount_in must be > 0".into()));
        }

        let (pool_addr, pool_state, a_to_b) =
            client.find_pool_inner(&self.rpc, &params.mint_in, &params.mint_out).await?;
        let (reserve_in, reserve_out) =
            client.directed_reserves(&self.rpc, &pool_state, a_to_b).await?;
        let sim = simulate_detailed(
            pool_addr, &pool_state, reserve_in, reserve_out, params.amount_in, a_to_b,
        )?;
        let min_out = min_amount_out(sim.estimated_out, tolerance);
        debug!(
            pool = %pool_addr,
            estimated_out = sim.estimated_out,
            min_out,
            price_impact_pct = sim.price_impact_pct,
            "swap quoted"
        );

        let payer_key         = self.payer.pubkey();
        let (pool_authority, _) = derive_pool_authority(&pool_addr, &client.program_id);
        let (treasury, _)     = derive_treasury(&client.program_id);

        let ix = swap_ix(
            &client.program_id,
            &payer_key,
            &pool_addr,
            &pool_authority,
            &pool_state.token_a_vault,
            &pool_state.token_b_vault,
            &derive_ata(&payer_key, &params.mint_in),
            &derive_ata(&payer_key, &params.mint_out),
            &treasury,
            &derive_ata(&treasury, &params.mint_in),
            params.amount_in,
            min_out,
            a_to_b,
        );
        let tx = sign(&self.rpc, &[ix], self.payer, &[]).await?;

        let result = SwapResult {
            signature:      first_signature(&tx).to_string(),
            pool:           pool_addr,
            amount_in:      params.amount_in,
            estimated_out:  sim.estimated_out,
            min_amount_out: min_out,
            slippage_bps:   tolerance.bps(),
            a_to_b,
        };
        *self.in_flight.lock().await = Some(result.clone());

        self.rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|e| classify_send_error(e, sim.estimated_out, min_out, tolerance))?;
        info!(pool = %pool_addr, signature = %result.signature, slippage_bps = tolerance.bps(), "swap confirmed");
        Ok(result)
    }
}

#[async_trait]
impl Operation for SwapAttempt<'_> {
    type Output = SwapResult;
    type Error = Error;

    fn label(&self) -> &str {
        "swap"
    }

    async fn attempt(&self, attempt: Attempt) -> Result<SwapResult> {
        self.send(attempt.tolerance).await
    }

    async fn reconcile(&self) -> Result<Option<SwapResult>> {
        let sent = self.in_flight.lock().await.clone();
        match sent {
            Some(result) if signature_landed(&self.rpc, &result.signature).await? => Ok(Some(result)),
            _ => Ok(None),
        }
    }
}

/// One deposit request; see [`SwapAttempt`].
struct ProvideAttempt<'a> {
    client:    &'a SwapClient,
    payer:     &'a Keypair,
    params:    ProvideParams,
    rpc:       RpcClient,
    in_flight: Mutex<Option<ProvideResult>>,
}

impl<'a> ProvideAttempt<'a> {
    fn new(client: &'a SwapClient, payer: &'a Keypair, params: ProvideParams) -> Self {
        Self { client, payer, params, rpc: client.rpc(), in_flight: Mutex::new(None) }
    }

    /// `tolerance = None` keeps the caller's `min_lp`.
    async fn send(&self, tolerance: Option<Tolerance>) -> Result<ProvideResult> {
        let client = self.client;
        let params = &self.params;
        let payer_key = self.payer.pubkey();

        let (pool_addr, pool_state, a_to_b) =
            client.find_pool_inner(&self.rpc, &params.mint_a, &params.mint_b).await?;
        let (pool_authority, _) = derive_pool_authority(&pool_addr, &client.program_id);
        let (position, _)       = derive_position(&pool_addr, &payer_key, &client.program_id);
        let (reserve_a, reserve_b) = client.reserves(&self.rpc, &pool_state).await?;

        // Map the caller's mint order onto the pool's token A / token B.
        let (amount_pool_a, amount_pool_b) = if a_to_b {
            let b = compute_amount_b(
                params.amount_a, params.amount_b, reserve_a, reserve_b, pool_state.lp_supply,
            )?;
            (params.amount_a, b)
        } else {
            let a = compute_amount_b(
                params.amount_a, params.amount_b, reserve_b, reserve_a, pool_state.lp_supply,
            )?;
            (a, params.amount_a)
        };

        let expected_lp = expected_lp_minted(
            amount_pool_a, amount_pool_b, reserve_a, reserve_b, pool_state.lp_supply,
        )?;
        let (min_lp, tolerance) = lp_floor(expected_lp, tolerance, params.min_lp);

        let ix = provide_liquidity_ix(
            &client.program_id,
            &payer_key,
            &pool_addr,
            &pool_authority,
            &position,
            &pool_state.token_a_vault,
            &pool_state.token_b_vault,
            &derive_ata(&payer_key, &pool_state.token_a_mint),
            &derive_ata(&payer_key, &pool_state.token_b_mint),
            amount_pool_a,
            amount_pool_b,
            min_lp,
            params.auto_compound,
            params.compound_threshold,
        );
        let tx = sign(&self.rpc, &[ix], self.payer, &[]).await?;

        let result = ProvideResult {
            signature: first_signature(&tx).to_string(),
            pool:      pool_addr,
            position,
            amount_a:  amount_pool_a,
            amount_b:  amount_pool_b,
            expected_lp,
            min_lp,
        };
        *self.in_flight.lock().await = Some(result.clone());

        self.rpc
            .send_and_confirm_transaction(&tx)
            .await
            .map_err(|e| classify_send_error(e, expected_lp, min_lp, tolerance))?;
        info!(pool = %pool_addr, signature = %result.signature, expected_lp, min_lp, "liquidity provided");
        Ok(result)
    }
}

#[async_trait]
impl Operation for ProvideAttempt<'_> {
    type Output = ProvideResult;
    type Error = Error;

    fn label(&self) -> &str {
        "provide_liquidity"
    }

    async fn attempt(&self, attempt: Attempt) -> Result<ProvideResult> {
        self.send(Some(attempt.tolerance)).await
    }

    async fn reconcile(&self) -> Result<Option<ProvideResult>> {
        let sent = self.in_flight.lock().await.clone();
        match sent {
            Some(result) if signature_landed(&self.rpc, &result.signature).await? => Ok(Some(result)),
            _ => Ok(None),
        }
    }
}

// ─── Utilities ────────────────────────────────────────────────────────────────

async fn sign(
    rpc:          &RpcClient,
    instructions: &[Instruction],
    payer:        &Keypair,
    extra:        &[&Keypair],
) -> Result<Transaction> {
    let blockhash = rpc.get_latest_blockhash().await?;
    let mut signers: Vec<&dyn Signer> = vec![payer];
    signers.extend(extra.iter().map(|k| *k as &dyn Signer));
    Ok(Transaction::new_signed_with_payer(
        instructions,
        Some(&payer.pubkey()),
        &signers,
        blockhash,
    ))
}

/// The fee payer's signature, which is also the transaction id.
fn first_signature(tx: &Transaction) -> Signature {
    tx.signatures.first().copied().unwrap_or_default()
}

/// Whether `signature` is known to the cluster and executed without error.
async fn signature_landed(rpc: &RpcClient, signature: &str) -> Result<bool> {
    let sig = Signature::from_str(signature)
        .map_err(|e| Error::InvalidArgument(format!("bad signature {signature}: {e}")))?;
    let statuses = rpc.get_signature_statuses(&[sig]).await?.value;
    Ok(matches!(
        statuses.into_iter().next().flatten(),
        Some(status) if status.err.is_none() && status.satisfies_commitment(rpc.commitment())
    ))
}

/// LP floor for a deposit and the tolerance it stands for. `None` keeps the
/// caller's `min_lp`.
fn lp_floor(expected_lp: u64, tolerance: Option<Tolerance>, caller_min: u64) -> (u64, Tolerance) {
    match tolerance {
        Some(t) => (min_amount_out(expected_lp, t), t),
        None    => (caller_min, implied_tolerance(expected_lp, caller_min)),
    }
}

/// Surface the program's slippage rejection as [`Error::SlippageExceeded`].
fn classify_send_error(err: ClientError, estimated: u64, min: u64, tolerance: Tolerance) -> Error {
    match err.get_transaction_error() {
        Some(TransactionError::InstructionError(_, InstructionError::Custom(code)))
            if code == PROGRAM_ERR_SLIPPAGE_EXCEEDED =>
        {
            Error::SlippageExceeded { estimated, min, tolerance }
        }
        _ => Error::Rpc(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_overrides_program_and_commitment() {
        let program = Pubkey::new_unique();
        let client = SwapClient::devnet()
            .with_program_id(program)
            .with_commitment(CommitmentConfig::finalized());
        assert_eq!(client.program_id(), program);
        assert_eq!(client.rpc_url(), DEVNET_RPC);
        assert_eq!(client.commitment, CommitmentConfig::finalized());
    }

    #[test]
    fn signed_transaction_id_is_payer_signature() {
        let payer = Keypair::new();
        let tx = Transaction::new_signed_with_payer(
            &[],
            Some(&payer.pubkey()),
            &[&payer],
            solana_sdk::hash::Hash::default(),
        );
        assert_eq!(first_signature(&tx), tx.signatures[0]);
        assert_ne!(first_signature(&tx), Signature::default());
    }

    #[test]
    fn caller_min_lp_reports_its_own_tolerance() {
        assert_eq!(lp_floor(10_000, None, 9_900), (9_900, Tolerance::from_bps(100)));
        assert_eq!(
            lp_floor(10_000, Some(Tolerance::from_bps(50)), 0),
            (9_950, Tolerance::from_bps(50)),
        );

        let (min, tolerance) = lp_floor(10_000, None, 9_900);
        let rejected = ClientError::from(TransactionError::InstructionError(
            0,
            InstructionError::Custom(PROGRAM_ERR_SLIPPAGE_EXCEEDED),
        ));
        let err = classify_send_error(rejected, 10_000, min, tolerance);
        assert!(matches!(err, Error::SlippageExceeded { min: 9_900, .. }));
        assert!(err.to_string().contains("triggered at 1.00%"), "{err}");
    }

    #[tokio::test]
    async fn swap_rejects_zero_amount_before_any_rpc() {
        let client = SwapClient::new("http://127.0.0.1:1");
        let payer = Keypair::new();
        let err = client
            .convert(&payer, SwapParams {
                mint_in:      Pubkey::new_unique(),
                mint_out:     Pubkey::new_unique(),
                amount_in:    0,
                max_slippage: Tolerance::from_pct(1.0),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn create_pool_validates_fee_rate() {
        let client = SwapClient::new("http://127.0.0.1:1");
        let err = client
            .create_pool(&Keypair::new(), CreatePoolParams {
                mint_a:       Pubkey::new_unique(),
                mint_b:       Pubkey::new_unique(),
                fee_rate_bps: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }
}
