//! One function per subcommand. Each prints either a human-readable report or
//! a single JSON object on stdout.

use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use solana_sdk::signature::Signer;
use swapkit_sdk::{
    math, CreatePoolParams, ProvideParams, RemoveLiquidityParams, SimulateParams, SwapClient,
    SwapParams, Tolerance,
};
use tracing::debug;

use crate::retry_args::RetryArgs;
use crate::tokens::{load_keypair, resolve_mint, resolve_symbol, Pair};

/// Settings shared by every subcommand.
pub struct Ctx {
    pub client:  SwapClient,
    pub keypair: String,
    pub json:    bool,
}

/// Print `body` as one JSON object tagged with `status` and `command`.
fn emit_json(command: &str, body: impl Serialize) -> Result<()> {
    let mut value = serde_json::to_value(body)?;
    if let Value::Object(map) = &mut value {
        map.insert("status".into(), json!("ok"));
        map.insert("command".into(), json!(command));
    }
    println!("{value}");
    Ok(())
}

// ─── create-pool ─────────────────────────────────────────────────────────────

pub async fn create_pool(
    ctx:           &Ctx,
    pair:          &Pair,
    initial_price: f64,
    seed_amount:   u64,
    fee_bps:       u16,
) -> Result<()> {
    if !(initial_price.is_finite() && initial_price > 0.0) {
        return Err(anyhow!("--initial-price must be a positive number, got {initial_price}"));
    }
    let payer = load_keypair(&ctx.keypair)?;
    let result = ctx
        .client
        .create_pool(&payer, CreatePoolParams { mint_a: pair.mint_a, mint_b: pair.mint_b, fee_rate_bps: fee_bps })
        .await
        .context("create-pool transaction failed")?;

    let seed_b = (seed_amount as f64 * initial_price) as u64;
    let seed_cmd = (seed_amount > 0).then(|| {
        format!("swapkit provide --pair {pair} --amount {seed_amount} --amount-b {seed_b}")
    });

    if ctx.json {
        return emit_json("create-pool", json!({
            "result":        result,
            "initial_price": initial_price,
            "seed_command":  seed_cmd,
        }));
    }
    println!("─── Pool Created ─────────────────────────────────────────────────");
    println!("  Pair             {pair}");
    println!("  Pool             {}", result.pool);
    println!("  Pool authority   {}", result.pool_authority);
    println!("  Vault A          {}", result.vault_a);
    println!("  Vault B          {}", result.vault_b);
    println!("  LP fee           {} bps ({:.2}%)", fee_bps, fee_bps as f64 / 100.0);
    println!("  Transaction      {}", result.signature);
    println!();
    match seed_cmd {
        Some(cmd) => {
            println!("  Seed it at {initial_price} {} per {}:", pair.symbol_b, pair.symbol_a);
            println!("    {cmd}");
        }
        None => println!("  The pool is empty. Run `swapkit provide --pair {pair} ...` to seed it."),
    }
    Ok(())
}

// ─── provide ─────────────────────────────────────────────────────────────────

pub async fn provide(
    ctx:                &Ctx,
    pair:               &Pair,
    amount:             u64,
    amount_b:           Option<u64>,
    auto_compound:      bool,
    compound_threshold: u64,
    retry:              &RetryArgs,
) -> Result<()> {
    if amount == 0 {
        return Err(anyhow!("--amount must be > 0 (atomic units)"));
    }
    let policy = retry.policy()?;
    let payer = load_keypair(&ctx.keypair)?;

    let params = ProvideParams {
        mint_a: pair.mint_a,
        mint_b: pair.mint_b,
        amount_a: amount,
        amount_b,
        min_lp: 0,
        auto_compound,
        compound_threshold,
    };
    let result = ctx
        .client
        .provide_with_retry(&payer, params, policy)
        .await
        .context("provide failed")?;

    if ctx.json {
        return emit_json("provide", &result);
    }
    println!("─── Liquidity Provided ───────────────────────────────────────────");
    println!("  Pair             {pair}");
    println!("  Pool             {}", result.pool);
    println!("  Position         {}", result.position);
    println!("  Deposited A      {:>20}", result.amount_a);
    println!("  Deposited B      {:>20}", result.amount_b);
    println!("  LP shares (est.) {:>20}", result.expected_lp);
    println!("  LP min accepted  {:>20}", result.min_lp);
    if auto_compound {
        println!("  Auto-compound    on (threshold {compound_threshold})");
    }
    println!("  Transaction      {}", result.signature);
    Ok(())
}

// ─── convert ─────────────────────────────────────────────────────────────────

pub async fn convert(
    ctx:       &Ctx,
    token_in:  &str,
    token_out: &str,
    amount_in: u64,
    retry:     &RetryArgs,
) -> Result<()> {
    let mint_in  = resolve_mint(token_in).context("--in")?;
    let mint_out = resolve_mint(token_out).context("--out")?;
    if mint_in == mint_out {
        return Err(anyhow!("--in and --out must be different tokens."));
    }
    if amount_in == 0 {
        return Err(anyhow!(
            "--amount must be > 0 (atomic units: lamports for SOL, μUSDC for USDC, etc.)"
        ));
    }
    let policy = retry.policy()?;
    let payer = load_keypair(&ctx.keypair)?;
    debug!(agent = %payer.pubkey(), ?policy, "converting");

    let params = SwapParams { mint_in, mint_out, amount_in, max_slippage: policy.base_tolerance };
    let result = ctx
        .client
        .convert_with_retry(&payer, params, policy)
        .await
        .context("swap failed")?;

    if ctx.json {
        return emit_json("convert", json!({
            "token_in":  token_in,
            "token_out": token_out,
            "result":    result,
        }));
    }
    let dir = if result.a_to_b { "A → B" } else { "B → A" };
    println!("─── Swap Executed ────────────────────────────────────────────────");
    println!("  Direction        {dir}  ({token_in} → {token_out})");
    println!("  Pool             {}", result.pool);
    println!("  Sold             {:>20}  {token_in}", result.amount_in);
    println!("  Received (est.)  {:>20}  {token_out}", result.estimated_out);
    println!(
        "  Min accepted     {:>20}  {token_out}  ({} slippage guard)",
        result.min_amount_out,
        Tolerance::from_bps(result.slippage_bps)
    );
    println!("  Transaction      {}", result.signature);
    Ok(())
}

// ─── simulate ────────────────────────────────────────────────────────────────

pub async fn simulate(ctx: &Ctx, token_in: &str, token_out: &str, amount_in: u64) -> Result<()> {
    let mint_in  = resolve_mint(token_in).context("--in")?;
    let mint_out = resolve_mint(token_out).context("--out")?;
    let sim = ctx
        .client
        .simulate(SimulateParams { mint_in, mint_out, amount_in })
        .await?;

    if ctx.json {
        return emit_json("simulate", &sim);
    }
    let dir = if sim.a_to_b { "A → B" } else { "B → A" };
    println!("─── Simulate: {token_in} → {token_out} ─────────────────────────────────");
    println!("  Pool             {}", sim.pool);
    println!("  Direction        {dir}");
    println!("  Reserve in       {:>20}", sim.reserve_in);
    println!("  Reserve out      {:>20}", sim.reserve_out);
    println!();
    println!("  ─── Fee Breakdown ────────────────────────────────");
    println!("  Sold             {:>20}  {token_in}", sim.amount_in);
    println!("  Protocol fee     {:>20}  (0.020%)", sim.protocol_fee);
    println!("  LP fee           {:>20}  ({:.2}% of net)", sim.lp_fee, sim.fee_rate_bps as f64 / 100.0);
    println!("  After all fees   {:>20}", sim.after_fees);
    println!();
    println!("  ─── Output ───────────────────────────────────────");
    println!("  Estimated out    {:>20}  {token_out}", sim.estimated_out);
    println!("  Effective rate   {:>20.6}", sim.effective_rate);
    println!("  Price impact     {:>19.4}%", sim.price_impact_pct);
    if sim.price_impact_pct > 5.0 {
        println!();
        println!("  Warning: price impact above 5%. Consider a smaller amount.");
    }
    Ok(())
}

// ─── pool-info ────────────────────────────────────────────────────────────────

pub async fn pool_info(ctx: &Ctx, pair: &Pair) -> Result<()> {
    let info = ctx
        .client
        .pool_info(pair.mint_a, pair.mint_b)
        .await
        .with_context(|| format!("No pool found for pair '{pair}'"))?;

    if ctx.json {
        return emit_json("pool-info", &info);
    }
    println!("─── Pool Info: {pair} ─────────────────────────────────────────────");
    println!("  Pool             {}", info.pool);
    println!("  Token A          {} ({})", resolve_symbol(&info.mint_a), info.mint_a);
    println!("  Token B          {} ({})", resolve_symbol(&info.mint_b), info.mint_b);
    println!("  Reserve A        {:>20}", info.reserve_a);
    println!("  Reserve B        {:>20}", info.reserve_b);
    println!("  LP supply        {:>20}", info.lp_supply);
    println!("  LP fee           {} bps ({:.2}%)", info.fee_rate_bps, info.fee_rate_bps as f64 / 100.0);
    println!("  Spot price       {:>20.9}  (B per A, raw units)", info.spot_price);
    Ok(())
}

// ─── my-positions / my-fees ───────────────────────────────────────────────────

pub async fn my_positions(ctx: &Ctx) -> Result<()> {
    let payer = load_keypair(&ctx.keypair)?;
    let positions = ctx.client.my_positions(&payer.pubkey()).await?;

    if ctx.json {
        return emit_json("my-positions", json!({
            "agent":     payer.pubkey().to_string(),
            "positions": positions,
        }));
    }
    println!("─── My Positions ─────────────────────────────────────────────────");
    println!("  Agent   {}", payer.pubkey());
    println!();
    if positions.is_empty() {
        println!("  No LP positions found.");
        println!("  Run `swapkit provide --pair <PAIR> --amount <AMT>` to open one.");
        return Ok(());
    }
    for (i, p) in positions.iter().enumerate() {
        println!("  [{:>2}]  Position   {}", i + 1, p.address);
        println!("        Pool       {}", p.pool);
        println!("        LP shares  {:>20}", p.lp_shares);
        if p.auto_compound {
            println!("        Compound   on (threshold {})", p.compound_threshold);
        }
        println!();
    }
    Ok(())
}

pub async fn my_fees(ctx: &Ctx) -> Result<()> {
    let payer = load_keypair(&ctx.keypair)?;
    let summary = ctx.client.my_fees(&payer.pubkey()).await?;

    if ctx.json {
        return emit_json("my-fees", json!({
            "agent":   payer.pubkey().to_string(),
            "summary": summary,
        }));
    }
    println!("─── My Fees ──────────────────────────────────────────────────────");
    println!("  Agent   {}", payer.pubkey());
    println!();
    if summary.positions.is_empty() {
        println!("  No LP positions found — no fees to show.");
        return Ok(());
    }
    for (i, p) in summary.positions.iter().enumerate() {
        println!("  [{:>2}]  Position   {}", i + 1, p.address);
        println!("        Pool       {}", p.pool);
        println!("        Fees A     {:>20}", p.total_fees_a);
        println!("        Fees B     {:>20}", p.total_fees_b);
        println!();
    }
    println!("  ─── Totals ───────────────────────────────────────");
    println!("  Total fees A     {:>20}  (across {} position(s))", summary.total_fees_a, summary.positions.len());
    println!("  Total fees B     {:>20}", summary.total_fees_b);
    println!();
    println!("  Includes pending fees accrued since last on-chain sync.");
    Ok(())
}

// ─── remove-liquidity ────────────────────────────────────────────────────────

pub async fn remove_liquidity(ctx: &Ctx, pair: &Pair, shares: u64, slippage: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&slippage) {
        return Err(anyhow!("--slippage {slippage} is out of range. Use 0–100 (percent)."));
    }
    let payer = load_keypair(&ctx.keypair)?;
    let result = ctx
        .client
        .remove_liquidity(&payer, RemoveLiquidityParams {
            mint_a:    pair.mint_a,
            mint_b:    pair.mint_b,
            lp_shares: shares,
            tolerance: Tolerance::from_pct(slippage),
        })
        .await
        .context("remove-liquidity failed")?;

    if ctx.json {
        return emit_json("remove-liquidity", &result);
    }
    println!("─── Liquidity Removed ────────────────────────────────────────────");
    println!("  Pair             {pair}");
    println!("  Position         {}", result.position);
    println!("  LP shares burned {:>20}", result.lp_shares);
    println!("  Token A (est.)   {:>20}  (min {})", result.expected_a, result.min_a);
    println!("  Token B (est.)   {:>20}  (min {})", result.expected_b, result.min_b);
    println!("  Transaction      {}", result.signature);
    println!();
    println!("  Run `swapkit claim-fees --pair {pair}` to collect accrued fees.");
    Ok(())
}

// ─── claim-fees ───────────────────────────────────────────────────────────────

pub async fn claim_fees(ctx: &Ctx, pair: &Pair) -> Result<()> {
    let payer = load_keypair(&ctx.keypair)?;
    let result = ctx
        .client
        .claim_fees(&payer, pair.mint_a, pair.mint_b)
        .await
        .context("claim-fees failed")?;

    if ctx.json {
        return emit_json("claim-fees", &result);
    }
    println!("─── Claim Fees ───────────────────────────────────────────────────");
    println!("  Pair             {pair}");
    println!("  Position         {}", result.position);
    println!("  Fees A           {:>20}", result.fees_a);
    println!("  Fees B           {:>20}", result.fees_b);
    match &result.signature {
        Some(sig) if result.auto_compound => println!("  Compounded       {sig}"),
        Some(sig) => println!("  Transaction      {sig}"),
        None => println!("  Nothing to claim; no transaction sent."),
    }
    Ok(())
}

// ─── impermanent-loss ─────────────────────────────────────────────────────────

pub fn impermanent_loss(ctx: &Ctx, entry_price: f64, current_price: f64) -> Result<()> {
    if !(entry_price.is_finite() && entry_price > 0.0) {
        return Err(anyhow!("--entry-price must be a positive number, got {entry_price}"));
    }
    let ratio = current_price / entry_price;
    let il = math::impermanent_loss(ratio)?;

    if ctx.json {
        return emit_json("impermanent-loss", json!({
            "entry_price":   entry_price,
            "current_price": current_price,
            "price_ratio":   ratio,
            "il_pct":        il * 100.0,
        }));
    }
    println!("─── Impermanent Loss ─────────────────────────────────────────────");
    println!("  Entry price      {entry_price:>20}");
    println!("  Current price    {current_price:>20}");
    println!("  Price ratio      {ratio:>20.6}");
    println!("  IL vs. holding   {:>19.4}%", il * 100.0);
    Ok(())
}
