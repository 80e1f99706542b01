//! Agent loop: quote, then swap with escalating slippage.
//!
//! ```bash
//! export SOLANA_RPC_URL="https://api.devnet.solana.com"
//! export AGENT_KEYPAIR_PATH="$HOME/.config/solana/id.json"
//! # optional, any subset of the fields
//! export RETRY_POLICY='{"max_attempts": 4, "delay_ms": 1500}'
//! RUST_LOG=swapkit_sdk=info cargo run --example agent_retry
//! ```

use std::error::Error;

use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Signer},
};
use swapkit_sdk::{RetryError, RetryPolicy, SimulateParams, SwapClient, SwapParams, Tolerance};
use tracing_subscriber::EnvFilter;

const WSOL_MINT: Pubkey = solana_sdk::pubkey!("So11111111111111111111111111111111111111112");
const USDC_MINT: Pubkey = solana_sdk::pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let rpc_url = std::env::var("SOLANA_RPC_URL")
        .unwrap_or_else(|_| "https://api.devnet.solana.com".into());
    let keypair_path = std::env::var("AGENT_KEYPAIR_PATH").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{home}/.config/solana/id.json")
    });
    let payer = read_keypair_file(&keypair_path)?;

    let policy: RetryPolicy = match std::env::var("RETRY_POLICY") {
        Ok(raw) => serde_json::from_str(&raw)?,
        Err(_) => RetryPolicy::default(),
    };
    policy.validate()?;

    let client = SwapClient::new(rpc_url);
    println!("agent {}", payer.pubkey());

    let amount_in = 10_000_000; // 0.01 SOL
    let sim = client
        .simulate(SimulateParams { mint_in: WSOL_MINT, mint_out: USDC_MINT, amount_in })
        .await?;
    println!("quote: {} out, {:.3}% impact", sim.estimated_out, sim.price_impact_pct);

    if sim.price_impact_pct > 2.0 {
        println!("impact too high, skipping");
        return Ok(());
    }

    let params = SwapParams {
        mint_in:      WSOL_MINT,
        mint_out:     USDC_MINT,
        amount_in,
        max_slippage: Tolerance::from_pct(0.5),
    };
    match client.convert_with_retry(&payer, params, policy).await {
        Ok(swap) => {
            println!("swapped at {}: {}", Tolerance::from_bps(swap.slippage_bps), swap.signature);
        }
        Err(RetryError::RetriesExhausted { attempts, last_tolerance, source, .. }) => {
            println!("gave up after {attempts} attempts (last {last_tolerance}): {source}");
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
