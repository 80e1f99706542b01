//! swapkit Rust SDK
//!
//! Async client for a constant-product AMM on Solana, built for agents that
//! have to keep trading through congested blocks. Swaps and deposits can be
//! submitted through a retrying [`Submitter`] that widens slippage tolerance
//! after each failed attempt.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use swapkit_sdk::{RetryPolicy, SimulateParams, SwapClient, SwapParams, Tolerance};
//! use solana_sdk::{pubkey::Pubkey, signature::Keypair};
//! use std::str::FromStr;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SwapClient::devnet();
//!     let keypair = Keypair::new(); // use your agent's funded keypair
//!
//!     let sol  = Pubkey::from_str("So11111111111111111111111111111111111111112")?;
//!     let usdc = Pubkey::from_str("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")?;
//!
//!     // 1. Simulate first to check the trade
//!     let sim = client.simulate(SimulateParams {
//!         mint_in: sol, mint_out: usdc, amount_in: 1_000_000_000,
//!     }).await?;
//!     println!("Estimated out: {}  price_impact: {:.2}%", sim.estimated_out, sim.price_impact_pct);
//!
//!     // 2. Up to 3 attempts at 0.5%, 1.0%, 1.5% slippage, 2s apart
//!     let policy = RetryPolicy::default();
//!     let result = client.convert_with_retry(&keypair, SwapParams {
//!         mint_in:      sol,
//!         mint_out:     usdc,
//!         amount_in:    1_000_000_000,
//!         max_slippage: Tolerance::from_pct(0.5),
//!     }, policy).await?;
//!     println!("Swapped! tx: {}", result.signature);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Feature Overview
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`SwapClient::create_pool`] | Create a new pool for a mint pair |
//! | [`SwapClient::provide_liquidity`] | Deposit tokens, receive LP shares |
//! | [`SwapClient::provide_with_retry`] | Deposit with escalating LP slippage |
//! | [`SwapClient::convert`] | Atomic token swap |
//! | [`SwapClient::convert_with_retry`] | Swap with escalating slippage |
//! | [`SwapClient::remove_liquidity`] | Burn LP shares for both tokens |
//! | [`SwapClient::claim_fees`] | Collect accrued LP fees |
//! | [`SwapClient::simulate`] | Off-chain fee + slippage breakdown |
//! | [`SwapClient::pool_info`] | Pool reserves, price, fee rate |
//! | [`SwapClient::my_positions`] | All LP positions for an owner |
//! | [`SwapClient::my_fees`] | Aggregated claimable fees |
//!
//! The retry machinery in [`retry`] is independent of Solana and can drive
//! any fallible async operation.

pub mod client;
pub mod error;
pub mod instructions;
pub mod math;
pub mod retry;
pub mod state;
pub mod types;

pub use client::SwapClient;
pub use error::{Error, Result};
pub use retry::{
    Attempt, IdempotencyKey, Operation, PolicyError, RetryError, RetryPolicy, Submitter,
    Tolerance,
};
pub use types::*;
