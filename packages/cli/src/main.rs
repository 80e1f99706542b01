mod commands;
mod logging;
mod retry_args;
mod tokens;

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use swapkit_sdk::{client::DEFAULT_PROGRAM_ID, SwapClient};

use crate::commands::Ctx;
use crate::retry_args::RetryArgs;
use crate::tokens::Pair;

// ─── Version banner ───────────────────────────────────────────────────────────

fn print_banner() {
    let ver = env!("CARGO_PKG_VERSION");
    println!();
    println!("  swapkit  v{ver}  ·  constant-product AMM client for Solana");
    println!("  {}", "─".repeat(62));
    println!("  Program   {DEFAULT_PROGRAM_ID}");
    println!("  Fees      0.020% protocol  +  0.01%–1.00% LP (per pool)");
    println!("  Retries   3 attempts, 0.5% → 1.0% → 1.5% slippage, 2s apart");
    println!();
}

// ─── CLI definition ───────────────────────────────────────────────────────────

/// swapkit: swaps and liquidity on a Solana constant-product AMM.
///
/// Every command supports --json for machine-readable output.
/// Swaps and deposits retry with widening slippage tolerance.
#[derive(Parser)]
#[command(
    name    = "swapkit",
    version = env!("CARGO_PKG_VERSION"),
    about   = "Swaps and liquidity on a Solana constant-product AMM, with retrying submission.",
    after_help = "\
ENVIRONMENT:
  SWAPKIT_RPC_URL         Solana JSON-RPC endpoint  [default: https://api.mainnet-beta.solana.com]
  SWAPKIT_KEYPAIR         Path to Ed25519 keypair JSON  [default: ~/.config/solana/id.json]
  SWAPKIT_LOG             tracing filter, overrides -v (e.g. swapkit_sdk=debug)
  SWAPKIT_MAX_ATTEMPTS    SWAPKIT_SLIPPAGE  SWAPKIT_SLIPPAGE_STEP
  SWAPKIT_MAX_SLIPPAGE    SWAPKIT_RETRY_DELAY_MS

QUICK START:
  swapkit simulate  --in SOL --out USDC --amount 1000000000
  swapkit convert   --in SOL --out USDC --amount 1000000000 -v
  swapkit provide   --pair SOL-USDC --amount 500000000
  swapkit claim-fees --pair SOL-USDC
  swapkit impermanent-loss --entry-price 150 --current-price 185"
)]
struct Cli {
    /// Solana JSON-RPC endpoint
    #[arg(
        long,
        global        = true,
        value_name    = "URL",
        default_value = "https://api.mainnet-beta.solana.com",
        env           = "SWAPKIT_RPC_URL"
    )]
    rpc_url: String,

    /// Path to the agent's Ed25519 keypair JSON file
    #[arg(
        long,
        global        = true,
        value_name    = "PATH",
        default_value = "~/.config/solana/id.json",
        env           = "SWAPKIT_KEYPAIR"
    )]
    keypair: String,

    /// Output machine-readable JSON instead of human-readable text
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    /// More stderr logging. Attempt progress always shows; -v adds CLI detail, -vv quotes and RPC detail
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new x·y=k liquidity pool for a token pair
    #[command(
        name = "create-pool",
        after_help = "\
EXAMPLES:
  swapkit create-pool --pair SOL-USDC --initial-price 185 --fee-bps 30
  swapkit create-pool --pair SOL-USDC --initial-price 185 --seed-amount 1000000000

NOTES:
  After creation the pool is empty. Run `provide` to seed initial liquidity.
  Fee range: 1–100 bps (0.01%–1.00%)."
    )]
    CreatePool {
        /// Token pair, e.g. SOL-USDC or <mintA>-<mintB>
        #[arg(long, value_name = "A-B")]
        pair: Pair,

        /// Token B per token A. Only used for the seed-command hint.
        #[arg(long, value_name = "FLOAT")]
        initial_price: f64,

        /// Token A amount for the seed-command hint (0 = no hint)
        #[arg(long, value_name = "AMOUNT", default_value_t = 0)]
        seed_amount: u64,

        /// LP fee charged on every swap, in basis points (1–100)
        #[arg(long, value_name = "BPS", default_value_t = 30)]
        fee_bps: u16,
    },

    /// Add liquidity to a pool and receive LP shares
    ///
    /// The minimum LP shares accepted follow the retry slippage schedule.
    #[command(
        after_help = "\
EXAMPLES:
  # Seed empty pool (first deposit sets the price)
  swapkit provide --pair SOL-USDC --amount 1000000000 --amount-b 185000000

  # Existing pool, amount-b computed from live reserves
  swapkit provide --pair SOL-USDC --amount 500000000 --auto-compound"
    )]
    Provide {
        #[arg(long, value_name = "A-B")]
        pair: Pair,

        /// Amount of the pair's first token to deposit (atomic units)
        #[arg(long, value_name = "AMOUNT")]
        amount: u64,

        /// Amount of the second token. Required for the first deposit.
        #[arg(long, value_name = "AMOUNT")]
        amount_b: Option<u64>,

        /// Reinvest accrued LP fees into additional LP shares on claim
        #[arg(long, default_value_t = false)]
        auto_compound: bool,

        /// Minimum combined fees before auto-compound fires
        #[arg(long, value_name = "AMOUNT", default_value_t = 0)]
        compound_threshold: u64,

        #[command(flatten)]
        retry: RetryArgs,
    },

    /// Execute a token swap, retrying with wider slippage on failure
    #[command(
        after_help = "\
EXAMPLES:
  swapkit convert --in SOL --out USDC --amount 1000000000
  swapkit convert --in SOL --out USDC --amount 1000000000 --max-attempts 1 --slippage 0.1
  swapkit convert --in SOL --out USDC --amount 1000000000 --max-slippage 2 --json

RETRY:
  Attempt n uses min(slippage + (n-1) × slippage-step, max-slippage).
  Before each retry the previous transaction is checked, so a swap that
  landed late is reported instead of being sent twice."
    )]
    Convert {
        /// Token to sell: symbol (SOL, USDC, USDT) or base-58 mint address
        #[arg(long = "in", value_name = "TOKEN")]
        token_in: String,

        /// Token to receive: symbol or base-58 mint address
        #[arg(long = "out", value_name = "TOKEN")]
        token_out: String,

        /// Amount of the input token to sell (atomic units)
        #[arg(long, value_name = "AMOUNT")]
        amount: u64,

        #[command(flatten)]
        retry: RetryArgs,
    },

    /// Preview a swap's fee breakdown without sending any transaction
    Simulate {
        #[arg(long = "in", value_name = "TOKEN")]
        token_in: String,

        #[arg(long = "out", value_name = "TOKEN")]
        token_out: String,

        #[arg(long, value_name = "AMOUNT")]
        amount: u64,
    },

    /// Show pool reserves, spot price, LP supply, and fee rate
    #[command(name = "pool-info")]
    PoolInfo {
        #[arg(long, value_name = "A-B")]
        pair: Pair,
    },

    /// List all LP positions owned by the agent keypair
    #[command(name = "my-positions")]
    MyPositions,

    /// Show unclaimed LP fees across all positions
    #[command(name = "my-fees")]
    MyFees,

    /// Burn LP shares and withdraw proportional tokens from a pool
    #[command(name = "remove-liquidity")]
    RemoveLiquidity {
        #[arg(long, value_name = "A-B")]
        pair: Pair,

        /// Number of LP shares to burn (see `my-positions`)
        #[arg(long, value_name = "SHARES")]
        shares: u64,

        /// Accept up to this many percent below the expected amounts
        #[arg(long, value_name = "PCT", default_value_t = 0.5)]
        slippage: f64,
    },

    /// Claim accrued LP trading fees for one pool position
    #[command(name = "claim-fees")]
    ClaimFees {
        #[arg(long, value_name = "A-B")]
        pair: Pair,
    },

    /// Impermanent loss of an LP position versus holding, offline
    #[command(name = "impermanent-loss")]
    ImpermanentLoss {
        /// Price of token A in token B when liquidity was added
        #[arg(long, value_name = "PRICE")]
        entry_price: f64,

        /// Price of token A in token B now
        #[arg(long, value_name = "PRICE")]
        current_price: f64,
    },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().len() == 1 {
        print_banner();
        Cli::command().print_long_help().ok();
        println!();
        return Ok(());
    }

    let cli = Cli::parse();
    logging::init(cli.verbose);

    let ctx = Ctx {
        client:  SwapClient::new(cli.rpc_url),
        keypair: cli.keypair,
        json:    cli.json,
    };

    match cli.command {
        Commands::CreatePool { pair, initial_price, seed_amount, fee_bps } => {
            commands::create_pool(&ctx, &pair, initial_price, seed_amount, fee_bps).await
        }
        Commands::Provide { pair, amount, amount_b, auto_compound, compound_threshold, retry } => {
            commands::provide(&ctx, &pair, amount, amount_b, auto_compound, compound_threshold, &retry)
                .await
        }
        Commands::Convert { token_in, token_out, amount, retry } => {
            commands::convert(&ctx, &token_in, &token_out, amount, &retry).await
        }
        Commands::Simulate { token_in, token_out, amount } => {
            commands::simulate(&ctx, &token_in, &token_out, amount).await
        }
        Commands::PoolInfo { pair } => commands::pool_info(&ctx, &pair).await,
        Commands::MyPositions => commands::my_positions(&ctx).await,
        Commands::MyFees => commands::my_fees(&ctx).await,
        Commands::RemoveLiquidity { pair, shares, slippage } => {
            commands::remove_liquidity(&ctx, &pair, shares, slippage).await
        }
        Commands::ClaimFees { pair } => commands::claim_fees(&ctx, &pair).await,
        Commands::ImpermanentLoss { entry_price, current_price } => {
            commands::impermanent_loss(&ctx, entry_price, current_price)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn convert_flags_and_globals_parse() {
        let cli = Cli::try_parse_from([
            "swapkit", "convert", "--in", "SOL", "--out", "USDC", "--amount", "5",
            "--max-attempts", "4", "-vv", "--json",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        match cli.command {
            Commands::Convert { amount, retry, .. } => {
                assert_eq!(amount, 5);
                assert_eq!(retry.max_attempts, 4);
            }
            _ => panic!("expected convert"),
        }
    }

    #[test]
    fn pair_is_validated_at_parse_time() {
        assert!(Cli::try_parse_from(["swapkit", "pool-info", "--pair", "SOL"]).is_err());
        assert!(Cli::try_parse_from(["swapkit", "pool-info", "--pair", "SOL-USDC"]).is_ok());
    }
}
