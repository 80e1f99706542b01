//! Token symbols, `A-B` pair strings and keypair loading.

use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use solana_sdk::{
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair},
};

// ─── Token symbol registry (mainnet-beta) ────────────────────────────────────

pub const KNOWN_TOKENS: &[(&str, Pubkey)] = &[
    ("SOL",  solana_sdk::pubkey!("So11111111111111111111111111111111111111112")),
    ("USDC", solana_sdk::pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")),
    ("USDT", solana_sdk::pubkey!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB")),
];

/// Resolve a symbol (SOL, USDC, USDT) or raw base-58 mint address to a Pubkey.
pub fn resolve_mint(symbol_or_address: &str) -> Result<Pubkey> {
    let upper = symbol_or_address.to_uppercase();
    if let Some((_, mint)) = KNOWN_TOKENS.iter().find(|(sym, _)| *sym == upper) {
        return Ok(*mint);
    }
    Pubkey::from_str(symbol_or_address).map_err(|_| {
        anyhow!(
            "Unknown token '{}'. Use a built-in symbol ({}) or a base-58 mint address.",
            symbol_or_address,
            KNOWN_TOKENS.iter().map(|(s, _)| *s).collect::<Vec<_>>().join(", ")
        )
    })
}

/// Reverse lookup: mint → symbol, or a shortened address for unknowns.
pub fn resolve_symbol(mint: &Pubkey) -> String {
    if let Some((sym, _)) = KNOWN_TOKENS.iter().find(|(_, known)| known == mint) {
        return sym.to_string();
    }
    let addr = mint.to_string();
    format!("{}…{}", &addr[..4], &addr[addr.len() - 4..])
}

/// A parsed `--pair TOKEN_A-TOKEN_B`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    pub symbol_a: String,
    pub symbol_b: String,
    pub mint_a:   Pubkey,
    pub mint_b:   Pubkey,
}

impl FromStr for Pair {
    type Err = anyhow::Error;

    fn from_str(pair: &str) -> Result<Self> {
        let (a, b) = pair
            .split_once('-')
            .filter(|(a, b)| !a.is_empty() && !b.is_empty())
            .ok_or_else(|| {
                anyhow!("--pair must be TOKEN_A-TOKEN_B (e.g. SOL-USDC or <mintA>-<mintB>). Got: '{pair}'")
            })?;
        let mint_a = resolve_mint(a).context("pair: token A")?;
        let mint_b = resolve_mint(b).context("pair: token B")?;
        if mint_a == mint_b {
            return Err(anyhow!("Token A and token B in --pair must be different."));
        }
        Ok(Pair { symbol_a: a.to_string(), symbol_b: b.to_string(), mint_a, mint_b })
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.symbol_a, self.symbol_b)
    }
}

// ─── Keypairs ─────────────────────────────────────────────────────────────────

/// Expand `~/` to `$HOME/` in keypair paths.
pub fn expand_home(path: &str) -> String {
    expand_home_in(path, &std::env::var("HOME").unwrap_or_default())
}

fn expand_home_in(path: &str, home: &str) -> String {
    match path.strip_prefix("~/") {
        Some(rest) => format!("{home}/{rest}"),
        None => path.to_string(),
    }
}

pub fn load_keypair(path: &str) -> Result<Keypair> {
    let expanded = expand_home(path);
    read_keypair_file(&expanded).map_err(|e| {
        anyhow!(
            "Cannot load keypair from '{}': {}\n  \
             Set SWAPKIT_KEYPAIR or pass --keypair to specify a different path.",
            expanded,
            e
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbols_are_case_insensitive() {
        assert_eq!(resolve_mint("usdc").unwrap(), KNOWN_TOKENS[1].1);
        assert_eq!(resolve_symbol(&KNOWN_TOKENS[0].1), "SOL");
    }

    #[test]
    fn raw_addresses_pass_through() {
        let mint = Pubkey::new_unique();
        assert_eq!(resolve_mint(&mint.to_string()).unwrap(), mint);
        assert!(resolve_mint("NOTATOKEN").is_err());
    }

    #[test]
    fn pair_parsing() {
        let pair: Pair = "SOL-USDC".parse().unwrap();
        assert_eq!(pair.mint_a, KNOWN_TOKENS[0].1);
        assert_eq!(pair.to_string(), "SOL-USDC");
        assert!("SOL".parse::<Pair>().is_err());
        assert!("SOL-".parse::<Pair>().is_err());
        assert!("SOL-sol".parse::<Pair>().is_err());
    }

    #[test]
    fn home_is_expanded() {
        assert_eq!(expand_home_in("~/id.json", "/home/agent"), "/home/agent/id.json");
        assert_eq!(expand_home_in("/abs/id.json", "/home/agent"), "/abs/id.json");
        assert_eq!(expand_home_in("~user/id.json", "/home/agent"), "~user/id.json");
    }
}
