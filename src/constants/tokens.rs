//! Well-known token mints

use solana_sdk::pubkey;

pub use solana_sdk::pubkey::Pubkey;

/// SOL Mint (Wrapped SOL)
pub const SOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");

/// USDC Mint (mainnet)
pub const USDC_MINT: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");

/// USDT Mint (mainnet)
pub const USDT_MINT: Pubkey = pubkey!("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB");

pub const SOL_DECIMALS: u8 = 9;

/// Symbol for well-known mints, used in logs and analytics when a wallet carries none.
pub fn known_token_symbol(mint: &Pubkey) -> Option<&'static str> {
    if mint == &SOL_MINT {
        Some("SOL")
    } else if mint == &USDC_MINT {
        Some("USDC")
    } else if mint == &USDT_MINT {
        Some("USDT")
    } else {
        None
    }
}
