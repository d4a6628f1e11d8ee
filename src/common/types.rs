use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::time::Duration;

use crate::constants::{
    DEFAULT_DEBOUNCE_MILLIS, DEFAULT_PROVIDER_TIMEOUT_SECS, DEFAULT_SLIPPAGE, MAX_SLIPPAGE,
    SOL_DECIMALS, SOL_MINT,
};
use crate::utils::amount::lamports_to_amount;

/// Token identity as the quote engine sees it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenRef {
    pub mint: Pubkey,
    pub symbol: String,
    pub decimals: u8,
    /// Native SOL (not the wrapped SPL token, even though both share a mint)
    pub is_native: bool,
}

impl TokenRef {
    pub fn new(mint: Pubkey, symbol: impl Into<String>, decimals: u8) -> Self {
        Self { mint, symbol: symbol.into(), decimals, is_native: false }
    }

    pub fn native_sol() -> Self {
        Self { mint: SOL_MINT, symbol: "SOL".to_string(), decimals: SOL_DECIMALS, is_native: true }
    }
}

/// A user wallet, owned by the wallets repository and referenced by the engine
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Wallet {
    /// Token account address; `None` until the account has been created
    pub pubkey: Option<Pubkey>,
    pub token: TokenRef,
    /// Balance in base units
    pub lamports: u64,
}

impl Wallet {
    pub fn new(pubkey: Option<Pubkey>, token: TokenRef, lamports: u64) -> Self {
        Self { pubkey, token, lamports }
    }

    pub fn native_sol(owner: Pubkey, lamports: u64) -> Self {
        Self { pubkey: Some(owner), token: TokenRef::native_sol(), lamports }
    }

    pub fn mint(&self) -> Pubkey {
        self.token.mint
    }

    pub fn decimals(&self) -> u8 {
        self.token.decimals
    }

    pub fn is_native(&self) -> bool {
        self.token.is_native
    }

    /// Balance in UI units
    pub fn amount(&self) -> f64 {
        lamports_to_amount(self.lamports, self.token.decimals)
    }
}

pub type SolanaRpcClient = solana_client::nonblocking::rpc_client::RpcClient;

/// Which asset covers network fees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PayingToken {
    #[default]
    NativeToken,
    TransactionToken,
}

/// Swap session tunables
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Quiet period before a wallet/constant change triggers a re-quote
    pub debounce: Duration,
    /// Upper bound (inclusive) for a valid slippage fraction
    pub max_slippage: f64,
    /// Used when the settings store holds nothing valid
    pub default_slippage: f64,
    /// Applied to every provider call; `None` lets a hung call stay Loading
    pub provider_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MILLIS),
            max_slippage: MAX_SLIPPAGE,
            default_slippage: DEFAULT_SLIPPAGE,
            provider_timeout: Some(Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS)),
        }
    }
}

impl SessionConfig {
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_max_slippage(mut self, max_slippage: f64) -> Self {
        self.max_slippage = max_slippage;
        self
    }

    pub fn with_default_slippage(mut self, default_slippage: f64) -> Self {
        self.default_slippage = default_slippage;
        self
    }

    pub fn with_provider_timeout(mut self, provider_timeout: Option<Duration>) -> Self {
        self.provider_timeout = provider_timeout;
        self
    }
}
