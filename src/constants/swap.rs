/// Largest accepted slippage fraction (inclusive)
pub const MAX_SLIPPAGE: f64 = 0.2;

/// Slippage used when nothing valid is persisted
pub const DEFAULT_SLIPPAGE: f64 = 0.01;

/// Quiet period applied to wallet/constant churn before re-quoting
pub const DEFAULT_DEBOUNCE_MILLIS: u64 = 300;

/// Upper bound for a single provider call
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 15;

/// Taker fee kept by the order book, as a fraction
pub const BASE_TAKER_FEE_BPS: f64 = 0.0022;

/// Share of the input that reaches the book after the taker fee
pub const FEE_MULTIPLIER: f64 = 1.0 - BASE_TAKER_FEE_BPS;

/// Size of an SPL token account, used for the rent-exempt creation fee
pub const TOKEN_ACCOUNT_LEN: usize = 165;
