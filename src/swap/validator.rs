//! Quote validation
//!
//! [`validate`] reduces a full snapshot of the quote to at most one [`ErrorCode`]. Rules
//! are ordered and the first match wins:
//!
//! 1. same source and destination mint: `SameTokenSwap`, whatever else is loaded
//! 2. fees loaded, network fee in native SOL and the native balance below it:
//!    `InsufficientFundsForFee`, even while other values are still loading
//! 3. anything still loading: no error
//! 4. a required value missing: `MissingParameters`
//! 5. input ≤ 0: `InvalidAmount`
//! 6. input below the minimum order size: `AmountTooSmall`
//! 7. input above the available amount: `InsufficientFunds`
//! 8. estimated amount of zero: `AmountTooSmall`
//! 9. exchange rate not positive: `InvalidExchangeRate`
//! 10. slippage outside (0, max]: `InvalidSlippage`
//!
//! "No pool for this pair" is not part of the chain; it lives in the exchange-rate
//! loadable's `Error` state, see [`loadable_error_code`].

use serde::Serialize;
use std::fmt;

use crate::common::loadable::{LoadState, LoadableState, combined};
use crate::common::types::Wallet;
use crate::swap::fees::FeeBreakdown;
use crate::utils::amount::is_greater_than;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    MissingParameters,
    InvalidAmount,
    InsufficientFunds,
    InsufficientFundsForFee,
    AmountTooSmall,
    InvalidExchangeRate,
    InvalidSlippage,
    SameTokenSwap,
    UnsupportedPair,
    SwappingUnavailable,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorCode::MissingParameters => "missing parameters",
            ErrorCode::InvalidAmount => "invalid amount",
            ErrorCode::InsufficientFunds => "insufficient funds",
            ErrorCode::InsufficientFundsForFee => "insufficient funds to cover the fee",
            ErrorCode::AmountTooSmall => "amount is too small",
            ErrorCode::InvalidExchangeRate => "invalid exchange rate",
            ErrorCode::InvalidSlippage => "invalid slippage",
            ErrorCode::SameTokenSwap => "cannot swap a token to itself",
            ErrorCode::UnsupportedPair => "swapping between these tokens is unsupported",
            ErrorCode::SwappingUnavailable => "swapping is currently unavailable",
        };
        f.write_str(text)
    }
}

/// Everything the validator looks at, borrowed from the session
#[derive(Debug, Clone, Copy)]
pub struct QuoteSnapshot<'a> {
    /// Combined state of the network constants
    pub initial_state: LoadState,
    pub source_wallet: Option<&'a Wallet>,
    pub destination_wallet: Option<&'a Wallet>,
    pub input_amount: Option<f64>,
    pub estimated_amount: Option<f64>,
    pub exchange_rate: &'a LoadableState<f64>,
    pub fees: &'a LoadableState<FeeBreakdown>,
    /// Smallest accepted input, in source UI units
    pub min_order_size: &'a LoadableState<f64>,
    /// Native SOL wallet, used for the fee check
    pub native_wallet: Option<&'a Wallet>,
    pub slippage: Option<f64>,
    pub max_slippage: f64,
    /// Source balance minus fees charged in the source token
    pub available_amount: Option<f64>,
}

/// `0 < slippage ≤ max_slippage`; NaN is never valid
pub fn is_slippage_valid(slippage: f64, max_slippage: f64) -> bool {
    slippage > 0.0 && slippage <= max_slippage
}

fn is_same_token_swap(snapshot: &QuoteSnapshot<'_>) -> bool {
    matches!(
        (snapshot.source_wallet, snapshot.destination_wallet),
        (Some(source), Some(destination)) if source.mint() == destination.mint()
    )
}

fn is_fee_unaffordable(snapshot: &QuoteSnapshot<'_>) -> bool {
    let LoadableState::Loaded(fees) = snapshot.fees else {
        return false;
    };
    let Some(fee) = fees.network_fee() else {
        return false;
    };
    if !fee.token.is_native {
        return false;
    }
    let balance = snapshot.native_wallet.map(|wallet| wallet.lamports).unwrap_or(0);
    balance < fee.amount
}

pub fn validate(snapshot: &QuoteSnapshot<'_>) -> Option<ErrorCode> {
    if is_same_token_swap(snapshot) {
        return Some(ErrorCode::SameTokenSwap);
    }

    // fires regardless of the loading gate below
    if is_fee_unaffordable(snapshot) {
        return Some(ErrorCode::InsufficientFundsForFee);
    }

    let loading = combined([
        snapshot.initial_state,
        snapshot.exchange_rate.load_state(),
        snapshot.fees.load_state(),
        snapshot.min_order_size.load_state(),
    ]);
    if loading != LoadState::Loaded {
        return None;
    }

    let (Some(source), Some(input), Some(_), Some(rate), Some(_), Some(min_order_size), Some(slippage)) = (
        snapshot.source_wallet,
        snapshot.input_amount,
        snapshot.destination_wallet,
        snapshot.exchange_rate.value().copied(),
        snapshot.fees.value(),
        snapshot.min_order_size.value().copied(),
        snapshot.slippage,
    ) else {
        return Some(ErrorCode::MissingParameters);
    };

    if !(input > 0.0) {
        return Some(ErrorCode::InvalidAmount);
    }

    if input < min_order_size {
        return Some(ErrorCode::AmountTooSmall);
    }

    if is_greater_than(input, snapshot.available_amount, source.decimals()) {
        return Some(ErrorCode::InsufficientFunds);
    }

    if snapshot.estimated_amount == Some(0.0) {
        return Some(ErrorCode::AmountTooSmall);
    }

    if !(rate > 0.0) {
        return Some(ErrorCode::InvalidExchangeRate);
    }

    if !is_slippage_valid(slippage, snapshot.max_slippage) {
        return Some(ErrorCode::InvalidSlippage);
    }

    None
}

/// Presentational code carried by the exchange-rate loadable, if it failed with one
pub fn loadable_error_code(exchange_rate: &LoadableState<f64>) -> Option<ErrorCode> {
    exchange_rate.error().and_then(|err| err.error_code())
}
