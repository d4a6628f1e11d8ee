//! Swap quote engine for Solana wallet clients.
//!
//! A [`SwapQuoteSession`] owns the state of one swap screen: the selected wallet pair,
//! the two linked amount fields, the fetched exchange rate and fee breakdown, and the
//! validation result. Pricing is delegated to a [`SwapProvider`]; wallets, persisted
//! preferences and analytics are injected.

pub mod common;
pub mod constants;
pub mod swap;
pub mod utils;

pub use crate::common::{
    AnalyticsEvent, AnalyticsSink, FeeApiClient, LoadState, LoadableState, LoadableValue,
    PayingToken, QuoteError, QuoteResult, SessionConfig, SettingsStore, TokenRef, Wallet,
    WalletsRepository,
};
pub use crate::swap::{
    AmountField, ErrorCode, Fee, FeeBreakdown, FeeKind, SessionDeps, SessionView, SwapProvider,
    SwapQuoteSession,
};
