//! Swap provider seam
//!
//! The quote engine never prices anything itself. Each AMM / order-book back end plugs
//! in through [`SwapProvider`]: three async lookups that feed the loadables and three pure
//! functions used for amount projection and validation.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;

use crate::common::error::QuoteResult;
use crate::common::types::Wallet;
use crate::swap::fees::{Fee, FeeBreakdown};

#[async_trait]
pub trait SwapProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str {
        "swap-provider"
    }

    /// Exchange rate for `from_mint` → `to_mint`.
    ///
    /// Fails with `QuoteError::UnsupportedPair` when no pool/market exists for the pair
    /// and `QuoteError::SwappingUnavailable` when the back end has no pools at all.
    async fn load_price(&self, from_mint: Pubkey, to_mint: Pubkey) -> QuoteResult<f64>;

    /// Fee breakdown for swapping out of `source_wallet` into `destination_wallet`.
    ///
    /// Called only after `load_price` for the same pair has loaded, so implementations
    /// may reuse market data it warmed.
    async fn calculate_fees(
        &self,
        source_wallet: &Wallet,
        destination_wallet: &Wallet,
        lamports_per_signature: Option<u64>,
        creating_account_fee: Option<u64>,
    ) -> QuoteResult<FeeBreakdown>;

    /// Smallest input the back end accepts for `from_mint` → `to_mint`, in source UI units.
    ///
    /// Requested together with the fees once the rate has loaded. Back ends without a
    /// minimum keep the default of zero.
    async fn calculate_min_order_size(&self, _from_mint: Pubkey, _to_mint: Pubkey) -> QuoteResult<f64> {
        Ok(0.0)
    }

    /// Amount received for `input_amount`, in destination UI units
    fn calculate_estimated_amount(&self, input_amount: f64, rate: f64, slippage: f64) -> Option<f64>;

    /// Input needed to receive `estimated_amount`, in source UI units
    fn calculate_needed_input_amount(
        &self,
        estimated_amount: f64,
        rate: f64,
        slippage: f64,
    ) -> Option<f64>;

    /// Spendable balance of `source_wallet` once `fee` is set aside, in UI units
    fn calculate_available_amount(&self, source_wallet: &Wallet, fee: Option<&Fee>) -> Option<f64>;
}
