//! Fee breakdown of a quoted swap

use serde::Serialize;
use std::collections::BTreeMap;

use crate::common::types::TokenRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FeeKind {
    LiquidityProvider,
    /// Explicit network fee; when absent it is derived from the three kinds below
    Network,
    AccountCreation,
    OrderCreation,
    Transaction,
}

impl FeeKind {
    /// Kinds summed into the derived network fee
    pub const NETWORK_COMPONENTS: [FeeKind; 3] =
        [FeeKind::AccountCreation, FeeKind::OrderCreation, FeeKind::Transaction];
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fee {
    /// Amount in base units of `token`
    pub amount: u64,
    pub token: TokenRef,
    /// Share of the traded amount, for fees taken by the pool rather than charged up front
    pub rate: Option<f64>,
}

impl Fee {
    pub fn new(amount: u64, token: TokenRef) -> Self {
        Self { amount, token, rate: None }
    }

    /// A fee expressed only as a fraction of the trade
    pub fn proportional(rate: f64, token: TokenRef) -> Self {
        Self { amount: 0, token, rate: Some(rate) }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FeeBreakdown {
    fees: BTreeMap<FeeKind, Fee>,
}

impl FeeBreakdown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, kind: FeeKind, fee: Fee) -> Self {
        self.fees.insert(kind, fee);
        self
    }

    pub fn get(&self, kind: FeeKind) -> Option<&Fee> {
        self.fees.get(&kind)
    }

    /// The fee the user pays to land the swap.
    ///
    /// Returns the explicit `Network` entry if present. Otherwise sums the
    /// account-creation, order-creation and transaction entries; `None` when none of
    /// them exist or they are denominated in different tokens.
    pub fn network_fee(&self) -> Option<Fee> {
        if let Some(fee) = self.fees.get(&FeeKind::Network) {
            return Some(fee.clone());
        }

        let mut total: Option<Fee> = None;
        for kind in FeeKind::NETWORK_COMPONENTS {
            let Some(fee) = self.fees.get(&kind) else { continue };
            total = match total {
                None => Some(fee.clone()),
                Some(acc) if acc.token.mint == fee.token.mint && acc.token.is_native == fee.token.is_native => {
                    Some(Fee::new(acc.amount.saturating_add(fee.amount), acc.token))
                }
                Some(_) => return None,
            };
        }
        total
    }

    /// Pool fee as a fraction of the trade
    pub fn liquidity_provider_rate(&self) -> Option<f64> {
        self.fees.get(&FeeKind::LiquidityProvider).and_then(|fee| fee.rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::pubkey::Pubkey;

    fn sol() -> TokenRef {
        TokenRef::native_sol()
    }

    #[test]
    fn test_network_fee_derived_from_components() {
        let fees = FeeBreakdown::new()
            .with(FeeKind::AccountCreation, Fee::new(2_039_280, sol()))
            .with(FeeKind::OrderCreation, Fee::new(23_357_760, sol()))
            .with(FeeKind::Transaction, Fee::new(10_000, sol()));
        let network = fees.network_fee().expect("components present");
        assert_eq!(network.amount, 2_039_280 + 23_357_760 + 10_000);
        assert!(network.token.is_native);
    }

    #[test]
    fn test_explicit_network_fee_wins() {
        let fees = FeeBreakdown::new()
            .with(FeeKind::Network, Fee::new(5_000, sol()))
            .with(FeeKind::Transaction, Fee::new(10_000, sol()));
        assert_eq!(fees.network_fee().map(|f| f.amount), Some(5_000));
    }

    #[test]
    fn test_mixed_token_components_have_no_aggregate() {
        let usdc = TokenRef::new(Pubkey::new_unique(), "USDC", 6);
        let fees = FeeBreakdown::new()
            .with(FeeKind::AccountCreation, Fee::new(1, sol()))
            .with(FeeKind::Transaction, Fee::new(1, usdc));
        assert_eq!(fees.network_fee(), None);
    }

    #[test]
    fn test_liquidity_fee_alone_has_no_network_fee() {
        let fees = FeeBreakdown::new().with(FeeKind::LiquidityProvider, Fee::proportional(0.0022, sol()));
        assert_eq!(fees.network_fee(), None);
        assert_eq!(fees.liquidity_provider_rate(), Some(0.0022));
    }
}
