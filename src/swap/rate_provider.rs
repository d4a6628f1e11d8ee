//! Rate-based swap provider
//!
//! Order-book style pricing: a single fair price per pair, a flat taker fee on the
//! input, and network fees for the transaction, any token accounts that have to be
//! created, and the open-orders account. When fees are paid in the transaction token
//! the native amounts are converted at the source/SOL fair price.

use anyhow::Result;
use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::common::error::{QuoteError, QuoteResult};
use crate::common::settings::SettingsStore;
use crate::common::types::{PayingToken, TokenRef, Wallet};
use crate::constants::{BASE_TAKER_FEE_BPS, FEE_MULTIPLIER, SOL_DECIMALS, SOL_MINT};
use crate::swap::fees::{Fee, FeeBreakdown, FeeKind};
use crate::swap::provider::SwapProvider;
use crate::utils::amount::{amount_to_lamports, lamports_to_amount};

/// Rent of a Serum open-orders account
pub const DEFAULT_ORDER_CREATION_FEE: u64 = 23_357_760;

/// Slippage applied when converting native fees into the transaction token
const FEE_CONVERSION_SLIPPAGE: f64 = 0.01;

/// Where fair prices come from
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// How many `from_mint` units buy one `to_mint` unit
    async fn fair_price(&self, from_mint: Pubkey, to_mint: Pubkey) -> Result<f64>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateProviderConfig {
    pub order_creation_fee: u64,
    pub paying_token: PayingToken,
    /// Smallest accepted order per source mint, in UI units; unlisted mints have none
    pub min_order_sizes: HashMap<Pubkey, f64>,
}

impl Default for RateProviderConfig {
    fn default() -> Self {
        Self {
            order_creation_fee: DEFAULT_ORDER_CREATION_FEE,
            paying_token: PayingToken::NativeToken,
            min_order_sizes: HashMap::new(),
        }
    }
}

pub struct RateSwapProvider<S> {
    source: Arc<S>,
    config: RateProviderConfig,
    settings: Option<Arc<dyn SettingsStore>>,
}

impl<S: PriceSource> RateSwapProvider<S> {
    pub fn new(source: Arc<S>, config: RateProviderConfig) -> Self {
        Self { source, config, settings: None }
    }

    /// Follow the persisted paying token instead of the configured one
    pub fn with_settings(mut self, settings: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn paying_token(&self) -> PayingToken {
        self.settings
            .as_ref()
            .and_then(|settings| settings.paying_token())
            .unwrap_or(self.config.paying_token)
    }

    /// Pairs touching native SOL always pay in SOL, whatever the stored choice
    fn pays_with_native(&self, source_wallet: &Wallet, destination_wallet: &Wallet) -> bool {
        source_wallet.is_native()
            || destination_wallet.is_native()
            || self.paying_token() == PayingToken::NativeToken
    }

    /// Native fee components: (account creation, order creation, transaction)
    fn native_network_fees(
        &self,
        source_wallet: &Wallet,
        destination_wallet: &Wallet,
        lamports_per_signature: u64,
        creating_account_fee: u64,
    ) -> (u64, u64, u64) {
        let mut signatures = 2u64;
        let mut accounts = 0u64;

        // a temporary wrapped SOL account is opened for a native source
        if source_wallet.is_native() {
            signatures += 1;
            accounts += 1;
        }

        // destination needs an account when it is native SOL or has not been created yet
        if destination_wallet.is_native() || destination_wallet.pubkey.is_none() {
            signatures += 1;
            accounts += 1;
        }

        (
            creating_account_fee.saturating_mul(accounts),
            self.config.order_creation_fee,
            lamports_per_signature.saturating_mul(signatures),
        )
    }
}

fn valid_rate(rate: f64) -> Option<f64> {
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

fn same_token(fee: &Fee, token: &TokenRef) -> bool {
    fee.token.mint == token.mint && fee.token.is_native == token.is_native
}

#[async_trait]
impl<S: PriceSource + 'static> SwapProvider for RateSwapProvider<S> {
    fn name(&self) -> &'static str {
        "rate-provider"
    }

    async fn load_price(&self, from_mint: Pubkey, to_mint: Pubkey) -> QuoteResult<f64> {
        let price = self.source.fair_price(from_mint, to_mint).await.map_err(QuoteError::from)?;
        valid_rate(price).ok_or(QuoteError::UnsupportedPair { from: from_mint, to: to_mint })
    }

    async fn calculate_fees(
        &self,
        source_wallet: &Wallet,
        destination_wallet: &Wallet,
        lamports_per_signature: Option<u64>,
        creating_account_fee: Option<u64>,
    ) -> QuoteResult<FeeBreakdown> {
        let fees = FeeBreakdown::new().with(
            FeeKind::LiquidityProvider,
            Fee::proportional(BASE_TAKER_FEE_BPS, source_wallet.token.clone()),
        );
        let (Some(lamports_per_signature), Some(creating_account_fee)) =
            (lamports_per_signature, creating_account_fee)
        else {
            return Ok(fees);
        };

        let (account_creation, order_creation, transaction) = self.native_network_fees(
            source_wallet,
            destination_wallet,
            lamports_per_signature,
            creating_account_fee,
        );

        if self.pays_with_native(source_wallet, destination_wallet) {
            let sol = TokenRef::native_sol();
            return Ok(fees
                .with(FeeKind::AccountCreation, Fee::new(account_creation, sol.clone()))
                .with(FeeKind::OrderCreation, Fee::new(order_creation, sol.clone()))
                .with(FeeKind::Transaction, Fee::new(transaction, sol)));
        }

        // paying in the transaction token: price every native component in source units
        let rate = self.load_price(source_wallet.mint(), SOL_MINT).await?;
        let decimals = source_wallet.decimals();
        let convert = |lamports: u64| {
            self.calculate_needed_input_amount(
                lamports_to_amount(lamports, SOL_DECIMALS),
                rate,
                FEE_CONVERSION_SLIPPAGE,
            )
            .map(|amount| amount_to_lamports(amount, decimals))
            .unwrap_or(0)
        };
        debug!(mint = %source_wallet.mint(), rate, "fees converted to transaction token");

        let token = source_wallet.token.clone();
        Ok(fees
            .with(FeeKind::AccountCreation, Fee::new(convert(account_creation), token.clone()))
            .with(FeeKind::OrderCreation, Fee::new(convert(order_creation), token.clone()))
            .with(FeeKind::Transaction, Fee::new(convert(transaction), token)))
    }

    async fn calculate_min_order_size(&self, from_mint: Pubkey, _to_mint: Pubkey) -> QuoteResult<f64> {
        Ok(self.config.min_order_sizes.get(&from_mint).copied().unwrap_or(0.0))
    }

    fn calculate_estimated_amount(&self, input_amount: f64, rate: f64, _slippage: f64) -> Option<f64> {
        let rate = valid_rate(rate)?;
        Some(FEE_MULTIPLIER * (input_amount / rate))
    }

    fn calculate_needed_input_amount(
        &self,
        estimated_amount: f64,
        rate: f64,
        _slippage: f64,
    ) -> Option<f64> {
        let rate = valid_rate(rate)?;
        Some(estimated_amount * rate / FEE_MULTIPLIER)
    }

    fn calculate_available_amount(&self, source_wallet: &Wallet, fee: Option<&Fee>) -> Option<f64> {
        let lamports = match fee {
            Some(fee) if same_token(fee, &source_wallet.token) => {
                source_wallet.lamports.saturating_sub(fee.amount)
            }
            _ => source_wallet.lamports,
        };
        Some(lamports_to_amount(lamports, source_wallet.decimals()))
    }
}
