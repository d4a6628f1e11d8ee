//! Shared test helpers
//!
//! `MockSwapProvider` answers from per-pair scripts with configurable latency and keeps
//! call counters plus an ordered call log, so tests can check both results and the
//! order in which the engine asked for them.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sol_swap_quote::common::analytics::{AnalyticsEvent, AnalyticsSink};
use sol_swap_quote::common::fee_api::FixedFeeApiClient;
use sol_swap_quote::common::settings::{InMemorySettings, SettingsStore};
use sol_swap_quote::common::wallets::StaticWalletsRepository;
use sol_swap_quote::swap::fees::{Fee, FeeBreakdown, FeeKind};
use sol_swap_quote::swap::rate_provider::PriceSource;
use sol_swap_quote::{QuoteError, QuoteResult, SessionDeps, SwapProvider, TokenRef, Wallet};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Clone)]
struct Script<T> {
    result: QuoteResult<T>,
    delay: Duration,
}

#[derive(Default)]
pub struct MockSwapProvider {
    rates: Mutex<HashMap<(Pubkey, Pubkey), Script<f64>>>,
    fees: Mutex<HashMap<(Pubkey, Pubkey), Script<FeeBreakdown>>>,
    min_order_sizes: Mutex<HashMap<(Pubkey, Pubkey), f64>>,
    pub price_calls: AtomicUsize,
    pub fee_calls: AtomicUsize,
    log: Mutex<Vec<String>>,
}

impl MockSwapProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// `rate` is source units per destination unit
    pub fn set_rate(&self, from: Pubkey, to: Pubkey, rate: f64, delay: Duration) {
        self.rates.lock().insert((from, to), Script { result: Ok(rate), delay });
    }

    pub fn fail_rate(&self, from: Pubkey, to: Pubkey, error: QuoteError, delay: Duration) {
        self.rates.lock().insert((from, to), Script { result: Err(error), delay });
    }

    pub fn set_fees(&self, from: Pubkey, to: Pubkey, fees: FeeBreakdown, delay: Duration) {
        self.fees.lock().insert((from, to), Script { result: Ok(fees), delay });
    }

    pub fn set_min_order_size(&self, from: Pubkey, to: Pubkey, size: f64) {
        self.min_order_sizes.lock().insert((from, to), size);
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }

    pub fn price_calls(&self) -> usize {
        self.price_calls.load(Ordering::SeqCst)
    }

    pub fn fee_calls(&self) -> usize {
        self.fee_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SwapProvider for MockSwapProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn load_price(&self, from_mint: Pubkey, to_mint: Pubkey) -> QuoteResult<f64> {
        self.price_calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(format!("price start {from_mint}->{to_mint}"));
        let script = self.rates.lock().get(&(from_mint, to_mint)).cloned();
        let Some(script) = script else {
            return Err(QuoteError::UnsupportedPair { from: from_mint, to: to_mint });
        };
        sleep(script.delay).await;
        self.log.lock().push(format!("price done {from_mint}->{to_mint}"));
        script.result
    }

    async fn calculate_fees(
        &self,
        source_wallet: &Wallet,
        destination_wallet: &Wallet,
        _lamports_per_signature: Option<u64>,
        _creating_account_fee: Option<u64>,
    ) -> QuoteResult<FeeBreakdown> {
        self.fee_calls.fetch_add(1, Ordering::SeqCst);
        let key = (source_wallet.mint(), destination_wallet.mint());
        self.log.lock().push(format!("fees start {}->{}", key.0, key.1));
        let script = self.fees.lock().get(&key).cloned().unwrap_or(Script {
            result: Ok(network_fee(5_000)),
            delay: Duration::ZERO,
        });
        sleep(script.delay).await;
        script.result
    }

    async fn calculate_min_order_size(&self, from_mint: Pubkey, to_mint: Pubkey) -> QuoteResult<f64> {
        self.log.lock().push(format!("min order start {from_mint}->{to_mint}"));
        Ok(self.min_order_sizes.lock().get(&(from_mint, to_mint)).copied().unwrap_or(0.0))
    }

    fn calculate_estimated_amount(&self, input_amount: f64, rate: f64, _slippage: f64) -> Option<f64> {
        (rate > 0.0).then(|| input_amount / rate)
    }

    fn calculate_needed_input_amount(&self, estimated_amount: f64, rate: f64, _slippage: f64) -> Option<f64> {
        (rate > 0.0).then(|| estimated_amount * rate)
    }

    fn calculate_available_amount(&self, source_wallet: &Wallet, fee: Option<&Fee>) -> Option<f64> {
        let lamports = match fee {
            Some(fee) if fee.token.mint == source_wallet.mint() && fee.token.is_native == source_wallet.is_native() => {
                source_wallet.lamports.saturating_sub(fee.amount)
            }
            _ => source_wallet.lamports,
        };
        Some(lamports as f64 / 10f64.powi(source_wallet.decimals() as i32))
    }
}

/// Fair prices for the rate provider, keyed by (from, to)
#[derive(Default)]
pub struct FixedPrices {
    prices: Mutex<HashMap<(Pubkey, Pubkey), f64>>,
}

impl FixedPrices {
    pub fn set(&self, from: Pubkey, to: Pubkey, price: f64) {
        self.prices.lock().insert((from, to), price);
    }
}

#[async_trait]
impl PriceSource for FixedPrices {
    async fn fair_price(&self, from_mint: Pubkey, to_mint: Pubkey) -> anyhow::Result<f64> {
        let price = self.prices.lock().get(&(from_mint, to_mint)).copied();
        price.ok_or_else(|| QuoteError::UnsupportedPair { from: from_mint, to: to_mint }.into())
    }
}

#[derive(Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events.lock().clone()
    }
}

impl AnalyticsSink for RecordingAnalytics {
    fn log(&self, event: AnalyticsEvent) {
        self.events.lock().push(event);
    }
}

/// Native-SOL network fee breakdown
pub fn network_fee(lamports: u64) -> FeeBreakdown {
    FeeBreakdown::new().with(FeeKind::Network, Fee::new(lamports, TokenRef::native_sol()))
}

pub fn sol_wallet(lamports: u64) -> Wallet {
    Wallet::native_sol(Pubkey::new_unique(), lamports)
}

pub fn token_wallet(symbol: &str, decimals: u8, lamports: u64) -> Wallet {
    Wallet::new(Some(Pubkey::new_unique()), TokenRef::new(Pubkey::new_unique(), symbol, decimals), lamports)
}

pub struct Harness {
    pub provider: Arc<MockSwapProvider>,
    pub wallets: Arc<StaticWalletsRepository>,
    pub settings: Arc<dyn SettingsStore>,
    pub analytics: Arc<RecordingAnalytics>,
}

impl Harness {
    pub fn new(wallets: Vec<Wallet>) -> Self {
        Self::with_settings(wallets, Arc::new(InMemorySettings::default()))
    }

    pub fn with_settings(wallets: Vec<Wallet>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            provider: MockSwapProvider::new(),
            wallets: Arc::new(StaticWalletsRepository::new(wallets)),
            settings,
            analytics: Arc::new(RecordingAnalytics::default()),
        }
    }

    pub fn deps(&self) -> SessionDeps {
        SessionDeps {
            provider: self.provider.clone(),
            fee_api: Arc::new(FixedFeeApiClient::default()),
            wallets: self.wallets.clone(),
            settings: self.settings.clone(),
            analytics: self.analytics.clone(),
        }
    }
}
