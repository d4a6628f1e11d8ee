//! Dependent fetch coordination
//!
//! Keeps the exchange rate, the fee breakdown and the minimum order size in step with
//! the selected wallet pair and the two network constants. Signals are debounced; each
//! settled signal flushes all three loadables and, for a quotable pair, reloads the
//! rate. Fees and the minimum order size are reloaded only after the rate for that same
//! refresh has been applied: the rate ticket is awaited by a continuation task that
//! reports back through a channel, and the dependent reloads happen here, on the owner,
//! once the refresh epoch is confirmed to be current.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::common::loadable::{Delivery, LoadableValue};
use crate::common::types::{PayingToken, Wallet};
use crate::swap::fees::FeeBreakdown;
use crate::swap::provider::SwapProvider;
use crate::utils::debounce::Debounce;

/// Everything a quote depends on besides the amounts
#[derive(Debug, Clone, PartialEq)]
pub struct PairSignal {
    pub source: Option<Wallet>,
    pub destination: Option<Wallet>,
    pub lamports_per_signature: Option<u64>,
    pub creating_account_fee: Option<u64>,
    /// Effective paying token; fees are priced in it
    pub paying_token: PayingToken,
}

impl PairSignal {
    fn quotable_pair(&self) -> Result<(&Wallet, &Wallet), SkipReason> {
        let (Some(source), Some(destination)) = (&self.source, &self.destination) else {
            return Err(SkipReason::MissingWallet);
        };
        if source.mint() == destination.mint() {
            return Err(SkipReason::SameMint);
        }
        Ok((source, destination))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingWallet,
    SameMint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Every loadable stays `NotRequested`
    Skipped(SkipReason),
    /// Rate reload issued; fees and minimum order size follow once it loads
    RateRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorStep {
    Refreshed(RefreshOutcome),
    FeesRequested,
    /// The rate settled for an outdated refresh or without a value
    FeesSkipped,
}

#[derive(Debug)]
struct RateSettled {
    epoch: u64,
    delivery: Delivery<f64>,
}

enum Event {
    Settled(PairSignal),
    Rate(RateSettled),
}

pub struct DependentFetchCoordinator {
    provider: Arc<dyn SwapProvider>,
    exchange_rate: LoadableValue<f64>,
    fees: LoadableValue<FeeBreakdown>,
    min_order_size: LoadableValue<f64>,
    debounce: Debounce<PairSignal>,
    last_signal: Option<PairSignal>,
    quoted: Option<PairSignal>,
    epoch: u64,
    rate_tx: mpsc::UnboundedSender<RateSettled>,
    rate_rx: mpsc::UnboundedReceiver<RateSettled>,
}

impl DependentFetchCoordinator {
    pub fn new(provider: Arc<dyn SwapProvider>, debounce: Duration, provider_timeout: Option<Duration>) -> Self {
        let (rate_tx, rate_rx) = mpsc::unbounded_channel();
        Self {
            provider,
            exchange_rate: LoadableValue::new("exchange_rate").with_timeout(provider_timeout),
            fees: LoadableValue::new("fees").with_timeout(provider_timeout),
            min_order_size: LoadableValue::new("min_order_size").with_timeout(provider_timeout),
            debounce: Debounce::new(debounce),
            last_signal: None,
            quoted: None,
            epoch: 0,
            rate_tx,
            rate_rx,
        }
    }

    pub fn exchange_rate(&self) -> &LoadableValue<f64> {
        &self.exchange_rate
    }

    pub fn fees(&self) -> &LoadableValue<FeeBreakdown> {
        &self.fees
    }

    pub fn min_order_size(&self) -> &LoadableValue<f64> {
        &self.min_order_size
    }

    /// Feed the current signal. Returns `false` if it equals the last one observed.
    pub fn observe(&mut self, signal: PairSignal) -> bool {
        if self.last_signal.as_ref() == Some(&signal) {
            return false;
        }
        self.last_signal = Some(signal.clone());
        self.debounce.push(signal);
        true
    }

    /// Whether the loadables currently describe `signal`
    pub fn is_current(&self, signal: &PairSignal) -> bool {
        !self.debounce.is_pending() && self.quoted.as_ref() == Some(signal)
    }

    pub fn is_refresh_pending(&self) -> bool {
        self.debounce.is_pending()
    }

    /// Wait for the next thing to do and do it. Cancel-safe.
    pub async fn next_step(&mut self) -> CoordinatorStep {
        let event = tokio::select! {
            signal = self.debounce.settled() => Event::Settled(signal),
            Some(settled) = self.rate_rx.recv() => Event::Rate(settled),
        };

        match event {
            Event::Settled(signal) => CoordinatorStep::Refreshed(self.refresh(signal)),
            Event::Rate(settled) => self.on_rate_settled(settled),
        }
    }

    /// Apply `signal` immediately, bypassing the debounce window.
    pub fn refresh(&mut self, signal: PairSignal) -> RefreshOutcome {
        self.debounce.cancel();
        self.last_signal = Some(signal.clone());
        self.epoch += 1;
        self.exchange_rate.flush();
        self.fees.flush();
        self.min_order_size.flush();

        let outcome = match signal.quotable_pair() {
            Err(reason) => {
                debug!(epoch = self.epoch, ?reason, "refresh skipped");
                RefreshOutcome::Skipped(reason)
            }
            Ok((source, destination)) => {
                self.install_producers(&signal, source, destination);
                match self.exchange_rate.reload() {
                    Some(ticket) => {
                        let (epoch, tx) = (self.epoch, self.rate_tx.clone());
                        tokio::spawn(async move {
                            let delivery = ticket.settled().await;
                            let _ = tx.send(RateSettled { epoch, delivery });
                        });
                    }
                    None => debug!(epoch = self.epoch, "exchange rate has no producer"),
                }
                info!(
                    epoch = self.epoch,
                    provider = self.provider.name(),
                    from = %source.mint(),
                    to = %destination.mint(),
                    "quote refresh"
                );
                RefreshOutcome::RateRequested
            }
        };
        self.quoted = Some(signal);
        outcome
    }

    /// Re-run the last refresh, e.g. after a transport error.
    pub fn retry(&mut self) -> Option<RefreshOutcome> {
        let signal = self.last_signal.clone()?;
        Some(self.refresh(signal))
    }

    fn install_producers(&self, signal: &PairSignal, source: &Wallet, destination: &Wallet) {
        let (from, to) = (source.mint(), destination.mint());
        let provider = self.provider.clone();
        self.exchange_rate.request(move || {
            let provider = provider.clone();
            async move { provider.load_price(from, to).await }
        });

        let provider = self.provider.clone();
        let (source, destination) = (source.clone(), destination.clone());
        let (lamports_per_signature, creating_account_fee) =
            (signal.lamports_per_signature, signal.creating_account_fee);
        self.fees.request(move || {
            let (provider, source, destination) = (provider.clone(), source.clone(), destination.clone());
            async move {
                provider
                    .calculate_fees(&source, &destination, lamports_per_signature, creating_account_fee)
                    .await
            }
        });

        let provider = self.provider.clone();
        self.min_order_size.request(move || {
            let provider = provider.clone();
            async move { provider.calculate_min_order_size(from, to).await }
        });
    }

    fn on_rate_settled(&mut self, settled: RateSettled) -> CoordinatorStep {
        if settled.epoch != self.epoch {
            debug!(epoch = settled.epoch, current = self.epoch, "rate settled for an outdated refresh");
            return CoordinatorStep::FeesSkipped;
        }
        match settled.delivery {
            Delivery::Applied(Ok(rate)) => {
                // tickets are dropped: deliveries are observed through the state streams
                let _ = self.fees.reload();
                let _ = self.min_order_size.reload();
                debug!(epoch = self.epoch, rate, "fees and min order size requested");
                CoordinatorStep::FeesRequested
            }
            Delivery::Applied(Err(_)) | Delivery::Discarded => CoordinatorStep::FeesSkipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::{QuoteError, QuoteResult};
    use crate::common::loadable::LoadState;
    use crate::common::types::TokenRef;
    use crate::swap::fees::{Fee, FeeKind};
    use async_trait::async_trait;
    use solana_sdk::pubkey::Pubkey;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Counting {
        prices: AtomicUsize,
        fees: AtomicUsize,
    }

    #[async_trait]
    impl SwapProvider for Counting {
        async fn load_price(&self, _: Pubkey, _: Pubkey) -> QuoteResult<f64> {
            self.prices.fetch_add(1, Ordering::SeqCst);
            Ok(2.0)
        }

        async fn calculate_fees(
            &self,
            _: &Wallet,
            _: &Wallet,
            lamports_per_signature: Option<u64>,
            _: Option<u64>,
        ) -> QuoteResult<FeeBreakdown> {
            self.fees.fetch_add(1, Ordering::SeqCst);
            let lamports = lamports_per_signature.ok_or(QuoteError::Provider("no constants".into()))?;
            Ok(FeeBreakdown::new().with(FeeKind::Transaction, Fee::new(lamports, TokenRef::native_sol())))
        }

        async fn calculate_min_order_size(&self, _: Pubkey, _: Pubkey) -> QuoteResult<f64> {
            Ok(0.5)
        }

        fn calculate_estimated_amount(&self, input: f64, rate: f64, _: f64) -> Option<f64> {
            Some(input / rate)
        }

        fn calculate_needed_input_amount(&self, estimated: f64, rate: f64, _: f64) -> Option<f64> {
            Some(estimated * rate)
        }

        fn calculate_available_amount(&self, wallet: &Wallet, _: Option<&Fee>) -> Option<f64> {
            Some(wallet.amount())
        }
    }

    fn signal(source: Option<Wallet>, destination: Option<Wallet>) -> PairSignal {
        PairSignal {
            source,
            destination,
            lamports_per_signature: Some(5_000),
            creating_account_fee: Some(2_039_280),
            paying_token: PayingToken::NativeToken,
        }
    }

    fn usdc() -> Wallet {
        Wallet::new(Some(Pubkey::new_unique()), TokenRef::new(Pubkey::new_unique(), "USDC", 6), 0)
    }

    #[tokio::test(start_paused = true)]
    async fn test_observe_deduplicates_and_debounces() {
        let provider = Arc::new(Counting::default());
        let mut coordinator = DependentFetchCoordinator::new(provider.clone(), Duration::from_millis(300), None);
        let sol = Wallet::native_sol(Pubkey::new_unique(), 1);
        let pair = signal(Some(sol), Some(usdc()));

        assert!(coordinator.observe(pair.clone()));
        assert!(!coordinator.observe(pair.clone()));
        assert!(!coordinator.is_current(&pair));

        let step = coordinator.next_step().await;
        assert_eq!(step, CoordinatorStep::Refreshed(RefreshOutcome::RateRequested));
        assert!(coordinator.is_current(&pair));
        assert_eq!(coordinator.next_step().await, CoordinatorStep::FeesRequested);

        let mut fees = coordinator.fees().subscribe();
        fees.wait_for(|state| state.is_loaded()).await.expect("sender alive");
        let mut min_order_size = coordinator.min_order_size().subscribe();
        min_order_size.wait_for(|state| state.is_loaded()).await.expect("sender alive");
        assert_eq!(coordinator.min_order_size().value(), Some(0.5));
        assert_eq!(provider.prices.load(Ordering::SeqCst), 1);
        assert_eq!(provider.fees.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_mint_leaves_both_not_requested() {
        let provider = Arc::new(Counting::default());
        let mut coordinator = DependentFetchCoordinator::new(provider.clone(), Duration::from_millis(300), None);
        let wallet = usdc();

        let outcome = coordinator.refresh(signal(Some(wallet.clone()), Some(wallet)));
        assert_eq!(outcome, RefreshOutcome::Skipped(SkipReason::SameMint));
        assert_eq!(coordinator.exchange_rate().load_state(), LoadState::NotRequested);
        assert_eq!(coordinator.fees().load_state(), LoadState::NotRequested);
        assert_eq!(coordinator.min_order_size().load_state(), LoadState::NotRequested);

        let outcome = coordinator.refresh(signal(None, Some(usdc())));
        assert_eq!(outcome, RefreshOutcome::Skipped(SkipReason::MissingWallet));
        assert_eq!(provider.prices.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_from_outdated_refresh_does_not_request_fees() {
        let provider = Arc::new(Counting::default());
        let mut coordinator = DependentFetchCoordinator::new(provider.clone(), Duration::from_millis(300), None);
        let sol = Wallet::native_sol(Pubkey::new_unique(), 1);

        coordinator.refresh(signal(Some(sol.clone()), Some(usdc())));
        coordinator.refresh(signal(Some(sol), None));

        // the first refresh's rate ticket settles as Discarded for epoch 1
        assert_eq!(coordinator.next_step().await, CoordinatorStep::FeesSkipped);
        assert_eq!(coordinator.fees().load_state(), LoadState::NotRequested);
        assert_eq!(coordinator.min_order_size().load_state(), LoadState::NotRequested);
        assert_eq!(provider.fees.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_reissues_last_refresh() {
        let provider = Arc::new(Counting::default());
        let mut coordinator = DependentFetchCoordinator::new(provider.clone(), Duration::from_millis(300), None);
        assert_eq!(coordinator.retry(), None);

        let sol = Wallet::native_sol(Pubkey::new_unique(), 1);
        coordinator.refresh(signal(Some(sol), Some(usdc())));
        assert_eq!(coordinator.next_step().await, CoordinatorStep::FeesRequested);
        assert_eq!(coordinator.retry(), Some(RefreshOutcome::RateRequested));
        assert_eq!(coordinator.next_step().await, CoordinatorStep::FeesRequested);
        assert_eq!(provider.prices.load(Ordering::SeqCst), 2);
    }
}
