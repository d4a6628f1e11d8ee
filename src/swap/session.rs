//! Swap quote session
//!
//! One session per swap screen. All mutation happens on a single task: user actions
//! arrive as commands, coordinator steps and loadable state changes arrive through
//! channels, and after every event the task re-projects the amounts, re-validates and
//! publishes a fresh [`SessionView`]. Provider calls run on their own tasks and only
//! touch the loadables, whose stale-result rule keeps late answers out.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::common::analytics::{AnalyticsEvent, AnalyticsRef, TracingAnalytics};
use crate::common::error::{QuoteError, QuoteResult};
use crate::common::fee_api::{FeeApiClient, RpcFeeApiClient, RpcFeeApiConfig};
use crate::common::loadable::{LoadState, LoadableState, LoadableValue, combined};
use crate::common::settings::SettingsStore;
use crate::common::types::{PayingToken, SessionConfig, Wallet};
use crate::common::wallets::WalletsRepository;
use crate::constants::known_token_symbol;
use crate::swap::coordinator::{CoordinatorStep, DependentFetchCoordinator, PairSignal};
use crate::swap::fees::{Fee, FeeBreakdown};
use crate::swap::price_api::HttpPriceSource;
use crate::swap::projector::{ActiveField, AmountField, AmountProjector, QuoteInputState, parse_amount};
use crate::swap::provider::SwapProvider;
use crate::swap::rate_provider::{RateProviderConfig, RateSwapProvider};
use crate::swap::validator::{ErrorCode, QuoteSnapshot, is_slippage_valid, loadable_error_code, validate};
use crate::utils::amount::floor_to_decimals;

/// Collaborators of a session
#[derive(Clone)]
pub struct SessionDeps {
    pub provider: Arc<dyn SwapProvider>,
    pub fee_api: Arc<dyn FeeApiClient>,
    pub wallets: Arc<dyn WalletsRepository>,
    pub settings: Arc<dyn SettingsStore>,
    pub analytics: AnalyticsRef,
}

impl SessionDeps {
    /// Mainnet wiring: HTTP prices, RPC fee constants, analytics to `tracing`
    pub fn mainnet(
        wallets: Arc<dyn WalletsRepository>,
        settings: Arc<dyn SettingsStore>,
    ) -> anyhow::Result<Self> {
        let prices = Arc::new(HttpPriceSource::mainnet_default()?);
        let provider =
            RateSwapProvider::new(prices, RateProviderConfig::default()).with_settings(settings.clone());
        Ok(Self {
            provider: Arc::new(provider),
            fee_api: Arc::new(RpcFeeApiClient::new(RpcFeeApiConfig::default())),
            wallets,
            settings,
            analytics: Arc::new(TracingAnalytics),
        })
    }
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionView {
    pub source_wallet: Option<Wallet>,
    pub destination_wallet: Option<Wallet>,
    pub input_amount: Option<f64>,
    pub estimated_amount: Option<f64>,
    pub active_field: ActiveField,
    /// Combined state of the network constants
    pub initial_state: LoadState,
    pub exchange_rate: LoadableState<f64>,
    pub fees: LoadableState<FeeBreakdown>,
    pub min_order_size: LoadableState<f64>,
    pub network_fee: Option<Fee>,
    /// Pool fee as a fraction of the trade
    pub liquidity_provider_fee: Option<f64>,
    pub slippage: f64,
    /// Paying token actually used for the current pair
    pub paying_token: PayingToken,
    pub is_paying_token_selectable: bool,
    pub reversed_rate_display: bool,
    /// Exchange rate as displayed, inverted when `reversed_rate_display` is set
    pub display_rate: Option<f64>,
    pub available_amount: Option<f64>,
    pub minimum_receive_amount: Option<f64>,
    pub error: Option<ErrorCode>,
    pub is_valid: bool,
}

enum Command {
    SelectSource(Option<Wallet>),
    SelectDestination(Option<Wallet>),
    SwapSourceAndDestination,
    EditInput(Option<f64>),
    EditEstimated(Option<f64>),
    SetFocus(Option<AmountField>),
    UseAllBalance,
    ChangeSlippage(f64),
    ChangePayingToken(PayingToken),
    ReverseExchangeRate,
    Reload,
    Snapshot(oneshot::Sender<SessionView>),
}

enum Event {
    Command(Command),
    Step(CoordinatorStep),
    StateChanged,
    Closed,
}

/// Handle on a running session. Dropping it stops the session task.
pub struct SwapQuoteSession {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<SessionView>,
}

impl SwapQuoteSession {
    /// Start a session, optionally pre-seeded with a wallet pair.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        deps: SessionDeps,
        config: SessionConfig,
        source_wallet: Option<Wallet>,
        destination_wallet: Option<Wallet>,
    ) -> Self {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(SessionView::default());
        let actor = SessionActor::new(deps, config, source_wallet, destination_wallet, view_tx);
        tokio::spawn(actor.run(command_rx));
        Self { commands, view }
    }

    /// Last published view
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// View after every previously sent action has been applied
    pub async fn current(&self) -> QuoteResult<SessionView> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx))?;
        rx.await.map_err(|_| QuoteError::SessionClosed)
    }

    /// Wait until a published view satisfies `predicate`
    pub async fn wait_for(&self, predicate: impl FnMut(&SessionView) -> bool) -> QuoteResult<SessionView> {
        let mut view = self.view.clone();
        let result = view.wait_for(predicate).await.map_err(|_| QuoteError::SessionClosed)?;
        Ok(result.clone())
    }

    fn send(&self, command: Command) -> QuoteResult<()> {
        self.commands.send(command).map_err(|_| QuoteError::SessionClosed)
    }

    pub fn select_source_wallet(&self, wallet: Option<Wallet>) -> QuoteResult<()> {
        self.send(Command::SelectSource(wallet))
    }

    pub fn select_destination_wallet(&self, wallet: Option<Wallet>) -> QuoteResult<()> {
        self.send(Command::SelectDestination(wallet))
    }

    pub fn swap_source_and_destination(&self) -> QuoteResult<()> {
        self.send(Command::SwapSourceAndDestination)
    }

    pub fn edit_input_amount(&self, amount: Option<f64>) -> QuoteResult<()> {
        self.send(Command::EditInput(amount))
    }

    pub fn edit_input_text(&self, text: &str) -> QuoteResult<()> {
        self.edit_input_amount(parse_amount(text))
    }

    pub fn edit_estimated_amount(&self, amount: Option<f64>) -> QuoteResult<()> {
        self.send(Command::EditEstimated(amount))
    }

    pub fn edit_estimated_text(&self, text: &str) -> QuoteResult<()> {
        self.edit_estimated_amount(parse_amount(text))
    }

    pub fn set_focus(&self, field: Option<AmountField>) -> QuoteResult<()> {
        self.send(Command::SetFocus(field))
    }

    pub fn use_all_balance(&self) -> QuoteResult<()> {
        self.send(Command::UseAllBalance)
    }

    pub fn change_slippage(&self, slippage: f64) -> QuoteResult<()> {
        self.send(Command::ChangeSlippage(slippage))
    }

    pub fn change_paying_token(&self, paying_token: PayingToken) -> QuoteResult<()> {
        self.send(Command::ChangePayingToken(paying_token))
    }

    pub fn reverse_exchange_rate(&self) -> QuoteResult<()> {
        self.send(Command::ReverseExchangeRate)
    }

    /// User retry: reloads failed constants and re-quotes the current pair.
    pub fn reload(&self) -> QuoteResult<()> {
        self.send(Command::Reload)
    }
}

fn token_label(wallet: &Wallet) -> String {
    if !wallet.token.symbol.is_empty() {
        return wallet.token.symbol.clone();
    }
    known_token_symbol(&wallet.mint()).map(str::to_string).unwrap_or_else(|| wallet.mint().to_string())
}

struct QuoteStates {
    exchange_rate: LoadableState<f64>,
    fees: LoadableState<FeeBreakdown>,
    min_order_size: LoadableState<f64>,
}

struct SessionActor {
    deps: SessionDeps,
    config: SessionConfig,
    state: QuoteInputState,
    projector: AmountProjector,
    coordinator: DependentFetchCoordinator,
    lamports_per_signature: LoadableValue<u64>,
    creating_account_fee: LoadableValue<u64>,
    view_tx: watch::Sender<SessionView>,
    last_error: Option<ErrorCode>,
}

impl SessionActor {
    fn new(
        deps: SessionDeps,
        config: SessionConfig,
        source_wallet: Option<Wallet>,
        destination_wallet: Option<Wallet>,
        view_tx: watch::Sender<SessionView>,
    ) -> Self {
        let slippage = deps
            .settings
            .slippage()
            .filter(|slippage| is_slippage_valid(*slippage, config.max_slippage))
            .unwrap_or(config.default_slippage);
        let paying_token = deps.settings.paying_token().unwrap_or_default();

        let lamports_per_signature =
            LoadableValue::new("lamports_per_signature").with_timeout(config.provider_timeout);
        let fee_api = deps.fee_api.clone();
        lamports_per_signature.request(move || {
            let fee_api = fee_api.clone();
            async move { fee_api.lamports_per_signature().await }
        });

        let creating_account_fee =
            LoadableValue::new("creating_account_fee").with_timeout(config.provider_timeout);
        let fee_api = deps.fee_api.clone();
        creating_account_fee.request(move || {
            let fee_api = fee_api.clone();
            async move { fee_api.creating_account_fee().await }
        });

        Self {
            projector: AmountProjector::new(deps.provider.clone()),
            coordinator: DependentFetchCoordinator::new(
                deps.provider.clone(),
                config.debounce,
                config.provider_timeout,
            ),
            state: QuoteInputState {
                source_wallet,
                destination_wallet,
                slippage,
                paying_token,
                ..Default::default()
            },
            deps,
            config,
            lamports_per_signature,
            creating_account_fee,
            view_tx,
            last_error: None,
        }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let mut rate_rx = self.coordinator.exchange_rate().subscribe();
        let mut fees_rx = self.coordinator.fees().subscribe();
        let mut min_order_rx = self.coordinator.min_order_size().subscribe();
        let mut lamports_rx = self.lamports_per_signature.subscribe();
        let mut rent_rx = self.creating_account_fee.subscribe();

        let _ = self.lamports_per_signature.reload();
        let _ = self.creating_account_fee.reload();
        self.sync();
        info!(provider = self.deps.provider.name(), "swap session started");

        loop {
            let event = tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => Event::Command(command),
                    None => Event::Closed,
                },
                step = self.coordinator.next_step() => Event::Step(step),
                Ok(()) = rate_rx.changed() => Event::StateChanged,
                Ok(()) = fees_rx.changed() => Event::StateChanged,
                Ok(()) = min_order_rx.changed() => Event::StateChanged,
                Ok(()) = lamports_rx.changed() => Event::StateChanged,
                Ok(()) = rent_rx.changed() => Event::StateChanged,
            };

            match event {
                Event::Command(command) => self.handle(command),
                Event::Step(step) => self.on_step(step),
                Event::StateChanged => {}
                Event::Closed => break,
            }
            self.sync();
        }
        debug!("swap session closed");
    }

    fn on_step(&mut self, step: CoordinatorStep) {
        debug!(?step, "coordinator step");
        if let CoordinatorStep::Refreshed(_) = step {
            self.state.reversed_rate_display = false;
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::SelectSource(wallet) => {
                if let Some(wallet) = &wallet {
                    self.log(AnalyticsEvent::SwapChangingTokenA { token: token_label(wallet) });
                }
                self.state.source_wallet = wallet;
            }
            Command::SelectDestination(wallet) => {
                if let Some(wallet) = &wallet {
                    self.log(AnalyticsEvent::SwapChangingTokenB { token: token_label(wallet) });
                }
                self.state.destination_wallet = wallet;
            }
            Command::SwapSourceAndDestination => {
                self.log(AnalyticsEvent::SwapReversing);
                self.projector.swap_pair(&mut self.state);
            }
            Command::EditInput(amount) => self.projector.edit_input(&mut self.state, amount),
            Command::EditEstimated(amount) => self.projector.edit_estimated(&mut self.state, amount),
            Command::SetFocus(field) => self.state.focused_field = field,
            Command::UseAllBalance => {
                let Some(available) = self.available_amount() else {
                    debug!("no available amount to use");
                    return;
                };
                self.log(AnalyticsEvent::SwapAvailableClick { sum: available });
                self.projector.use_all_balance(&mut self.state, available);
            }
            Command::ChangeSlippage(slippage) => {
                self.log(AnalyticsEvent::SwapSlippageKeydown { slippage });
                self.state.slippage = slippage;
                if is_slippage_valid(slippage, self.config.max_slippage) {
                    if let Err(err) = self.deps.settings.set_slippage(slippage) {
                        warn!(error = %err, "slippage not saved");
                    }
                }
            }
            Command::ChangePayingToken(paying_token) => {
                self.log(AnalyticsEvent::SwapPayingTokenChanged { paying_token });
                self.state.paying_token = paying_token;
                if let Err(err) = self.deps.settings.set_paying_token(paying_token) {
                    warn!(error = %err, "paying token not saved");
                }
            }
            Command::ReverseExchangeRate => {
                self.state.reversed_rate_display = !self.state.reversed_rate_display;
            }
            Command::Reload => {
                for constant in [&self.lamports_per_signature, &self.creating_account_fee] {
                    if !constant.state().is_loaded() {
                        let _ = constant.reload();
                    }
                }
                let outcome = self.coordinator.retry();
                debug!(?outcome, "reload");
            }
            Command::Snapshot(reply) => {
                // answered after the sync below so the view reflects every prior command
                self.sync();
                let _ = reply.send(self.view_tx.borrow().clone());
            }
        }
    }

    fn log(&self, event: AnalyticsEvent) {
        self.deps.analytics.log(event);
    }

    fn signal(&self) -> PairSignal {
        PairSignal {
            source: self.state.source_wallet.clone(),
            destination: self.state.destination_wallet.clone(),
            lamports_per_signature: self.lamports_per_signature.value(),
            creating_account_fee: self.creating_account_fee.value(),
            paying_token: self.state.effective_paying_token(),
        }
    }

    /// Rate, fee and minimum order size states as they apply to the current pair.
    /// Results for a pair that is still waiting out the debounce window are shown as
    /// loading.
    fn quote_states(&self) -> QuoteStates {
        if self.coordinator.is_current(&self.signal()) {
            QuoteStates {
                exchange_rate: self.coordinator.exchange_rate().state(),
                fees: self.coordinator.fees().state(),
                min_order_size: self.coordinator.min_order_size().state(),
            }
        } else {
            QuoteStates {
                exchange_rate: LoadableState::Loading,
                fees: LoadableState::Loading,
                min_order_size: LoadableState::Loading,
            }
        }
    }

    fn network_fee(&self) -> Option<Fee> {
        self.quote_states().fees.value().and_then(FeeBreakdown::network_fee)
    }

    fn available_amount(&self) -> Option<f64> {
        let source = self.state.source_wallet.as_ref()?;
        self.deps.provider.calculate_available_amount(source, self.network_fee().as_ref())
    }

    fn native_wallet(&self) -> Option<Wallet> {
        self.deps.wallets.native_wallet().or_else(|| {
            [&self.state.source_wallet, &self.state.destination_wallet]
                .into_iter()
                .flatten()
                .find(|wallet| wallet.is_native())
                .cloned()
        })
    }

    fn sync(&mut self) {
        let signal = self.signal();
        self.coordinator.observe(signal);

        let QuoteStates { exchange_rate, fees, min_order_size } = self.quote_states();
        self.projector.project(&mut self.state, exchange_rate.value().copied());

        let initial_state =
            combined([self.lamports_per_signature.load_state(), self.creating_account_fee.load_state()]);
        let network_fee = fees.value().and_then(FeeBreakdown::network_fee);
        let liquidity_provider_fee = fees.value().and_then(FeeBreakdown::liquidity_provider_rate);
        let available_amount = self.state.source_wallet.as_ref().and_then(|source| {
            self.deps.provider.calculate_available_amount(source, network_fee.as_ref())
        });
        let native_wallet = self.native_wallet();

        let snapshot = QuoteSnapshot {
            initial_state,
            source_wallet: self.state.source_wallet.as_ref(),
            destination_wallet: self.state.destination_wallet.as_ref(),
            input_amount: self.state.input_amount,
            estimated_amount: self.state.estimated_amount,
            exchange_rate: &exchange_rate,
            fees: &fees,
            min_order_size: &min_order_size,
            native_wallet: native_wallet.as_ref(),
            slippage: Some(self.state.slippage),
            max_slippage: self.config.max_slippage,
            available_amount,
        };
        let error = validate(&snapshot).or_else(|| loadable_error_code(&exchange_rate));
        if error != self.last_error {
            info!(?error, previous = ?self.last_error, "quote error changed");
            self.last_error = error;
        }

        let is_valid = error.is_none()
            && initial_state == LoadState::Loaded
            && exchange_rate.is_loaded()
            && fees.is_loaded()
            && min_order_size.is_loaded();
        let minimum_receive_amount = match (&self.state.destination_wallet, self.state.estimated_amount) {
            (Some(destination), Some(estimated)) => {
                Some(floor_to_decimals(estimated * (1.0 - self.state.slippage), destination.decimals()))
            }
            _ => None,
        };
        let display_rate = exchange_rate
            .value()
            .copied()
            .filter(|rate| *rate > 0.0)
            .map(|rate| if self.state.reversed_rate_display { 1.0 / rate } else { rate });

        let view = SessionView {
            source_wallet: self.state.source_wallet.clone(),
            destination_wallet: self.state.destination_wallet.clone(),
            input_amount: self.state.input_amount,
            estimated_amount: self.state.estimated_amount,
            active_field: self.state.active_field,
            initial_state,
            exchange_rate,
            fees,
            min_order_size,
            network_fee,
            liquidity_provider_fee,
            slippage: self.state.slippage,
            paying_token: self.state.effective_paying_token(),
            is_paying_token_selectable: self.state.is_paying_token_selectable(),
            reversed_rate_display: self.state.reversed_rate_display,
            display_rate,
            available_amount,
            minimum_receive_amount,
            error,
            is_valid,
        };
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }
}
