//! Fetch ordering and stale-result behaviour of the dependent fetch coordinator

mod common;

use common::{MockSwapProvider, network_fee, sol_wallet, token_wallet};
use sol_swap_quote::swap::coordinator::{CoordinatorStep, DependentFetchCoordinator, PairSignal, RefreshOutcome};
use sol_swap_quote::{LoadState, LoadableState, PayingToken, QuoteError, Wallet};
use std::time::Duration;
use tokio::time::{sleep, timeout};

const DEBOUNCE: Duration = Duration::from_millis(300);

fn signal(source: &Wallet, destination: &Wallet) -> PairSignal {
    PairSignal {
        source: Some(source.clone()),
        destination: Some(destination.clone()),
        lamports_per_signature: Some(5_000),
        creating_account_fee: Some(2_039_280),
        paying_token: PayingToken::NativeToken,
    }
}

async fn step(coordinator: &mut DependentFetchCoordinator) -> CoordinatorStep {
    timeout(Duration::from_secs(30), coordinator.next_step()).await.expect("coordinator stalled")
}

#[tokio::test(start_paused = true)]
async fn test_late_fees_for_previous_pair_are_discarded() {
    let provider = MockSwapProvider::new();
    let a = sol_wallet(5_000_000_000);
    let b = token_wallet("B", 6, 0);
    let c = token_wallet("C", 6, 0);
    provider.set_rate(a.mint(), b.mint(), 0.01, Duration::ZERO);
    provider.set_rate(a.mint(), c.mint(), 0.02, Duration::ZERO);
    provider.set_fees(a.mint(), b.mint(), network_fee(111), Duration::from_millis(2_000));
    provider.set_fees(a.mint(), c.mint(), network_fee(222), Duration::from_millis(10));

    let mut coordinator = DependentFetchCoordinator::new(provider.clone(), DEBOUNCE, None);

    coordinator.observe(signal(&a, &b));
    assert_eq!(step(&mut coordinator).await, CoordinatorStep::Refreshed(RefreshOutcome::RateRequested));
    assert_eq!(step(&mut coordinator).await, CoordinatorStep::FeesRequested);
    assert_eq!(coordinator.fees().load_state(), LoadState::Loading);

    // A→B fees are still in flight when the user picks C
    coordinator.observe(signal(&a, &c));
    assert_eq!(step(&mut coordinator).await, CoordinatorStep::Refreshed(RefreshOutcome::RateRequested));
    assert_eq!(step(&mut coordinator).await, CoordinatorStep::FeesRequested);

    let mut fees = coordinator.fees().subscribe();
    timeout(Duration::from_secs(30), fees.wait_for(|state| state.is_loaded()))
        .await
        .expect("fees stalled")
        .expect("sender alive");
    assert_eq!(coordinator.fees().value(), Some(network_fee(222)));

    // let the slow A→B answer arrive
    sleep(Duration::from_secs(5)).await;
    assert_eq!(coordinator.fees().state(), LoadableState::Loaded(network_fee(222)));
    assert_eq!(coordinator.exchange_rate().value(), Some(0.02));
    assert_eq!(provider.fee_calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fees_start_only_after_rate_loaded() {
    let provider = MockSwapProvider::new();
    let a = sol_wallet(1);
    let b = token_wallet("B", 6, 0);
    provider.set_rate(a.mint(), b.mint(), 0.5, Duration::from_millis(700));

    let mut coordinator = DependentFetchCoordinator::new(provider.clone(), DEBOUNCE, None);
    coordinator.refresh(signal(&a, &b));
    assert_eq!(coordinator.exchange_rate().load_state(), LoadState::Loading);
    assert_eq!(coordinator.fees().load_state(), LoadState::NotRequested);

    sleep(Duration::from_millis(500)).await;
    assert_eq!(provider.fee_calls(), 0, "fees must wait for the rate");

    assert_eq!(step(&mut coordinator).await, CoordinatorStep::FeesRequested);
    sleep(Duration::from_millis(10)).await;

    let log = provider.log();
    let price_done = log.iter().position(|entry| entry.starts_with("price done")).expect("price finished");
    let fees_start = log.iter().position(|entry| entry.starts_with("fees start")).expect("fees started");
    assert!(price_done < fees_start, "unexpected call order: {log:?}");
    let min_order_start = log.iter().position(|entry| entry.starts_with("min order start")).expect("min order asked");
    assert!(price_done < min_order_start, "unexpected call order: {log:?}");
}

#[tokio::test(start_paused = true)]
async fn test_failed_rate_never_requests_fees() {
    let provider = MockSwapProvider::new();
    let a = sol_wallet(1);
    let b = token_wallet("B", 6, 0);
    provider.fail_rate(a.mint(), b.mint(), QuoteError::Http("502".into()), Duration::from_millis(50));

    let mut coordinator = DependentFetchCoordinator::new(provider.clone(), DEBOUNCE, None);
    coordinator.refresh(signal(&a, &b));
    assert_eq!(step(&mut coordinator).await, CoordinatorStep::FeesSkipped);
    assert_eq!(coordinator.exchange_rate().state(), LoadableState::Error(QuoteError::Http("502".into())));
    assert_eq!(coordinator.fees().load_state(), LoadState::NotRequested);
    assert_eq!(coordinator.min_order_size().load_state(), LoadState::NotRequested);
    assert_eq!(provider.fee_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_selections_quotes_last_pair_once() {
    let provider = MockSwapProvider::new();
    let a = sol_wallet(1);
    let targets: Vec<Wallet> = (0..5).map(|i| token_wallet(&format!("T{i}"), 6, 0)).collect();
    for target in &targets {
        provider.set_rate(a.mint(), target.mint(), 1.0, Duration::ZERO);
    }

    let mut coordinator = DependentFetchCoordinator::new(provider.clone(), DEBOUNCE, None);
    for target in &targets {
        coordinator.observe(signal(&a, target));
        sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(step(&mut coordinator).await, CoordinatorStep::Refreshed(RefreshOutcome::RateRequested));
    assert_eq!(step(&mut coordinator).await, CoordinatorStep::FeesRequested);
    assert_eq!(provider.price_calls(), 1);
    let last = targets.last().expect("targets");
    assert!(coordinator.is_current(&signal(&a, last)));
}

#[tokio::test(start_paused = true)]
async fn test_provider_timeout_ends_in_error() {
    let provider = MockSwapProvider::new();
    let a = sol_wallet(1);
    let b = token_wallet("B", 6, 0);
    provider.set_rate(a.mint(), b.mint(), 1.0, Duration::from_secs(3_600));

    let mut coordinator = DependentFetchCoordinator::new(provider.clone(), DEBOUNCE, Some(Duration::from_secs(15)));
    coordinator.refresh(signal(&a, &b));
    assert_eq!(step(&mut coordinator).await, CoordinatorStep::FeesSkipped);
    assert_eq!(coordinator.exchange_rate().state(), LoadableState::Error(QuoteError::Timeout(15_000)));
}
