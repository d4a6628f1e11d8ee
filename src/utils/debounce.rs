//! Debounce a stream of values
//!
//! Every `push` replaces the pending value and restarts the quiet period. `settled`
//! resolves with the last value once the period elapses without a new push. It is
//! cancel-safe: dropping the future loses nothing, so it can sit in a `select!` loop.

use std::time::Duration;
use tokio::time::{Instant, sleep_until};

#[derive(Debug)]
pub struct Debounce<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debounce<T> {
    pub fn new(window: Duration) -> Self {
        Self { window, pending: None }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace the pending value and restart the quiet period.
    pub fn push(&mut self, value: T) {
        self.pending = Some((value, Instant::now() + self.window));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Drop the pending value without emitting it.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Wait for the quiet period to pass. Never resolves while nothing is pending.
    pub async fn settled(&mut self) -> T {
        loop {
            let Some((_, deadline)) = &self.pending else {
                return std::future::pending().await;
            };
            sleep_until(*deadline).await;
            if let Some((value, deadline)) = self.pending.take() {
                if deadline <= Instant::now() {
                    return value;
                }
                // pushed again while we slept
                self.pending = Some((value, deadline));
            }
        }
    }
}
