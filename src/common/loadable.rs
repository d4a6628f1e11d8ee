//! Loadable values
//!
//! `LoadableValue<T>` is an async result slot with four explicit states. A producer is
//! installed with [`LoadableValue::request`] and executed with [`LoadableValue::reload`].
//! Every reload/flush bumps a generation counter; a producer result is applied only if
//! its generation is still current when it settles (last caller wins). Superseded
//! results are dropped, never written into the state.

use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, warn};

use crate::common::error::{QuoteError, QuoteResult};

/// State of a loadable slot, carrying the value or error.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadableState<T> {
    NotRequested,
    Loading,
    Loaded(T),
    Error(QuoteError),
}

impl<T> Default for LoadableState<T> {
    fn default() -> Self {
        LoadableState::NotRequested
    }
}

/// Value-less view of [`LoadableState`], used to combine several slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadState {
    #[default]
    NotRequested,
    Loading,
    Loaded,
    Error,
}

impl<T> LoadableState<T> {
    pub fn load_state(&self) -> LoadState {
        match self {
            LoadableState::NotRequested => LoadState::NotRequested,
            LoadableState::Loading => LoadState::Loading,
            LoadableState::Loaded(_) => LoadState::Loaded,
            LoadableState::Error(_) => LoadState::Error,
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            LoadableState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&QuoteError> {
        match self {
            LoadableState::Error(err) => Some(err),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadableState::Loaded(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> LoadableState<U> {
        match self {
            LoadableState::NotRequested => LoadableState::NotRequested,
            LoadableState::Loading => LoadableState::Loading,
            LoadableState::Loaded(value) => LoadableState::Loaded(f(value)),
            LoadableState::Error(err) => LoadableState::Error(err),
        }
    }
}

/// Combine several slot states into one.
///
/// Error dominates, then Loading, then NotRequested; the result is Loaded only when
/// every input is Loaded. An empty input counts as Loaded.
pub fn combined<I>(states: I) -> LoadState
where
    I: IntoIterator<Item = LoadState>,
{
    let mut result = LoadState::Loaded;
    for state in states {
        result = match (result, state) {
            (LoadState::Error, _) | (_, LoadState::Error) => LoadState::Error,
            (LoadState::Loading, _) | (_, LoadState::Loading) => LoadState::Loading,
            (LoadState::NotRequested, _) | (_, LoadState::NotRequested) => LoadState::NotRequested,
            (LoadState::Loaded, LoadState::Loaded) => LoadState::Loaded,
        };
    }
    result
}

/// Outcome of one reload, reported to whoever holds its [`LoadTicket`].
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery<T> {
    /// The result was current and is now the slot state.
    Applied(QuoteResult<T>),
    /// A newer reload or a flush happened first; the result was dropped.
    Discarded,
}

/// Handle on a single reload. Awaiting it is optional.
#[must_use = "dropping the ticket is fine, but then nobody observes the delivery"]
pub struct LoadTicket<T> {
    generation: u64,
    rx: oneshot::Receiver<Delivery<T>>,
}

impl<T> LoadTicket<T> {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait until the producer settles and report whether its result was applied.
    pub async fn settled(self) -> Delivery<T> {
        // the sender only disappears if the runtime dropped the task
        self.rx.await.unwrap_or(Delivery::Discarded)
    }
}

type Producer<T> = Arc<dyn Fn() -> BoxFuture<'static, QuoteResult<T>> + Send + Sync>;

struct Slot<T> {
    generation: u64,
    producer: Option<Producer<T>>,
    timeout: Option<Duration>,
}

struct Shared<T> {
    name: &'static str,
    slot: Mutex<Slot<T>>,
    state_tx: watch::Sender<LoadableState<T>>,
}

impl<T: Clone> Shared<T> {
    fn deliver(&self, generation: u64, result: QuoteResult<T>) -> Delivery<T> {
        let slot = self.slot.lock();
        if slot.generation != generation {
            debug!(
                loadable = self.name,
                generation,
                current = slot.generation,
                "discarding stale result"
            );
            return Delivery::Discarded;
        }
        let state = match &result {
            Ok(value) => LoadableState::Loaded(value.clone()),
            Err(err) => {
                warn!(loadable = self.name, generation, error = %err, "load failed");
                LoadableState::Error(err.clone())
            }
        };
        // sent while holding the slot lock so a concurrent reload cannot interleave
        self.state_tx.send_replace(state);
        Delivery::Applied(result)
    }
}

/// Async result container with explicit states and stale-result discarding.
pub struct LoadableValue<T> {
    inner: Arc<Shared<T>>,
}

impl<T> Clone for LoadableValue<T> {
    fn clone(&self) -> Self {
        Self { inner: self.inner.clone() }
    }
}

impl<T: fmt::Debug> fmt::Debug for LoadableValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadableValue")
            .field("name", &self.inner.name)
            .field("generation", &self.inner.slot.lock().generation)
            .field("state", &*self.inner.state_tx.borrow())
            .finish()
    }
}

impl<T> LoadableValue<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create an empty slot in `NotRequested`.
    pub fn new(name: &'static str) -> Self {
        let (state_tx, _) = watch::channel(LoadableState::NotRequested);
        Self {
            inner: Arc::new(Shared {
                name,
                slot: Mutex::new(Slot { generation: 0, producer: None, timeout: None }),
                state_tx,
            }),
        }
    }

    /// Bound every producer run by `timeout`; an expired run settles as `QuoteError::Timeout`.
    pub fn with_timeout(self, timeout: Option<Duration>) -> Self {
        self.inner.slot.lock().timeout = timeout;
        self
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Install a producer without running it.
    pub fn request<F, Fut>(&self, producer: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = QuoteResult<T>> + Send + 'static,
    {
        let producer: Producer<T> = Arc::new(move || Box::pin(producer()));
        self.inner.slot.lock().producer = Some(producer);
    }

    /// Run the installed producer. Any pending run becomes stale.
    ///
    /// Returns `None` when no producer is installed; the state is left untouched.
    /// Must be called from within a tokio runtime.
    pub fn reload(&self) -> Option<LoadTicket<T>> {
        let (generation, future, timeout) = {
            let mut slot = self.inner.slot.lock();
            let Some(producer) = slot.producer.clone() else {
                debug!(loadable = self.inner.name, "reload ignored, no producer installed");
                return None;
            };
            slot.generation += 1;
            self.inner.state_tx.send_replace(LoadableState::Loading);
            (slot.generation, producer(), slot.timeout)
        };
        debug!(loadable = self.inner.name, generation, "reload");

        let (tx, rx) = oneshot::channel();
        let shared = self.inner.clone();
        tokio::spawn(async move {
            let result = match timeout {
                Some(limit) => match tokio::time::timeout(limit, future).await {
                    Ok(result) => result,
                    Err(_) => Err(QuoteError::Timeout(limit.as_millis() as u64)),
                },
                None => future.await,
            };
            let delivery = shared.deliver(generation, result);
            let _ = tx.send(delivery);
        });

        Some(LoadTicket { generation, rx })
    }

    /// Reset to `NotRequested`, dropping any loaded value.
    ///
    /// The producer stays installed. A run still in flight is not cancelled, but its
    /// generation is now stale so its result will be discarded on arrival.
    pub fn flush(&self) {
        let mut slot = self.inner.slot.lock();
        slot.generation += 1;
        self.inner.state_tx.send_replace(LoadableState::NotRequested);
        debug!(loadable = self.inner.name, generation = slot.generation, "flush");
    }

    pub fn state(&self) -> LoadableState<T> {
        self.inner.state_tx.borrow().clone()
    }

    pub fn load_state(&self) -> LoadState {
        self.inner.state_tx.borrow().load_state()
    }

    /// The value if the slot is `Loaded`.
    pub fn value(&self) -> Option<T> {
        self.inner.state_tx.borrow().value().cloned()
    }

    pub fn generation(&self) -> u64 {
        self.inner.slot.lock().generation
    }

    /// State stream. The receiver starts marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<LoadableState<T>> {
        self.inner.state_tx.subscribe()
    }
}
