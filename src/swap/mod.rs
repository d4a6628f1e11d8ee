pub mod coordinator;
pub mod fees;
pub mod price_api;
pub mod projector;
pub mod provider;
pub mod rate_provider;
pub mod session;
pub mod validator;

pub use coordinator::{CoordinatorStep, DependentFetchCoordinator, PairSignal, RefreshOutcome, SkipReason};
pub use fees::{Fee, FeeBreakdown, FeeKind};
pub use price_api::{HttpPriceSource, PriceApiConfig};
pub use projector::{ActiveField, AmountField, AmountProjector, QuoteInputState, parse_amount};
pub use provider::SwapProvider;
pub use rate_provider::{PriceSource, RateProviderConfig, RateSwapProvider};
pub use session::{SessionDeps, SessionView, SwapQuoteSession};
pub use validator::{ErrorCode, QuoteSnapshot, is_slippage_valid, loadable_error_code, validate};
