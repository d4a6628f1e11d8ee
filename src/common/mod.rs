pub mod analytics;
pub mod error;
pub mod fee_api;
pub mod loadable;
pub mod settings;
pub mod types;
pub mod wallets;

pub use analytics::{AnalyticsEvent, AnalyticsRef, AnalyticsSink, NoopAnalytics, TracingAnalytics};
pub use error::{QuoteError, QuoteResult};
pub use fee_api::{FeeApiClient, FixedFeeApiClient, RpcFeeApiClient, RpcFeeApiConfig};
pub use loadable::{Delivery, LoadState, LoadTicket, LoadableState, LoadableValue, combined};
pub use settings::{InMemorySettings, JsonFileSettings, SettingsStore, SwapSettings};
pub use types::{PayingToken, SessionConfig, SolanaRpcClient, TokenRef, Wallet};
pub use wallets::{StaticWalletsRepository, WalletsRepository};
