//! Transport / provider error channel
//!
//! Errors here travel inside `LoadableState::Error` and are broadcast through watch
//! channels, so the type is `Clone` and carries messages rather than sources.

use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::swap::validator::ErrorCode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    #[error("provider error: {0}")]
    Provider(String),

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("http error: {0}")]
    Http(String),

    #[error("swapping from {from} to {to} is currently unsupported")]
    UnsupportedPair { from: Pubkey, to: Pubkey },

    #[error("swapping is currently unavailable")]
    SwappingUnavailable,

    #[error("request timed out after {0} ms")]
    Timeout(u64),

    #[error("settings error: {0}")]
    Settings(String),

    #[error("swap session is closed")]
    SessionClosed,
}

impl QuoteError {
    /// Presentational code for errors that have one.
    ///
    /// Only the "no pool" family maps onto the validator taxonomy; plain transport
    /// failures stay in the loadable and are shown as a retry prompt instead.
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            QuoteError::UnsupportedPair { .. } => Some(ErrorCode::UnsupportedPair),
            QuoteError::SwappingUnavailable => Some(ErrorCode::SwappingUnavailable),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for QuoteError {
    fn from(err: anyhow::Error) -> Self {
        // adapters that already produced a QuoteError keep their variant
        match err.downcast::<QuoteError>() {
            Ok(quote_error) => quote_error,
            Err(err) => QuoteError::Provider(format!("{err:#}")),
        }
    }
}

pub type QuoteResult<T> = Result<T, QuoteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anyhow_roundtrip_keeps_variant() {
        let err = anyhow::Error::new(QuoteError::SwappingUnavailable);
        assert_eq!(QuoteError::from(err), QuoteError::SwappingUnavailable);
    }

    #[test]
    fn test_anyhow_message_becomes_provider_error() {
        let err = anyhow::anyhow!("connection refused").context("load price");
        match QuoteError::from(err) {
            QuoteError::Provider(msg) => {
                assert!(msg.contains("load price"));
                assert!(msg.contains("connection refused"));
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_error_code_mapping() {
        let pair = QuoteError::UnsupportedPair { from: Pubkey::new_unique(), to: Pubkey::new_unique() };
        assert_eq!(pair.error_code(), Some(ErrorCode::UnsupportedPair));
        assert_eq!(QuoteError::SwappingUnavailable.error_code(), Some(ErrorCode::SwappingUnavailable));
        assert_eq!(QuoteError::Timeout(10).error_code(), None);
    }
}
