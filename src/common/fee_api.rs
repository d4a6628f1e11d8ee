//! Network fee constants
//!
//! Two numbers feed every fee calculation: lamports charged per signature and the
//! rent-exempt minimum of a fresh SPL token account.

use anyhow::Context;
use async_trait::async_trait;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::debug;

use crate::common::error::{QuoteError, QuoteResult};
use crate::common::types::SolanaRpcClient;
use crate::constants::TOKEN_ACCOUNT_LEN;

#[async_trait]
pub trait FeeApiClient: Send + Sync {
    async fn lamports_per_signature(&self) -> QuoteResult<u64>;
    async fn creating_account_fee(&self) -> QuoteResult<u64>;
}

#[derive(Debug, Clone)]
pub struct RpcFeeApiConfig {
    pub rpc_url: String,
    pub commitment: CommitmentConfig,
}

impl Default for RpcFeeApiConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            commitment: CommitmentConfig::confirmed(),
        }
    }
}

pub struct RpcFeeApiClient {
    rpc: Arc<SolanaRpcClient>,
}

impl RpcFeeApiClient {
    pub fn new(config: RpcFeeApiConfig) -> Self {
        Self { rpc: Arc::new(SolanaRpcClient::new_with_commitment(config.rpc_url, config.commitment)) }
    }

    pub fn with_client(rpc: Arc<SolanaRpcClient>) -> Self {
        Self { rpc }
    }
}

#[async_trait]
impl FeeApiClient for RpcFeeApiClient {
    async fn lamports_per_signature(&self) -> QuoteResult<u64> {
        // fee of a message with a single signer is exactly one signature's worth
        let blockhash = self
            .rpc
            .get_latest_blockhash()
            .await
            .context("get latest blockhash")
            .map_err(|err| QuoteError::Rpc(format!("{err:#}")))?;
        let payer = Pubkey::new_unique();
        let message = Message::new_with_blockhash(&[], Some(&payer), &blockhash);
        let fee = self
            .rpc
            .get_fee_for_message(&message)
            .await
            .map_err(|err| QuoteError::Rpc(err.to_string()))?;
        debug!(fee, "lamports per signature");
        Ok(fee)
    }

    async fn creating_account_fee(&self) -> QuoteResult<u64> {
        let rent = self
            .rpc
            .get_minimum_balance_for_rent_exemption(TOKEN_ACCOUNT_LEN)
            .await
            .map_err(|err| QuoteError::Rpc(err.to_string()))?;
        debug!(rent, "token account rent");
        Ok(rent)
    }
}

/// Constant answers, for tests and offline use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedFeeApiClient {
    pub lamports_per_signature: u64,
    pub creating_account_fee: u64,
}

impl Default for FixedFeeApiClient {
    fn default() -> Self {
        Self { lamports_per_signature: 5_000, creating_account_fee: 2_039_280 }
    }
}

#[async_trait]
impl FeeApiClient for FixedFeeApiClient {
    async fn lamports_per_signature(&self) -> QuoteResult<u64> {
        Ok(self.lamports_per_signature)
    }

    async fn creating_account_fee(&self) -> QuoteResult<u64> {
        Ok(self.creating_account_fee)
    }
}
