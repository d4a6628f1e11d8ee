//! HTTP price source
//!
//! Pulls USD prices for both mints in one request and derives the cross rate.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Proxy};
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::{env, time::Duration};
use tracing::debug;

use crate::common::error::QuoteError;
use crate::swap::rate_provider::PriceSource;

/// Price API client configuration
#[derive(Debug, Clone)]
pub struct PriceApiConfig {
    /// Base URL, e.g. `https://lite-api.jup.ag`
    pub base_url: String,
    /// Request timeout (milliseconds)
    pub timeout_millis: u64,
}

impl Default for PriceApiConfig {
    fn default() -> Self {
        Self { base_url: "https://lite-api.jup.ag".to_string(), timeout_millis: 10_000 }
    }
}

#[derive(Debug, Deserialize)]
struct PriceResponse {
    data: HashMap<String, Option<PriceEntry>>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    #[serde(deserialize_with = "de_price")]
    price: f64,
}

/// Prices come back either as a JSON number or a decimal string
fn de_price<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }
    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text.parse().map_err(serde::de::Error::custom),
    }
}

#[derive(Clone)]
pub struct HttpPriceSource {
    http: Client,
    pub config: PriceApiConfig,
}

impl HttpPriceSource {
    pub fn new(config: PriceApiConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_millis(config.timeout_millis))
            .connect_timeout(Duration::from_secs(5));

        if let Ok(https_proxy) = env::var("HTTPS_PROXY").or_else(|_| env::var("https_proxy")) {
            builder = builder.proxy(Proxy::https(&https_proxy)?);
        }

        Ok(Self { http: builder.build()?, config })
    }

    pub fn mainnet_default() -> Result<Self> {
        Self::new(PriceApiConfig::default())
    }

    #[inline]
    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    /// USD price per mint; mints the API does not know are absent from the map
    pub async fn usd_prices(&self, mints: &[Pubkey]) -> Result<HashMap<Pubkey, f64>> {
        let ids = mints.iter().map(Pubkey::to_string).collect::<Vec<_>>().join(",");
        let response = self
            .http
            .get(self.endpoint("/price/v2"))
            .query(&[("ids", ids)])
            .send()
            .await
            .map_err(|err| QuoteError::Http(err.to_string()))?
            .error_for_status()
            .map_err(|err| QuoteError::Http(err.to_string()))?
            .json::<PriceResponse>()
            .await?;
        Ok(parse_prices(response))
    }
}

fn parse_prices(response: PriceResponse) -> HashMap<Pubkey, f64> {
    response
        .data
        .into_iter()
        .filter_map(|(mint, entry)| Some((mint.parse().ok()?, entry?.price)))
        .filter(|(_, price)| price.is_finite() && *price > 0.0)
        .collect()
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fair_price(&self, from_mint: Pubkey, to_mint: Pubkey) -> Result<f64> {
        let prices = self.usd_prices(&[from_mint, to_mint]).await?;
        let unsupported = || anyhow!(QuoteError::UnsupportedPair { from: from_mint, to: to_mint });
        let from_usd = prices.get(&from_mint).copied().ok_or_else(unsupported)?;
        let to_usd = prices.get(&to_mint).copied().ok_or_else(unsupported)?;
        debug!(%from_mint, %to_mint, from_usd, to_usd, "fair price");
        Ok(to_usd / from_usd)
    }
}
