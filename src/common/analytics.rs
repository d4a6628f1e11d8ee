//! Analytics sink
//!
//! Fire-and-forget: events are handed over and nothing is read back. Sinks must not
//! block the session.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::common::types::PayingToken;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AnalyticsEvent {
    SwapChangingTokenA { token: String },
    SwapChangingTokenB { token: String },
    SwapReversing,
    SwapAvailableClick { sum: f64 },
    SwapSlippageKeydown { slippage: f64 },
    SwapPayingTokenChanged { paying_token: PayingToken },
}

pub trait AnalyticsSink: Send + Sync {
    fn log(&self, event: AnalyticsEvent);
}

pub type AnalyticsRef = Arc<dyn AnalyticsSink>;

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAnalytics;

impl AnalyticsSink for NoopAnalytics {
    fn log(&self, _event: AnalyticsEvent) {}
}

/// Writes each event to `tracing` as one JSON object
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAnalytics;

impl TracingAnalytics {
    pub fn to_json(event: &AnalyticsEvent) -> serde_json::Value {
        let mut value = serde_json::to_value(event).unwrap_or_else(|_| serde_json::json!({}));
        if let Some(object) = value.as_object_mut() {
            object.insert("timestamp".to_string(), Utc::now().to_rfc3339().into());
        }
        value
    }
}

impl AnalyticsSink for TracingAnalytics {
    fn log(&self, event: AnalyticsEvent) {
        info!(target: "analytics", "{}", Self::to_json(&event));
    }
}
