//! Persisted swap preferences
//!
//! Slippage and paying token outlive a swap session. The session reads them once on
//! start and writes them back whenever the user changes them.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::common::error::{QuoteError, QuoteResult};
use crate::common::types::PayingToken;

pub trait SettingsStore: Send + Sync {
    fn slippage(&self) -> Option<f64>;
    fn set_slippage(&self, slippage: f64) -> QuoteResult<()>;
    fn paying_token(&self) -> Option<PayingToken>;
    fn set_paying_token(&self, paying_token: PayingToken) -> QuoteResult<()>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SwapSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slippage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paying_token: Option<PayingToken>,
}

#[derive(Debug, Default)]
pub struct InMemorySettings {
    inner: RwLock<SwapSettings>,
}

impl InMemorySettings {
    pub fn new(settings: SwapSettings) -> Self {
        Self { inner: RwLock::new(settings) }
    }

    pub fn snapshot(&self) -> SwapSettings {
        *self.inner.read()
    }
}

impl SettingsStore for InMemorySettings {
    fn slippage(&self) -> Option<f64> {
        self.inner.read().slippage
    }

    fn set_slippage(&self, slippage: f64) -> QuoteResult<()> {
        self.inner.write().slippage = Some(slippage);
        Ok(())
    }

    fn paying_token(&self) -> Option<PayingToken> {
        self.inner.read().paying_token
    }

    fn set_paying_token(&self, paying_token: PayingToken) -> QuoteResult<()> {
        self.inner.write().paying_token = Some(paying_token);
        Ok(())
    }
}

/// Settings kept in a JSON file, cached in memory and rewritten on every change
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    cache: RwLock<SwapSettings>,
}

impl JsonFileSettings {
    /// Open `path`. A missing file starts empty; an unreadable one is an error.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let settings = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("read settings {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parse settings {}", path.display()))?
        } else {
            SwapSettings::default()
        };
        Ok(Self { path, cache: RwLock::new(settings) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, settings: &SwapSettings) -> Result<()> {
        let json = serde_json::to_string_pretty(settings)?;
        // write-then-rename so a crash never leaves a truncated file behind
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| format!("replace {}", self.path.display()))?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut SwapSettings)) -> QuoteResult<()> {
        let mut cache = self.cache.write();
        let mut next = *cache;
        apply(&mut next);
        self.persist(&next).map_err(|err| {
            warn!(path = %self.path.display(), error = %err, "settings not persisted");
            QuoteError::Settings(format!("{err:#}"))
        })?;
        *cache = next;
        Ok(())
    }
}

impl SettingsStore for JsonFileSettings {
    fn slippage(&self) -> Option<f64> {
        self.cache.read().slippage
    }

    fn set_slippage(&self, slippage: f64) -> QuoteResult<()> {
        self.update(|settings| settings.slippage = Some(slippage))
    }

    fn paying_token(&self) -> Option<PayingToken> {
        self.cache.read().paying_token
    }

    fn set_paying_token(&self, paying_token: PayingToken) -> QuoteResult<()> {
        self.update(|settings| settings.paying_token = Some(paying_token))
    }
}
