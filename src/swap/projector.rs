//! Bidirectional amount projection
//!
//! The field the user last typed into is authoritative; the other one is derived from
//! it through the provider's estimate/invert pair. A derived field that currently has
//! edit focus is never written, so projection cannot clobber keystrokes or oscillate.

use std::sync::Arc;

use crate::common::types::{PayingToken, Wallet};
use crate::constants::DEFAULT_SLIPPAGE;
use crate::swap::provider::SwapProvider;
use crate::utils::amount::round_to_decimals;

/// Which amount the user edited last
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveField {
    #[default]
    None,
    Input,
    Estimated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountField {
    Input,
    Estimated,
}

/// User-editable quote state, owned by the session
#[derive(Debug, Clone, PartialEq)]
pub struct QuoteInputState {
    pub source_wallet: Option<Wallet>,
    pub destination_wallet: Option<Wallet>,
    pub input_amount: Option<f64>,
    pub estimated_amount: Option<f64>,
    pub slippage: f64,
    pub paying_token: PayingToken,
    pub reversed_rate_display: bool,
    pub active_field: ActiveField,
    /// Field holding edit focus, if any
    pub focused_field: Option<AmountField>,
}

impl Default for QuoteInputState {
    fn default() -> Self {
        Self {
            source_wallet: None,
            destination_wallet: None,
            input_amount: None,
            estimated_amount: None,
            slippage: DEFAULT_SLIPPAGE,
            paying_token: PayingToken::default(),
            reversed_rate_display: false,
            active_field: ActiveField::None,
            focused_field: None,
        }
    }
}

impl QuoteInputState {
    /// Fees can only be paid in the transaction token when neither side is native SOL
    pub fn effective_paying_token(&self) -> PayingToken {
        if self.touches_native() { PayingToken::NativeToken } else { self.paying_token }
    }

    /// The paying-token choice is only offered for SPL-to-SPL pairs
    pub fn is_paying_token_selectable(&self) -> bool {
        !self.touches_native()
    }

    fn touches_native(&self) -> bool {
        [&self.source_wallet, &self.destination_wallet].into_iter().flatten().any(Wallet::is_native)
    }
}

/// Parse a user-typed amount. Accepts `,` as decimal separator; blank is `None`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let value: f64 = text.replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}

pub struct AmountProjector {
    provider: Arc<dyn SwapProvider>,
}

impl AmountProjector {
    pub fn new(provider: Arc<dyn SwapProvider>) -> Self {
        Self { provider }
    }

    pub fn edit_input(&self, state: &mut QuoteInputState, amount: Option<f64>) {
        state.input_amount = amount;
        state.active_field = ActiveField::Input;
    }

    pub fn edit_estimated(&self, state: &mut QuoteInputState, amount: Option<f64>) {
        state.estimated_amount = amount;
        state.active_field = ActiveField::Estimated;
    }

    /// Write `available` into the input field and make it authoritative.
    ///
    /// Focus is dropped: the action comes from a button, not from typing.
    pub fn use_all_balance(&self, state: &mut QuoteInputState, available: f64) {
        state.focused_field = None;
        state.input_amount = Some(available);
        state.active_field = ActiveField::Input;
    }

    /// Exchange source and destination.
    ///
    /// The authoritative amount follows its token into the opposite field and the other
    /// field is cleared; it is re-derived once the rate for the new pair loads.
    pub fn swap_pair(&self, state: &mut QuoteInputState) {
        std::mem::swap(&mut state.source_wallet, &mut state.destination_wallet);
        state.focused_field = None;
        match state.active_field {
            ActiveField::Input | ActiveField::None => {
                state.estimated_amount = state.input_amount.take();
                state.active_field =
                    if state.estimated_amount.is_some() { ActiveField::Estimated } else { ActiveField::None };
            }
            ActiveField::Estimated => {
                state.input_amount = state.estimated_amount.take();
                state.active_field = ActiveField::Input;
            }
        }
    }

    /// Recompute the derived field from the authoritative one.
    ///
    /// `rate` is `None` while the exchange rate is not usable; the derived field is then
    /// cleared. Returns whether anything was written.
    pub fn project(&self, state: &mut QuoteInputState, rate: Option<f64>) -> bool {
        let rate = rate.filter(|rate| rate.is_finite() && *rate > 0.0);
        match state.active_field {
            ActiveField::None => false,
            ActiveField::Input => {
                if state.focused_field == Some(AmountField::Estimated) {
                    return false;
                }
                let decimals = state.destination_wallet.as_ref().map(Wallet::decimals);
                let estimated = match (state.input_amount, rate, decimals) {
                    (Some(input), Some(rate), Some(decimals)) => self
                        .provider
                        .calculate_estimated_amount(input, rate, state.slippage)
                        .map(|amount| round_to_decimals(amount, decimals)),
                    _ => None,
                };
                let changed = state.estimated_amount != estimated;
                state.estimated_amount = estimated;
                changed
            }
            ActiveField::Estimated => {
                if state.focused_field == Some(AmountField::Input) {
                    return false;
                }
                let decimals = state.source_wallet.as_ref().map(Wallet::decimals);
                let input = match (state.estimated_amount, rate, decimals) {
                    (Some(estimated), Some(rate), Some(decimals)) => self
                        .provider
                        .calculate_needed_input_amount(estimated, rate, state.slippage)
                        .map(|amount| round_to_decimals(amount, decimals)),
                    _ => None,
                };
                let changed = state.input_amount != input;
                state.input_amount = input;
                changed
            }
        }
    }
}
