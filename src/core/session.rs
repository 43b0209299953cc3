use chrono::{DateTime, Utc};
use tracing::debug;

use crate::core::convert::{EMPTY_PLACEHOLDER, normalize_amount};
use crate::core::currency::CurrencyCode;

/// Current user input and the values derived from it.
///
/// Amount text always carries exactly one symbol prefix, that of `from`.
/// Setters only mutate; callers decide when to schedule a recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    amount_text: String,
    from: CurrencyCode,
    to: CurrencyCode,
    result_text: String,
    last_refreshed_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new(from: CurrencyCode, to: CurrencyCode) -> Self {
        Self {
            amount_text: normalize_amount("0", from),
            from,
            to,
            result_text: EMPTY_PLACEHOLDER.to_string(),
            last_refreshed_at: None,
        }
    }

    pub fn amount_text(&self) -> &str {
        &self.amount_text
    }

    pub fn from(&self) -> CurrencyCode {
        self.from
    }

    pub fn to(&self) -> CurrencyCode {
        self.to
    }

    pub fn result_text(&self) -> &str {
        &self.result_text
    }

    pub fn last_refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.last_refreshed_at
    }

    pub fn set_amount_text(&mut self, raw: &str) {
        self.amount_text = normalize_amount(raw, self.from);
        debug!("Amount text set to {:?}", self.amount_text);
    }

    /// Switches the source currency and re-prefixes the amount with its symbol.
    pub fn set_from_code(&mut self, code: CurrencyCode) {
        self.from = code;
        self.amount_text = normalize_amount(&self.amount_text, code);
        debug!("Source currency set to {code}, amount {:?}", self.amount_text);
    }

    pub fn set_to_code(&mut self, code: CurrencyCode) {
        self.to = code;
        debug!("Target currency set to {code}");
    }

    pub fn set_result_text(&mut self, result: String) {
        self.result_text = result;
    }

    pub fn mark_refreshed(&mut self, at: DateTime<Utc>) {
        self.last_refreshed_at = Some(at);
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(CurrencyCode::Usd, CurrencyCode::Inr)
    }
}
