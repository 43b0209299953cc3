//! Amount normalization and conversion against a rate snapshot.
use anyhow::{Result, bail};
use tracing::{debug, error};

use crate::core::currency::CurrencyCode;
use crate::core::rates::RateTable;

/// Shown in place of a value when there is no amount to convert.
pub const EMPTY_PLACEHOLDER: &str = "—";

/// Outcome of evaluating an amount against a rate snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    /// Nothing left after removing the symbol.
    Empty,
    /// The amount is not a finite decimal number.
    Invalid,
    /// The computation itself failed.
    Failed,
    Converted { amount: f64, value: f64 },
}

impl Conversion {
    /// Renders the outcome prefixed with the target currency symbol.
    pub fn render(&self, to: CurrencyCode) -> String {
        let sym = to.symbol();
        match self {
            Conversion::Empty => format!("{sym} {EMPTY_PLACEHOLDER}"),
            Conversion::Invalid => format!("{sym} Invalid"),
            Conversion::Failed => format!("{sym} Error"),
            Conversion::Converted { value, .. } => format!("{sym} {value:.2}"),
        }
    }

    /// Two decimal form of the parsed amount, prefixed with the source symbol.
    pub fn canonical_amount(&self, from: CurrencyCode) -> Option<String> {
        match self {
            Conversion::Converted { amount, .. } => Some(format!("{} {amount:.2}", from.symbol())),
            _ => None,
        }
    }
}

/// Replaces any known symbol prefix with the symbol of `from`.
///
/// Leading symbols are stripped until none remain, so applying this to its
/// own output returns the same text.
pub fn normalize_amount(raw: &str, from: CurrencyCode) -> String {
    let mut rest = raw.trim();
    while let Some(stripped) = strip_known_symbol(rest) {
        rest = stripped.trim();
    }
    format!("{} {rest}", from.symbol())
}

fn strip_known_symbol(text: &str) -> Option<&str> {
    CurrencyCode::symbols().find_map(|s| text.strip_prefix(s))
}

/// Evaluates `amount_text` in `from` against `rates`, expressed in `to`.
pub fn evaluate(
    amount_text: &str,
    from: CurrencyCode,
    to: CurrencyCode,
    rates: &RateTable,
) -> Conversion {
    let raw = amount_text.replace(from.symbol(), "");
    let raw = raw.trim();
    if raw.is_empty() {
        return Conversion::Empty;
    }

    let amount = match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            debug!("Amount {:?} is not a number", raw);
            return Conversion::Invalid;
        }
    };

    match compute(amount, from, to, rates) {
        Ok(value) => Conversion::Converted { amount, value },
        Err(e) => {
            error!(error = %e, amount, %from, %to, "Conversion failed");
            Conversion::Failed
        }
    }
}

/// Converts `amount_text` and renders the result text.
pub fn convert(amount_text: &str, from: CurrencyCode, to: CurrencyCode, rates: &RateTable) -> String {
    evaluate(amount_text, from, to, rates).render(to)
}

fn compute(amount: f64, from: CurrencyCode, to: CurrencyCode, rates: &RateTable) -> Result<f64> {
    let from_rate = rates.rate_or_base(from);
    let to_rate = rates.rate_or_base(to);
    let value = amount / from_rate * to_rate;
    if !value.is_finite() {
        bail!("Non-finite result converting {amount} {from} to {to} at {from_rate}/{to_rate}");
    }
    debug!("Converted {amount} {from} to {value} {to}");
    Ok(value)
}
