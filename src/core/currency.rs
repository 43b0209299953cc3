//! Currency codes and rate provider abstractions

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::core::rates::RateTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CurrencyCode {
    Usd,
    Eur,
    Inr,
    Jpy,
}

impl CurrencyCode {
    pub const ALL: [CurrencyCode; 4] = [
        CurrencyCode::Usd,
        CurrencyCode::Eur,
        CurrencyCode::Inr,
        CurrencyCode::Jpy,
    ];

    /// Three letter code used by rate providers.
    pub fn code(&self) -> &'static str {
        match self {
            CurrencyCode::Usd => "USD",
            CurrencyCode::Eur => "EUR",
            CurrencyCode::Inr => "INR",
            CurrencyCode::Jpy => "JPY",
        }
    }

    /// Display symbol prefixed to amounts.
    pub fn symbol(&self) -> &'static str {
        match self {
            CurrencyCode::Usd => "$",
            CurrencyCode::Eur => "€",
            CurrencyCode::Inr => "₹",
            CurrencyCode::Jpy => "¥",
        }
    }

    /// Symbols of every supported currency.
    pub fn symbols() -> impl Iterator<Item = &'static str> {
        Self::ALL.iter().map(|c| c.symbol())
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for CurrencyCode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(CurrencyCode::Usd),
            "EUR" => Ok(CurrencyCode::Eur),
            "INR" => Ok(CurrencyCode::Inr),
            "JPY" => Ok(CurrencyCode::Jpy),
            _ => Err(anyhow::anyhow!("Unsupported currency: {}", s)),
        }
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> String {
        code.code().to_string()
    }
}

/// A remote source of the latest exchange rates.
#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rates(&self) -> Result<RateTable>;
}
