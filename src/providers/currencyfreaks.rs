use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::config::CurrencyFreaksConfig;
use crate::core::currency::RateProvider;
use crate::core::rates::RateTable;

const USER_AGENT: &str = concat!("xfx/", env!("CARGO_PKG_VERSION"));

// CurrencyFreaksProvider implementation for RateProvider
pub struct CurrencyFreaksProvider {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl CurrencyFreaksProvider {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(CurrencyFreaksProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.map(str::to_string),
            client,
        })
    }

    pub fn from_config(config: &CurrencyFreaksConfig) -> Result<Self> {
        Self::new(
            &config.base_url,
            config.api_key.as_deref(),
            config.timeout(),
        )
    }
}

/// Rates arrive as numbers or numeric strings depending on the plan.
#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, Value>,
}

fn parse_rate(code: &str, value: &Value) -> Option<f64> {
    let rate = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    if rate.is_none() {
        debug!("Ignoring non-numeric rate for {}: {}", code, value);
    }
    rate
}

#[async_trait]
impl RateProvider for CurrencyFreaksProvider {
    #[instrument(name = "CurrencyFreaksFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<RateTable> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("No API key configured for currency rates"))?;

        let url = format!("{}/latest?apikey={}", self.base_url, api_key);
        debug!("Requesting latest rates from {}/latest", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for latest rates", e.without_url()))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for latest rates",
                response.status()
            ));
        }

        let text = response.text().await?;

        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for latest rates: {}", e))?;

        let table = RateTable::from_rates(
            data.rates
                .iter()
                .filter_map(|(code, value)| parse_rate(code, value).map(|r| (code.clone(), r))),
        );
        if table.is_empty() {
            return Err(anyhow!("No usable rates in latest rates response"));
        }
        Ok(table)
    }
}
