pub mod cli;
pub mod converter;
pub mod core;
pub mod providers;

use crate::converter::{ConverterHandle, ConverterSettings};
use crate::core::config::AppConfig;
use crate::core::fetcher::RateFetcher;
use crate::core::rates::RateStore;
use crate::core::timestamp::SystemClock;
use crate::providers::CurrencyFreaksProvider;
use anyhow::Result;
use std::io::Write;
use std::sync::Arc;
use tokio::io::AsyncBufRead;
use tracing::{info, warn};

pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("Currency converter starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    run_with_config(&config, stdin, std::io::stdout()).await
}

/// Runs a converter session reading commands from `input` until it ends.
pub async fn run_with_config<R, W>(config: &AppConfig, input: R, output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let settings = ConverterSettings::from_config(config)?;
    let store = Arc::new(RateStore::new());

    let provider = CurrencyFreaksProvider::from_config(&config.providers.currencyfreaks)?;
    let fetcher = RateFetcher::new(
        Arc::new(provider),
        Arc::clone(&store),
        config.refresh.rates_interval(),
    );
    // Prime the cache so the first render uses real rates when available
    if let Err(e) = fetcher.refresh_once().await {
        warn!(error = %e, "Initial rate fetch failed, converting at base rates");
    }
    let fetcher = fetcher.spawn_after(config.refresh.rates_interval());

    let converter = ConverterHandle::spawn(settings, store, Arc::new(SystemClock));
    let result = cli::repl::run(input, output, &converter).await;

    converter.shutdown().await;
    fetcher.shutdown().await;
    info!("Currency converter stopped");
    result
}
