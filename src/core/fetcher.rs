use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::core::currency::RateProvider;
use crate::core::rates::RateStore;

/// Periodically pulls rates from a provider into a [`RateStore`].
///
/// The interval runs from the end of one attempt to the start of the next.
pub struct RateFetcher {
    provider: Arc<dyn RateProvider>,
    store: Arc<RateStore>,
    interval: Duration,
}

impl RateFetcher {
    pub fn new(provider: Arc<dyn RateProvider>, store: Arc<RateStore>, interval: Duration) -> Self {
        Self {
            provider,
            store,
            interval,
        }
    }

    /// Performs one fetch. A failure leaves the stored table as it was.
    pub async fn refresh_once(&self) -> Result<()> {
        match self.provider.fetch_rates().await {
            Ok(table) => {
                info!("Fetched {} exchange rates", table.len());
                self.store.replace(table);
                Ok(())
            }
            Err(e) => {
                let failures = self.store.record_failure();
                warn!(error = %e, failures, "Rate refresh failed, keeping cached rates");
                Err(e)
            }
        }
    }

    /// Starts the loop with an immediate first fetch.
    pub fn spawn(self) -> FetcherHandle {
        self.spawn_after(Duration::ZERO)
    }

    /// Starts the loop, waiting `delay` before the first fetch.
    pub fn spawn_after(self, delay: Duration) -> FetcherHandle {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let handle = tokio::spawn(async move {
            self.run(cancel_clone, delay).await;
        });
        FetcherHandle { handle, cancel }
    }

    async fn run(self, cancel: CancellationToken, mut delay: Duration) {
        debug!("Rate fetcher started, interval {:?}", self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(delay) => {}
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = self.refresh_once() => {}
            }
            delay = self.interval;
        }
        info!("Rate fetcher stopped");
    }
}

/// Stops the background fetch loop on shutdown.
pub struct FetcherHandle {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
}

impl FetcherHandle {
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Rate fetcher task ended abnormally");
        }
    }
}
