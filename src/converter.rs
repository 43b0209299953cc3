//! The converter session: a single task that owns [`SessionState`] and
//! serializes every input event, debounce fire and heartbeat tick.

use anyhow::{Result, anyhow, bail};
use chrono::FixedOffset;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::config::AppConfig;
use crate::core::convert::evaluate;
use crate::core::currency::CurrencyCode;
use crate::core::debounce::{InputDebouncer, PendingRecompute};
use crate::core::rates::RateStore;
use crate::core::session::SessionState;
use crate::core::timestamp::{Clock, TimestampTracker, offset_from_minutes};

#[derive(Debug, Clone)]
pub struct ConverterSettings {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub debounce: Duration,
    pub heartbeat: Duration,
    pub utc_offset: FixedOffset,
    pub zone_label: String,
    pub stale_after_failures: u32,
}

impl ConverterSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        if config.refresh.rates_interval_secs == 0 {
            bail!("Invalid refresh.rates_interval_secs: must be greater than zero");
        }
        if config.refresh.timestamp_interval_secs == 0 {
            bail!("Invalid refresh.timestamp_interval_secs: must be greater than zero");
        }
        let utc_offset = offset_from_minutes(config.display.utc_offset_minutes).ok_or_else(|| {
            anyhow!(
                "Invalid display.utc_offset_minutes: {}",
                config.display.utc_offset_minutes
            )
        })?;
        Ok(Self {
            from: config.defaults.from,
            to: config.defaults.to,
            debounce: config.refresh.debounce(),
            heartbeat: config.refresh.timestamp_interval(),
            utc_offset,
            zone_label: config.display.zone_label.clone(),
            stale_after_failures: config.refresh.stale_after_failures,
        })
    }
}

/// Everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq)]
pub struct View {
    pub amount_text: String,
    pub result_text: String,
    pub last_refreshed: String,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rates_stale: bool,
    /// Number of conversions run so far.
    pub conversions: u64,
}

#[derive(Debug, Clone)]
enum Event {
    AmountChanged(String),
    FromChanged(CurrencyCode),
    ToChanged(CurrencyCode),
    Confirm,
    Recompute(PendingRecompute),
    Tick,
    Shutdown,
}

struct Converter {
    session: SessionState,
    debouncer: InputDebouncer<Event>,
    timestamps: TimestampTracker,
    rates: Arc<RateStore>,
    clock: Arc<dyn Clock>,
    stale_after_failures: u32,
    conversions: u64,
    view: watch::Sender<View>,
}

impl Converter {
    fn start(&mut self, events: &mpsc::UnboundedSender<Event>) {
        self.stamp();
        self.timestamps.start_periodic(events.downgrade(), Event::Tick);
        self.debouncer.schedule();
        self.publish();
    }

    async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        info!("Converter session started");
        while let Some(event) = events.recv().await {
            if !self.handle(event) {
                break;
            }
        }
        self.debouncer.cancel();
        self.timestamps.stop_periodic();
        info!("Converter session stopped");
    }

    /// Applies one event. Returns false once the session should stop.
    fn handle(&mut self, event: Event) -> bool {
        debug!(?event, "Handling converter event");
        match event {
            Event::AmountChanged(raw) => {
                self.session.set_amount_text(&raw);
                self.debouncer.schedule();
            }
            Event::FromChanged(code) => {
                self.session.set_from_code(code);
                self.debouncer.schedule();
            }
            Event::ToChanged(code) => {
                self.session.set_to_code(code);
                self.debouncer.schedule();
            }
            Event::Confirm => {
                self.debouncer.cancel();
                self.recompute(true);
                self.stamp();
            }
            Event::Recompute(token) => {
                if !self.debouncer.consume(token) {
                    return true;
                }
                self.recompute(false);
            }
            Event::Tick => self.stamp(),
            Event::Shutdown => return false,
        }
        self.publish();
        true
    }

    fn recompute(&mut self, canonicalize: bool) {
        let rates = self.rates.snapshot();
        let from = self.session.from();
        let to = self.session.to();
        let outcome = evaluate(self.session.amount_text(), from, to, &rates);
        if canonicalize {
            if let Some(amount) = outcome.canonical_amount(from) {
                self.session.set_amount_text(&amount);
            }
        }
        self.session.set_result_text(outcome.render(to));
        self.conversions += 1;
        debug!(
            amount = self.session.amount_text(),
            result = self.session.result_text(),
            "Recomputed conversion"
        );
    }

    fn stamp(&mut self) {
        self.session.mark_refreshed(self.clock.now());
    }

    fn publish(&self) {
        let last_refreshed = self
            .session
            .last_refreshed_at()
            .map_or_else(|| self.timestamps.placeholder(), |at| self.timestamps.label(at));
        self.view.send_replace(View {
            amount_text: self.session.amount_text().to_string(),
            result_text: self.session.result_text().to_string(),
            last_refreshed,
            from: self.session.from(),
            to: self.session.to(),
            rates_stale: self.rates.is_stale(self.stale_after_failures),
            conversions: self.conversions,
        });
    }
}

/// Delivers input events to a running converter session and exposes its view.
///
/// Dropping the handle ends the session.
pub struct ConverterHandle {
    events: mpsc::UnboundedSender<Event>,
    view: watch::Receiver<View>,
    task: JoinHandle<()>,
}

impl ConverterHandle {
    /// Starts a session. Must be called from within a tokio runtime.
    pub fn spawn(
        settings: ConverterSettings,
        rates: Arc<RateStore>,
        clock: Arc<dyn Clock>,
    ) -> ConverterHandle {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = SessionState::new(settings.from, settings.to);
        let timestamps =
            TimestampTracker::new(settings.utc_offset, &settings.zone_label, settings.heartbeat);
        let (view_tx, view_rx) = watch::channel(View {
            amount_text: session.amount_text().to_string(),
            result_text: session.result_text().to_string(),
            last_refreshed: timestamps.placeholder(),
            from: session.from(),
            to: session.to(),
            rates_stale: false,
            conversions: 0,
        });

        let mut converter = Converter {
            session,
            debouncer: InputDebouncer::new(
                settings.debounce,
                events_tx.downgrade(),
                Event::Recompute,
            ),
            timestamps,
            rates,
            clock,
            stale_after_failures: settings.stale_after_failures,
            conversions: 0,
            view: view_tx,
        };
        converter.start(&events_tx);
        let task = tokio::spawn(converter.run(events_rx));

        ConverterHandle {
            events: events_tx,
            view: view_rx,
            task,
        }
    }

    fn send(&self, event: Event) -> Result<()> {
        self.events
            .send(event)
            .map_err(|_| anyhow!("Converter session has stopped"))
    }

    pub fn amount_changed(&self, raw: impl Into<String>) -> Result<()> {
        self.send(Event::AmountChanged(raw.into()))
    }

    pub fn from_changed(&self, code: CurrencyCode) -> Result<()> {
        self.send(Event::FromChanged(code))
    }

    pub fn to_changed(&self, code: CurrencyCode) -> Result<()> {
        self.send(Event::ToChanged(code))
    }

    pub fn confirm(&self) -> Result<()> {
        self.send(Event::Confirm)
    }

    /// Latest published view.
    pub fn view(&self) -> View {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.clone()
    }

    pub async fn shutdown(self) {
        if self.events.send(Event::Shutdown).is_err() {
            debug!("Converter session already stopped");
        }
        if let Err(e) = self.task.await {
            warn!(error = %e, "Converter task ended abnormally");
        }
    }
}
