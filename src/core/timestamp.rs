//! "Last refreshed" marker rendered in a fixed display time zone.

use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc::WeakUnboundedSender;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::core::convert::EMPTY_PLACEHOLDER;

const LABEL_PREFIX: &str = "Last refreshed:";
const DISPLAY_FORMAT: &str = "%d %b %Y, %H:%M:%S";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = at;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Renders refresh instants and drives the periodic heartbeat.
pub struct TimestampTracker {
    offset: FixedOffset,
    zone_label: String,
    interval: Duration,
    ticker: Option<JoinHandle<()>>,
}

impl TimestampTracker {
    pub fn new(offset: FixedOffset, zone_label: &str, interval: Duration) -> Self {
        Self {
            offset,
            zone_label: zone_label.to_string(),
            interval,
            ticker: None,
        }
    }

    /// Label shown before the first stamp.
    pub fn placeholder(&self) -> String {
        format!("{LABEL_PREFIX} {EMPTY_PLACEHOLDER} {}", self.zone_label)
    }

    pub fn label(&self, at: DateTime<Utc>) -> String {
        let local = at.with_timezone(&self.offset);
        format!(
            "{LABEL_PREFIX} {} {}",
            local.format(DISPLAY_FORMAT),
            self.zone_label
        )
    }

    /// (Re)starts the heartbeat, sending `event` once per interval.
    ///
    /// The first tick arrives one full interval after this call; callers stamp
    /// immediately themselves.
    pub fn start_periodic<E>(&mut self, notify: WeakUnboundedSender<E>, event: E)
    where
        E: Clone + Send + 'static,
    {
        self.stop_periodic();
        let interval = self.interval;
        self.ticker = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                let Some(sender) = notify.upgrade() else {
                    break;
                };
                if sender.send(event.clone()).is_err() {
                    break;
                }
            }
        }));
        debug!("Started timestamp heartbeat every {:?}", interval);
    }

    pub fn stop_periodic(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
            debug!("Stopped timestamp heartbeat");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.is_some()
    }
}

impl Drop for TimestampTracker {
    fn drop(&mut self) {
        self.stop_periodic();
    }
}

/// Parses a UTC offset given in minutes east of UTC.
pub fn offset_from_minutes(minutes: i32) -> Option<FixedOffset> {
    FixedOffset::east_opt(minutes.checked_mul(60)?)
}
