use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::core::currency::CurrencyCode;

/// Snapshot of exchange rates relative to an implicit base unit.
///
/// Every rate held is positive and finite. Entries that violate this are
/// dropped on construction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    rates: HashMap<String, f64>,
}

impl RateTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rates<I, K>(rates: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        let rates = rates
            .into_iter()
            .map(|(code, rate)| (code.into(), rate))
            .filter(|(code, rate)| {
                let valid = rate.is_finite() && *rate > 0.0;
                if !valid {
                    debug!("Dropping invalid rate {} for {}", rate, code);
                }
                valid
            })
            .collect();
        Self { rates }
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    /// Rate for `code`, treating an unknown currency as already in the base unit.
    pub fn rate_or_base(&self, code: CurrencyCode) -> f64 {
        self.get(code.code()).unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// Latest successfully fetched rate table, shared between the fetcher and
/// the converter.
///
/// Readers grab an `Arc` to an immutable table, so a concurrent `replace`
/// is observed either entirely or not at all.
#[derive(Debug, Default)]
pub struct RateStore {
    current: RwLock<Arc<RateTable>>,
    consecutive_failures: AtomicU32,
}

impl RateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<RateTable> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    pub fn replace(&self, table: RateTable) {
        let table = Arc::new(table);
        debug!("Replacing rate table with {} rates", table.len());
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = table;
        self.consecutive_failures.store(0, Ordering::SeqCst);
    }

    /// Records a failed fetch. The held table is left untouched.
    pub fn record_failure(&self) -> u32 {
        self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::SeqCst)
    }

    pub fn is_stale(&self, threshold: u32) -> bool {
        threshold > 0 && self.consecutive_failures() >= threshold
    }
}
