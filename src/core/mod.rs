//! Core conversion engine and its collaborators

pub mod config;
pub mod convert;
pub mod currency;
pub mod debounce;
pub mod fetcher;
pub mod log;
pub mod rates;
pub mod session;
pub mod timestamp;

// Re-export main types for cleaner imports
pub use currency::{CurrencyCode, RateProvider};
pub use rates::{RateStore, RateTable};
