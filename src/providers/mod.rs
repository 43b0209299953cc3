pub mod currencyfreaks;

pub use currencyfreaks::CurrencyFreaksProvider;
