use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

use crate::core::currency::CurrencyCode;

pub const API_KEY_ENV: &str = "XFX_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct CurrencyFreaksConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

impl Default for CurrencyFreaksConfig {
    fn default() -> Self {
        CurrencyFreaksConfig {
            base_url: "https://api.currencyfreaks.com".to_string(),
            api_key: None,
            timeout_secs: 5,
        }
    }
}

impl CurrencyFreaksConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct ProvidersConfig {
    pub currencyfreaks: CurrencyFreaksConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct RefreshConfig {
    pub rates_interval_secs: u64,
    pub timestamp_interval_secs: u64,
    pub debounce_ms: u64,
    /// Consecutive failed fetches after which rates are flagged stale. Zero disables.
    pub stale_after_failures: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        RefreshConfig {
            rates_interval_secs: 300,
            timestamp_interval_secs: 60,
            debounce_ms: 150,
            stale_after_failures: 3,
        }
    }
}

impl RefreshConfig {
    pub fn rates_interval(&self) -> Duration {
        Duration::from_secs(self.rates_interval_secs)
    }

    pub fn timestamp_interval(&self) -> Duration {
        Duration::from_secs(self.timestamp_interval_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    pub utc_offset_minutes: i32,
    pub zone_label: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            utc_offset_minutes: 330,
            zone_label: "IST".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DefaultsConfig {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            from: CurrencyCode::Usd,
            to: CurrencyCode::Inr,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub providers: ProvidersConfig,
    pub refresh: RefreshConfig,
    pub display: DisplayConfig,
    pub defaults: DefaultsConfig,
}

impl AppConfig {
    /// Loads the default config file, falling back to built-in defaults when
    /// it does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            debug!("No config at {}, using defaults", config_path.display());
            Self::default()
        };
        Ok(config.with_env_overrides())
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "xfx")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                debug!("Using API key from {API_KEY_ENV}");
                self.providers.currencyfreaks.api_key = Some(key.trim().to_string());
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.refresh.debounce(), Duration::from_millis(150));
        assert_eq!(config.refresh.rates_interval(), Duration::from_secs(300));
        assert_eq!(config.refresh.timestamp_interval(), Duration::from_secs(60));
        assert_eq!(config.providers.currencyfreaks.timeout(), Duration::from_secs(5));
        assert_eq!(config.defaults.from, CurrencyCode::Usd);
        assert_eq!(config.defaults.to, CurrencyCode::Inr);
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  currencyfreaks:
    base_url: "http://example.com/rates"
    api_key: "secret"
refresh:
  debounce_ms: 250
  stale_after_failures: 0
display:
  utc_offset_minutes: -300
  zone_label: "EST"
defaults:
  from: eur
  to: JPY
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        let provider = &config.providers.currencyfreaks;
        assert_eq!(provider.base_url, "http://example.com/rates");
        assert_eq!(provider.api_key.as_deref(), Some("secret"));
        assert_eq!(provider.timeout_secs, 5);
        assert_eq!(config.refresh.debounce_ms, 250);
        assert_eq!(config.refresh.rates_interval_secs, 300);
        assert_eq!(config.refresh.stale_after_failures, 0);
        assert_eq!(config.display.utc_offset_minutes, -300);
        assert_eq!(config.display.zone_label, "EST");
        assert_eq!(config.defaults.from, CurrencyCode::Eur);
        assert_eq!(config.defaults.to, CurrencyCode::Jpy);
    }

    #[test]
    fn test_unsupported_default_currency_is_rejected() {
        let result: Result<AppConfig, _> = serde_yaml::from_str("defaults:\n  from: GBP\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let result = AppConfig::load_from_path("/nonexistent/xfx/config.yaml");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
