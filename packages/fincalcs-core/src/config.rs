//! Analysis settings.
//!
//! Settings are read from a TOML file and passed explicitly to every
//! statistics call.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Process-wide analysis parameters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Annual risk-free rate (e.g., 0.02 for 2%)
    pub risk_free_rate: f64,
    /// Trading days used to annualize daily statistics
    pub trading_days_per_year: u32,
    /// Tickers of the known benchmark indexes
    pub exchanges: Vec<String>,
    /// Benchmark used for Sortino when no security names an exchange
    pub default_benchmark: String,
    /// Security store location (falls back to `SecurityStore::default_path`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.02,
            trading_days_per_year: 252,
            exchanges: ["^GSPC", "^IBEX", "^IXIC", "^DJI", "^STOXX50E"]
                .into_iter()
                .map(String::from)
                .collect(),
            default_benchmark: "^GSPC".to_string(),
            store_path: None,
        }
    }
}

impl Settings {
    /// Get the default settings file path.
    ///
    /// Default path: `<config dir>/fincalcs/config.toml`
    /// Can be overridden with `FINCALCS_CONFIG` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("FINCALCS_CONFIG") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join("fincalcs/config.toml"))
            .unwrap_or_else(|| PathBuf::from("fincalcs.toml"))
    }

    /// Load settings from the default path.
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    /// Load settings from a specific path. A missing file yields defaults.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let settings: Self = toml::from_str(&content)?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Whether `ticker` is one of the known benchmark indexes.
    pub fn is_exchange(&self, ticker: &str) -> bool {
        self.exchanges.iter().any(|e| e == ticker)
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
