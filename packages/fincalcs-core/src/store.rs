//! Raw security record storage and persistence.

use crate::config::Settings;
use crate::security::Security;
use crate::types::SecurityRecord;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Security records keyed by ticker, persisted as JSON.
#[derive(Debug)]
pub struct SecurityStore {
    /// Path to the store JSON file
    path: PathBuf,
    /// In-memory records
    records: BTreeMap<String, SecurityRecord>,
}

impl SecurityStore {
    /// Open the store at the path configured in `settings`, or the default path.
    pub fn open(settings: &Settings) -> Result<Self> {
        let path = settings
            .store_path
            .clone()
            .unwrap_or_else(Self::default_path);
        Self::with_path(path)
    }

    /// Open a store backed by `path`. A missing file yields an empty store.
    pub fn with_path(path: PathBuf) -> Result<Self> {
        let records = Self::load_from_path(&path)?;
        Ok(Self { path, records })
    }

    /// Create an in-memory store (no persistence).
    pub fn in_memory() -> Self {
        Self {
            path: PathBuf::new(),
            records: BTreeMap::new(),
        }
    }

    /// Get the default store file path.
    ///
    /// Default path: `~/.fincalcs/securities.json`
    /// Can be overridden with `FINCALCS_STORE_FILE` environment variable.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = env::var("FINCALCS_STORE_FILE") {
            return PathBuf::from(path);
        }

        directories::BaseDirs::new()
            .map(|dirs| dirs.home_dir().join(".fincalcs/securities.json"))
            .unwrap_or_else(|| PathBuf::from("securities.json"))
    }

    /// Get the current path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_from_path(path: &Path) -> Result<BTreeMap<String, SecurityRecord>> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = fs::read_to_string(path)?;
        let data: serde_json::Value = serde_json::from_str(&content)?;

        // Accept a plain list of records as well as the ticker map
        if data.is_array() {
            let records: Vec<SecurityRecord> = serde_json::from_value(data)?;
            return Ok(records
                .into_iter()
                .map(|r| (r.ticker.clone(), r))
                .collect());
        }

        Ok(serde_json::from_value(data)?)
    }

    /// Save the records to disk.
    pub fn save(&self) -> Result<()> {
        // Skip if in-memory only
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(&self.records)?;
        fs::write(&self.path, content)?;
        tracing::info!(path = %self.path.display(), records = self.records.len(), "Saved security store");
        Ok(())
    }

    /// Reload the records from disk.
    pub fn reload(&mut self) -> Result<()> {
        self.records = Self::load_from_path(&self.path)?;
        Ok(())
    }

    /// Insert or replace a record. Returns whether a record was replaced.
    pub fn upsert(&mut self, record: SecurityRecord) -> bool {
        let ticker = record.ticker.trim().to_string();
        self.records.insert(ticker, record).is_some()
    }

    /// Remove a record.
    pub fn remove(&mut self, ticker: &str) -> Result<SecurityRecord> {
        self.records
            .remove(ticker)
            .ok_or_else(|| Error::SymbolNotFound(ticker.to_string()))
    }

    pub fn get(&self, ticker: &str) -> Option<&SecurityRecord> {
        self.records.get(ticker)
    }

    /// Records for `tickers`, in request order. Unknown tickers are skipped.
    pub fn get_many(&self, tickers: &[String]) -> Vec<&SecurityRecord> {
        tickers
            .iter()
            .filter_map(|ticker| {
                let record = self.records.get(ticker);
                if record.is_none() {
                    tracing::warn!(ticker = %ticker, "Security not found in store");
                }
                record
            })
            .collect()
    }

    /// All records.
    pub fn records(&self) -> impl Iterator<Item = &SecurityRecord> {
        self.records.values()
    }

    /// Records that describe stocks (dividends and an exchange).
    pub fn stocks(&self) -> Vec<&SecurityRecord> {
        self.records
            .values()
            .filter(|r| r.dividends.is_some() && r.exchange.is_some())
            .collect()
    }

    /// Records of the known benchmark indexes.
    pub fn indexes(&self, settings: &Settings) -> Vec<&SecurityRecord> {
        self.records
            .values()
            .filter(|r| settings.is_exchange(&r.ticker))
            .collect()
    }

    /// Build the domain security for `ticker`.
    pub fn security(&self, ticker: &str, settings: &Settings) -> Result<Security> {
        let record = self
            .get(ticker)
            .ok_or_else(|| Error::SymbolNotFound(ticker.to_string()))?;
        Security::create(record.clone(), settings)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
