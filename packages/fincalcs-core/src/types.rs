//! Records exchanged with the storage and presentation layers.

use crate::security::SecurityKind;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Raw historical data for one security, keyed by date string.
///
/// Date keys use `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityRecord {
    /// Ticker symbol
    pub ticker: String,
    /// International Securities Identification Number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    /// Display name
    pub name: String,
    /// Ticker of the reference market index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    /// Closing prices
    pub closures: BTreeMap<String, f64>,
    /// Dividends paid, aligned with `closures`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dividends: Option<BTreeMap<String, f64>>,
    /// Precomputed daily returns; `null` marks an undefined return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_returns: Option<BTreeMap<String, Option<f64>>>,
}

impl SecurityRecord {
    /// Create a record with only closing prices.
    pub fn new<K: Into<String>>(
        ticker: &str,
        name: &str,
        closures: impl IntoIterator<Item = (K, f64)>,
    ) -> Self {
        Self {
            ticker: ticker.to_string(),
            isin: None,
            name: name.to_string(),
            exchange: None,
            closures: closures.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            dividends: None,
            daily_returns: None,
        }
    }

    pub fn with_isin(mut self, isin: &str) -> Self {
        self.isin = Some(isin.to_string());
        self
    }

    /// Attach dividends and a reference exchange, making this a stock record.
    pub fn with_dividends<K: Into<String>>(
        mut self,
        exchange: &str,
        dividends: impl IntoIterator<Item = (K, f64)>,
    ) -> Self {
        self.exchange = Some(exchange.to_string());
        self.dividends = Some(dividends.into_iter().map(|(k, v)| (k.into(), v)).collect());
        self
    }

    pub fn with_daily_returns<K: Into<String>>(
        mut self,
        daily_returns: impl IntoIterator<Item = (K, Option<f64>)>,
    ) -> Self {
        self.daily_returns = Some(
            daily_returns
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        );
        self
    }
}

/// Request to analyze a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioRequest {
    /// Member tickers
    pub tickers: Vec<String>,
    /// Number of shares held per ticker
    pub shares_per_ticker: BTreeMap<String, u64>,
    /// Optional start of the analysis window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_date: Option<NaiveDate>,
    /// Optional end of the analysis window
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl PortfolioRequest {
    /// Check the request shape before any data is loaded.
    pub fn validate(&self) -> Result<()> {
        if self.tickers.is_empty() {
            return Err(Error::InvalidRequest("no tickers given".to_string()));
        }
        if self.tickers.iter().any(|t| t.trim().is_empty()) {
            return Err(Error::InvalidRequest("empty ticker".to_string()));
        }

        let tickers: BTreeSet<&str> = self.tickers.iter().map(String::as_str).collect();
        let share_keys: BTreeSet<&str> = self.shares_per_ticker.keys().map(String::as_str).collect();
        if tickers != share_keys {
            return Err(Error::InvalidRequest(
                "tickers and shares_per_ticker keys should match".to_string(),
            ));
        }

        if let Some((ticker, _)) = self.shares_per_ticker.iter().find(|(_, n)| **n == 0) {
            return Err(Error::InvalidRequest(format!(
                "share count for {} must be positive",
                ticker
            )));
        }

        if let (Some(initial), Some(end)) = (self.initial_date, self.end_date) {
            if initial >= end {
                return Err(Error::InvalidRequest(
                    "initial date must be previous to end date".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Statistics computed for a portfolio over its reconciled window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PortfolioStatistics {
    /// Member tickers
    pub symbols: Vec<String>,
    /// Sum of share counts
    pub total_shares: u64,
    /// Share-count weight per ticker
    pub weights: BTreeMap<String, f64>,
    /// First date of the reconciled window
    pub first_date: NaiveDate,
    /// Last date of the reconciled window
    pub last_date: NaiveDate,
    /// Daily weighted returns
    pub returns: BTreeMap<NaiveDate, f64>,
    /// Expanding-window standard deviation of the weighted returns
    pub volatility: BTreeMap<NaiveDate, f64>,
    /// Annualized return (decimal)
    pub annualized_return: f64,
    /// Annualized volatility (decimal)
    pub annualized_volatility: f64,
    /// Maximum drawdown (zero or negative decimal)
    pub maximum_drawdown: f64,
    /// Sharpe ratio; `None` when volatility is zero
    pub sharpe_ratio: Option<f64>,
    /// Sortino ratio per benchmark ticker; `None` when downside deviation is zero
    pub sortino_ratio: BTreeMap<String, Option<f64>>,
    /// Calmar ratio; `None` when there is no drawdown
    pub calmar_ratio: Option<f64>,
}

/// Full description of a single security.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecurityStatistics {
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    pub name: String,
    pub kind: SecurityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub closures: BTreeMap<NaiveDate, f64>,
    pub daily_returns: BTreeMap<NaiveDate, f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dividends: Option<BTreeMap<NaiveDate, f64>>,
    /// CAGR per period label (`3yr`, `5yr`); periods without enough history are absent
    pub cagr: BTreeMap<String, f64>,
}

/// A dated value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DatedValue {
    pub date: NaiveDate,
    pub value: f64,
}

/// One line of a security listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SecuritySummary {
    pub ticker: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_price: Option<DatedValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_return: Option<DatedValue>,
}

/// API response wrapper for success cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
