//! Securities: generic symbols, benchmark indexes, and dividend-paying stocks.

mod cagr;

pub use cagr::CagrPeriod;

use crate::config::Settings;
use crate::timeseries::TimeSeries;
use crate::types::SecurityRecord;
use crate::{Error, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Which kind of security a [`Security`] is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SecurityKind {
    /// Plain priced symbol
    Generic,
    /// Benchmark market index
    Index,
    /// Stock with dividends and a reference exchange
    Stock,
}

/// Variant-specific data.
#[derive(Debug, Clone, PartialEq)]
enum Variant {
    Generic,
    Index,
    Stock {
        dividends: TimeSeries,
        exchange: String,
    },
}

/// A tradable security and its price history.
///
/// Daily returns are either supplied at creation or derived from the closing
/// prices on first access and cached for the lifetime of the instance.
#[derive(Debug, Clone)]
pub struct Security {
    ticker: String,
    name: String,
    isin: Option<String>,
    closures: TimeSeries,
    first_date: NaiveDate,
    last_date: NaiveDate,
    variant: Variant,
    daily_returns: OnceLock<TimeSeries>,
}

impl Security {
    /// Build a security from a raw record.
    ///
    /// The variant is chosen as follows:
    /// - dividends and an exchange are both present: [`SecurityKind::Stock`]
    /// - the ticker is a known exchange in `settings`: [`SecurityKind::Index`]
    /// - otherwise: [`SecurityKind::Generic`]
    pub fn create(record: SecurityRecord, settings: &Settings) -> Result<Self> {
        let ticker = record.ticker.trim().to_string();
        if ticker.is_empty() {
            return Err(Error::InvalidTicker("ticker must not be empty".to_string()));
        }

        let closures = TimeSeries::build(record.closures)?;
        let (first_date, last_date) = match (closures.first_date(), closures.last_date()) {
            (Some(first), Some(last)) => (first, last),
            _ => {
                return Err(Error::InsufficientData(format!(
                    "{} has no closing prices",
                    ticker
                )))
            }
        };

        let variant = match (record.dividends, record.exchange) {
            (Some(dividends), Some(exchange)) => {
                let dividends = TimeSeries::build(dividends)?;
                if !dividends.dates().eq(closures.dates()) {
                    return Err(Error::MisalignedSeries(format!(
                        "{} dividends are not aligned with closing prices",
                        ticker
                    )));
                }
                Variant::Stock {
                    dividends,
                    exchange,
                }
            }
            (dividends, _) if settings.is_exchange(&ticker) => {
                if dividends.is_some() {
                    tracing::warn!(ticker = %ticker, "Ignoring dividends on index");
                }
                Variant::Index
            }
            (dividends, _) => {
                if dividends.is_some() {
                    tracing::warn!(ticker = %ticker, "Ignoring dividends without an exchange");
                }
                Variant::Generic
            }
        };

        let daily_returns = OnceLock::new();
        if let Some(raw) = record.daily_returns {
            let skipped = raw.values().filter(|v| v.is_none()).count();
            if skipped > 0 {
                tracing::debug!(ticker = %ticker, skipped, "Skipping undefined daily returns");
            }
            let returns = TimeSeries::build(raw.into_iter().filter_map(|(d, v)| v.map(|v| (d, v))))?;
            let _ = daily_returns.set(returns);
        }

        Ok(Self {
            ticker,
            name: record.name,
            isin: record.isin,
            closures,
            first_date,
            last_date,
            variant,
            daily_returns,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn isin(&self) -> Option<&str> {
        self.isin.as_deref()
    }

    pub fn kind(&self) -> SecurityKind {
        match self.variant {
            Variant::Generic => SecurityKind::Generic,
            Variant::Index => SecurityKind::Index,
            Variant::Stock { .. } => SecurityKind::Stock,
        }
    }

    /// Ticker of the reference market index (stocks only).
    pub fn exchange(&self) -> Option<&str> {
        match &self.variant {
            Variant::Stock { exchange, .. } => Some(exchange),
            _ => None,
        }
    }

    /// Dividends (stocks only).
    pub fn dividends(&self) -> Option<&TimeSeries> {
        match &self.variant {
            Variant::Stock { dividends, .. } => Some(dividends),
            _ => None,
        }
    }

    /// Closing prices.
    pub fn closures(&self) -> &TimeSeries {
        &self.closures
    }

    /// Date of the first closing price.
    pub fn first_date(&self) -> NaiveDate {
        self.first_date
    }

    /// Date of the last closing price.
    pub fn last_date(&self) -> NaiveDate {
        self.last_date
    }

    /// Daily returns, derived from closing prices on first access.
    ///
    /// Concurrent first accesses may each compute the series; only one result
    /// is stored and all of them are identical.
    pub fn daily_returns(&self) -> Result<&TimeSeries> {
        if let Some(returns) = self.daily_returns.get() {
            return Ok(returns);
        }

        let computed = self.closures.percent_change()?;
        tracing::debug!(ticker = %self.ticker, points = computed.len(), "Derived daily returns");
        Ok(self.daily_returns.get_or_init(|| computed))
    }

    /// Append one trading day.
    ///
    /// Stocks record `dividend` (zero when absent). A cached return series is
    /// extended with the new day's return instead of being recomputed.
    pub fn append_day(&mut self, date: NaiveDate, close: f64, dividend: Option<f64>) -> Result<()> {
        if date <= self.last_date {
            return Err(Error::OutOfOrder {
                date,
                last: self.last_date,
            });
        }

        let previous_close = self.closures.get(self.last_date).unwrap_or_default();
        let new_return = match self.daily_returns.get() {
            Some(_) if previous_close == 0.0 => {
                return Err(Error::DivisionByZero(format!(
                    "{} closed at zero on {}",
                    self.ticker, self.last_date
                )))
            }
            Some(_) => Some((close - previous_close) / previous_close),
            None => None,
        };

        self.closures.append(date, close)?;
        if let Variant::Stock { dividends, .. } = &mut self.variant {
            dividends.append(date, dividend.unwrap_or(0.0))?;
        }
        if let (Some(value), Some(returns)) = (new_return, self.daily_returns.get_mut()) {
            returns.append(date, value)?;
        }
        self.last_date = date;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use std::thread;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn closes() -> Vec<(&'static str, f64)> {
        vec![
            ("2024-01-01", 100.0),
            ("2024-01-02", 110.0),
            ("2024-01-03", 121.0),
        ]
    }

    fn dividends() -> Vec<(&'static str, f64)> {
        vec![("2024-01-01", 0.0), ("2024-01-02", 0.5), ("2024-01-03", 0.0)]
    }

    #[test]
    fn test_create_generic() {
        let record = SecurityRecord::new("AAA", "Alpha", closes());
        let security = Security::create(record, &Settings::default()).unwrap();

        assert_eq!(security.kind(), SecurityKind::Generic);
        assert_eq!(security.ticker(), "AAA");
        assert_eq!(security.exchange(), None);
        assert!(security.dividends().is_none());
        assert_eq!(security.first_date(), date("2024-01-01"));
        assert_eq!(security.last_date(), date("2024-01-03"));
    }

    #[test]
    fn test_create_stock() {
        let record = SecurityRecord::new("SAN", "Santander", closes())
            .with_isin("ES0113900J37")
            .with_dividends("^IBEX", dividends());
        let security = Security::create(record, &Settings::default()).unwrap();

        assert_eq!(security.kind(), SecurityKind::Stock);
        assert_eq!(security.exchange(), Some("^IBEX"));
        assert_eq!(security.isin(), Some("ES0113900J37"));
        assert_eq!(security.dividends().unwrap().len(), 3);
    }

    #[test]
    fn test_create_index() {
        let record = SecurityRecord::new("^GSPC", "S&P 500", closes());
        let security = Security::create(record, &Settings::default()).unwrap();
        assert_eq!(security.kind(), SecurityKind::Index);
    }

    #[test]
    fn test_dividends_without_exchange_is_generic() {
        let mut record = SecurityRecord::new("AAA", "Alpha", closes());
        record.dividends = Some(
            dividends()
                .into_iter()
                .map(|(d, v)| (d.to_string(), v))
                .collect(),
        );
        let security = Security::create(record, &Settings::default()).unwrap();
        assert_eq!(security.kind(), SecurityKind::Generic);
    }

    #[test]
    fn test_create_rejects_empty_ticker() {
        let record = SecurityRecord::new("  ", "Nothing", closes());
        let result = Security::create(record, &Settings::default());
        assert!(matches!(result, Err(Error::InvalidTicker(_))));
    }

    #[test]
    fn test_create_rejects_empty_closures() {
        let record = SecurityRecord::new("AAA", "Alpha", Vec::<(String, f64)>::new());
        let result = Security::create(record, &Settings::default());
        assert!(matches!(result, Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_create_rejects_misaligned_dividends() {
        let record = SecurityRecord::new("SAN", "Santander", closes())
            .with_dividends("^IBEX", [("2024-01-01", 0.0)]);
        let result = Security::create(record, &Settings::default());
        assert!(matches!(result, Err(Error::MisalignedSeries(_))));
    }

    #[test]
    fn test_create_rejects_malformed_date() {
        let record = SecurityRecord::new("AAA", "Alpha", [("01/02/2024", 1.0)]);
        let result = Security::create(record, &Settings::default());
        assert!(matches!(result, Err(Error::MalformedDate(_))));
    }

    #[test]
    fn test_daily_returns_derived_and_cached() {
        let security =
            Security::create(SecurityRecord::new("AAA", "Alpha", closes()), &Settings::default())
                .unwrap();

        let first = security.daily_returns().unwrap();
        let second = security.daily_returns().unwrap();

        assert!(std::ptr::eq(first, second));
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
        assert_relative_eq!(first.get(date("2024-01-02")).unwrap(), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_supplied_daily_returns_skip_nulls() {
        let record = SecurityRecord::new("AAA", "Alpha", closes()).with_daily_returns([
            ("2024-01-01", None),
            ("2024-01-02", Some(0.2)),
            ("2024-01-03", Some(-0.1)),
        ]);
        let security = Security::create(record, &Settings::default()).unwrap();
        let returns = security.daily_returns().unwrap();

        assert_eq!(returns.len(), 2);
        assert_eq!(returns.get(date("2024-01-02")), Some(0.2));
    }

    #[test]
    fn test_daily_returns_single_close() {
        let record = SecurityRecord::new("AAA", "Alpha", [("2024-01-01", 100.0)]);
        let security = Security::create(record, &Settings::default()).unwrap();
        assert!(matches!(
            security.daily_returns(),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_daily_returns_concurrent_access() {
        let security = Arc::new(
            Security::create(SecurityRecord::new("AAA", "Alpha", closes()), &Settings::default())
                .unwrap(),
        );

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let security = Arc::clone(&security);
                thread::spawn(move || security.daily_returns().unwrap().values())
            })
            .collect();

        let expected = security.daily_returns().unwrap().values();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), expected);
        }
    }

    #[test]
    fn test_append_day_extends_cached_returns() {
        let record = SecurityRecord::new("SAN", "Santander", closes())
            .with_dividends("^IBEX", dividends());
        let mut security = Security::create(record, &Settings::default()).unwrap();
        security.daily_returns().unwrap();

        security
            .append_day(date("2024-01-04"), 108.9, Some(0.25))
            .unwrap();

        assert_eq!(security.last_date(), date("2024-01-04"));
        assert_eq!(security.closures().len(), 4);
        assert_eq!(security.dividends().unwrap().get(date("2024-01-04")), Some(0.25));
        let returns = security.daily_returns().unwrap();
        assert_eq!(returns.len(), 3);
        assert_relative_eq!(returns.get(date("2024-01-04")).unwrap(), -0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_append_day_before_returns_are_derived() {
        let mut security =
            Security::create(SecurityRecord::new("AAA", "Alpha", closes()), &Settings::default())
                .unwrap();
        security.append_day(date("2024-01-04"), 133.1, None).unwrap();

        let returns = security.daily_returns().unwrap();
        assert_eq!(returns.len(), 3);
        assert_relative_eq!(returns.get(date("2024-01-04")).unwrap(), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_append_day_out_of_order() {
        let mut security =
            Security::create(SecurityRecord::new("AAA", "Alpha", closes()), &Settings::default())
                .unwrap();
        let result = security.append_day(date("2024-01-03"), 1.0, None);

        assert!(matches!(result, Err(Error::OutOfOrder { .. })));
        assert_eq!(security.closures().len(), 3);
    }
}
