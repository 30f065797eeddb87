//! Request handling over the security store.

use crate::config::Settings;
use crate::portfolio::Portfolio;
use crate::security::{CagrPeriod, Security, SecurityKind};
use crate::store::SecurityStore;
use crate::types::{
    DatedValue, PortfolioRequest, PortfolioStatistics, SecurityStatistics, SecuritySummary,
};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Analyze the portfolio described by `request`.
///
/// # Errors
///
/// * [`Error::InvalidRequest`] if the request is malformed
/// * [`Error::InvalidTicker`] if a requested ticker is a benchmark index
/// * [`Error::EmptySymbolSet`] if none of the tickers is stored
/// * [`Error::UnknownTicker`] if only some of them are stored
/// * [`Error::BenchmarkNotFound`] if a Sortino benchmark is not stored
pub fn analyze_portfolio(
    request: &PortfolioRequest,
    store: &SecurityStore,
    settings: &Settings,
) -> Result<PortfolioStatistics> {
    request.validate()?;

    if let Some(index) = request.tickers.iter().find(|t| settings.is_exchange(t)) {
        return Err(Error::InvalidTicker(format!(
            "{} is a benchmark index",
            index
        )));
    }

    let records = store.get_many(&request.tickers);
    if records.is_empty() {
        return Err(Error::EmptySymbolSet);
    }

    let securities = records
        .into_iter()
        .map(|record| Security::create(record.clone(), settings).map(Arc::new))
        .collect::<Result<Vec<_>>>()?;

    let portfolio = Portfolio::create(
        securities,
        request.shares_per_ticker.clone(),
        request.initial_date,
        request.end_date,
    )?;

    let mut benchmarks = BTreeMap::new();
    for ticker in portfolio.benchmark_tickers(settings) {
        let benchmark = store.security(&ticker, settings).map_err(|e| match e {
            Error::SymbolNotFound(t) => Error::BenchmarkNotFound(t),
            other => other,
        })?;
        benchmarks.insert(ticker, Arc::new(benchmark));
    }

    PortfolioStatistics::compute(&portfolio, &benchmarks, settings)
}

/// Describe one stored security, including its CAGR.
///
/// CAGR periods without enough history are left out.
pub fn describe_security(
    ticker: &str,
    store: &SecurityStore,
    settings: &Settings,
) -> Result<SecurityStatistics> {
    let security = store.security(ticker, settings)?;

    let mut cagr = BTreeMap::new();
    for period in CagrPeriod::ALL {
        match security.cagr(period) {
            Ok(value) => {
                cagr.insert(period.label().to_string(), value);
            }
            Err(Error::InsufficientHistory { .. }) => {
                tracing::debug!(ticker, %period, "Not enough history for CAGR");
            }
            Err(e) => return Err(e),
        }
    }

    let daily_returns = match security.daily_returns() {
        Ok(returns) => returns.to_map(),
        Err(Error::InsufficientData(_)) => BTreeMap::new(),
        Err(e) => return Err(e),
    };

    Ok(SecurityStatistics {
        ticker: security.ticker().to_string(),
        isin: security.isin().map(String::from),
        name: security.name().to_string(),
        kind: security.kind(),
        exchange: security.exchange().map(String::from),
        first_date: security.first_date(),
        last_date: security.last_date(),
        closures: security.closures().to_map(),
        daily_returns,
        dividends: security.dividends().map(|d| d.to_map()),
        cagr,
    })
}

/// Summaries of the stored securities of one kind.
///
/// Records that fail to parse are logged and skipped.
pub fn list_securities(
    store: &SecurityStore,
    settings: &Settings,
    kind: SecurityKind,
) -> Vec<SecuritySummary> {
    store
        .records()
        .filter_map(|record| match Security::create(record.clone(), settings) {
            Ok(security) => Some(security),
            Err(e) => {
                tracing::warn!(ticker = %record.ticker, error = %e, "Skipping unreadable record");
                None
            }
        })
        .filter(|security| security.kind() == kind)
        .map(|security| summarize(&security))
        .collect()
}

fn summarize(security: &Security) -> SecuritySummary {
    let last_price = security
        .closures()
        .last()
        .map(|(date, value)| DatedValue { date, value });
    let last_return = security
        .daily_returns()
        .ok()
        .and_then(|returns| returns.last())
        .map(|(date, value)| DatedValue { date, value });

    SecuritySummary {
        ticker: security.ticker().to_string(),
        isin: security.isin().map(String::from),
        name: security.name().to_string(),
        exchange: security.exchange().map(String::from),
        last_price,
        last_return,
    }
}
