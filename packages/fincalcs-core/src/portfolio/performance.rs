//! Portfolio performance analytics.

use super::aggregate::Portfolio;
use super::risk;
use crate::config::Settings;
use crate::security::Security;
use crate::types::PortfolioStatistics;
use crate::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Lookup of benchmark index securities by ticker.
pub trait BenchmarkSource {
    fn benchmark(&self, ticker: &str) -> Option<Arc<Security>>;
}

impl BenchmarkSource for HashMap<String, Arc<Security>> {
    fn benchmark(&self, ticker: &str) -> Option<Arc<Security>> {
        self.get(ticker).cloned()
    }
}

impl BenchmarkSource for BTreeMap<String, Arc<Security>> {
    fn benchmark(&self, ticker: &str) -> Option<Arc<Security>> {
        self.get(ticker).cloned()
    }
}

/// Sortino ratio against every benchmark of `portfolio`.
///
/// Each benchmark contributes its mean daily return over its whole history.
/// A ratio is `None` when the downside deviation is zero.
pub fn sortino_ratios<B>(
    portfolio: &Portfolio,
    ann_return: f64,
    benchmarks: &B,
    settings: &Settings,
) -> Result<BTreeMap<String, Option<f64>>>
where
    B: BenchmarkSource + ?Sized,
{
    let weighted_returns = portfolio.weighted_returns()?;
    let mut ratios = BTreeMap::new();

    for ticker in portfolio.benchmark_tickers(settings) {
        let benchmark = benchmarks
            .benchmark(&ticker)
            .ok_or_else(|| Error::BenchmarkNotFound(ticker.clone()))?;
        let benchmark_mean = risk::mean(&benchmark.daily_returns()?.values())?;

        let ratio = defined(
            "sortino",
            risk::sortino_ratio(
                &weighted_returns,
                ann_return,
                benchmark_mean,
                settings.trading_days_per_year,
            ),
        )?;
        ratios.insert(ticker, ratio);
    }

    Ok(ratios)
}

/// Map a zero denominator to an undefined ratio.
fn defined(ratio: &str, value: Result<f64>) -> Result<Option<f64>> {
    match value {
        Ok(value) => Ok(Some(value)),
        Err(Error::DivisionByZero(reason)) => {
            tracing::warn!(ratio, %reason, "Ratio is undefined");
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

impl PortfolioStatistics {
    /// Calculate the full statistics bundle for a portfolio.
    ///
    /// Ratios whose denominator is zero are reported as `None`.
    pub fn compute<B>(portfolio: &Portfolio, benchmarks: &B, settings: &Settings) -> Result<Self>
    where
        B: BenchmarkSource + ?Sized,
    {
        let weighted_returns = portfolio.weighted_returns()?;
        let index = portfolio.cumulative_index()?;

        let annualized_return = risk::annualized_return(&index)?;
        let annualized_volatility =
            risk::annualized_volatility(&weighted_returns, settings.trading_days_per_year)?;
        let maximum_drawdown = risk::max_drawdown(&index);

        let sharpe_ratio = defined(
            "sharpe",
            risk::sharpe_ratio(
                annualized_return,
                annualized_volatility,
                settings.risk_free_rate,
            ),
        )?;
        let sortino_ratio = sortino_ratios(portfolio, annualized_return, benchmarks, settings)?;
        let calmar_ratio = defined(
            "calmar",
            risk::calmar_ratio(annualized_return, maximum_drawdown, settings.risk_free_rate),
        )?;

        tracing::info!(
            symbols = ?portfolio.tickers(),
            first_date = %portfolio.first_date(),
            last_date = %portfolio.last_date(),
            annualized_return,
            annualized_volatility,
            "Computed portfolio statistics"
        );

        Ok(Self {
            symbols: portfolio.tickers(),
            total_shares: portfolio.total_shares(),
            weights: portfolio.weights().clone(),
            first_date: portfolio.first_date(),
            last_date: portfolio.last_date(),
            returns: weighted_returns.to_map(),
            volatility: risk::expanding_std_dev(&weighted_returns).to_map(),
            annualized_return,
            annualized_volatility,
            maximum_drawdown,
            sharpe_ratio,
            sortino_ratio,
            calmar_ratio,
        })
    }
}
