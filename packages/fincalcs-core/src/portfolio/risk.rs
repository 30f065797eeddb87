//! Risk and return statistics over daily series.
//!
//! Provides annualized return and volatility, maximum drawdown, and the
//! Sharpe, Sortino and Calmar ratios.

use crate::timeseries::TimeSeries;
use crate::{Error, Result};

/// Average calendar days per month (365.25 / 12).
pub const DAYS_PER_MONTH: f64 = 30.4375;

/// Denominators with a magnitude below this are treated as zero.
const ZERO_TOLERANCE: f64 = 1e-12;

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Result<f64> {
    if values.is_empty() {
        return Err(Error::InsufficientData(
            "Need at least 1 observation for a mean".to_string(),
        ));
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator).
pub fn std_dev(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "Need at least 2 observations for a standard deviation, got {}",
            values.len()
        )));
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);

    Ok(variance.sqrt())
}

/// Standard deviation of all observations up to and including each date.
///
/// Dates with fewer than two observations so far are omitted.
pub fn expanding_std_dev(series: &TimeSeries) -> TimeSeries {
    let mut count = 0.0;
    let mut mean = 0.0;
    let mut m2 = 0.0;

    // Welford's online update
    series
        .iter()
        .filter_map(|(date, value)| {
            count += 1.0;
            let delta = value - mean;
            mean += delta / count;
            m2 += delta * (value - mean);

            (count >= 2.0).then(|| (date, (m2 / (count - 1.0)).sqrt()))
        })
        .collect()
}

/// Annualized volatility: `std_dev(series) * sqrt(trading_days_per_year)`.
///
/// # Arguments
///
/// * `series` - Daily returns
/// * `trading_days_per_year` - Annualization factor (typically 252)
pub fn annualized_volatility(series: &TimeSeries, trading_days_per_year: u32) -> Result<f64> {
    Ok(std_dev(&series.values())? * f64::from(trading_days_per_year).sqrt())
}

/// Annualized return of a level series (prices or a cumulative index).
///
/// The total return is measured from the first non-zero level to the last
/// level and annualized over the months elapsed between the first and last
/// observations:
///
/// `sign(1 + total) * |1 + total| ^ (12 / months) - 1`
///
/// Factoring out the sign keeps the result defined when the cumulative
/// return is below -100%.
///
/// # Errors
///
/// * [`Error::DegenerateWindow`] if no time elapses between the first and last observation
/// * [`Error::DivisionByZero`] if every level is zero
pub fn annualized_return(levels: &TimeSeries) -> Result<f64> {
    let (Some((first_date, _)), Some((last_date, last))) = (levels.first(), levels.last()) else {
        return Err(Error::DegenerateWindow(
            "no observations to annualize".to_string(),
        ));
    };

    let months_passed = (last_date - first_date).num_days() as f64 / DAYS_PER_MONTH;
    if months_passed <= 0.0 {
        return Err(Error::DegenerateWindow(format!(
            "no time elapsed between {} and {}",
            first_date, last_date
        )));
    }

    let reference = levels
        .iter()
        .map(|(_, value)| value)
        .find(|value| *value != 0.0)
        .ok_or_else(|| Error::DivisionByZero("every level is zero".to_string()))?;

    let growth = last / reference;
    Ok(growth.signum() * growth.abs().powf(12.0 / months_passed) - 1.0)
}

/// Calculate maximum drawdown of a level series.
///
/// Tracks the running high-water mark and returns the most negative
/// `level / high_water_mark - 1` (e.g., -0.15 for a 15% drawdown), or 0 if
/// the series never declines.
pub fn max_drawdown(levels: &TimeSeries) -> f64 {
    let mut high_water_mark = f64::NEG_INFINITY;
    let mut max_drawdown: f64 = 0.0;

    for (_, value) in levels.iter() {
        if value > high_water_mark {
            high_water_mark = value;
        }
        if high_water_mark > 0.0 {
            max_drawdown = max_drawdown.min(value / high_water_mark - 1.0);
        }
    }

    max_drawdown
}

/// Sharpe ratio: `(ann_return - risk_free_rate) / ann_volatility`.
///
/// # Errors
///
/// [`Error::DivisionByZero`] if `ann_volatility` is zero.
pub fn sharpe_ratio(ann_return: f64, ann_volatility: f64, risk_free_rate: f64) -> Result<f64> {
    if ann_volatility.abs() < ZERO_TOLERANCE {
        return Err(Error::DivisionByZero(
            "annualized volatility is zero".to_string(),
        ));
    }
    Ok((ann_return - risk_free_rate) / ann_volatility)
}

/// Standard deviation of the negative observations only.
///
/// Fewer than two negative observations give a deviation of zero.
pub fn downside_deviation(returns: &TimeSeries) -> f64 {
    let downside: Vec<f64> = returns
        .iter()
        .map(|(_, r)| r)
        .filter(|r| *r < 0.0)
        .collect();

    std_dev(&downside).unwrap_or(0.0)
}

/// Sortino ratio against a benchmark.
///
/// # Arguments
///
/// * `weighted_returns` - Daily returns within the analysis window
/// * `ann_return` - Annualized return of the same window
/// * `benchmark_mean_return` - Mean daily return of the benchmark
/// * `trading_days_per_year` - Annualization factor for the downside deviation
///
/// # Errors
///
/// [`Error::DivisionByZero`] if the annualized downside deviation is zero.
pub fn sortino_ratio(
    weighted_returns: &TimeSeries,
    ann_return: f64,
    benchmark_mean_return: f64,
    trading_days_per_year: u32,
) -> Result<f64> {
    let annualized_downside =
        downside_deviation(weighted_returns) * f64::from(trading_days_per_year).sqrt();

    if annualized_downside.abs() < ZERO_TOLERANCE {
        return Err(Error::DivisionByZero(
            "downside deviation is zero".to_string(),
        ));
    }
    Ok((ann_return - benchmark_mean_return) / annualized_downside)
}

/// Calmar ratio: `(ann_return - risk_free_rate) / max_drawdown`.
///
/// # Errors
///
/// [`Error::DivisionByZero`] if `max_drawdown` is zero.
pub fn calmar_ratio(ann_return: f64, max_drawdown: f64, risk_free_rate: f64) -> Result<f64> {
    if max_drawdown.abs() < ZERO_TOLERANCE {
        return Err(Error::DivisionByZero("maximum drawdown is zero".to_string()));
    }
    Ok((ann_return - risk_free_rate) / max_drawdown)
}
