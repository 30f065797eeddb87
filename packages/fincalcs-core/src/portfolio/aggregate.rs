//! Share-weighted aggregation of securities over a common date range.

use super::risk;
use crate::config::Settings;
use crate::security::Security;
use crate::timeseries::TimeSeries;
use crate::{Error, Result};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Starting level of the cumulative-return index.
pub const INDEX_BASE: f64 = 100.0;

/// Trading dates shared by every member of a portfolio.
#[derive(Debug, Clone, PartialEq)]
pub struct DateRange {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    /// Common dates within `[first_date, last_date]`, ascending
    pub common_dates: Vec<NaiveDate>,
}

/// Intersect the daily-return dates of `securities`, optionally clipped.
///
/// `initial_date` and `end_date` only narrow the window, and only when they
/// fall strictly inside the intersected range; other values are ignored.
///
/// # Errors
///
/// * [`Error::EmptySymbolSet`] if `securities` is empty
/// * [`Error::NoOverlap`] if no date is shared by every security
pub fn reconcile_date_range(
    securities: &[Arc<Security>],
    initial_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<DateRange> {
    let (head, rest) = securities.split_first().ok_or(Error::EmptySymbolSet)?;

    let mut common: Vec<NaiveDate> = head.daily_returns()?.dates().collect();
    for security in rest {
        let returns = security.daily_returns()?;
        common.retain(|date| returns.contains(*date));
    }

    let (Some(&common_first), Some(&common_last)) = (common.first(), common.last()) else {
        return Err(Error::NoOverlap);
    };

    let lower = clip_bound(initial_date, common_first, common_last, common_first);
    let upper = clip_bound(end_date, common_first, common_last, common_last);
    common.retain(|date| *date >= lower && *date <= upper);

    match (common.first(), common.last()) {
        (Some(&first_date), Some(&last_date)) => {
            tracing::debug!(%first_date, %last_date, dates = common.len(), "Reconciled date range");
            Ok(DateRange {
                first_date,
                last_date,
                common_dates: common,
            })
        }
        _ => Err(Error::NoOverlap),
    }
}

fn clip_bound(
    requested: Option<NaiveDate>,
    first: NaiveDate,
    last: NaiveDate,
    fallback: NaiveDate,
) -> NaiveDate {
    match requested {
        Some(date) if date > first && date < last => date,
        Some(date) => {
            tracing::warn!(%date, %first, %last, "Ignoring clipping date outside common range");
            fallback
        }
        None => fallback,
    }
}

/// A fixed set of securities held in integer share counts.
#[derive(Debug, Clone)]
pub struct Portfolio {
    securities: Vec<Arc<Security>>,
    shares: BTreeMap<String, u64>,
    total_shares: u64,
    weights: BTreeMap<String, f64>,
    range: DateRange,
}

impl Portfolio {
    /// Create a portfolio over the reconciled date range of `securities`.
    ///
    /// # Errors
    ///
    /// * [`Error::EmptySymbolSet`] if `securities` is empty
    /// * [`Error::UnknownTicker`] if a share count names no member security
    /// * [`Error::InvalidRequest`] for duplicate members, members without a
    ///   share count, or zero total shares
    /// * any error of [`reconcile_date_range`]
    pub fn create(
        securities: Vec<Arc<Security>>,
        shares_per_ticker: BTreeMap<String, u64>,
        initial_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Self> {
        if securities.is_empty() {
            return Err(Error::EmptySymbolSet);
        }

        let mut members = BTreeSet::new();
        for security in &securities {
            if !members.insert(security.ticker()) {
                return Err(Error::InvalidRequest(format!(
                    "duplicate security {}",
                    security.ticker()
                )));
            }
        }

        if let Some(unknown) = shares_per_ticker
            .keys()
            .find(|ticker| !members.contains(ticker.as_str()))
        {
            return Err(Error::UnknownTicker(unknown.clone()));
        }
        if let Some(missing) = members
            .iter()
            .find(|ticker| !shares_per_ticker.contains_key(**ticker))
        {
            return Err(Error::InvalidRequest(format!("no share count for {}", missing)));
        }

        let total_shares = shares_per_ticker
            .values()
            .try_fold(0u64, |total, n| total.checked_add(*n))
            .ok_or_else(|| Error::InvalidRequest("total shares overflow".to_string()))?;
        if total_shares == 0 {
            return Err(Error::InvalidRequest(
                "total shares must be positive".to_string(),
            ));
        }

        let weights = shares_per_ticker
            .iter()
            .map(|(ticker, n)| (ticker.clone(), *n as f64 / total_shares as f64))
            .collect();

        let range = reconcile_date_range(&securities, initial_date, end_date)?;

        Ok(Self {
            securities,
            shares: shares_per_ticker,
            total_shares,
            weights,
            range,
        })
    }

    /// Member securities.
    pub fn securities(&self) -> &[Arc<Security>] {
        &self.securities
    }

    pub fn tickers(&self) -> Vec<String> {
        self.securities
            .iter()
            .map(|s| s.ticker().to_string())
            .collect()
    }

    pub fn shares(&self) -> &BTreeMap<String, u64> {
        &self.shares
    }

    /// Sum of all share counts.
    pub fn total_shares(&self) -> u64 {
        self.total_shares
    }

    /// Share-count weight per ticker (sums to 1).
    pub fn weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }

    pub fn date_range(&self) -> &DateRange {
        &self.range
    }

    pub fn first_date(&self) -> NaiveDate {
        self.range.first_date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.range.last_date
    }

    /// Benchmarks for Sortino: the distinct exchanges of member stocks, or
    /// the configured default benchmark when no member names one.
    pub fn benchmark_tickers(&self, settings: &Settings) -> BTreeSet<String> {
        let exchanges: BTreeSet<String> = self
            .securities
            .iter()
            .filter_map(|s| s.exchange().map(String::from))
            .collect();

        if exchanges.is_empty() {
            BTreeSet::from([settings.default_benchmark.clone()])
        } else {
            exchanges
        }
    }

    /// Weighted daily returns over `[first_date, last_date]`.
    ///
    /// Every date on which at least one member has a return is included. A
    /// member with no return on a date contributes zero for that date.
    pub fn weighted_returns(&self) -> Result<TimeSeries> {
        let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();

        for security in &self.securities {
            let weight = self.weights.get(security.ticker()).copied().unwrap_or(0.0);
            let returns = security
                .daily_returns()?
                .slice(Some(self.range.first_date), Some(self.range.last_date));

            for (date, value) in returns.iter() {
                *totals.entry(date).or_insert(0.0) += value * weight;
            }
        }

        Ok(totals.into_iter().collect())
    }

    /// Standard deviation of the weighted daily returns.
    pub fn volatility(&self) -> Result<f64> {
        risk::std_dev(&self.weighted_returns()?.values())
    }

    /// Standard deviation of the weighted returns up to each date.
    pub fn volatility_series(&self) -> Result<TimeSeries> {
        Ok(risk::expanding_std_dev(&self.weighted_returns()?))
    }

    /// Cumulative-return index over the weighted returns.
    ///
    /// The index is anchored at [`INDEX_BASE`] on the day before `first_date`,
    /// so each date's level is `INDEX_BASE * prod(1 + r)` over every weighted
    /// return up to and including that date.
    pub fn cumulative_index(&self) -> Result<TimeSeries> {
        let returns = self.weighted_returns()?;
        let anchor = self.range.first_date.pred_opt().ok_or_else(|| {
            Error::DegenerateWindow(format!("no day before {}", self.range.first_date))
        })?;

        let mut level = INDEX_BASE;
        let mut index = TimeSeries::new();
        index.append(anchor, level)?;

        for (date, value) in returns.iter() {
            level *= 1.0 + value;
            index.append(date, level)?;
        }

        Ok(index)
    }

    /// Maximum drawdown of the cumulative index (zero or negative).
    pub fn drawdown(&self) -> Result<f64> {
        Ok(risk::max_drawdown(&self.cumulative_index()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SecurityRecord;
    use approx::assert_relative_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn security(ticker: &str, closures: &[(&str, f64)]) -> Arc<Security> {
        Arc::new(
            Security::create(
                SecurityRecord::new(ticker, ticker, closures.iter().copied()),
                &Settings::default(),
            )
            .unwrap(),
        )
    }

    fn shares(entries: &[(&str, u64)]) -> BTreeMap<String, u64> {
        entries
            .iter()
            .map(|(t, n)| (t.to_string(), *n))
            .collect()
    }

    fn pair() -> Vec<Arc<Security>> {
        vec![
            security(
                "A",
                &[("2024-01-01", 100.0), ("2024-01-02", 110.0), ("2024-01-03", 121.0)],
            ),
            security(
                "B",
                &[("2024-01-01", 50.0), ("2024-01-02", 55.0), ("2024-01-03", 60.5)],
            ),
        ]
    }

    #[test]
    fn test_equal_weight_example() {
        let portfolio =
            Portfolio::create(pair(), shares(&[("A", 1), ("B", 1)]), None, None).unwrap();

        assert_eq!(portfolio.total_shares(), 2);
        assert_relative_eq!(portfolio.weights()["A"], 0.5);
        assert_relative_eq!(portfolio.weights()["B"], 0.5);

        let returns = portfolio.weighted_returns().unwrap();
        assert_eq!(returns.len(), 2);
        assert_relative_eq!(returns.get(date("2024-01-02")).unwrap(), 0.10, epsilon = 1e-12);
        assert_relative_eq!(returns.get(date("2024-01-03")).unwrap(), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_weights_sum_to_one() {
        let securities = vec![
            security("A", &[("2024-01-01", 1.0), ("2024-01-02", 2.0)]),
            security("B", &[("2024-01-01", 1.0), ("2024-01-02", 2.0)]),
            security("C", &[("2024-01-01", 1.0), ("2024-01-02", 2.0)]),
        ];
        let portfolio =
            Portfolio::create(securities, shares(&[("A", 7), ("B", 3), ("C", 11)]), None, None)
                .unwrap();

        let sum: f64 = portfolio.weights().values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_relative_eq!(portfolio.weights()["C"], 11.0 / 21.0);
    }

    #[test]
    fn test_create_empty() {
        let result = Portfolio::create(vec![], BTreeMap::new(), None, None);
        assert!(matches!(result, Err(Error::EmptySymbolSet)));
    }

    #[test]
    fn test_create_unknown_ticker() {
        let result = Portfolio::create(pair(), shares(&[("A", 1), ("B", 1), ("Z", 1)]), None, None);
        assert!(matches!(result, Err(Error::UnknownTicker(t)) if t == "Z"));
    }

    #[test]
    fn test_create_missing_share_count() {
        let result = Portfolio::create(pair(), shares(&[("A", 1)]), None, None);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_create_zero_total_shares() {
        let result = Portfolio::create(pair(), shares(&[("A", 0), ("B", 0)]), None, None);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_create_duplicate_security() {
        let a = security("A", &[("2024-01-01", 1.0), ("2024-01-02", 2.0)]);
        let result = Portfolio::create(vec![a.clone(), a], shares(&[("A", 1)]), None, None);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_reconcile_intersects_calendars() {
        // B misses 2024-01-03 (holiday) and starts a day later
        let securities = vec![
            security(
                "A",
                &[
                    ("2024-01-01", 10.0),
                    ("2024-01-02", 11.0),
                    ("2024-01-03", 12.0),
                    ("2024-01-04", 13.0),
                    ("2024-01-05", 14.0),
                ],
            ),
            security(
                "B",
                &[
                    ("2024-01-02", 20.0),
                    ("2024-01-03", 21.0),
                    ("2024-01-05", 22.0),
                ],
            ),
        ];

        let range = reconcile_date_range(&securities, None, None).unwrap();
        assert_eq!(range.common_dates, vec![date("2024-01-03"), date("2024-01-05")]);
        assert_eq!(range.first_date, date("2024-01-03"));
        assert_eq!(range.last_date, date("2024-01-05"));
    }

    #[test]
    fn test_missing_dates_contribute_zero() {
        let securities = vec![
            security(
                "A",
                &[
                    ("2024-01-01", 100.0),
                    ("2024-01-02", 110.0),
                    ("2024-01-03", 121.0),
                    ("2024-01-04", 133.1),
                ],
            ),
            security(
                "B",
                &[("2024-01-01", 50.0), ("2024-01-02", 55.0), ("2024-01-04", 60.5)],
            ),
        ];
        let portfolio =
            Portfolio::create(securities, shares(&[("A", 1), ("B", 1)]), None, None).unwrap();
        let returns = portfolio.weighted_returns().unwrap();

        // Only A trades on 2024-01-03
        assert_relative_eq!(returns.get(date("2024-01-03")).unwrap(), 0.05, epsilon = 1e-12);
        assert_relative_eq!(returns.get(date("2024-01-04")).unwrap(), 0.10, epsilon = 1e-12);
    }

    #[test]
    fn test_reconcile_clipping_only_narrows() {
        let closes: Vec<(&str, f64)> = vec![
            ("2024-01-01", 1.0),
            ("2024-01-02", 1.1),
            ("2024-01-03", 1.2),
            ("2024-01-04", 1.3),
            ("2024-01-05", 1.4),
        ];
        let securities = vec![security("A", &closes), security("B", &closes)];

        let clipped = reconcile_date_range(
            &securities,
            Some(date("2024-01-03")),
            Some(date("2024-01-04")),
        )
        .unwrap();
        assert_eq!(clipped.first_date, date("2024-01-03"));
        assert_eq!(clipped.last_date, date("2024-01-04"));

        // Out-of-range bounds are ignored rather than extending the window
        let wide = reconcile_date_range(
            &securities,
            Some(date("2023-06-01")),
            Some(date("2025-01-01")),
        )
        .unwrap();
        assert_eq!(wide.first_date, date("2024-01-02"));
        assert_eq!(wide.last_date, date("2024-01-05"));
    }

    #[test]
    fn test_reconcile_no_overlap() {
        let securities = vec![
            security("A", &[("2024-01-01", 1.0), ("2024-01-02", 2.0)]),
            security("B", &[("2024-02-01", 1.0), ("2024-02-02", 2.0)]),
        ];
        let result = reconcile_date_range(&securities, None, None);
        assert!(matches!(result, Err(Error::NoOverlap)));
    }

    #[test]
    fn test_volatility() {
        let securities = vec![security(
            "A",
            &[
                ("2024-01-01", 100.0),
                ("2024-01-02", 110.0),
                ("2024-01-03", 99.0),
                ("2024-01-04", 108.9),
            ],
        )];
        let portfolio = Portfolio::create(securities, shares(&[("A", 5)]), None, None).unwrap();

        // returns: 0.10, -0.10, 0.10
        let mean: f64 = 0.1 / 3.0;
        let var = ((0.1 - mean).powi(2) * 2.0 + (-0.1 - mean).powi(2)) / 2.0;
        assert_relative_eq!(portfolio.volatility().unwrap(), var.sqrt(), epsilon = 1e-12);

        let series = portfolio.volatility_series().unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.last_date(), Some(date("2024-01-04")));
    }

    #[test]
    fn test_drawdown() {
        let securities = vec![security(
            "A",
            &[
                ("2024-01-01", 100.0),
                ("2024-01-02", 100.0),
                ("2024-01-03", 120.0),
                ("2024-01-04", 90.0),
                ("2024-01-05", 130.0),
            ],
        )];
        let portfolio = Portfolio::create(securities, shares(&[("A", 1)]), None, None).unwrap();

        let index = portfolio.cumulative_index().unwrap();
        assert_eq!(index.first(), Some((date("2024-01-01"), INDEX_BASE)));
        assert_relative_eq!(index.get(date("2024-01-03")).unwrap(), 120.0, epsilon = 1e-9);

        // Peak 120 then trough 90: 90 / 120 - 1
        assert_relative_eq!(portfolio.drawdown().unwrap(), -0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_first_return_enters_index() {
        let securities = vec![security(
            "A",
            &[("2024-01-01", 100.0), ("2024-01-02", 80.0), ("2024-01-03", 80.0)],
        )];
        let portfolio = Portfolio::create(securities, shares(&[("A", 1)]), None, None).unwrap();

        let index = portfolio.cumulative_index().unwrap();
        assert_eq!(index.len(), 3);
        assert_relative_eq!(index.get(date("2024-01-02")).unwrap(), 80.0, epsilon = 1e-9);
        assert_relative_eq!(index.get(date("2024-01-03")).unwrap(), 80.0, epsilon = 1e-9);

        assert_relative_eq!(portfolio.drawdown().unwrap(), -0.20, epsilon = 1e-12);
    }

    #[test]
    fn test_cumulative_index_compounds_every_return() {
        let portfolio =
            Portfolio::create(pair(), shares(&[("A", 1), ("B", 1)]), None, None).unwrap();
        let index = portfolio.cumulative_index().unwrap();

        // Two weighted returns of 10%
        assert_relative_eq!(index.last().unwrap().1, INDEX_BASE * 1.1 * 1.1, epsilon = 1e-9);
    }

    #[test]
    fn test_create_total_shares_overflow() {
        let result = Portfolio::create(pair(), shares(&[("A", u64::MAX), ("B", 1)]), None, None);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_drawdown_zero_for_rising_index() {
        let portfolio = Portfolio::create(pair(), shares(&[("A", 2), ("B", 1)]), None, None).unwrap();
        assert_eq!(portfolio.drawdown().unwrap(), 0.0);
    }

    #[test]
    fn test_benchmark_tickers() {
        let settings = Settings::default();
        let portfolio = Portfolio::create(pair(), shares(&[("A", 1), ("B", 1)]), None, None).unwrap();
        assert_eq!(
            portfolio.benchmark_tickers(&settings),
            BTreeSet::from(["^GSPC".to_string()])
        );

        let stock = |ticker: &str, exchange: &str| {
            Arc::new(
                Security::create(
                    SecurityRecord::new(ticker, ticker, [("2024-01-01", 1.0), ("2024-01-02", 2.0)])
                        .with_dividends(exchange, [("2024-01-01", 0.0), ("2024-01-02", 0.0)]),
                    &settings,
                )
                .unwrap(),
            )
        };
        let portfolio = Portfolio::create(
            vec![stock("SAN", "^IBEX"), stock("BBVA", "^IBEX"), stock("AAPL", "^IXIC")],
            shares(&[("SAN", 1), ("BBVA", 1), ("AAPL", 1)]),
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            portfolio.benchmark_tickers(&settings),
            BTreeSet::from(["^IBEX".to_string(), "^IXIC".to_string()])
        );
    }
}
