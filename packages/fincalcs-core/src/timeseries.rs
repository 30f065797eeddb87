//! Date-indexed series of daily observations.

use crate::{Error, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// Raw date format with a time component (truncated to the date).
const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Raw date format without a time component.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a raw date key.
///
/// Accepts `YYYY-MM-DD HH:MM:SS` (the time is dropped) and `YYYY-MM-DD`.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, DATE_TIME_FORMAT) {
        return Ok(datetime.date());
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| Error::MalformedDate(raw.to_string()))
}

/// An ordered sequence of `(date, value)` observations.
///
/// Dates are unique and strictly increasing. A series only grows through
/// [`TimeSeries::append`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TimeSeries {
    points: BTreeMap<NaiveDate, f64>,
}

impl TimeSeries {
    /// Create an empty series.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a series from raw `date string -> value` entries.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedDate`] if a key matches neither accepted format
    /// * [`Error::DuplicateDate`] if two keys resolve to the same calendar date
    pub fn build<I, K>(raw: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let mut points = BTreeMap::new();
        for (key, value) in raw {
            let date = parse_date(key.as_ref())?;
            if points.insert(date, value).is_some() {
                return Err(Error::DuplicateDate(date));
            }
        }
        Ok(Self { points })
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// First observation.
    pub fn first(&self) -> Option<(NaiveDate, f64)> {
        self.points.first_key_value().map(|(d, v)| (*d, *v))
    }

    /// Last observation.
    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.points.last_key_value().map(|(d, v)| (*d, *v))
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.first().map(|(date, _)| date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.last().map(|(date, _)| date)
    }

    /// Value observed on `date`, if any.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points.get(&date).copied()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.points.contains_key(&date)
    }

    /// Iterate observations in date order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (NaiveDate, f64)> + '_ {
        self.points.iter().map(|(d, v)| (*d, *v))
    }

    pub fn dates(&self) -> impl DoubleEndedIterator<Item = NaiveDate> + '_ {
        self.points.keys().copied()
    }

    /// Values in date order.
    pub fn values(&self) -> Vec<f64> {
        self.points.values().copied().collect()
    }

    /// Observations with dates in `[start, end]`.
    ///
    /// A missing bound is unconstrained. An inverted range yields an empty series.
    pub fn slice(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Self::new();
            }
        }

        let points = self
            .points
            .iter()
            .filter(|(date, _)| start.map_or(true, |s| **date >= s))
            .filter(|(date, _)| end.map_or(true, |e| **date <= e))
            .map(|(d, v)| (*d, *v))
            .collect();

        Self { points }
    }

    /// Dates present in both series, ascending.
    pub fn intersect_dates(&self, other: &TimeSeries) -> Vec<NaiveDate> {
        self.points
            .keys()
            .filter(|date| other.points.contains_key(date))
            .copied()
            .collect()
    }

    /// Simple percentage change between consecutive observations.
    ///
    /// The result is dated by the later observation of each pair, so the first
    /// date is dropped.
    ///
    /// # Errors
    ///
    /// * [`Error::InsufficientData`] with fewer than two observations
    /// * [`Error::DivisionByZero`] if a previous value is zero
    pub fn percent_change(&self) -> Result<Self> {
        if self.points.len() < 2 {
            return Err(Error::InsufficientData(format!(
                "percent change needs at least 2 observations, got {}",
                self.points.len()
            )));
        }

        let mut points = BTreeMap::new();
        let mut previous: Option<(NaiveDate, f64)> = None;
        for (date, value) in self.iter() {
            if let Some((prev_date, prev_value)) = previous {
                if prev_value == 0.0 {
                    return Err(Error::DivisionByZero(format!(
                        "zero value on {} in percent change",
                        prev_date
                    )));
                }
                points.insert(date, (value - prev_value) / prev_value);
            }
            previous = Some((date, value));
        }

        Ok(Self { points })
    }

    /// Add one observation after the last date.
    ///
    /// # Errors
    ///
    /// [`Error::OutOfOrder`] unless `date` is strictly after the last date.
    pub fn append(&mut self, date: NaiveDate, value: f64) -> Result<()> {
        if let Some(last) = self.last_date() {
            if date <= last {
                return Err(Error::OutOfOrder { date, last });
            }
        }
        self.points.insert(date, value);
        Ok(())
    }

    /// Map of date to value, for handing to serializers.
    pub fn to_map(&self) -> BTreeMap<NaiveDate, f64> {
        self.points.clone()
    }
}

impl FromIterator<(NaiveDate, f64)> for TimeSeries {
    /// Later entries for a repeated date replace earlier ones.
    fn from_iter<T: IntoIterator<Item = (NaiveDate, f64)>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}
