//! Compound annual growth rate.

use super::Security;
use crate::{Error, Result};
use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Look-back period for CAGR.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CagrPeriod {
    #[serde(rename = "3yr")]
    ThreeYears,
    #[serde(rename = "5yr")]
    FiveYears,
}

impl CagrPeriod {
    /// All supported periods.
    pub const ALL: [CagrPeriod; 2] = [CagrPeriod::ThreeYears, CagrPeriod::FiveYears];

    pub fn years(self) -> u32 {
        match self {
            CagrPeriod::ThreeYears => 3,
            CagrPeriod::FiveYears => 5,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CagrPeriod::ThreeYears => "3yr",
            CagrPeriod::FiveYears => "5yr",
        }
    }
}

impl fmt::Display for CagrPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CagrPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "3yr" => Ok(CagrPeriod::ThreeYears),
            "5yr" => Ok(CagrPeriod::FiveYears),
            other => Err(Error::InvalidPeriod(other.to_string())),
        }
    }
}

impl Security {
    /// Compound annual growth rate over the last `period`.
    ///
    /// The window starts `N` years before the last close (Feb 29 clamps to
    /// Feb 28) and includes every close on or after that date:
    ///
    /// `sign(g) * |g| ^ (1 / N) - 1` with `g = last_close / first_close_in_window`
    ///
    /// # Errors
    ///
    /// * [`Error::InsufficientHistory`] if the window holds fewer than two closes
    /// * [`Error::DivisionByZero`] if the first close in the window is zero
    pub fn cagr(&self, period: CagrPeriod) -> Result<f64> {
        let years = period.years();
        let today = self.last_date();
        let window_start = today
            .checked_sub_months(Months::new(12 * years))
            .unwrap_or(NaiveDate::MIN);

        let window = self.closures().slice(Some(window_start), None);
        let (first, last) = match (window.first(), window.last()) {
            (Some(first), Some(last)) if window.len() >= 2 => (first, last),
            _ => {
                return Err(Error::InsufficientHistory {
                    ticker: self.ticker().to_string(),
                    period: period.label().to_string(),
                })
            }
        };

        if first.1 == 0.0 {
            return Err(Error::DivisionByZero(format!(
                "{} closed at zero on {}",
                self.ticker(),
                first.0
            )));
        }

        let growth = last.1 / first.1;
        Ok(growth.signum() * growth.abs().powf(1.0 / f64::from(years)) - 1.0)
    }
}
