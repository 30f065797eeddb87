//! Portfolio module.
//!
//! Provides share-weighted aggregation, performance analytics, and risk metrics.

mod aggregate;
mod performance;
pub mod risk;

pub use aggregate::{reconcile_date_range, DateRange, Portfolio, INDEX_BASE};
pub use performance::{sortino_ratios, BenchmarkSource};
pub use risk::{
    annualized_return, annualized_volatility, calmar_ratio, downside_deviation,
    expanding_std_dev, max_drawdown, sharpe_ratio, sortino_ratio,
};
