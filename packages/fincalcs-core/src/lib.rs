//! Fincalcs Core - Portfolio statistics over historical security prices.
//!
//! This crate provides:
//!
//! - **Time series**: Date-keyed price and return series
//! - **Securities**: Generic securities, benchmark indexes and dividend-paying stocks
//! - **Portfolios**: Share-weighted returns over a reconciled date range
//! - **Statistics**: Annualized return and volatility, max drawdown, Sharpe, Sortino, Calmar, CAGR
//!
//! # Example
//!
//! ```rust,no_run
//! use fincalcs_core::{analyze_portfolio, PortfolioRequest, SecurityStore, Settings};
//!
//! let settings = Settings::load()?;
//! let store = SecurityStore::open(&settings)?;
//!
//! let request = PortfolioRequest {
//!     tickers: vec!["GLD".to_string(), "SLV".to_string()],
//!     shares_per_ticker: [("GLD".to_string(), 10), ("SLV".to_string(), 30)].into(),
//!     initial_date: None,
//!     end_date: None,
//! };
//!
//! let stats = analyze_portfolio(&request, &store, &settings)?;
//! if let Some(sharpe) = stats.sharpe_ratio {
//!     println!("Sharpe: {:.3}", sharpe);
//! }
//! # Ok::<(), fincalcs_core::Error>(())
//! ```

use chrono::NaiveDate;

pub mod config;
pub mod portfolio;
pub mod security;
pub mod service;
pub mod store;
pub mod timeseries;
pub mod types;

// Re-export commonly used types
pub use config::Settings;
pub use portfolio::{reconcile_date_range, BenchmarkSource, DateRange, Portfolio};
pub use security::{CagrPeriod, Security, SecurityKind};
pub use store::SecurityStore;
pub use timeseries::{parse_date, TimeSeries};
pub use types::{
    ApiResponse, DatedValue, PortfolioRequest, PortfolioStatistics, SecurityRecord,
    SecurityStatistics, SecuritySummary,
};

// Re-export main functionality
pub use service::{analyze_portfolio, describe_security, list_securities};

/// Error types for fincalcs-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Malformed date: {0}")]
    MalformedDate(String),

    #[error("Duplicate date: {0}")]
    DuplicateDate(NaiveDate),

    #[error("Date {date} is not after the last date {last}")]
    OutOfOrder { date: NaiveDate, last: NaiveDate },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Not enough history for {ticker} over {period}")]
    InsufficientHistory { ticker: String, period: String },

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Invalid ticker: {0}")]
    InvalidTicker(String),

    #[error("Misaligned series: {0}")]
    MisalignedSeries(String),

    #[error("Unknown ticker: {0}")]
    UnknownTicker(String),

    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("Benchmark not found: {0}")]
    BenchmarkNotFound(String),

    #[error("No symbols to analyze")]
    EmptySymbolSet,

    #[error("Securities share no common dates")]
    NoOverlap,

    #[error("Degenerate window: {0}")]
    DegenerateWindow(String),

    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for fincalcs-core operations.
pub type Result<T> = std::result::Result<T, Error>;
