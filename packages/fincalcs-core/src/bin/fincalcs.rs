//! Fincalcs CLI - Portfolio statistics from the command line.
//!
//! Every command prints an `ApiResponse` JSON envelope on stdout. Logs go to stderr.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fincalcs_core::{
    analyze_portfolio, describe_security, list_securities, parse_date, ApiResponse,
    PortfolioRequest, SecurityKind, SecurityRecord, SecurityStore, Settings,
};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "fincalcs")]
#[command(about = "Portfolio risk and return statistics")]
#[command(version)]
struct Cli {
    /// Settings file (defaults to FINCALCS_CONFIG or the user config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Security store file (overrides the configured one)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Describe one security
    Symbol {
        /// Ticker symbol
        ticker: String,
    },
    /// List stored stocks
    Stocks,
    /// List stored benchmark indexes
    Indexes,
    /// Analyze a share-weighted portfolio
    Portfolio {
        /// Tickers (comma-separated)
        #[arg(short, long)]
        tickers: String,
        /// Shares per ticker, e.g. "GLD:10,SLV:30"
        #[arg(short, long)]
        shares: String,
        /// First date of the analysis window (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        from: Option<NaiveDate>,
        /// Last date of the analysis window (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        to: Option<NaiveDate>,
    },
    /// Import raw security records from a JSON array
    Import {
        /// JSON file holding the records
        file: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            println!("{}", render(&ApiResponse::<()>::err(e.to_string())));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> fincalcs_core::Result<String> {
    let mut settings = match &cli.config {
        Some(path) => Settings::load_from_path(path)?,
        None => Settings::load()?,
    };
    if cli.store.is_some() {
        settings.store_path = cli.store;
    }
    let mut store = SecurityStore::open(&settings)?;

    let output = match cli.command {
        Commands::Symbol { ticker } => {
            render(&ApiResponse::ok(describe_security(&ticker, &store, &settings)?))
        }
        Commands::Stocks => render(&ApiResponse::ok(list_securities(
            &store,
            &settings,
            SecurityKind::Stock,
        ))),
        Commands::Indexes => render(&ApiResponse::ok(list_securities(
            &store,
            &settings,
            SecurityKind::Index,
        ))),
        Commands::Portfolio {
            tickers,
            shares,
            from,
            to,
        } => {
            let request = PortfolioRequest {
                tickers: split_list(&tickers),
                shares_per_ticker: parse_shares(&shares)?,
                initial_date: from,
                end_date: to,
            };
            render(&ApiResponse::ok(analyze_portfolio(&request, &store, &settings)?))
        }
        Commands::Import { file } => {
            let content = std::fs::read_to_string(&file)?;
            let records: Vec<SecurityRecord> = serde_json::from_str(&content)?;

            let mut added = Vec::new();
            let mut updated = Vec::new();
            for record in records {
                let ticker = record.ticker.clone();
                if store.upsert(record) {
                    updated.push(ticker);
                } else {
                    added.push(ticker);
                }
            }
            store.save()?;

            render(&ApiResponse::ok(json!({
                "added": added,
                "updated": updated,
                "total": store.len(),
            })))
        }
    };

    Ok(output)
}

fn render<T: Serialize>(response: &ApiResponse<T>) -> String {
    serde_json::to_string_pretty(response).unwrap_or_else(|e| {
        format!(r#"{{"ok":false,"error":"serialization failed: {}"}}"#, e)
    })
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    parse_date(raw).map_err(|e| e.to_string())
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_shares(raw: &str) -> fincalcs_core::Result<BTreeMap<String, u64>> {
    split_list(raw)
        .into_iter()
        .map(|entry| {
            let (ticker, count) = entry.split_once(':').ok_or_else(|| {
                fincalcs_core::Error::InvalidRequest(format!(
                    "expected TICKER:SHARES, got {}",
                    entry
                ))
            })?;
            let count = count.trim().parse::<u64>().map_err(|_| {
                fincalcs_core::Error::InvalidRequest(format!("invalid share count in {}", entry))
            })?;
            Ok((ticker.trim().to_string(), count))
        })
        .collect()
}
