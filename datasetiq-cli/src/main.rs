//! DataSetIQ CLI: fetch, search, and analyse series from the command line.
//!
//! Commands:
//! - `get`: fetch one series as CSV
//! - `search`: search the catalogue, JSON output
//! - `features`: series plus derived feature columns as CSV
//! - `insight`: one-line statistical summary, JSON output
//! - `ml-ready`: several series aligned, imputed and feature-engineered, CSV
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use datasetiq_core::series::parse_date;
use datasetiq_core::{
    Client, ClientConfig, FeatureMode, FeatureOptions, FeatureSet, GetOptions, ImputeStrategy,
    JoinMode, MlOptions, SeriesInput, Table,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "datasetiq",
    about = "DataSetIQ CLI: time-series fetch, features and insights"
)]
struct Cli {
    /// TOML config file. Defaults to DATASETIQ_* environment variables.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API key; overrides the config file and environment.
    #[arg(long, global = true)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch one series and print it as CSV.
    Get {
        series_id: String,

        /// Start date (YYYY-MM-DD), inclusive.
        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        /// End date (YYYY-MM-DD), inclusive.
        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,

        /// Drop observations without a value.
        #[arg(long, default_value_t = false)]
        dropna: bool,
    },
    /// Search the series catalogue.
    Search {
        query: String,

        #[arg(long, default_value_t = datasetiq_core::search::DEFAULT_LIMIT)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Print a series with derived feature columns as CSV.
    Features {
        series_id: String,

        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,

        /// Lag periods.
        #[arg(long, value_delimiter = ',', default_value = "1,3,12")]
        lags: Vec<usize>,

        /// Rolling windows.
        #[arg(long, value_delimiter = ',', default_value = "3,6,12")]
        windows: Vec<usize>,

        /// Feature families, e.g. "mom,yoy,lags". Defaults to all.
        #[arg(long)]
        include: Option<FeatureSet>,

        /// Drop rows with any undefined feature value.
        #[arg(long, default_value_t = false)]
        dropna: bool,
    },
    /// Summarize a series over a lookback window.
    Insight {
        series_id: String,

        /// Lookback such as 6m, 1y or 90d.
        #[arg(long, default_value = datasetiq_core::insight::DEFAULT_WINDOW)]
        window: String,

        /// Use the full history instead of a lookback window.
        #[arg(long, default_value_t = false, conflicts_with = "window")]
        full: bool,

        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,
    },
    /// Align several series into one model-ready table.
    MlReady {
        #[arg(required = true)]
        series_ids: Vec<String>,

        #[arg(long, value_parser = parse_date)]
        start: Option<NaiveDate>,

        #[arg(long, value_parser = parse_date)]
        end: Option<NaiveDate>,

        /// Join mode: inner or outer.
        #[arg(long, default_value = "inner")]
        align: JoinMode,

        /// Imputation steps joined by '+': ffill, bfill, median, or none.
        #[arg(long, default_value = "ffill+median")]
        impute: ImputeStrategy,

        /// Base columns only.
        #[arg(long, default_value_t = false)]
        no_features: bool,

        #[arg(long, value_delimiter = ',', default_value = "1,3,12")]
        lags: Vec<usize>,

        #[arg(long, value_delimiter = ',', default_value = "3,6,12")]
        windows: Vec<usize>,

        /// Drop rows with any remaining undefined value.
        #[arg(long, default_value_t = false)]
        dropna: bool,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let client = build_client(cli.config, cli.api_key)?;

    match cli.command {
        Commands::Get {
            series_id,
            start,
            end,
            dropna,
        } => {
            let series = client.get_with(
                &series_id,
                &GetOptions {
                    start,
                    end,
                    drop_missing: dropna,
                },
            )?;
            print_csv(&Table::from_series("value", &series))
        }
        Commands::Search {
            query,
            limit,
            offset,
        } => {
            let page = client.search(&query, limit, offset)?;
            print_json(&page)
        }
        Commands::Features {
            series_id,
            start,
            end,
            lags,
            windows,
            include,
            dropna,
        } => {
            let opts = FeatureOptions {
                lags,
                windows,
                families: include.unwrap_or_default(),
                drop_incomplete: dropna,
            };
            let table = client.add_features(&SeriesInput::Id(series_id), start, end, &opts)?;
            print_csv(&table)
        }
        Commands::Insight {
            series_id,
            window,
            full,
            start,
            end,
        } => {
            let window = (!full).then_some(window.as_str());
            let insight =
                client.get_insight(&SeriesInput::Id(series_id), window, start, end)?;
            print_json(&insight)
        }
        Commands::MlReady {
            series_ids,
            start,
            end,
            align,
            impute,
            no_features,
            lags,
            windows,
            dropna,
        } => {
            let opts = MlOptions {
                start,
                end,
                join: align,
                impute,
                features: if no_features {
                    FeatureMode::None
                } else {
                    FeatureMode::Default
                },
                lags,
                windows,
                drop_incomplete: dropna,
            };
            let table = client.get_ml_ready(&series_ids, &opts)?;
            print_csv(&table)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_client(config_path: Option<PathBuf>, api_key: Option<String>) -> Result<Client> {
    let mut config = match config_path {
        Some(path) => ClientConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ClientConfig::from_env()?,
    };
    if let Some(key) = api_key {
        config.api_key = Some(key);
    }
    tracing::debug!(
        base_url = %config.base_url,
        keyed = config.api_key.is_some(),
        max_retries = config.max_retries,
        "client configured"
    );
    Ok(Client::new(config)?)
}

fn print_csv(table: &Table) -> Result<()> {
    let stdout = std::io::stdout();
    table.write_csv(stdout.lock())?;
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}
