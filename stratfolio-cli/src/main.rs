//! Stratfolio CLI: strategy listing and capital allocation.
//!
//! Commands:
//! - `strategies`: list the strategy catalog
//! - `allocate`: split capital across the tickers of one or two strategies

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stratfolio_core::data::{
    CircuitBreaker, CsvProvider, MarketDataProvider, SyntheticProvider, YahooProvider,
};
use stratfolio_core::{AllocatorConfig, StrategyCatalog};
use stratfolio_runner::{
    render_catalog, render_details, render_summary, run_allocation, save_artifacts,
    AllocationRequest,
};

#[derive(Parser)]
#[command(
    name = "stratfolio",
    version,
    about = "Stratfolio: split capital across investment strategies"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Source {
    /// Yahoo Finance over HTTP.
    Yahoo,
    /// A directory of <TICKER>.csv files.
    Csv,
    /// Deterministic random walk (demo only).
    Synthetic,
}

#[derive(Subcommand)]
enum Commands {
    /// List strategies and their tickers.
    Strategies {
        /// Strategy catalog TOML. Defaults to the built-in catalog.
        #[arg(long)]
        catalog: Option<PathBuf>,
    },
    /// Allocate capital across the tickers of the selected strategies.
    Allocate {
        /// Total capital in dollars.
        #[arg(long)]
        capital: f64,

        /// Strategy name (repeat for a second strategy).
        #[arg(long = "strategy", short = 's', required = true)]
        strategies: Vec<String>,

        /// Allocator config TOML.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Strategy catalog TOML. Defaults to the built-in catalog.
        #[arg(long)]
        catalog: Option<PathBuf>,

        /// Minimum weight per ticker (overrides config).
        #[arg(long)]
        floor: Option<f64>,

        /// Trading days of history to score (overrides config).
        #[arg(long)]
        lookback: Option<usize>,

        #[arg(long, value_enum, default_value_t = Source::Yahoo)]
        source: Source,

        /// Directory for --source csv.
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Report dollar amounts only, without whole-share conversion.
        #[arg(long, default_value_t = false)]
        no_shares: bool,

        /// Print fundamentals and recent bars for every ticker.
        #[arg(long, default_value_t = false)]
        details: bool,

        /// Write report.json, allocations.csv and history.csv here.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stratfolio=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Strategies { catalog } => {
            let catalog = load_catalog(catalog.as_deref())?;
            print!("{}", render_catalog(&catalog));
            Ok(())
        }
        Commands::Allocate {
            capital,
            strategies,
            config,
            catalog,
            floor,
            lookback,
            source,
            data_dir,
            no_shares,
            details,
            output_dir,
        } => {
            let mut cfg = match config {
                Some(path) => AllocatorConfig::from_file(&path)?,
                None => AllocatorConfig::default(),
            };
            if let Some(floor) = floor {
                cfg.floor_fraction = floor;
            }
            if let Some(lookback) = lookback {
                cfg.lookback_days = lookback;
            }
            if no_shares {
                cfg.compute_shares = false;
            }
            cfg.validate()?;

            let catalog = load_catalog(catalog.as_deref())?;
            let provider = build_provider(source, data_dir)?;
            let request = AllocationRequest::new(capital, strategies);

            let report = run_allocation(&request, &catalog, provider.as_ref(), &cfg)?;

            print!("{}", render_summary(&report));
            if details {
                println!();
                print!("{}", render_details(&report, cfg.lookback_days));
            }

            if let Some(dir) = output_dir {
                let run_dir = save_artifacts(&report, &dir)?;
                println!();
                println!("Artifacts saved to: {}", run_dir.display());
            }
            Ok(())
        }
    }
}

fn load_catalog(path: Option<&Path>) -> Result<StrategyCatalog> {
    match path {
        Some(p) => StrategyCatalog::from_file(p)
            .with_context(|| format!("failed to load catalog {}", p.display())),
        None => Ok(StrategyCatalog::reference()),
    }
}

fn build_provider(
    source: Source,
    data_dir: Option<PathBuf>,
) -> Result<Box<dyn MarketDataProvider>> {
    match source {
        Source::Yahoo => {
            let breaker = Arc::new(CircuitBreaker::default_provider());
            Ok(Box::new(YahooProvider::new(breaker)?))
        }
        Source::Csv => {
            let Some(dir) = data_dir else {
                bail!("--source csv requires --data-dir");
            };
            if !dir.is_dir() {
                bail!("data directory does not exist: {}", dir.display());
            }
            Ok(Box::new(CsvProvider::new(dir)))
        }
        Source::Synthetic => {
            tracing::warn!("using synthetic data; allocations do not reflect market prices");
            Ok(Box::new(SyntheticProvider::new(
                chrono::Local::now().date_naive(),
            )))
        }
    }
}
