use anyhow::Result;
use clap::{Parser, Subcommand};
use quantkit::{
    backtester::CrossoverParams,
    commands::{backtest, features, fetch, normalize, pipeline},
    config::AppConfig,
    models::{Interval, Period},
};
use std::str::FromStr;

#[derive(Parser)]
#[command(name = "quantkit")]
#[command(about = "Stock data download, feature engineering and backtesting toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download raw OHLCV history for one or more tickers
    Fetch {
        /// Tickers to download (defaults to the configured list)
        #[arg(value_delimiter = ',', num_args = 0..)]
        tickers: Vec<String>,
        /// History range code (1d 5d 1mo 3mo 6mo 1y 2y 5y 10y ytd max)
        #[arg(long)]
        period: Option<String>,
        /// Bar interval code (1m 2m 5m 15m 30m 60m 90m 1h 1d 5d 1wk 1mo 3mo)
        #[arg(long)]
        interval: Option<String>,
        /// Skip writing the downloaded data to the raw cache
        #[arg(long)]
        no_save: bool,
    },
    /// Build the technical feature table for a ticker
    Features {
        ticker: String,
        /// Download fresh data instead of using the latest cached file
        #[arg(long)]
        fetch: bool,
    },
    /// Min-max normalize the latest feature table for a ticker
    Normalize {
        ticker: String,
        /// Column names to leave untouched
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },
    /// Run the sample EMA-crossover backtest on cached data
    Backtest {
        ticker: String,
        /// Fast EMA window
        #[arg(long, default_value_t = 50)]
        fast: usize,
        /// Slow EMA window
        #[arg(long, default_value_t = 200)]
        slow: usize,
        /// Starting capital
        #[arg(long, default_value_t = 100_000.0)]
        capital: f64,
    },
    /// Fetch, build and normalize features for every configured ticker
    Pipeline {
        /// Tickers to process (defaults to the configured list)
        #[arg(value_delimiter = ',', num_args = 0..)]
        tickers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;
    config.layout.ensure()?;

    match cli.command {
        Commands::Fetch {
            tickers,
            period,
            interval,
            no_save,
        } => {
            let tickers = resolve_tickers(tickers, &config);
            let period = match period {
                Some(raw) => Period::from_str(&raw)?,
                None => config.period,
            };
            let interval = match interval {
                Some(raw) => Interval::from_str(&raw)?,
                None => config.interval,
            };
            fetch::run(&config, &tickers, period, interval, !no_save).await?;
        }
        Commands::Features { ticker, fetch } => {
            features::run(&config, &ticker, fetch).await?;
        }
        Commands::Normalize { ticker, exclude } => {
            normalize::run(&config, &ticker, &exclude).await?;
        }
        Commands::Backtest {
            ticker,
            fast,
            slow,
            capital,
        } => {
            let params = CrossoverParams {
                fast,
                slow,
                initial_capital: capital,
            };
            backtest::run(&config, &ticker, params).await?;
        }
        Commands::Pipeline { tickers } => {
            let tickers = resolve_tickers(tickers, &config);
            pipeline::run(&config, &tickers).await?;
        }
    }

    Ok(())
}

fn resolve_tickers(cli_tickers: Vec<String>, config: &AppConfig) -> Vec<String> {
    if cli_tickers.is_empty() {
        config.tickers.clone()
    } else {
        cli_tickers
    }
}
