//! Folio Risk CLI - portfolio risk analysis from the command line.
//!
//! Prints JSON wrapped in `{ ok, data, error }` so other tools can consume it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use folio_risk_core::{
    analysis::{AnalysisOptions, AnalysisResponse},
    config::AppConfig,
    market_data::{InMemoryPriceSource, PriceSource, RapidApiClient},
    server::{self, AnalyzeRequest, AppState},
    ApiResponse,
};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "folio-risk")]
#[command(about = "Portfolio risk analyzer - volatility, Sharpe ratio, drawdown and correlation")]
#[command(version)]
struct Cli {
    /// Config file path (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch prices from the market data provider and analyze them
    Analyze {
        /// Tickers (comma-separated, e.g. AAPL,TSLA,BTC-USD)
        #[arg(short, long, value_delimiter = ',', required = true)]
        tickers: Vec<String>,
        /// Weights in ticker order, as fractions or percentages
        #[arg(short, long, value_delimiter = ',')]
        weights: Option<Vec<f64>>,
        /// First date (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last date (YYYY-MM-DD)
        #[arg(long)]
        end: NaiveDate,
        /// Report per-period figures instead of annualized ones
        #[arg(long)]
        daily: bool,
    },
    /// Analyze prices from a local JSON file
    File {
        /// Price file: {"AAPL": [{"date": "2024-01-02", "close": 185.6}, ...]}
        #[arg(short, long)]
        prices: PathBuf,
        /// Tickers to include (defaults to every ticker in the file)
        #[arg(short, long, value_delimiter = ',')]
        tickers: Option<Vec<String>>,
        /// Weights in ticker order, as fractions or percentages
        #[arg(short, long, value_delimiter = ',')]
        weights: Option<Vec<f64>>,
        /// Report per-period figures instead of annualized ones
        #[arg(long)]
        daily: bool,
    },
    /// Run the HTTP analysis endpoint
    Serve {
        /// Listen host (overrides config)
        #[arg(long)]
        host: Option<String>,
        /// Listen port (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Analyze {
            tickers,
            weights,
            start,
            end,
            daily,
        } => {
            let client = RapidApiClient::new(&config.market_data)?;
            let request = AnalyzeRequest {
                tickers,
                weights,
                start_date: start,
                end_date: end,
                annualize: Some(!daily),
            };
            print_result(run_analysis(&client, &request, &config.analysis).await)
        }
        Commands::File {
            prices,
            tickers,
            weights,
            daily,
        } => {
            let source = InMemoryPriceSource::from_path(&prices)
                .with_context(|| format!("failed to read {}", prices.display()))?;
            let request = AnalyzeRequest {
                tickers: tickers.unwrap_or_else(|| source.tickers()),
                weights,
                start_date: NaiveDate::MIN,
                end_date: NaiveDate::MAX,
                annualize: Some(!daily),
            };
            print_result(run_analysis(&source, &request, &config.analysis).await)
        }
        Commands::Serve { host, port } => {
            let mut server_config = config.server.clone();
            if let Some(host) = host {
                server_config.host = host;
            }
            if let Some(port) = port {
                server_config.port = port;
            }

            let client = RapidApiClient::new(&config.market_data)?;
            let state = Arc::new(AppState::new(Arc::new(client), config.analysis));
            server::serve(&server_config, state).await?;
            Ok(())
        }
    }
}

async fn run_analysis(
    source: &dyn PriceSource,
    request: &AnalyzeRequest,
    options: &AnalysisOptions,
) -> folio_risk_core::Result<AnalysisResponse> {
    let response = server::analyze(source, request, options).await?;
    for warning in &response.warnings {
        tracing::warn!("{}", warning);
    }
    Ok(response)
}

fn print_result<T: Serialize>(result: folio_risk_core::Result<T>) -> anyhow::Result<()> {
    let failed = result.is_err();
    let envelope = match result {
        Ok(data) => ApiResponse::ok(data),
        Err(e) => ApiResponse::err(e.to_string()),
    };
    println!("{}", serde_json::to_string_pretty(&envelope)?);

    if failed {
        std::process::exit(1);
    }
    Ok(())
}
