//! Folio Risk Core - portfolio risk/return analytics.
//!
//! This crate turns aligned price histories and fixed portfolio weights into
//! descriptive risk statistics:
//!
//! - **Returns**: inner-joined price alignment, per-asset simple returns and
//!   the weighted portfolio series
//! - **Risk metrics**: volatility, mean return, Sharpe ratio, cumulative
//!   returns, drawdown and maximum drawdown, with optional annualization
//! - **Cross-asset metrics**: covariance and Pearson correlation matrices
//! - **Collaborators**: a RapidAPI price client, an HTTP endpoint and
//!   configuration loading around the pure calculators
//!
//! # Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use folio_risk_core::{compute_returns, compute_risk_metrics, PricePoint, PriceTable};
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
//! let table = PriceTable::from_series([
//!     ("A", vec![
//!         PricePoint::new(day(2), 100.0),
//!         PricePoint::new(day(3), 110.0),
//!         PricePoint::new(day(4), 99.0),
//!     ]),
//!     ("B", vec![
//!         PricePoint::new(day(2), 50.0),
//!         PricePoint::new(day(3), 50.0),
//!         PricePoint::new(day(4), 55.0),
//!     ]),
//! ])
//! .unwrap();
//!
//! let (_, portfolio) = compute_returns(&table, None).unwrap();
//! let metrics = compute_risk_metrics(&portfolio.values).unwrap();
//! assert_eq!(metrics.max_drawdown, 0.0);
//! ```

pub mod analysis;
pub mod config;
pub mod market_data;
pub mod portfolio;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use types::{
    AlignedPrices, AnnualizedMetrics, ApiResponse, CorrelationMatrix, PricePoint, PriceTable,
    ReturnSeries, ReturnTable, RiskMetrics, WeightVector, WEIGHT_TOLERANCE,
};

// Re-export main functionality
pub use analysis::{AnalysisOptions, AnalysisResponse, PortfolioAnalysis};
pub use config::AppConfig;
pub use market_data::{fetch_price_table, DateRange, PriceSource};
pub use portfolio::{
    compute_correlation_matrix, compute_returns, compute_risk_metrics, TRADING_DAYS_PER_YEAR,
};

/// Error types for folio-risk-core operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid weights: {0}")]
    InvalidWeights(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Asset unavailable: {symbol}: {reason}")]
    AssetUnavailable { symbol: String, reason: String },

    #[error("no valid data found for any requested ticker")]
    NoValidData,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for folio-risk-core operations.
pub type Result<T> = std::result::Result<T, Error>;
