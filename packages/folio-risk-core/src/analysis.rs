//! End-to-end portfolio analysis: returns, risk metrics and correlation for
//! one price table, plus the response payload served to clients.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::portfolio::{
    compute_correlation_matrix, compute_returns, compute_risk_metrics, cumulative_returns,
    TRADING_DAYS_PER_YEAR,
};
use crate::types::{
    AlignedPrices, AnnualizedMetrics, CorrelationMatrix, PriceTable, ReturnSeries, ReturnTable, RiskMetrics,
    WeightVector,
};
use crate::Result;

/// Column name for the weighted portfolio in return tables.
pub const PORTFOLIO_COLUMN: &str = "portfolio";

/// Reporting options for an analysis run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Report yearly figures instead of per-period ones
    pub annualize: bool,
    /// Periods per year used when annualizing
    pub periods_per_year: u32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            annualize: true,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        }
    }
}

/// Everything computed for one portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysis {
    pub tickers: Vec<String>,
    pub weights: WeightVector,
    pub prices: AlignedPrices,
    pub asset_returns: ReturnTable,
    pub portfolio_returns: ReturnSeries,
    pub metrics: RiskMetrics,
    /// Present when annualization was requested
    pub annualized: Option<AnnualizedMetrics>,
    /// Present when the portfolio holds at least two assets
    pub correlation: Option<CorrelationMatrix>,
    /// Running `1 + r` products per asset, in ticker order
    pub asset_cumulative_returns: Vec<Vec<f64>>,
}

impl PortfolioAnalysis {
    /// Run the full pipeline over a price table.
    ///
    /// `weights` defaults to equal weighting. A single-asset table yields no
    /// correlation matrix rather than an error.
    pub fn run(
        prices: &PriceTable,
        weights: Option<&WeightVector>,
        options: &AnalysisOptions,
    ) -> Result<Self> {
        let (asset_returns, portfolio_returns) = compute_returns(prices, weights)?;
        let prices = prices.align()?;
        let weights = match weights {
            Some(w) => w.clone(),
            None => WeightVector::equal(asset_returns.tickers.len())?,
        };

        let metrics = compute_risk_metrics(&portfolio_returns.values)?;
        let annualized = options
            .annualize
            .then(|| metrics.annualized(options.periods_per_year));

        let correlation = if asset_returns.tickers.len() >= 2 {
            Some(compute_correlation_matrix(&asset_returns)?)
        } else {
            None
        };

        let asset_cumulative_returns = asset_returns
            .columns
            .iter()
            .map(|c| cumulative_returns(c))
            .collect();

        Ok(Self {
            tickers: asset_returns.tickers.clone(),
            weights,
            prices,
            asset_returns,
            portfolio_returns,
            metrics,
            annualized,
            correlation,
            asset_cumulative_returns,
        })
    }

    /// Headline figures: annualized when available, per period otherwise.
    pub fn headline(&self) -> (f64, f64, f64) {
        match &self.annualized {
            Some(a) => (a.mean_return, a.volatility, a.sharpe_ratio),
            None => (
                self.metrics.mean_return,
                self.metrics.volatility,
                self.metrics.sharpe_ratio,
            ),
        }
    }

    /// Build the client-facing payload.
    pub fn to_response(&self, warnings: Vec<String>) -> AnalysisResponse {
        let (expected_return, volatility, sharpe_ratio) = self.headline();

        let dates = &self.portfolio_returns.dates;

        AnalysisResponse {
            expected_return,
            volatility,
            sharpe_ratio,
            annualized: self.annualized.is_some(),
            max_drawdown: self.metrics.max_drawdown,
            is_degenerate: self.metrics.is_degenerate,
            cumulative_returns: DatedColumns::new(
                dates,
                &self.tickers,
                &self.asset_cumulative_returns,
                Some(&self.metrics.cumulative_returns),
            ),
            returns: DatedColumns::new(
                dates,
                &self.tickers,
                &self.asset_returns.columns,
                Some(&self.portfolio_returns.values),
            ),
            prices: DatedColumns::new(
                &self.prices.dates,
                &self.prices.tickers,
                &self.prices.columns,
                None,
            ),
            drawdown: self.metrics.drawdown_series.clone(),
            correlation_matrix: self
                .correlation
                .as_ref()
                .map(|c| c.values.clone())
                .unwrap_or_default(),
            tickers: self.tickers.clone(),
            weights: self.weights.as_slice().to_vec(),
            warnings,
        }
    }
}

/// Column-oriented dated series: `{"date": [...], "AAPL": [...], ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatedColumns {
    pub date: Vec<NaiveDate>,
    #[serde(flatten)]
    pub series: BTreeMap<String, Vec<f64>>,
}

impl DatedColumns {
    /// One column per ticker, plus a [`PORTFOLIO_COLUMN`] when `portfolio`
    /// is given.
    fn new(
        dates: &[NaiveDate],
        tickers: &[String],
        columns: &[Vec<f64>],
        portfolio: Option<&[f64]>,
    ) -> Self {
        let mut series: BTreeMap<String, Vec<f64>> =
            tickers.iter().cloned().zip(columns.iter().cloned()).collect();
        if let Some(values) = portfolio {
            series.insert(PORTFOLIO_COLUMN.to_string(), values.to_vec());
        }
        Self {
            date: dates.to_vec(),
            series,
        }
    }
}

/// Analysis result as returned by the HTTP endpoint and the CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResponse {
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    /// Whether the three figures above are annualized
    pub annualized: bool,
    pub max_drawdown: f64,
    pub is_degenerate: bool,
    pub cumulative_returns: DatedColumns,
    /// Per-period simple returns per asset and for the portfolio
    pub returns: DatedColumns,
    /// Aligned closing prices, one row more than the return tables
    pub prices: DatedColumns,
    pub drawdown: Vec<f64>,
    pub correlation_matrix: Vec<Vec<f64>>,
    pub tickers: Vec<String>,
    pub weights: Vec<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
