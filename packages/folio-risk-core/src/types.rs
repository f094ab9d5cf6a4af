//! Core data types for portfolio risk analysis.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Tolerance used when checking that weights sum to one.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

/// A single closing price observation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PricePoint {
    /// Trading date of the observation
    pub date: NaiveDate,
    /// Closing price
    pub close: f64,
}

impl PricePoint {
    /// Create a new price point.
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }

    /// Whether the close is a finite, positive price.
    pub fn is_usable(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Closing prices per asset, keyed by date.
///
/// Assets keep their insertion order, which is also the order weights are
/// matched against. Non-finite or non-positive prices are dropped on insert
/// so they show up as gaps during alignment rather than as zeros.
///
/// Tables are built through [`PriceTable::insert`] only.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PriceTable {
    tickers: Vec<String>,
    series: Vec<BTreeMap<NaiveDate, f64>>,
}

impl PriceTable {
    /// Create an empty price table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(ticker, prices)` pairs.
    pub fn from_series<I, S, P>(series: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, P)>,
        S: AsRef<str>,
        P: IntoIterator<Item = PricePoint>,
    {
        let mut table = Self::new();
        for (ticker, points) in series {
            table.insert(ticker.as_ref(), points)?;
        }
        Ok(table)
    }

    /// Add an asset's price history. Tickers are stored uppercase.
    ///
    /// A later observation for the same date replaces the earlier one.
    pub fn insert<P>(&mut self, ticker: &str, points: P) -> Result<()>
    where
        P: IntoIterator<Item = PricePoint>,
    {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(Error::InvalidInput("ticker must not be empty".to_string()));
        }
        if self.tickers.contains(&ticker) {
            return Err(Error::InvalidInput(format!("duplicate ticker: {}", ticker)));
        }

        let prices = points
            .into_iter()
            .filter(PricePoint::is_usable)
            .map(|p| (p.date, p.close))
            .collect();

        self.tickers.push(ticker);
        self.series.push(prices);
        Ok(())
    }

    /// Asset identifiers in column order.
    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    /// Number of assets.
    pub fn asset_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Raw (unaligned) observations for one asset.
    pub fn series(&self, ticker: &str) -> Option<&BTreeMap<NaiveDate, f64>> {
        let ticker = ticker.to_uppercase();
        self.tickers
            .iter()
            .position(|t| *t == ticker)
            .and_then(|idx| self.series.get(idx))
    }

    /// Inner-join every asset on date.
    ///
    /// A date survives only if every asset has a price for it. Fails with
    /// [`Error::InsufficientData`] when fewer than two rows remain.
    pub fn align(&self) -> Result<AlignedPrices> {
        let Some((first, rest)) = self.series.split_first() else {
            return Err(Error::InsufficientData(
                "price table contains no assets".to_string(),
            ));
        };

        let dates: Vec<NaiveDate> = first
            .keys()
            .filter(|date| rest.iter().all(|s| s.contains_key(date)))
            .copied()
            .collect();

        if dates.len() < 2 {
            return Err(Error::InsufficientData(format!(
                "need at least 2 aligned price observations, found {}",
                dates.len()
            )));
        }

        let columns = self
            .series
            .iter()
            .map(|s| dates.iter().map(|d| s[d]).collect())
            .collect();

        Ok(AlignedPrices {
            dates,
            tickers: self.tickers.clone(),
            columns,
        })
    }
}

/// Prices after the inner join: one column per asset over a shared,
/// strictly increasing date index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlignedPrices {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl AlignedPrices {
    /// Number of aligned rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Portfolio weights, one per asset, summing to one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    /// Validate already-normalized weights.
    pub fn new(values: Vec<f64>) -> Result<Self> {
        check_components(&values)?;
        let total: f64 = values.iter().sum();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(Error::InvalidWeights(format!(
                "weights must sum to 1, got {}",
                total
            )));
        }
        Ok(Self(values))
    }

    /// Equal weighting, `1/n` per asset.
    pub fn equal(n: usize) -> Result<Self> {
        if n == 0 {
            return Err(Error::InvalidWeights(
                "cannot build weights for zero assets".to_string(),
            ));
        }
        Ok(Self(vec![1.0 / n as f64; n]))
    }

    /// Rescale arbitrary non-negative weights so they sum to one.
    pub fn normalize(values: Vec<f64>) -> Result<Self> {
        check_components(&values)?;
        let total: f64 = values.iter().sum();
        if total <= 0.0 {
            return Err(Error::InvalidWeights(
                "weights must have a positive total".to_string(),
            ));
        }
        Ok(Self(values.into_iter().map(|w| w / total).collect()))
    }

    /// Accept user-entered weights as fractions (sum 1) or percentages
    /// (sum 100). Percentages are divided by 100; any other total is
    /// rejected rather than silently rescaled.
    pub fn from_user_input(values: Vec<f64>) -> Result<Self> {
        check_components(&values)?;
        let total: f64 = values.iter().sum();
        if (total - 1.0).abs() <= WEIGHT_TOLERANCE {
            Ok(Self(values))
        } else if (total - 100.0).abs() <= WEIGHT_TOLERANCE * 100.0 {
            Ok(Self(values.into_iter().map(|w| w / 100.0).collect()))
        } else {
            Err(Error::InvalidWeights(format!(
                "weights must sum to 1 (or 100%), got {}",
                total
            )))
        }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn check_components(values: &[f64]) -> Result<()> {
    if values.is_empty() {
        return Err(Error::InvalidWeights("weights must not be empty".to_string()));
    }
    if let Some(w) = values.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(Error::InvalidWeights(format!(
            "weights must be finite and non-negative, got {}",
            w
        )));
    }
    Ok(())
}

impl TryFrom<Vec<f64>> for WeightVector {
    type Error = Error;

    fn try_from(values: Vec<f64>) -> Result<Self> {
        Self::new(values)
    }
}

impl From<WeightVector> for Vec<f64> {
    fn from(weights: WeightVector) -> Self {
        weights.0
    }
}

/// Per-asset simple returns over the aligned index minus its first date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnTable {
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl ReturnTable {
    /// Number of return periods.
    pub fn periods(&self) -> usize {
        self.dates.len()
    }

    /// Returns for one asset.
    pub fn column(&self, ticker: &str) -> Option<&[f64]> {
        let ticker = ticker.to_uppercase();
        self.tickers
            .iter()
            .position(|t| *t == ticker)
            .and_then(|idx| self.columns.get(idx))
            .map(Vec::as_slice)
    }
}

/// A dated return series (one asset or the weighted portfolio).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<f64>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Risk metrics for a single return series.
///
/// All figures are per period (not annualized); see
/// [`RiskMetrics::annualized`] for the opt-in yearly view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskMetrics {
    /// Number of return periods in the sample
    pub periods: usize,
    /// Arithmetic mean of the returns
    pub mean_return: f64,
    /// Sample standard deviation (N-1 denominator)
    pub volatility: f64,
    /// Mean over volatility, no risk-free adjustment; 0 when degenerate
    pub sharpe_ratio: f64,
    /// Set when volatility is zero and the Sharpe ratio fell back to 0
    pub is_degenerate: bool,
    /// Running product of `1 + r`, compounding from 1.0
    pub cumulative_returns: Vec<f64>,
    /// Relative decline from the running peak, always <= 0
    pub drawdown_series: Vec<f64>,
    /// Minimum of the drawdown series
    pub max_drawdown: f64,
}

/// Annualized view of [`RiskMetrics`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AnnualizedMetrics {
    /// Periods per year used for scaling (252 for trading days)
    pub periods_per_year: u32,
    /// Mean return scaled by `periods_per_year`
    pub mean_return: f64,
    /// Volatility scaled by `sqrt(periods_per_year)`
    pub volatility: f64,
    /// Annualized mean over annualized volatility; 0 when degenerate
    pub sharpe_ratio: f64,
}

/// Pairwise Pearson correlations between asset return series.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationMatrix {
    pub tickers: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    /// Correlation between two assets by ticker.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.values[i][j])
    }

    fn index_of(&self, ticker: &str) -> Option<usize> {
        let ticker = ticker.to_uppercase();
        self.tickers.iter().position(|t| *t == ticker)
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// API response wrapper used by the CLI and the HTTP error path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error.into()),
        }
    }
}
