//! Historical price fetching.
//!
//! Sources implement [`PriceSource`]; [`fetch_price_table`] turns a list of
//! tickers into a [`PriceTable`], reporting tickers without usable data
//! instead of padding them with placeholder prices.

mod rapidapi;

pub use rapidapi::{parse_history, RapidApiClient};

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::types::{PricePoint, PriceTable, WeightVector};
use crate::{Error, Result};

/// Inclusive date range for a history request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range; `start` must not be after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidInput(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A provider of daily closing prices.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch closing prices for `symbol` within `range`, sorted by date.
    ///
    /// Implementations return [`Error::AssetUnavailable`] when the symbol has
    /// no usable data.
    async fn fetch_history(&self, symbol: &str, range: DateRange) -> Result<Vec<PricePoint>>;
}

/// Price source backed by an in-memory map, e.g. loaded from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPriceSource {
    prices: HashMap<String, Vec<PricePoint>>,
}

impl InMemoryPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the history for one ticker.
    pub fn with_series(mut self, ticker: &str, points: Vec<PricePoint>) -> Self {
        self.prices.insert(ticker.to_uppercase(), points);
        self
    }

    /// Load `{"AAPL": [{"date": "2024-01-02", "close": 185.6}, ...], ...}`.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<PricePoint>> = serde_json::from_str(content)?;
        Ok(Self {
            prices: raw
                .into_iter()
                .map(|(ticker, points)| (ticker.to_uppercase(), points))
                .collect(),
        })
    }

    /// Load a JSON price file from disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Tickers present in the source, sorted.
    pub fn tickers(&self) -> Vec<String> {
        let mut tickers: Vec<String> = self.prices.keys().cloned().collect();
        tickers.sort();
        tickers
    }
}

#[async_trait]
impl PriceSource for InMemoryPriceSource {
    async fn fetch_history(&self, symbol: &str, range: DateRange) -> Result<Vec<PricePoint>> {
        let symbol = symbol.to_uppercase();
        let mut points: Vec<PricePoint> = self
            .prices
            .get(&symbol)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| range.contains(p.date))
                    .copied()
                    .collect()
            })
            .unwrap_or_default();

        if points.is_empty() {
            return Err(Error::AssetUnavailable {
                symbol,
                reason: "no prices in requested range".to_string(),
            });
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

/// A requested ticker that could not be fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnavailableAsset {
    pub symbol: String,
    pub reason: String,
}

impl UnavailableAsset {
    /// User-facing warning line.
    pub fn warning(&self) -> String {
        format!("{} could not be fetched: {}", self.symbol, self.reason)
    }
}

/// Result of fetching a set of tickers.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    /// Prices for every ticker that returned data, in request order
    pub table: PriceTable,
    /// Tickers that failed, in request order
    pub unavailable: Vec<UnavailableAsset>,
}

impl FetchOutcome {
    pub fn warnings(&self) -> Vec<String> {
        self.unavailable.iter().map(|u| u.warning()).collect()
    }
}

/// Fetch every ticker from `source` and assemble a price table.
///
/// Tickers are fetched one after another. Failures are logged and collected
/// in [`FetchOutcome::unavailable`]; if nothing could be fetched the call
/// fails with [`Error::NoValidData`].
pub async fn fetch_price_table(
    source: &dyn PriceSource,
    tickers: &[String],
    range: DateRange,
) -> Result<FetchOutcome> {
    if tickers.is_empty() {
        return Err(Error::InvalidInput("no tickers requested".to_string()));
    }
    let mut seen = std::collections::HashSet::new();
    if let Some(dup) = tickers
        .iter()
        .map(|t| t.trim().to_uppercase())
        .find(|t| !seen.insert(t.clone()))
    {
        return Err(Error::InvalidInput(format!("duplicate ticker: {}", dup)));
    }

    let mut table = PriceTable::new();
    let mut unavailable = Vec::new();

    for ticker in tickers {
        let symbol = ticker.trim().to_uppercase();
        match source.fetch_history(&symbol, range).await {
            Ok(points) => {
                let points: Vec<PricePoint> =
                    points.into_iter().filter(PricePoint::is_usable).collect();
                if points.is_empty() {
                    warn!(symbol = %symbol, "no usable prices in range");
                    unavailable.push(UnavailableAsset {
                        symbol,
                        reason: "no usable prices in range".to_string(),
                    });
                    continue;
                }
                info!(symbol = %symbol, observations = points.len(), "fetched price history");
                table.insert(&symbol, points)?;
            }
            Err(e) => {
                warn!(symbol = %symbol, error = %e, "price history unavailable");
                unavailable.push(UnavailableAsset {
                    symbol,
                    reason: unavailable_reason(e),
                });
            }
        }
    }

    if table.is_empty() {
        return Err(Error::NoValidData);
    }

    Ok(FetchOutcome { table, unavailable })
}

fn unavailable_reason(err: Error) -> String {
    match err {
        Error::AssetUnavailable { reason, .. } => reason,
        other => other.to_string(),
    }
}

/// Keep the weights of `available` tickers and renormalize them.
///
/// `weights` lines up with `requested`. Dropping a ticker redistributes its
/// share proportionally across the remaining ones.
pub fn restrict_weights(
    requested: &[String],
    weights: &WeightVector,
    available: &[String],
) -> Result<WeightVector> {
    if requested.len() != weights.len() {
        return Err(Error::InvalidWeights(format!(
            "expected {} weights, got {}",
            requested.len(),
            weights.len()
        )));
    }

    let by_ticker: HashMap<String, f64> = requested
        .iter()
        .map(|t| t.trim().to_uppercase())
        .zip(weights.as_slice().iter().copied())
        .collect();

    let kept = available
        .iter()
        .map(|t| {
            by_ticker.get(&t.to_uppercase()).copied().ok_or_else(|| {
                Error::InvalidInput(format!("{} was not among the requested tickers", t))
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    WeightVector::normalize(kept)
}
