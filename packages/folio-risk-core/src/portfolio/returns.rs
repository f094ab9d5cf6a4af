//! Periodic returns for each asset and for the weighted portfolio.

use crate::types::{PriceTable, ReturnSeries, ReturnTable, WeightVector};
use crate::{Error, Result};

/// Compute per-asset simple returns and the weighted portfolio return series.
///
/// Prices are inner-joined on date first, so a row is used only when every
/// asset has a price for it. The first aligned row produces no return, so
/// every output series has `aligned rows - 1` entries.
///
/// When `weights` is `None` each asset gets `1/N`. Supplied weights must
/// already be normalized; use [`WeightVector::from_user_input`] or
/// [`WeightVector::normalize`] to get there.
///
/// The portfolio return for a period is `sum(w_i * r_i)`. Weights are held
/// fixed for every period, which ignores the drift a buy-and-hold portfolio
/// would see and models no rebalancing.
///
/// # Example
///
/// ```rust
/// use chrono::NaiveDate;
/// use folio_risk_core::{compute_returns, PricePoint, PriceTable};
///
/// let day = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
/// let table = PriceTable::from_series([
///     ("A", vec![PricePoint::new(day(2), 100.0), PricePoint::new(day(3), 110.0)]),
///     ("B", vec![PricePoint::new(day(2), 50.0), PricePoint::new(day(3), 50.0)]),
/// ])
/// .unwrap();
///
/// let (assets, portfolio) = compute_returns(&table, None).unwrap();
/// assert_eq!(assets.periods(), 1);
/// assert!((portfolio.values[0] - 0.05).abs() < 1e-12);
/// ```
pub fn compute_returns(
    prices: &PriceTable,
    weights: Option<&WeightVector>,
) -> Result<(ReturnTable, ReturnSeries)> {
    let aligned = prices.align()?;
    let asset_count = aligned.tickers.len();

    let weights = match weights {
        Some(w) => {
            if w.len() != asset_count {
                return Err(Error::InvalidWeights(format!(
                    "expected {} weights, got {}",
                    asset_count,
                    w.len()
                )));
            }
            w.clone()
        }
        None => WeightVector::equal(asset_count)?,
    };

    let columns: Vec<Vec<f64>> = aligned
        .columns
        .iter()
        .map(|prices| simple_returns(prices))
        .collect();

    let dates = aligned.dates[1..].to_vec();
    let portfolio = weighted_sum(&columns, weights.as_slice(), dates.len());

    Ok((
        ReturnTable {
            dates: dates.clone(),
            tickers: aligned.tickers,
            columns,
        },
        ReturnSeries {
            dates,
            values: portfolio,
        },
    ))
}

/// Simple returns `(p[t] - p[t-1]) / p[t-1]` for consecutive prices.
///
/// Returns an empty vector for fewer than two prices.
pub fn simple_returns(prices: &[f64]) -> Vec<f64> {
    prices
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0])
        .collect()
}

fn weighted_sum(columns: &[Vec<f64>], weights: &[f64], periods: usize) -> Vec<f64> {
    (0..periods)
        .map(|t| {
            columns
                .iter()
                .zip(weights)
                .map(|(col, w)| w * col[t])
                .sum()
        })
        .collect()
}
