//! Portfolio risk metrics calculation.
//!
//! Provides volatility, mean return, Sharpe ratio, cumulative returns and
//! drawdown for a single return series. All base figures are per period;
//! annualization is a separate, explicit step.

use crate::types::{AnnualizedMetrics, RiskMetrics};
use crate::{Error, Result};

/// Trading days in a year, the usual scaling for daily returns.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

// Spread below this, relative to max(|mean|, 1), is floating-point residue.
// Returns derived from prices carry error on the scale of `1 + r`, hence the
// floor of 1.
const ROUNDING_NOISE: f64 = 64.0 * f64::EPSILON;

/// Calculate risk metrics for a return series.
///
/// # Arguments
///
/// * `returns` - Per-period simple returns (e.g., 0.01 for 1%)
///
/// # Returns
///
/// `RiskMetrics` with per-period figures, or [`Error::InsufficientData`] for
/// an empty series.
///
/// Volatility is the sample standard deviation (N-1 denominator); a single
/// observation yields zero. The Sharpe ratio is a raw `mean / volatility`
/// with no risk-free rate subtracted. When volatility is zero the ratio is
/// reported as 0 and `is_degenerate` is set instead of dividing.
pub fn compute_risk_metrics(returns: &[f64]) -> Result<RiskMetrics> {
    if returns.is_empty() {
        return Err(Error::InsufficientData(
            "need at least 1 return to compute risk metrics".to_string(),
        ));
    }

    let mean_return = mean(returns);
    let volatility = sample_std_dev(returns);
    let (sharpe_ratio, is_degenerate) = guarded_ratio(mean_return, volatility);

    let cumulative_returns = cumulative_returns(returns);
    let drawdown_series = drawdown_series(&cumulative_returns);
    let max_drawdown = max_drawdown(&drawdown_series);

    Ok(RiskMetrics {
        periods: returns.len(),
        mean_return,
        volatility,
        sharpe_ratio,
        is_degenerate,
        cumulative_returns,
        drawdown_series,
        max_drawdown,
    })
}

impl RiskMetrics {
    /// Scale mean and volatility to a yearly horizon.
    ///
    /// Mean is multiplied by `periods_per_year` and volatility by its square
    /// root. Pass [`TRADING_DAYS_PER_YEAR`] for daily data.
    pub fn annualized(&self, periods_per_year: u32) -> AnnualizedMetrics {
        let scale = f64::from(periods_per_year);
        let mean_return = self.mean_return * scale;
        let volatility = self.volatility * scale.sqrt();
        let (sharpe_ratio, _) = guarded_ratio(mean_return, volatility);

        AnnualizedMetrics {
            periods_per_year,
            mean_return,
            volatility,
            sharpe_ratio,
        }
    }
}

impl AnnualizedMetrics {
    /// Textbook Sharpe ratio: `(mean - risk_free_rate) / volatility`.
    ///
    /// `risk_free_rate` is annual (e.g., 0.04 for 4%). Returns 0 when
    /// volatility is zero.
    pub fn excess_sharpe(&self, risk_free_rate: f64) -> f64 {
        guarded_ratio(self.mean_return - risk_free_rate, self.volatility).0
    }
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with an N-1 denominator.
///
/// Returns 0 for fewer than two values, and for a series whose spread is
/// within rounding noise of its values (a constant 1% daily return computed
/// from prices never comes out as exactly equal floats).
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }

    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    let std_dev = variance.sqrt();
    if std_dev <= ROUNDING_NOISE * m.abs().max(1.0) {
        0.0
    } else {
        std_dev
    }
}

/// Running product of `1 + r`, compounding from a base of 1.0.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}

/// Relative distance from the running peak of a cumulative series.
///
/// Every value is <= 0; zero means the series is at a new high.
pub fn drawdown_series(cumulative: &[f64]) -> Vec<f64> {
    let mut running_max = f64::NEG_INFINITY;
    cumulative
        .iter()
        .map(|&value| {
            if value > running_max {
                running_max = value;
            }
            if running_max > 0.0 {
                ((value - running_max) / running_max).min(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

/// Deepest drawdown (most negative value); 0 for an empty series.
pub fn max_drawdown(drawdowns: &[f64]) -> f64 {
    drawdowns.iter().copied().fold(0.0, f64::min)
}

// Zero or non-finite denominators fall back to 0 and report degeneracy.
fn guarded_ratio(numerator: f64, denominator: f64) -> (f64, bool) {
    if denominator > 0.0 {
        let ratio = numerator / denominator;
        if ratio.is_finite() {
            return (ratio, false);
        }
    }
    (0.0, true)
}
