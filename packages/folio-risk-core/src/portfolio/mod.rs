//! Portfolio analytics.
//!
//! Three stateless calculators, applied in order: returns from aligned
//! prices, per-series risk metrics, then cross-asset correlation.

mod correlation;
mod returns;
mod risk;

pub use correlation::{compute_correlation_matrix, covariance_matrix, portfolio_variance};
pub use returns::{compute_returns, simple_returns};
pub use risk::{
    compute_risk_metrics, cumulative_returns, drawdown_series, max_drawdown, mean,
    sample_std_dev, TRADING_DAYS_PER_YEAR,
};
