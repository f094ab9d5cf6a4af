//! Cross-asset covariance and correlation.

use crate::portfolio::risk::{mean, sample_std_dev};
use crate::types::{CorrelationMatrix, ReturnTable, WeightVector};
use crate::{Error, Result};

/// Sample covariance matrix (N-1 denominator) of the asset return columns.
///
/// Requires at least two return periods.
pub fn covariance_matrix(returns: &ReturnTable) -> Result<Vec<Vec<f64>>> {
    let periods = returns.periods();
    if periods < 2 {
        return Err(Error::InsufficientData(format!(
            "need at least 2 aligned return periods, found {}",
            periods
        )));
    }

    let means: Vec<f64> = returns.columns.iter().map(|c| mean(c)).collect();
    let n = returns.columns.len();
    let mut cov = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in i..n {
            let (ci, cj) = (&returns.columns[i], &returns.columns[j]);
            let sum: f64 = ci
                .iter()
                .zip(cj)
                .map(|(a, b)| (a - means[i]) * (b - means[j]))
                .sum();
            let value = sum / (periods - 1) as f64;
            cov[i][j] = value;
            cov[j][i] = value;
        }
    }

    Ok(cov)
}

/// Pearson correlation matrix of per-asset returns.
///
/// Needs at least two assets and two periods. The diagonal is exactly 1.0
/// and off-diagonal values are clamped to `[-1, 1]`. A pair involving a
/// zero-variance series has no defined correlation and is reported as 0.0.
pub fn compute_correlation_matrix(returns: &ReturnTable) -> Result<CorrelationMatrix> {
    if returns.tickers.len() < 2 {
        return Err(Error::InsufficientData(format!(
            "need at least 2 assets for a correlation matrix, found {}",
            returns.tickers.len()
        )));
    }

    let cov = covariance_matrix(returns)?;
    let std_devs: Vec<f64> = returns.columns.iter().map(|c| sample_std_dev(c)).collect();
    let n = cov.len();
    let mut values = vec![vec![0.0; n]; n];

    for i in 0..n {
        values[i][i] = 1.0;
        for j in (i + 1)..n {
            let denom = std_devs[i] * std_devs[j];
            let rho = if denom > 0.0 {
                (cov[i][j] / denom).clamp(-1.0, 1.0)
            } else {
                0.0
            };
            values[i][j] = rho;
            values[j][i] = rho;
        }
    }

    Ok(CorrelationMatrix {
        tickers: returns.tickers.clone(),
        values,
    })
}

/// Portfolio variance `w' * cov * w`.
///
/// With a sample covariance matrix this equals the sample variance of the
/// fixed-weight portfolio return series.
pub fn portfolio_variance(cov: &[Vec<f64>], weights: &WeightVector) -> Result<f64> {
    let w = weights.as_slice();
    if cov.len() != w.len() || cov.iter().any(|row| row.len() != w.len()) {
        return Err(Error::InvalidWeights(format!(
            "expected {} weights, got {}",
            cov.len(),
            w.len()
        )));
    }

    Ok(cov
        .iter()
        .zip(w)
        .map(|(row, wi)| wi * row.iter().zip(w).map(|(c, wj)| c * wj).sum::<f64>())
        .sum())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::risk::sample_std_dev;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn table(columns: &[(&str, Vec<f64>)]) -> ReturnTable {
        let periods = columns[0].1.len();
        ReturnTable {
            dates: (0..periods)
                .map(|i| {
                    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap() + chrono::Days::new(i as u64)
                })
                .collect(),
            tickers: columns.iter().map(|(t, _)| t.to_string()).collect(),
            columns: columns.iter().map(|(_, c)| c.clone()).collect(),
        }
    }

    #[test]
    fn test_perfect_correlation() {
        let returns = table(&[
            ("A", vec![0.01, 0.02, -0.01, 0.03]),
            ("B", vec![0.02, 0.04, -0.02, 0.06]),
            ("C", vec![-0.01, -0.02, 0.01, -0.03]),
        ]);
        let corr = compute_correlation_matrix(&returns).unwrap();

        assert_abs_diff_eq!(corr.get("A", "B").unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(corr.get("A", "C").unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_symmetric_with_unit_diagonal() {
        let returns = table(&[
            ("A", vec![0.011, -0.02, 0.005, 0.013, -0.007]),
            ("B", vec![0.002, 0.01, -0.004, 0.02, 0.001]),
            ("C", vec![-0.03, 0.015, 0.0, 0.007, 0.012]),
        ]);
        let corr = compute_correlation_matrix(&returns).unwrap();

        for i in 0..corr.len() {
            assert_eq!(corr.values[i][i], 1.0);
            for j in 0..corr.len() {
                assert_eq!(corr.values[i][j], corr.values[j][i]);
                assert!((-1.0..=1.0).contains(&corr.values[i][j]));
            }
        }
    }

    #[test]
    fn test_zero_variance_pair() {
        let returns = table(&[("A", vec![0.01, 0.02, 0.03]), ("B", vec![0.0, 0.0, 0.0])]);
        let corr = compute_correlation_matrix(&returns).unwrap();
        assert_eq!(corr.get("A", "B"), Some(0.0));
        assert_eq!(corr.get("B", "B"), Some(1.0));

        let flat = table(&[("A", vec![0.01, 0.02, 0.03]), ("B", vec![0.01; 3])]);
        let corr = compute_correlation_matrix(&flat).unwrap();
        assert_eq!(corr.get("A", "B"), Some(0.0));
    }

    #[test]
    fn test_requires_two_assets_and_periods() {
        let single = table(&[("A", vec![0.01, 0.02, 0.03])]);
        assert!(matches!(
            compute_correlation_matrix(&single),
            Err(Error::InsufficientData(_))
        ));

        let short = table(&[("A", vec![0.01]), ("B", vec![0.02])]);
        assert!(matches!(
            compute_correlation_matrix(&short),
            Err(Error::InsufficientData(_))
        ));
    }

    #[test]
    fn test_portfolio_variance_matches_series_variance() {
        let a = vec![0.01, -0.02, 0.015, 0.0, 0.007];
        let b = vec![-0.005, 0.01, 0.02, -0.01, 0.003];
        let returns = table(&[("A", a.clone()), ("B", b.clone())]);
        let weights = WeightVector::new(vec![0.3, 0.7]).unwrap();

        let cov = covariance_matrix(&returns).unwrap();
        let variance = portfolio_variance(&cov, &weights).unwrap();

        let series: Vec<f64> = a.iter().zip(&b).map(|(x, y)| 0.3 * x + 0.7 * y).collect();
        assert_abs_diff_eq!(variance.sqrt(), sample_std_dev(&series), epsilon = 1e-12);

        let wrong = WeightVector::equal(3).unwrap();
        assert!(portfolio_variance(&cov, &wrong).is_err());
    }
}
