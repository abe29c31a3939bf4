//! Performance metrics calculator.
//!
//! Point estimates computed once from a completed run: Sharpe ratio over
//! the daily P/L series, and CAPM beta/alpha of the underlying against the
//! simulated benchmark.

use serde::{Deserialize, Serialize};

use crate::backtest::DailyResult;

/// Dispersion below this is treated as none.
const MIN_STD_DEV: f64 = 1e-12;

/// Risk/return statistics for one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Final return in excess of the CAPM-implied return (fraction).
    pub alpha: f64,
    /// Sensitivity of the underlying to the benchmark.
    pub beta: f64,
    pub sharpe_ratio: f64,
}

impl Default for PerformanceMetrics {
    fn default() -> Self {
        Self {
            alpha: 0.0,
            beta: 1.0,
            sharpe_ratio: 0.0,
        }
    }
}

impl PerformanceMetrics {
    /// Generate a summary report.
    pub fn summary(&self) -> String {
        format!(
            "Performance Summary\n\
             ====================\n\
             Alpha: {:.2}%\n\
             Beta: {:.2}\n\
             Sharpe Ratio: {:.2}",
            self.alpha * 100.0,
            self.beta,
            self.sharpe_ratio
        )
    }
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate all metrics for a completed run.
    pub fn analyze(
        results: &[DailyResult],
        stock_returns: &[f64],
        market_returns: &[f64],
        risk_free_rate: f64,
    ) -> PerformanceMetrics {
        let returns: Vec<f64> = results.iter().map(|r| r.profit_loss_pct / 100.0).collect();

        let sharpe_ratio = Self::sharpe_ratio(&returns, risk_free_rate);
        let beta = Self::beta(stock_returns, market_returns);
        let final_return = returns.last().copied().unwrap_or(0.0);
        let market_final_return = Self::compound(market_returns);
        let alpha = Self::alpha(final_return, market_final_return, beta, risk_free_rate);

        PerformanceMetrics {
            alpha,
            beta,
            sharpe_ratio,
        }
    }

    /// Sharpe ratio scaled by the number of observations.
    ///
    /// `(mean * n - rf) / (stdev * sqrt(n))`, zero when the series has no
    /// dispersion.
    pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64) -> f64 {
        let std_dev = Self::sample_variance(returns).sqrt();
        if std_dev < MIN_STD_DEV || !std_dev.is_finite() {
            return 0.0;
        }
        let n = returns.len() as f64;
        (Self::mean(returns) * n - risk_free_rate) / (std_dev * n.sqrt())
    }

    /// Covariance with the market over market variance; 1.0 when the market
    /// is flat.
    pub fn beta(stock_returns: &[f64], market_returns: &[f64]) -> f64 {
        let market_var = Self::sample_variance(market_returns);
        if market_var.sqrt() < MIN_STD_DEV || !market_var.is_finite() {
            return 1.0;
        }
        Self::sample_covariance(stock_returns, market_returns) / market_var
    }

    /// Realized return minus the CAPM expected return.
    pub fn alpha(final_return: f64, market_final_return: f64, beta: f64, risk_free_rate: f64) -> f64 {
        final_return - (risk_free_rate + beta * (market_final_return - risk_free_rate))
    }

    /// Cumulative return of a series of simple returns.
    pub fn compound(returns: &[f64]) -> f64 {
        returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
    }

    fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    fn sample_variance(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        let mean = Self::mean(values);
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64
    }

    fn sample_covariance(xs: &[f64], ys: &[f64]) -> f64 {
        let n = xs.len().min(ys.len());
        if n < 2 {
            return 0.0;
        }
        let (xs, ys) = (&xs[..n], &ys[..n]);
        let mean_x = Self::mean(xs);
        let mean_y = Self::mean(ys);
        xs.iter()
            .zip(ys)
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum::<f64>()
            / (n - 1) as f64
    }
}
