//! Performance metrics module.
//!
//! Provides end-of-run statistics:
//! - Sharpe ratio of the daily P/L series
//! - Beta and alpha against the simulated benchmark

pub mod calculator;

pub use calculator::{MetricsCalculator, PerformanceMetrics};
