//! Catalyst backtesting engine.
//!
//! Replays a multi-leg option strategy over a simulated price path:
//! - Entry valuation and cost basis
//! - Daily mark-to-market with a volatility crush on the catalyst day
//! - Latched take-profit / stop-loss alerts plus the catalyst notice
//! - End-of-run performance metrics
//! - Parallel batch runs with per-job seeds

pub mod alerts;
pub mod batch;
pub mod engine;

pub use alerts::{Alert, AlertKind, AlertLatch};
pub use batch::{BatchJob, BatchRunner};
pub use engine::{BacktestEngine, BacktestError, BacktestOutcome, DailyResult, InitialValuation};
