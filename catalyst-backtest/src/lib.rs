pub mod backtest;
pub mod config;
pub mod data;
pub mod metrics;
pub mod portfolio;
pub mod pricing;
pub mod regime;
pub mod simulation;
pub mod strategy;

// Re-export commonly used types
pub use data::{DailyBar, LegAction, OptionLeg, OptionQuote, OptionType, OptionsChain};
pub use config::{BacktestConfig, ConfigError};
pub use pricing::{live_position_value, position_value, BlackScholes};
pub use strategy::{Strategy, StrategyDefinition, StrategyError};
pub use regime::{classify, Company, SectorClassifier, VolatilityRegime};
pub use simulation::{MarketSnapshot, PathSimulator, SimulatedPath};
pub use backtest::{
    Alert, AlertKind, BacktestEngine, BacktestError, BacktestOutcome, BatchJob, BatchRunner,
    DailyResult,
};
pub use metrics::{MetricsCalculator, PerformanceMetrics};
pub use portfolio::{Notification, PaperBook, PaperTrade, PortfolioError};
