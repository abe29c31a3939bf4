//! Volatility regime classification module.
//!
//! Categorizes tickers by sector:
//! - Biotechnology: high volatility, large binary shock, deep IV crush
//! - Technology (and anything unknown): moderate volatility

pub mod classifier;

pub use classifier::{
    builtin, classify, Company, RegimeProfile, Sector, SectorClassifier, VolatilityRegime,
};
