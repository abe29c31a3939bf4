//! Strategy model and ingestion.

pub mod definition;

pub use definition::{
    parse_percentage, Rationale, ReportedGreeks, Strategy, StrategyDefinition, StrategyError,
    TradeDetails,
};
