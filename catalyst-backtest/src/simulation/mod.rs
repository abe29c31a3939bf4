//! Synthetic market generation.
//!
//! - Day-indexed price paths with a catalyst shock and benchmark series
//! - Market snapshots (spot, catalyst date, options chain) per company

pub mod market;
pub mod path;

pub use market::{generate_chain, MarketSnapshot, CATALYST_LEAD_DAYS, CHAIN_DTE};
pub use path::{CatalystShock, PathSimulator, SimulatedPath};
