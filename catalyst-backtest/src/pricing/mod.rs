//! Option pricing and position valuation.
//!
//! - Black-Scholes closed-form pricing with a polynomial normal CDF
//! - Signed multi-leg valuation in theoretical units
//! - Dollar-notional valuation for executed positions

pub mod black_scholes;
pub mod valuation;

pub use black_scholes::{norm_cdf, price, BlackScholes, DAYS_PER_YEAR, RISK_FREE_RATE};
pub use valuation::{live_position_value, position_value, position_value_with, CONTRACT_MULTIPLIER};
