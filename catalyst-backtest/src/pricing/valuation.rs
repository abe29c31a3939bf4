//! Mark-to-market valuation of multi-leg positions.
//!
//! Two entry points with different units:
//! - [`position_value`]: theoretical price units, used by the backtest and
//!   normalized against the initial cost basis.
//! - [`live_position_value`]: dollars for one contract per leg, used to mark
//!   executed paper trades.

use crate::data::OptionLeg;

use super::black_scholes::{BlackScholes, DAYS_PER_YEAR};

/// Shares represented by one option contract.
pub const CONTRACT_MULTIPLIER: f64 = 100.0;

/// Signed theoretical value of all legs at the default rate.
///
/// Bought legs contribute `+price`, sold legs `-price`.
pub fn position_value(legs: &[OptionLeg], spot: f64, vol: f64, days_to_expiry: f64) -> f64 {
    position_value_with(&BlackScholes::default(), legs, spot, vol, days_to_expiry)
}

/// Signed theoretical value of all legs priced with `bs`.
pub fn position_value_with(
    bs: &BlackScholes,
    legs: &[OptionLeg],
    spot: f64,
    vol: f64,
    days_to_expiry: f64,
) -> f64 {
    let time = days_to_expiry.max(0.0) / DAYS_PER_YEAR;

    legs.iter()
        .map(|leg| leg.action.sign() * bs.price(spot, leg.strike, time, vol, leg.option_type))
        .sum()
}

/// Dollar value of one contract per leg.
pub fn live_position_value(legs: &[OptionLeg], spot: f64, vol: f64, days_to_expiry: f64) -> f64 {
    position_value(legs, spot, vol, days_to_expiry) * CONTRACT_MULTIPLIER
}
