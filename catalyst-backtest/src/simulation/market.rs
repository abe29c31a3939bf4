//! Synthetic market snapshot for a covered company.
//!
//! Stands in for a market-data feed: a spot price, the date of the next
//! catalyst and a five-strike options chain priced off a sector-dependent
//! implied volatility with a linear skew.

use chrono::{Duration, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::data::{OptionQuote, OptionType, OptionsChain};
use crate::pricing::{BlackScholes, DAYS_PER_YEAR};
use crate::regime::{Company, VolatilityRegime};

/// Days from today to the simulated catalyst.
pub const CATALYST_LEAD_DAYS: i64 = 25;

/// Tenor of the quoted chain.
pub const CHAIN_DTE: f64 = 30.0;

const STRIKE_STEP: f64 = 5.0;
const STRIKE_OFFSETS: [f64; 5] = [-2.0, -1.0, 0.0, 1.0, 2.0];
const SKEW_PER_POINT: f64 = 0.5;
const IV_NOISE: f64 = 5.0;
const HALF_SPREAD_PCT: f64 = 0.05;
const MIN_BID: f64 = 0.01;
const MIN_REPORTED_IV: f64 = 50.0;
const MIN_PRICING_IV: f64 = 1.0;

/// Spot, catalyst date and chain for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    pub stock_price: f64,
    pub catalyst_date: NaiveDate,
    /// Base implied volatility in percent.
    pub implied_volatility: f64,
    pub options_chain: OptionsChain,
}

impl MarketSnapshot {
    /// Generate a snapshot for `company` as of `today`.
    pub fn generate(company: &Company, today: NaiveDate, rng: &mut impl Rng) -> Self {
        let stock_price = 50.0 + rng.random::<f64>() * 450.0;
        let (iv_base, iv_span) = company.sector.regime().quoted_iv();
        let implied_volatility = iv_base + rng.random::<f64>() * iv_span;

        Self {
            ticker: company.ticker.clone(),
            stock_price,
            catalyst_date: today + Duration::days(CATALYST_LEAD_DAYS),
            implied_volatility,
            options_chain: generate_chain(stock_price, implied_volatility, rng),
        }
    }

    /// Regime implied by the snapshot's volatility level.
    pub fn regime(&self) -> VolatilityRegime {
        if self.implied_volatility >= VolatilityRegime::HighVolatility.quoted_iv().0 {
            VolatilityRegime::HighVolatility
        } else {
            VolatilityRegime::Moderate
        }
    }
}

/// Build a five-strike chain around `stock_price`.
///
/// `volatility` is in percent. Both sides share a half-spread of 5% of the
/// call's theoretical price.
pub fn generate_chain(stock_price: f64, volatility: f64, rng: &mut impl Rng) -> OptionsChain {
    let bs = BlackScholes::default();
    let time = CHAIN_DTE / DAYS_PER_YEAR;
    let atm = (stock_price / STRIKE_STEP).round() * STRIKE_STEP;
    let mut chain = OptionsChain::default();

    for offset in STRIKE_OFFSETS {
        let strike = atm + offset * STRIKE_STEP;
        let call_iv =
            volatility + (stock_price - strike) * SKEW_PER_POINT + rng.random::<f64>() * IV_NOISE;
        let put_iv =
            volatility + (strike - stock_price) * SKEW_PER_POINT + rng.random::<f64>() * IV_NOISE;

        let call_price = bs.call_price(stock_price, strike, time, call_iv.max(MIN_PRICING_IV) / 100.0);
        let put_price = bs.put_price(stock_price, strike, time, put_iv.max(MIN_PRICING_IV) / 100.0);
        let spread = call_price * HALF_SPREAD_PCT;

        let call_volume = 200 + (rng.random::<f64>() * 5000.0) as u64;
        let put_volume = 200 + (rng.random::<f64>() * 5000.0) as u64;

        chain.add_quote(OptionQuote {
            strike,
            option_type: OptionType::Call,
            bid: (call_price - spread).max(MIN_BID),
            ask: call_price + spread,
            iv: call_iv.max(MIN_REPORTED_IV),
            volume: call_volume,
        });
        chain.add_quote(OptionQuote {
            strike,
            option_type: OptionType::Put,
            bid: (put_price - spread).max(MIN_BID),
            ask: put_price + spread,
            iv: put_iv.max(MIN_REPORTED_IV),
            volume: put_volume,
        });
    }

    chain
}
