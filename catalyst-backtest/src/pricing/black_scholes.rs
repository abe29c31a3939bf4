//! Closed-form Black-Scholes pricing for European options.
//!
//! The standard normal CDF uses the Zelen-Severo polynomial
//! (Abramowitz & Stegun 26.2.17), accurate to about 7.5e-8. Prices must
//! match the reference valuations built on that polynomial, so the exact
//! `statrs` normal is only used in tests to bound its error.

use crate::data::OptionType;

/// Annualized risk-free rate used throughout the engine.
pub const RISK_FREE_RATE: f64 = 0.02;

/// Calendar days per year used to convert days to expiry into years.
pub const DAYS_PER_YEAR: f64 = 365.0;

const P: f64 = 0.231_641_9;
const B1: f64 = 0.319_381_530;
const B2: f64 = -0.356_563_782;
const B3: f64 = 1.781_477_937;
const B4: f64 = -1.821_255_978;
const B5: f64 = 1.330_274_429;
const INV_SQRT_2PI: f64 = 0.398_942_28;

/// Standard normal CDF.
pub fn norm_cdf(x: f64) -> f64 {
    let t = 1.0 / (1.0 + P * x.abs());
    let poly = t * (B1 + t * (B2 + t * (B3 + t * (B4 + t * B5))));
    let tail = INV_SQRT_2PI * (-0.5 * x * x).exp() * poly;
    if x >= 0.0 {
        1.0 - tail
    } else {
        tail
    }
}

/// Intrinsic value of an option at expiry.
pub fn intrinsic(spot: f64, strike: f64, opt_type: OptionType) -> f64 {
    match opt_type {
        OptionType::Call => (spot - strike).max(0.0),
        OptionType::Put => (strike - spot).max(0.0),
    }
}

/// Black-Scholes calculator for options pricing.
#[derive(Debug, Clone, Copy)]
pub struct BlackScholes {
    /// Risk-free interest rate
    pub rate: f64,
}

impl Default for BlackScholes {
    fn default() -> Self {
        Self {
            rate: RISK_FREE_RATE,
        }
    }
}

impl BlackScholes {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    /// Returns (d1, d2), or None when `vol * sqrt(time)` is not positive.
    fn d1_d2(&self, spot: f64, strike: f64, time: f64, vol: f64) -> Option<(f64, f64)> {
        if time <= 0.0 {
            return None;
        }
        let vol_sqrt_t = vol * time.sqrt();
        if vol_sqrt_t <= 0.0 || !vol_sqrt_t.is_finite() {
            return None;
        }
        let d1 = ((spot / strike).ln() + (self.rate + 0.5 * vol * vol) * time) / vol_sqrt_t;
        Some((d1, d1 - vol_sqrt_t))
    }

    /// Calculate call option price.
    pub fn call_price(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        match self.d1_d2(spot, strike, time, vol) {
            Some((d1, d2)) => {
                let price =
                    spot * norm_cdf(d1) - strike * (-self.rate * time).exp() * norm_cdf(d2);
                price.max(0.0)
            }
            None => intrinsic(spot, strike, OptionType::Call),
        }
    }

    /// Calculate put option price.
    pub fn put_price(&self, spot: f64, strike: f64, time: f64, vol: f64) -> f64 {
        match self.d1_d2(spot, strike, time, vol) {
            Some((d1, d2)) => {
                let price =
                    strike * (-self.rate * time).exp() * norm_cdf(-d2) - spot * norm_cdf(-d1);
                price.max(0.0)
            }
            None => intrinsic(spot, strike, OptionType::Put),
        }
    }

    /// Calculate option price based on type.
    pub fn price(&self, spot: f64, strike: f64, time: f64, vol: f64, opt_type: OptionType) -> f64 {
        match opt_type {
            OptionType::Call => self.call_price(spot, strike, time, vol),
            OptionType::Put => self.put_price(spot, strike, time, vol),
        }
    }
}

/// Price a single option with an explicit rate.
pub fn price(
    spot: f64,
    strike: f64,
    time_to_expiry: f64,
    rate: f64,
    vol: f64,
    opt_type: OptionType,
) -> f64 {
    BlackScholes::new(rate).price(spot, strike, time_to_expiry, vol, opt_type)
}
