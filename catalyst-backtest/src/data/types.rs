//! Core data types for strategy valuation.
//!
//! These types represent the fundamental data structures shared by the
//! pricer, the path simulator and the backtest engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "C" | "CALL" => Some(Self::Call),
            "P" | "PUT" => Some(Self::Put),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "CALL",
            Self::Put => "PUT",
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a leg is bought or sold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LegAction {
    Buy,
    Sell,
}

impl LegAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "BUY" | "B" | "LONG" => Some(Self::Buy),
            "SELL" | "S" | "SHORT" => Some(Self::Sell),
            _ => None,
        }
    }

    /// Sign applied to a leg's value when marking the position.
    pub fn sign(&self) -> f64 {
        match self {
            Self::Buy => 1.0,
            Self::Sell => -1.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for LegAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single option position within a strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionLeg {
    /// Buy or sell.
    pub action: LegAction,
    /// Call or put.
    #[serde(rename = "type")]
    pub option_type: OptionType,
    /// Strike price.
    pub strike: f64,
    /// Expiry label as supplied by the strategy author (e.g. "2024-07-19").
    pub expiry: String,
}

impl OptionLeg {
    pub fn new(action: LegAction, option_type: OptionType, strike: f64, expiry: &str) -> Self {
        Self {
            action,
            option_type,
            strike,
            expiry: expiry.to_string(),
        }
    }
}

impl fmt::Display for OptionLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.2} {}",
            self.action, self.option_type, self.strike, self.expiry
        )
    }
}

/// One simulated trading day of the underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// Day index, 1-based.
    pub day: u32,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// A single quoted option contract in a synthetic chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionQuote {
    pub strike: f64,
    pub option_type: OptionType,
    pub bid: f64,
    pub ask: f64,
    /// Implied volatility in percent (e.g. 85.0 = 85%).
    pub iv: f64,
    pub volume: u64,
}

/// Calls and puts for a single expiration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionsChain {
    pub calls: Vec<OptionQuote>,
    pub puts: Vec<OptionQuote>,
}

impl OptionsChain {
    /// Add a quote to the appropriate side.
    pub fn add_quote(&mut self, quote: OptionQuote) {
        match quote.option_type {
            OptionType::Call => self.calls.push(quote),
            OptionType::Put => self.puts.push(quote),
        }
    }

    /// Get all strikes available in this chain, ascending.
    pub fn strikes(&self) -> Vec<f64> {
        let mut strikes: Vec<_> = self
            .calls
            .iter()
            .chain(self.puts.iter())
            .map(|q| q.strike)
            .collect();
        strikes.sort_by(|a, b| a.total_cmp(b));
        strikes.dedup();
        strikes
    }

    pub fn call_at_strike(&self, strike: f64) -> Option<&OptionQuote> {
        self.calls.iter().find(|q| q.strike == strike)
    }

    pub fn put_at_strike(&self, strike: f64) -> Option<&OptionQuote> {
        self.puts.iter().find(|q| q.strike == strike)
    }

    pub fn total_quotes(&self) -> usize {
        self.calls.len() + self.puts.len()
    }
}
