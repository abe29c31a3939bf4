//! Strategy ingestion.
//!
//! Strategy definitions arrive from collaborators as JSON with thresholds
//! expressed as free-text percentages ("50%", "-25 %", "$1,200"). They are
//! parsed once here into a typed [`Strategy`]; the backtest never sees the
//! raw strings.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::OptionLeg;

#[derive(Error, Debug)]
pub enum StrategyError {
    #[error("strategy '{0}' has no legs")]
    EmptyLegs(String),

    #[error("leg {index} has invalid strike {strike}")]
    InvalidStrike { index: usize, strike: f64 },

    #[error("invalid {field} threshold: '{value}'")]
    InvalidThreshold { field: &'static str, value: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rationale block supplied with a strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rationale {
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub risk_considerations: Vec<String>,
}

/// Sensitivities reported by the strategy author. Carried, not computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportedGreeks {
    pub delta: f64,
    pub theta: f64,
    pub vega: f64,
}

/// Trade block of the wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDetails {
    pub legs: Vec<OptionLeg>,
    #[serde(default)]
    pub entry_price: String,
    pub target_profit: String,
    pub stop_loss: String,
    #[serde(default)]
    pub position_size: String,
    #[serde(default)]
    pub max_risk: String,
}

/// Strategy as produced by the strategy-generation collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDefinition {
    pub strategy_name: String,
    #[serde(default)]
    pub strategy_type: Option<String>,
    pub ticker: String,
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub rationale: Rationale,
    #[serde(default)]
    pub greeks: Option<ReportedGreeks>,
    pub trade_details: TradeDetails,
}

impl StrategyDefinition {
    pub fn from_json(json: &str) -> Result<Self, StrategyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate and convert into the typed strategy.
    pub fn parse(self) -> Result<Strategy, StrategyError> {
        let details = self.trade_details;
        let target_profit_pct = parse_percentage("target profit", &details.target_profit)?;
        let stop_loss_pct = parse_percentage("stop loss", &details.stop_loss)?;

        let mut strategy = Strategy::new(
            &self.strategy_name,
            &self.ticker,
            details.legs,
            target_profit_pct,
            stop_loss_pct,
        )?;
        strategy.strategy_type = self.strategy_type;
        strategy.analysis = self.analysis;
        strategy.rationale = self.rationale;
        strategy.greeks = self.greeks;
        strategy.entry_price = details.entry_price;
        strategy.position_size = details.position_size;
        strategy.max_risk = details.max_risk;
        Ok(strategy)
    }
}

/// Parse a free-text percentage by keeping only digits, '.' and '-'.
pub fn parse_percentage(field: &'static str, raw: &str) -> Result<f64, StrategyError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(StrategyError::InvalidThreshold {
            field,
            value: raw.to_string(),
        }),
    }
}

/// A validated multi-leg option strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub strategy_type: Option<String>,
    pub ticker: String,
    pub legs: Vec<OptionLeg>,
    /// Take-profit threshold, percent of cost basis.
    pub target_profit_pct: f64,
    /// Stop-loss threshold, percent of cost basis. Sign is ignored.
    pub stop_loss_pct: f64,
    pub analysis: String,
    pub rationale: Rationale,
    pub greeks: Option<ReportedGreeks>,
    pub entry_price: String,
    pub position_size: String,
    pub max_risk: String,
}

impl Strategy {
    pub fn new(
        name: &str,
        ticker: &str,
        legs: Vec<OptionLeg>,
        target_profit_pct: f64,
        stop_loss_pct: f64,
    ) -> Result<Self, StrategyError> {
        if legs.is_empty() {
            return Err(StrategyError::EmptyLegs(name.to_string()));
        }
        if let Some((index, leg)) = legs
            .iter()
            .enumerate()
            .find(|(_, l)| !(l.strike.is_finite() && l.strike > 0.0))
        {
            return Err(StrategyError::InvalidStrike {
                index,
                strike: leg.strike,
            });
        }
        for (field, value) in [
            ("target profit", target_profit_pct),
            ("stop loss", stop_loss_pct),
        ] {
            if !value.is_finite() {
                return Err(StrategyError::InvalidThreshold {
                    field,
                    value: value.to_string(),
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            strategy_type: None,
            ticker: ticker.to_uppercase(),
            legs,
            target_profit_pct,
            stop_loss_pct,
            analysis: String::new(),
            rationale: Rationale::default(),
            greeks: None,
            entry_price: String::new(),
            position_size: String::new(),
            max_risk: String::new(),
        })
    }

    /// Stop-loss level as a negative percentage.
    pub fn stop_level_pct(&self) -> f64 {
        -self.stop_loss_pct.abs()
    }

    pub fn average_strike(&self) -> f64 {
        self.legs.iter().map(|l| l.strike).sum::<f64>() / self.legs.len() as f64
    }

    pub fn num_legs(&self) -> usize {
        self.legs.len()
    }
}
