//! Paper trading book.
//!
//! Handles the paper trade lifecycle:
//! - Execution (entry mark and dollar target/stop)
//! - Price updates (re-mark, close on target or stop)
//! - Manual close
//!
//! Marks use the live valuer (dollars for one contract per leg) with fixed
//! volatility and time-to-expiry assumptions per lifecycle stage.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::pricing::live_position_value;
use crate::strategy::Strategy;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Unknown paper trade: {0}")]
    UnknownTrade(u64),

    #[error("Paper trade {0} is already closed")]
    AlreadyClosed(u64),

    #[error("Invalid underlying price: {0}")]
    InvalidPrice(f64),

    #[error("Non-finite position value for {0}")]
    NonFiniteValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Status of a paper trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Reason a paper trade was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    /// Hit profit target.
    ProfitTarget,
    /// Hit stop loss.
    StopLoss,
    /// Closed by the user.
    Manual,
}

/// Kind of user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

/// A user-facing notification raised by the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    fn new(kind: NotificationKind, message: String) -> Self {
        Self { kind, message }
    }
}

/// Volatility and remaining days used to mark a position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkParams {
    pub volatility: f64,
    pub days_to_expiry: f64,
}

impl MarkParams {
    pub const fn new(volatility: f64, days_to_expiry: f64) -> Self {
        Self {
            volatility,
            days_to_expiry,
        }
    }
}

/// Mark assumptions for each lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkSchedule {
    pub entry: MarkParams,
    pub update: MarkParams,
    pub close: MarkParams,
}

impl Default for MarkSchedule {
    fn default() -> Self {
        Self {
            entry: MarkParams::new(1.5, 30.0),
            update: MarkParams::new(1.0, 15.0),
            close: MarkParams::new(0.4, 10.0),
        }
    }
}

/// An executed paper trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperTrade {
    pub id: u64,
    pub executed_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub strategy: Strategy,
    pub status: PositionStatus,
    pub exit_reason: Option<ExitReason>,
    /// Underlying price at execution.
    pub entry_price: Decimal,
    /// Position value at execution.
    pub entry_value: Decimal,
    pub current_value: Decimal,
    pub unrealized_pnl: Decimal,
    /// Dollar P/L at which the trade takes profit.
    pub target_pnl: Decimal,
    /// Dollar P/L at or below which the trade stops out (non-positive).
    pub stop_pnl: Decimal,
}

impl PaperTrade {
    /// Check if the trade is open.
    pub fn is_open(&self) -> bool {
        self.status == PositionStatus::Open
    }

    /// Unrealized P/L as a percentage of the absolute entry value.
    pub fn pnl_pct(&self) -> f64 {
        if self.entry_value.is_zero() {
            return 0.0;
        }
        let pnl: f64 = self.unrealized_pnl.try_into().unwrap_or(0.0);
        let basis: f64 = self.entry_value.abs().try_into().unwrap_or(1.0);
        pnl / basis * 100.0
    }

    fn close(&mut self, value: Decimal, reason: ExitReason, at: DateTime<Utc>) {
        self.current_value = value;
        self.unrealized_pnl = value - self.entry_value;
        self.status = PositionStatus::Closed;
        self.exit_reason = Some(reason);
        self.closed_at = Some(at);
    }
}

/// Collection of paper trades.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperBook {
    #[serde(default)]
    marks: MarkSchedule,
    trades: Vec<PaperTrade>,
    next_id: u64,
}

impl PaperBook {
    pub fn new(marks: MarkSchedule) -> Self {
        Self {
            marks,
            trades: Vec::new(),
            next_id: 0,
        }
    }

    /// Load a book from a JSON file, or start an empty one if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PortfolioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the book to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), PortfolioError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// All trades, newest first.
    pub fn trades(&self) -> impl Iterator<Item = &PaperTrade> {
        self.trades.iter().rev()
    }

    pub fn open_trades(&self) -> impl Iterator<Item = &PaperTrade> {
        self.trades().filter(|t| t.is_open())
    }

    pub fn get(&self, id: u64) -> Option<&PaperTrade> {
        self.trades.iter().find(|t| t.id == id)
    }

    /// Total unrealized P/L over open trades.
    pub fn open_pnl(&self) -> Decimal {
        self.open_trades().map(|t| t.unrealized_pnl).sum()
    }

    /// Open a paper trade at the given underlying price.
    pub fn execute(
        &mut self,
        strategy: Strategy,
        price: f64,
        now: DateTime<Utc>,
    ) -> Result<(u64, Notification), PortfolioError> {
        let entry_price = to_dollars(check_price(price)?, &strategy.ticker)?;
        let entry_value = mark(&strategy, price, self.marks.entry)?;

        let basis = entry_value.abs();
        let target_pnl = percent_of(strategy.target_profit_pct, basis, &strategy.ticker)?.round_dp(2);
        let stop_pnl = -percent_of(strategy.stop_loss_pct.abs(), basis, &strategy.ticker)?.round_dp(2);

        self.next_id += 1;
        let id = self.next_id;
        let message = format!("Executed paper trade for {}", strategy.ticker);

        info!(
            id,
            ticker = %strategy.ticker,
            %entry_value,
            %target_pnl,
            %stop_pnl,
            "Executed paper trade"
        );

        self.trades.push(PaperTrade {
            id,
            executed_at: now,
            closed_at: None,
            strategy,
            status: PositionStatus::Open,
            exit_reason: None,
            entry_price,
            entry_value,
            current_value: entry_value,
            unrealized_pnl: Decimal::ZERO,
            target_pnl,
            stop_pnl,
        });

        Ok((id, Notification::new(NotificationKind::Info, message)))
    }

    /// Re-mark open trades on `ticker`, closing any that reach target or stop.
    pub fn on_price(
        &mut self,
        ticker: &str,
        price: f64,
        now: DateTime<Utc>,
    ) -> Result<Vec<Notification>, PortfolioError> {
        let price = check_price(price)?;
        let ticker = ticker.to_uppercase();
        let params = self.marks.update;
        let mut notifications = Vec::new();

        for trade in self
            .trades
            .iter_mut()
            .filter(|t| t.is_open() && t.strategy.ticker == ticker)
        {
            let value = mark(&trade.strategy, price, params)?;
            let pnl = value - trade.entry_value;

            if pnl >= trade.target_pnl {
                trade.close(value, ExitReason::ProfitTarget, now);
                info!(id = trade.id, %pnl, "Paper trade hit profit target");
                notifications.push(Notification::new(
                    NotificationKind::Success,
                    format!("{} Take-Profit hit at {}", ticker, format_dollars(pnl)),
                ));
            } else if pnl <= trade.stop_pnl {
                trade.close(value, ExitReason::StopLoss, now);
                info!(id = trade.id, %pnl, "Paper trade stopped out");
                notifications.push(Notification::new(
                    NotificationKind::Error,
                    format!("{} Stop-Loss triggered at {}", ticker, format_dollars(pnl)),
                ));
            } else {
                debug!(id = trade.id, %value, %pnl, "Re-marked paper trade");
                trade.current_value = value;
                trade.unrealized_pnl = pnl;
            }
        }

        Ok(notifications)
    }

    /// Close an open trade at the given underlying price.
    pub fn close(
        &mut self,
        id: u64,
        price: f64,
        now: DateTime<Utc>,
    ) -> Result<&PaperTrade, PortfolioError> {
        let price = check_price(price)?;
        let params = self.marks.close;
        let trade = self
            .trades
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(PortfolioError::UnknownTrade(id))?;
        if !trade.is_open() {
            return Err(PortfolioError::AlreadyClosed(id));
        }

        let value = mark(&trade.strategy, price, params)?;
        trade.close(value, ExitReason::Manual, now);
        info!(id, pnl = %trade.unrealized_pnl, "Closed paper trade");

        Ok(&*trade)
    }
}

fn mark(strategy: &Strategy, price: f64, params: MarkParams) -> Result<Decimal, PortfolioError> {
    let value = live_position_value(&strategy.legs, price, params.volatility, params.days_to_expiry);
    to_dollars(value, &strategy.ticker)
}

fn check_price(price: f64) -> Result<f64, PortfolioError> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(PortfolioError::InvalidPrice(price))
    }
}

fn to_dollars(value: f64, ticker: &str) -> Result<Decimal, PortfolioError> {
    Decimal::try_from(value)
        .map(|d| d.round_dp(2))
        .map_err(|_| PortfolioError::NonFiniteValue(ticker.to_string()))
}

fn percent_of(pct: f64, basis: Decimal, ticker: &str) -> Result<Decimal, PortfolioError> {
    let pct = Decimal::try_from(pct).map_err(|_| PortfolioError::NonFiniteValue(ticker.to_string()))?;
    Ok(pct / Decimal::ONE_HUNDRED * basis)
}

/// `$12.34` / `-$12.34`.
fn format_dollars(amount: Decimal) -> String {
    let sign = if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{}${:.2}", sign, amount.abs().round_dp(2))
}
