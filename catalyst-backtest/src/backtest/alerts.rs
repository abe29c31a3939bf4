//! Threshold and event alerts raised during a run.
//!
//! Profit and loss alerts latch: each fires at most once per run, and at
//! most one of the two fires on any given day.

use serde::{Deserialize, Serialize};

/// Kind of alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    /// Take-profit threshold reached.
    Profit,
    /// Stop-loss threshold breached.
    Loss,
    /// Informational event (catalyst).
    Info,
}

impl AlertKind {
    /// Whether the alert comes from a P/L threshold.
    pub fn is_threshold(&self) -> bool {
        matches!(self, Self::Profit | Self::Loss)
    }
}

/// An alert attached to a simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub day: u32,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn profit(day: u32, target_pct: f64) -> Self {
        Self {
            day,
            kind: AlertKind::Profit,
            message: format!("Take-Profit target of {}% hit.", target_pct),
        }
    }

    pub fn loss(day: u32, stop_level_pct: f64) -> Self {
        Self {
            day,
            kind: AlertKind::Loss,
            message: format!("Stop-Loss of {}% triggered.", stop_level_pct),
        }
    }

    pub fn catalyst(day: u32, pre_iv: f64, post_iv: f64) -> Self {
        Self {
            day,
            kind: AlertKind::Info,
            message: format!(
                "Catalyst Event Occurred. IV crushed from {:.0}% to {:.0}%.",
                pre_iv * 100.0,
                post_iv * 100.0
            ),
        }
    }
}

/// Latched take-profit / stop-loss state for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertLatch {
    pub target_hit: bool,
    pub stop_hit: bool,
}

impl AlertLatch {
    /// Check thresholds for one day; the profit check runs first and wins.
    ///
    /// `stop_level_pct` is the (negative) level at or below which the stop
    /// triggers.
    pub fn evaluate(
        &mut self,
        day: u32,
        profit_loss_pct: f64,
        target_pct: f64,
        stop_level_pct: f64,
    ) -> Option<Alert> {
        if !self.target_hit && profit_loss_pct >= target_pct {
            self.target_hit = true;
            return Some(Alert::profit(day, target_pct));
        }
        if !self.stop_hit && profit_loss_pct <= stop_level_pct {
            self.stop_hit = true;
            return Some(Alert::loss(day, stop_level_pct));
        }
        None
    }
}
