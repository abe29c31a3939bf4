//! Paper trading.
//!
//! Tracks executed strategies against live prices:
//! - Entry marks with dollar take-profit / stop-loss levels
//! - Automatic close on target or stop with notifications
//! - Manual close and JSON persistence

pub mod paper;

pub use paper::{
    ExitReason, MarkParams, MarkSchedule, Notification, NotificationKind, PaperBook, PaperTrade,
    PortfolioError, PositionStatus,
};
