//! Core backtesting engine.
//!
//! Runs the simulation loop as a fold over an explicit run state:
//! 1. Value the strategy at entry and fix the cost basis
//! 2. For each simulated day, pick the volatility regime (pre/post catalyst)
//! 3. Revalue the strategy at the day's close and remaining time
//! 4. Evaluate latched profit/loss thresholds and the catalyst event
//! 5. Record the daily result
//! 6. Compute performance metrics over the full run

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{BacktestConfig, ConfigError};
use crate::data::DailyBar;
use crate::metrics::{MetricsCalculator, PerformanceMetrics};
use crate::pricing::{position_value_with, BlackScholes};
use crate::regime::{RegimeProfile, VolatilityRegime};
use crate::simulation::{CatalystShock, PathSimulator, SimulatedPath};
use crate::strategy::{Strategy, StrategyError};

use super::alerts::{Alert, AlertLatch};

/// Initial values at or below this are considered degenerate.
const MIN_INITIAL_VALUE: f64 = 0.01;

/// Fraction of the average strike used as fallback cost basis.
const FALLBACK_STRIKE_FRACTION: f64 = 0.1;

/// Absolute floor on the cost basis.
const MIN_COST_BASIS: f64 = 0.01;

#[derive(Error, Debug)]
pub enum BacktestError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("Initial spot must be positive, got {0}")]
    InvalidSpot(f64),

    #[error("Path has {actual} days, expected {expected}")]
    PathLength { expected: usize, actual: usize },

    #[error("Path catalyst falls on day {actual}, expected day {expected}")]
    CatalystDay { expected: u32, actual: u32 },
}

/// Result of one simulated day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyResult {
    pub day: u32,
    /// P/L as a percentage of cost basis.
    pub profit_loss_pct: f64,
    pub bar: DailyBar,
    /// Alerts raised this day: threshold alert first, then the catalyst.
    pub alerts: Vec<Alert>,
}

impl DailyResult {
    /// The alert to display for this day.
    ///
    /// A profit/loss alert takes precedence over the catalyst notice when
    /// both fire on the same day; the full list stays in `alerts`.
    pub fn alert(&self) -> Option<&Alert> {
        self.alerts
            .iter()
            .find(|a| a.kind.is_threshold())
            .or_else(|| self.alerts.first())
    }
}

/// Entry valuation of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialValuation {
    /// Negated position value: what opening the position pays (negative)
    /// or receives (positive).
    pub initial_value: f64,
    /// Denominator for percentage P/L, strictly positive.
    pub cost_basis: f64,
    /// Whether the strike-based fallback was used.
    pub fallback: bool,
}

/// Output of a completed backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestOutcome {
    pub strategy_name: String,
    pub ticker: String,
    pub profile: RegimeProfile,
    pub initial_value: f64,
    pub cost_basis: f64,
    pub shock: CatalystShock,
    pub results: Vec<DailyResult>,
    pub metrics: PerformanceMetrics,
}

impl BacktestOutcome {
    /// All alerts in day order.
    pub fn alerts(&self) -> impl Iterator<Item = &Alert> {
        self.results.iter().flat_map(|r| r.alerts.iter())
    }

    pub fn final_profit_loss_pct(&self) -> f64 {
        self.results.last().map(|r| r.profit_loss_pct).unwrap_or(0.0)
    }

    /// Lowest daily P/L seen during the run.
    pub fn worst_profit_loss_pct(&self) -> f64 {
        self.results
            .iter()
            .map(|r| r.profit_loss_pct)
            .fold(f64::INFINITY, f64::min)
    }

    /// Highest daily P/L seen during the run.
    pub fn best_profit_loss_pct(&self) -> f64 {
        self.results
            .iter()
            .map(|r| r.profit_loss_pct)
            .fold(f64::NEG_INFINITY, f64::max)
    }

    /// Generate summary string.
    pub fn summary(&self) -> String {
        let alerts: Vec<String> = self
            .alerts()
            .map(|a| format!("  Day {:>2}: {}", a.day, a.message))
            .collect();

        format!(
            "Backtest Results: {} ({})\n\
             ----------------------------------------\n\
             Initial Value: {:.2}\n\
             Cost Basis: {:.2}\n\
             Catalyst Shock: {:+.1}%\n\
             Final P/L: {:.2}%\n\
             Best / Worst P/L: {:.2}% / {:.2}%\n\
             \n\
             Alerts:\n{}\n\
             \n\
             {}",
            self.strategy_name,
            self.ticker,
            self.initial_value,
            self.cost_basis,
            self.shock.direction * self.shock.magnitude * 100.0,
            self.final_profit_loss_pct(),
            self.best_profit_loss_pct(),
            self.worst_profit_loss_pct(),
            alerts.join("\n"),
            self.metrics.summary(),
        )
    }
}

/// Per-run state threaded through the daily fold.
#[derive(Debug, Default)]
struct RunState {
    latch: AlertLatch,
    results: Vec<DailyResult>,
}

/// The main backtesting engine.
#[derive(Debug, Clone)]
pub struct BacktestEngine {
    config: BacktestConfig,
    /// Pricer at the configured risk-free rate.
    pricer: BlackScholes,
}

impl Default for BacktestEngine {
    fn default() -> Self {
        let config = BacktestConfig::default();
        Self {
            pricer: BlackScholes::new(config.risk_free_rate),
            config,
        }
    }
}

impl BacktestEngine {
    /// Create a new backtest engine.
    pub fn new(config: BacktestConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        Ok(Self {
            pricer: BlackScholes::new(config.risk_free_rate),
            config,
        })
    }

    /// Simulate a path for `regime` and run the strategy over it.
    pub fn run(
        &self,
        strategy: &Strategy,
        initial_spot: f64,
        regime: VolatilityRegime,
        rng: &mut impl Rng,
    ) -> Result<BacktestOutcome, BacktestError> {
        self.run_with_profile(strategy, initial_spot, regime.profile(), rng)
    }

    /// Simulate a path for an explicit regime profile and run the strategy over it.
    pub fn run_with_profile(
        &self,
        strategy: &Strategy,
        initial_spot: f64,
        profile: RegimeProfile,
        rng: &mut impl Rng,
    ) -> Result<BacktestOutcome, BacktestError> {
        if !(initial_spot.is_finite() && initial_spot > 0.0) {
            return Err(BacktestError::InvalidSpot(initial_spot));
        }

        let simulator = PathSimulator::new(self.config.clone(), profile);
        let path = simulator.simulate(initial_spot, rng);
        self.run_on_path(strategy, &path, simulator.profile())
    }

    /// Run the strategy over an existing path.
    pub fn run_on_path(
        &self,
        strategy: &Strategy,
        path: &SimulatedPath,
        profile: &RegimeProfile,
    ) -> Result<BacktestOutcome, BacktestError> {
        let days = self.config.days;
        let catalyst_day = self.config.catalyst_day;

        if path.days() != days as usize {
            return Err(BacktestError::PathLength {
                expected: days as usize,
                actual: path.days(),
            });
        }
        if path.catalyst_day != catalyst_day {
            return Err(BacktestError::CatalystDay {
                expected: catalyst_day,
                actual: path.catalyst_day,
            });
        }
        if !(path.initial_spot.is_finite() && path.initial_spot > 0.0) {
            return Err(BacktestError::InvalidSpot(path.initial_spot));
        }

        info!(
            strategy = %strategy.name,
            ticker = %strategy.ticker,
            legs = strategy.num_legs(),
            initial_spot = path.initial_spot,
            "Starting backtest"
        );

        let entry = self.initial_valuation(strategy, path.initial_spot, profile.pre_catalyst_iv);
        if entry.fallback {
            warn!(
                initial_value = entry.initial_value,
                cost_basis = entry.cost_basis,
                "Initial value near zero, using strike-based cost basis"
            );
        }

        let target_pct = strategy.target_profit_pct;
        let stop_level_pct = strategy.stop_level_pct();

        let state = path
            .bars
            .iter()
            .fold(RunState::default(), |mut state, bar| {
                let day = bar.day;
                let vol = profile.iv_for_day(day, catalyst_day);
                let days_to_expiry = f64::from(days.saturating_sub(day));
                let current_value =
                    position_value_with(&self.pricer, &strategy.legs, bar.close, vol, days_to_expiry);
                let profit_loss_pct =
                    (entry.initial_value + current_value) / entry.cost_basis * 100.0;

                let mut alerts = Vec::new();
                if let Some(alert) =
                    state
                        .latch
                        .evaluate(day, profit_loss_pct, target_pct, stop_level_pct)
                {
                    debug!(day, kind = ?alert.kind, profit_loss_pct, "Threshold alert");
                    alerts.push(alert);
                }
                if day == catalyst_day {
                    alerts.push(Alert::catalyst(
                        day,
                        profile.pre_catalyst_iv,
                        profile.post_catalyst_iv,
                    ));
                }

                state.results.push(DailyResult {
                    day,
                    profit_loss_pct,
                    bar: bar.clone(),
                    alerts,
                });
                state
            });

        let metrics = MetricsCalculator::analyze(
            &state.results,
            &path.stock_returns,
            &path.market_returns,
            self.config.risk_free_rate,
        );

        let outcome = BacktestOutcome {
            strategy_name: strategy.name.clone(),
            ticker: strategy.ticker.clone(),
            profile: *profile,
            initial_value: entry.initial_value,
            cost_basis: entry.cost_basis,
            shock: path.shock,
            results: state.results,
            metrics,
        };

        info!(
            strategy = %outcome.strategy_name,
            final_pl = outcome.final_profit_loss_pct(),
            sharpe = outcome.metrics.sharpe_ratio,
            target_hit = state.latch.target_hit,
            stop_hit = state.latch.stop_hit,
            "Backtest complete"
        );

        Ok(outcome)
    }

    /// Value the strategy at entry and derive its cost basis.
    pub fn initial_valuation(&self, strategy: &Strategy, spot: f64, vol: f64) -> InitialValuation {
        let initial_value = -position_value_with(
            &self.pricer,
            &strategy.legs,
            spot,
            vol,
            f64::from(self.config.days),
        );

        if initial_value.abs() > MIN_INITIAL_VALUE {
            InitialValuation {
                initial_value,
                cost_basis: initial_value.abs(),
                fallback: false,
            }
        } else {
            InitialValuation {
                initial_value,
                cost_basis: (strategy.average_strike() * FALLBACK_STRIKE_FRACTION)
                    .max(MIN_COST_BASIS),
                fallback: true,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::AlertKind;
    use crate::data::{LegAction, OptionLeg, OptionType};
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn long_call(strike: f64, target: f64, stop: f64) -> Strategy {
        Strategy::new(
            "Long Call",
            "AAPL",
            vec![OptionLeg::new(LegAction::Buy, OptionType::Call, strike, "30D")],
            target,
            stop,
        )
        .unwrap()
    }

    fn iron_condor() -> Strategy {
        Strategy::new(
            "Iron Condor",
            "MRNA",
            vec![
                OptionLeg::new(LegAction::Sell, OptionType::Put, 90.0, "30D"),
                OptionLeg::new(LegAction::Buy, OptionType::Put, 80.0, "30D"),
                OptionLeg::new(LegAction::Sell, OptionType::Call, 110.0, "30D"),
                OptionLeg::new(LegAction::Buy, OptionType::Call, 120.0, "30D"),
            ],
            50.0,
            100.0,
        )
        .unwrap()
    }

    /// 30 closes at `base` with overrides.
    fn closes(base: f64, overrides: &[(usize, f64)]) -> Vec<f64> {
        let mut closes = vec![base; 30];
        for &(day, close) in overrides {
            closes[day - 1] = close;
        }
        closes
    }

    #[test]
    fn test_reference_entry_valuation() {
        let engine = BacktestEngine::default();
        let entry = engine.initial_valuation(&long_call(100.0, 50.0, 50.0), 100.0, 0.30);
        assert!((entry.initial_value + 3.52).abs() <= 0.02);
        assert!((entry.cost_basis - 3.52).abs() <= 0.02);
        assert_eq!(entry.cost_basis, entry.initial_value.abs());
        assert!(!entry.fallback);
    }

    #[test]
    fn test_degenerate_entry_uses_strike_fallback() {
        let engine = BacktestEngine::default();
        let strategy = Strategy::new(
            "Flat",
            "AAPL",
            vec![
                OptionLeg::new(LegAction::Buy, OptionType::Call, 100.0, "30D"),
                OptionLeg::new(LegAction::Sell, OptionType::Call, 100.0, "30D"),
            ],
            50.0,
            50.0,
        )
        .unwrap();
        let entry = engine.initial_valuation(&strategy, 100.0, 0.8);
        assert_eq!(entry.initial_value, 0.0);
        assert_eq!(entry.cost_basis, 10.0);
        assert!(entry.fallback);
    }

    #[test]
    fn test_day_count_invariant() {
        let engine = BacktestEngine::default();
        for (seed, regime) in [
            (1, VolatilityRegime::Moderate),
            (2, VolatilityRegime::HighVolatility),
        ] {
            for strategy in [long_call(100.0, 50.0, 50.0), iron_condor()] {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let outcome = engine.run(&strategy, 100.0, regime, &mut rng).unwrap();
                assert_eq!(outcome.results.len(), 30);
                assert_eq!(outcome.results[19].day, 20);
                for (i, result) in outcome.results.iter().enumerate() {
                    assert_eq!(result.day, i as u32 + 1);
                    assert!(result.bar.close > 0.0);
                }
            }
        }
    }

    #[test]
    fn test_info_alert_exactly_once_on_catalyst_day() {
        let engine = BacktestEngine::default();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let outcome = engine
            .run(&iron_condor(), 100.0, VolatilityRegime::HighVolatility, &mut rng)
            .unwrap();
        let infos: Vec<_> = outcome
            .alerts()
            .filter(|a| a.kind == AlertKind::Info)
            .collect();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].day, 20);
        assert_eq!(
            infos[0].message,
            "Catalyst Event Occurred. IV crushed from 150% to 40%."
        );
    }

    #[test]
    fn test_threshold_alerts_fire_at_most_once() {
        let engine = BacktestEngine::default();
        for seed in 0..25 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let outcome = engine
                .run(&iron_condor(), 100.0, VolatilityRegime::HighVolatility, &mut rng)
                .unwrap();
            let profits = outcome.alerts().filter(|a| a.kind == AlertKind::Profit).count();
            let losses = outcome.alerts().filter(|a| a.kind == AlertKind::Loss).count();
            assert!(profits <= 1);
            assert!(losses <= 1);
            for result in &outcome.results {
                assert!(result.alerts.iter().filter(|a| a.kind.is_threshold()).count() <= 1);
            }
        }
    }

    #[test]
    fn test_profit_alert_latches_on_first_crossing() {
        let engine = BacktestEngine::default();
        let strategy = long_call(100.0, 50.0, 100.0);
        let path = SimulatedPath::from_closes(
            100.0,
            &closes(100.0, &[(2, 130.0), (4, 130.0), (6, 135.0)]),
            20,
            1.0,
        );
        let profile = VolatilityRegime::Moderate.profile();
        let outcome = engine.run_on_path(&strategy, &path, &profile).unwrap();

        assert!(outcome.results[1].profit_loss_pct >= 50.0);
        assert!(outcome.results[2].profit_loss_pct < 50.0);
        assert!(outcome.results[3].profit_loss_pct >= 50.0);

        let profits: Vec<_> = outcome
            .alerts()
            .filter(|a| a.kind == AlertKind::Profit)
            .collect();
        assert_eq!(profits.len(), 1);
        assert_eq!(profits[0].day, 2);
        assert_eq!(profits[0].message, "Take-Profit target of 50% hit.");
    }

    #[test]
    fn test_stop_fires_when_long_call_expires_worthless() {
        let engine = BacktestEngine::default();
        let strategy = long_call(100.0, 500.0, 100.0);
        let path = SimulatedPath::from_closes(100.0, &closes(95.0, &[]), 20, 1.0);
        let profile = VolatilityRegime::Moderate.profile();
        let outcome = engine.run_on_path(&strategy, &path, &profile).unwrap();

        let last = outcome.results.last().unwrap();
        assert_relative_eq!(last.profit_loss_pct, -100.0, epsilon = 1e-9);
        let losses: Vec<_> = outcome
            .alerts()
            .filter(|a| a.kind == AlertKind::Loss)
            .collect();
        assert_eq!(losses.len(), 1);
        assert!(losses[0].day > 20);
    }

    #[test]
    fn test_threshold_alert_displayed_over_catalyst_notice() {
        let engine = BacktestEngine::default();
        let strategy = long_call(100.0, 50.0, 100.0);
        let path = SimulatedPath::from_closes(100.0, &closes(100.0, &[(20, 130.0)]), 20, 1.0);
        let profile = VolatilityRegime::Moderate.profile();
        let outcome = engine.run_on_path(&strategy, &path, &profile).unwrap();

        let catalyst = &outcome.results[19];
        assert_eq!(catalyst.alerts.len(), 2);
        assert_eq!(catalyst.alerts[0].kind, AlertKind::Profit);
        assert_eq!(catalyst.alerts[1].kind, AlertKind::Info);
        assert_eq!(catalyst.alert().map(|a| a.kind), Some(AlertKind::Profit));

        let quiet = &outcome.results[18];
        assert!(quiet.alert().is_none());
    }

    #[test]
    fn test_volatility_collapses_on_catalyst_day() {
        // Flat path: the only change between day 19 and 20 is the IV crush
        let engine = BacktestEngine::default();
        let strategy = long_call(100.0, 1000.0, 1000.0);
        let path = SimulatedPath::from_closes(100.0, &closes(100.0, &[]), 20, 1.0);
        let profile = VolatilityRegime::HighVolatility.profile();
        let outcome = engine.run_on_path(&strategy, &path, &profile).unwrap();

        let before = outcome.results[18].profit_loss_pct;
        let after = outcome.results[19].profit_loss_pct;
        assert!(before - after > 20.0, "before={before} after={after}");
    }

    #[test]
    fn test_seeded_runs_are_identical() {
        let engine = BacktestEngine::default();
        let run = |seed| {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let outcome = engine
                .run(&iron_condor(), 142.5, VolatilityRegime::HighVolatility, &mut rng)
                .unwrap();
            serde_json::to_string(&outcome).unwrap()
        };
        assert_eq!(run(2024), run(2024));
        assert_ne!(run(2024), run(2025));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let engine = BacktestEngine::default();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert!(matches!(
            engine.run(&iron_condor(), 0.0, VolatilityRegime::Moderate, &mut rng),
            Err(BacktestError::InvalidSpot(_))
        ));
        assert!(matches!(
            engine.run(&iron_condor(), f64::NAN, VolatilityRegime::Moderate, &mut rng),
            Err(BacktestError::InvalidSpot(_))
        ));

        let short_path = SimulatedPath::from_closes(100.0, &[100.0; 10], 5, 1.0);
        assert!(matches!(
            engine.run_on_path(&iron_condor(), &short_path, &VolatilityRegime::Moderate.profile()),
            Err(BacktestError::PathLength { expected: 30, actual: 10 })
        ));

        let config = BacktestConfig {
            catalyst_day: 30,
            ..Default::default()
        };
        assert!(matches!(
            BacktestEngine::new(config),
            Err(BacktestError::Config(_))
        ));
    }

    #[test]
    fn test_custom_profile_run() {
        let engine = BacktestEngine::default();
        let profile = RegimeProfile {
            pre_catalyst_iv: 0.30,
            post_catalyst_iv: 0.20,
            ..VolatilityRegime::Moderate.profile()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let outcome = engine
            .run_with_profile(&long_call(100.0, 50.0, 50.0), 100.0, profile, &mut rng)
            .unwrap();
        assert_eq!(outcome.profile, profile);
        assert!((outcome.cost_basis - 3.52).abs() <= 0.02);
        assert_eq!(
            outcome.results[19].alerts.last().map(|a| a.message.as_str()),
            Some("Catalyst Event Occurred. IV crushed from 30% to 20%.")
        );
    }

    #[test]
    fn test_path_with_other_catalyst_day_rejected() {
        let engine = BacktestEngine::default();
        let path = SimulatedPath::from_closes(100.0, &closes(100.0, &[]), 15, 1.0);
        assert!(matches!(
            engine.run_on_path(&iron_condor(), &path, &VolatilityRegime::Moderate.profile()),
            Err(BacktestError::CatalystDay { expected: 20, actual: 15 })
        ));
    }

    #[test]
    fn test_configured_rate_drives_pricing_and_metrics() {
        let base = BacktestEngine::default();
        let high_rate = BacktestEngine::new(BacktestConfig {
            risk_free_rate: 0.10,
            ..Default::default()
        })
        .unwrap();
        let strategy = long_call(100.0, 1000.0, 1000.0);

        let low_entry = base.initial_valuation(&strategy, 100.0, 0.8);
        let high_entry = high_rate.initial_valuation(&strategy, 100.0, 0.8);
        // Long call costs more at a higher rate
        assert!(high_entry.initial_value < low_entry.initial_value);

        let path = SimulatedPath::from_closes(
            100.0,
            &closes(100.0, &[(3, 104.0), (8, 97.0), (12, 108.0), (25, 111.0)]),
            20,
            1.0,
        );
        let profile = VolatilityRegime::Moderate.profile();
        let low = base.run_on_path(&strategy, &path, &profile).unwrap();
        let high = high_rate.run_on_path(&strategy, &path, &profile).unwrap();
        assert_ne!(low.results[9].profit_loss_pct, high.results[9].profit_loss_pct);
        assert_ne!(low.metrics.sharpe_ratio, high.metrics.sharpe_ratio);
    }

    #[test]
    fn test_metrics_populated() {
        let engine = BacktestEngine::default();
        let mut rng = ChaCha8Rng::seed_from_u64(77);
        let outcome = engine
            .run(&long_call(100.0, 50.0, 50.0), 100.0, VolatilityRegime::Moderate, &mut rng)
            .unwrap();
        assert!(outcome.metrics.sharpe_ratio.is_finite());
        assert!(outcome.metrics.beta.is_finite());
        assert!(outcome.metrics.alpha.is_finite());
        assert!(outcome.summary().contains("Long Call (AAPL)"));
    }
}
