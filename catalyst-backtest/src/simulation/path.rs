//! Synthetic price path with a scheduled catalyst.
//!
//! Each day opens at the previous close and applies two independent
//! intraday moves. On the catalyst day a directional shock sized off the
//! initial spot is added. A benchmark index is simulated alongside with a
//! lower constant volatility and no shock.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::BacktestConfig;
use crate::data::DailyBar;
use crate::regime::RegimeProfile;

/// Catalyst shock drawn once per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CatalystShock {
    /// Size as a fraction of the initial spot.
    pub magnitude: f64,
    /// +1.0 for a gap up, -1.0 for a gap down.
    pub direction: f64,
    /// Price change added to the catalyst-day close.
    pub amount: f64,
}

/// One simulated run of the underlying and the benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedPath {
    pub initial_spot: f64,
    pub catalyst_day: u32,
    pub shock: CatalystShock,
    pub bars: Vec<DailyBar>,
    pub benchmark_base: f64,
    /// Benchmark close per day.
    pub benchmark: Vec<f64>,
    /// Underlying close-over-open return per day.
    pub stock_returns: Vec<f64>,
    /// Benchmark day-over-day return per day.
    pub market_returns: Vec<f64>,
}

impl SimulatedPath {
    /// Build a path from scripted closes.
    ///
    /// Each bar opens at the previous close, high/low bracket open and close,
    /// and the benchmark stays flat. Used to replay a known price sequence.
    pub fn from_closes(initial_spot: f64, closes: &[f64], catalyst_day: u32, min_spot: f64) -> Self {
        let mut bars = Vec::with_capacity(closes.len());
        let mut stock_returns = Vec::with_capacity(closes.len());
        let mut open = initial_spot;

        for (i, &raw_close) in closes.iter().enumerate() {
            let close = raw_close.max(min_spot);
            bars.push(DailyBar {
                day: i as u32 + 1,
                open,
                high: open.max(close),
                low: open.min(close),
                close,
                volume: 0,
            });
            stock_returns.push((close - open) / open);
            open = close;
        }

        Self {
            initial_spot,
            catalyst_day,
            shock: CatalystShock {
                magnitude: 0.0,
                direction: 1.0,
                amount: 0.0,
            },
            bars,
            benchmark_base: 1.0,
            benchmark: vec![1.0; closes.len()],
            stock_returns,
            market_returns: vec![0.0; closes.len()],
        }
    }

    pub fn days(&self) -> usize {
        self.bars.len()
    }
}

/// Generates price paths for one volatility regime.
#[derive(Debug, Clone)]
pub struct PathSimulator {
    config: BacktestConfig,
    profile: RegimeProfile,
}

impl PathSimulator {
    pub fn new(config: BacktestConfig, profile: RegimeProfile) -> Self {
        Self { config, profile }
    }

    pub fn profile(&self) -> &RegimeProfile {
        &self.profile
    }

    /// Simulate a full path starting from `initial_spot`.
    pub fn simulate(&self, initial_spot: f64, rng: &mut impl Rng) -> SimulatedPath {
        let days = self.config.days;
        let catalyst_day = self.config.catalyst_day;
        let daily_vol = self.profile.daily_volatility;

        let magnitude = self.profile.shock_min + rng.random::<f64>() * self.profile.shock_span;
        let direction = if rng.random::<f64>() > 0.5 { 1.0 } else { -1.0 };
        let shock = CatalystShock {
            magnitude,
            direction,
            amount: direction * initial_spot * magnitude,
        };

        let mut bars = Vec::with_capacity(days as usize);
        let mut benchmark = Vec::with_capacity(days as usize);
        let mut stock_returns = Vec::with_capacity(days as usize);
        let mut market_returns = Vec::with_capacity(days as usize);

        let mut spot = initial_spot;
        let mut market = self.config.benchmark_base;

        for day in 1..=days {
            let open = spot;
            let move1 = open * (rng.random::<f64>() - 0.5) * daily_vol;
            let move2 = open * (rng.random::<f64>() - 0.5) * daily_vol;

            let mut close = open + move1 + move2;
            if day == catalyst_day {
                close += shock.amount;
            }
            close = close.max(self.config.min_spot);

            let market_open = market;
            market = market_open
                * (1.0 + (rng.random::<f64>() - 0.5) * self.config.benchmark_daily_volatility);

            let volume_scale = if day == catalyst_day {
                self.config.catalyst_volume_multiplier
            } else {
                1.0
            };
            let volume = (self.config.base_volume
                + rng.random::<f64>() * self.config.volume_range * volume_scale)
                .round() as u64;

            let intraday = [open, close, open + move1, open + move2];
            let high = intraday.iter().copied().fold(f64::MIN, f64::max);
            let low = intraday.iter().copied().fold(f64::MAX, f64::min);

            bars.push(DailyBar {
                day,
                open,
                high,
                low,
                close,
                volume,
            });
            benchmark.push(market);
            stock_returns.push((close - open) / open);
            market_returns.push((market - market_open) / market_open);

            spot = close;
        }

        SimulatedPath {
            initial_spot,
            catalyst_day,
            shock,
            bars,
            benchmark_base: self.config.benchmark_base,
            benchmark,
            stock_returns,
            market_returns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regime::VolatilityRegime;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn simulate(regime: VolatilityRegime, seed: u64) -> SimulatedPath {
        let simulator = PathSimulator::new(BacktestConfig::default(), regime.profile());
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        simulator.simulate(100.0, &mut rng)
    }

    #[test]
    fn test_day_layout() {
        let path = simulate(VolatilityRegime::Moderate, 1);
        assert_eq!(path.days(), 30);
        assert_eq!(path.benchmark.len(), 30);
        assert_eq!(path.stock_returns.len(), 30);
        assert_eq!(path.market_returns.len(), 30);
        for (i, bar) in path.bars.iter().enumerate() {
            assert_eq!(bar.day, i as u32 + 1);
        }
        assert_eq!(path.bars[0].open, 100.0);
    }

    #[test]
    fn test_bars_are_consistent() {
        for seed in 0..20 {
            let path = simulate(VolatilityRegime::HighVolatility, seed);
            let mut prev_close = path.initial_spot;
            for bar in &path.bars {
                assert_eq!(bar.open, prev_close);
                assert!(bar.high >= bar.open.max(bar.close));
                assert!(bar.low <= bar.open.min(bar.close));
                assert!(bar.close >= 1.0);
                assert!(bar.volume >= 1_000_000);
                prev_close = bar.close;
            }
        }
    }

    #[test]
    fn test_shock_within_regime_range() {
        for seed in 0..50 {
            let high = simulate(VolatilityRegime::HighVolatility, seed).shock;
            assert!(high.magnitude >= 0.4 && high.magnitude < 0.9);
            assert!(high.direction == 1.0 || high.direction == -1.0);
            assert_eq!(high.amount, high.direction * 100.0 * high.magnitude);

            let moderate = simulate(VolatilityRegime::Moderate, seed).shock;
            assert!(moderate.magnitude >= 0.1 && moderate.magnitude < 0.25);
        }
    }

    #[test]
    fn test_catalyst_volume_inflated_range() {
        for seed in 0..20 {
            let path = simulate(VolatilityRegime::Moderate, seed);
            for bar in &path.bars {
                if bar.day == 20 {
                    assert!(bar.volume <= 26_000_000);
                } else {
                    assert!(bar.volume <= 6_000_000);
                }
            }
        }
    }

    #[test]
    fn test_spot_floor_holds_after_crash() {
        let profile = RegimeProfile {
            daily_volatility: 0.0,
            pre_catalyst_iv: 1.0,
            post_catalyst_iv: 0.5,
            shock_min: 5.0,
            shock_span: 0.0,
        };
        let simulator = PathSimulator::new(BacktestConfig::default(), profile);
        // Find a seed with a downward shock
        let path = (0..64)
            .map(|seed| simulator.simulate(10.0, &mut ChaCha8Rng::seed_from_u64(seed)))
            .find(|p| p.shock.direction < 0.0)
            .unwrap();
        assert_eq!(path.bars[19].close, 1.0);
        assert!(path.bars.iter().all(|b| b.close > 0.0));
    }

    #[test]
    fn test_seeded_paths_repeat() {
        assert_eq!(
            simulate(VolatilityRegime::HighVolatility, 42),
            simulate(VolatilityRegime::HighVolatility, 42)
        );
        assert_ne!(
            simulate(VolatilityRegime::HighVolatility, 42),
            simulate(VolatilityRegime::HighVolatility, 43)
        );
    }

    #[test]
    fn test_scripted_path() {
        let path = SimulatedPath::from_closes(100.0, &[110.0, 99.0, 0.5], 2, 1.0);
        assert_eq!(path.days(), 3);
        assert_eq!(path.bars[1].open, 110.0);
        assert_eq!(path.bars[1].high, 110.0);
        assert_eq!(path.bars[2].close, 1.0);
        assert!(path.market_returns.iter().all(|r| *r == 0.0));
        assert!((path.stock_returns[0] - 0.1).abs() < 1e-12);
    }
}
