//! Parallel batch runs.
//!
//! Each job gets its own ChaCha8 generator seeded with `base_seed + index`,
//! so results do not depend on how rayon schedules the work. Path draws and
//! market-snapshot draws for a job come from separate ChaCha streams.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::info;

use crate::regime::{classify, VolatilityRegime};
use crate::strategy::Strategy;

use super::engine::{BacktestEngine, BacktestError, BacktestOutcome};

/// ChaCha stream for simulated price paths.
const PATH_STREAM: u64 = 0;

/// ChaCha stream for market snapshots (starting spot).
const MARKET_STREAM: u64 = 1;

/// One strategy to backtest.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub strategy: Strategy,
    pub initial_spot: f64,
    pub regime: VolatilityRegime,
}

impl BatchJob {
    pub fn new(strategy: Strategy, initial_spot: f64, regime: VolatilityRegime) -> Self {
        Self {
            strategy,
            initial_spot,
            regime,
        }
    }

    /// Job with the regime looked up from the strategy's ticker.
    pub fn classified(strategy: Strategy, initial_spot: f64) -> Self {
        let regime = classify(&strategy.ticker);
        Self::new(strategy, initial_spot, regime)
    }
}

/// Runs many backtests concurrently.
#[derive(Debug, Clone)]
pub struct BatchRunner {
    engine: BacktestEngine,
    base_seed: u64,
}

impl BatchRunner {
    pub fn new(engine: BacktestEngine, base_seed: u64) -> Self {
        Self { engine, base_seed }
    }

    /// Seed used for the job at `index`.
    pub fn seed_for(&self, index: usize) -> u64 {
        self.base_seed.wrapping_add(index as u64)
    }

    /// Generator for the job's simulated path.
    pub fn path_rng(&self, index: usize) -> ChaCha8Rng {
        self.rng(index, PATH_STREAM)
    }

    /// Generator for the job's market snapshot, independent of its path.
    pub fn market_rng(&self, index: usize) -> ChaCha8Rng {
        self.rng(index, MARKET_STREAM)
    }

    fn rng(&self, index: usize, stream: u64) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed_for(index));
        rng.set_stream(stream);
        rng
    }

    /// Run every job, returning results in job order.
    pub fn run(&self, jobs: &[BatchJob]) -> Vec<Result<BacktestOutcome, BacktestError>> {
        info!("Running batch of {} backtests (base seed {})", jobs.len(), self.base_seed);

        let results: Vec<_> = jobs
            .par_iter()
            .enumerate()
            .map(|(index, job)| self.run_one(index, job))
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        info!("Batch complete: {} succeeded, {} failed", results.len() - failed, failed);

        results
    }

    /// Run a single job with its batch seed.
    pub fn run_one(&self, index: usize, job: &BatchJob) -> Result<BacktestOutcome, BacktestError> {
        let mut rng = self.path_rng(index);
        self.engine
            .run(&job.strategy, job.initial_spot, job.regime, &mut rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BacktestConfig;
    use crate::data::{LegAction, OptionLeg, OptionType};
    use crate::regime::SectorClassifier;
    use crate::simulation::{MarketSnapshot, PathSimulator};
    use chrono::NaiveDate;
    use rand::Rng;

    fn straddle(ticker: &str, strike: f64) -> Strategy {
        Strategy::new(
            "Long Straddle",
            ticker,
            vec![
                OptionLeg::new(LegAction::Buy, OptionType::Call, strike, "30D"),
                OptionLeg::new(LegAction::Buy, OptionType::Put, strike, "30D"),
            ],
            40.0,
            30.0,
        )
        .unwrap()
    }

    fn jobs() -> Vec<BatchJob> {
        vec![
            BatchJob::classified(straddle("MRNA", 100.0), 100.0),
            BatchJob::classified(straddle("NVDA", 450.0), 455.0),
            BatchJob::classified(straddle("CRSP", 60.0), 58.0),
            BatchJob::new(straddle("XYZ", 20.0), 0.0, VolatilityRegime::Moderate),
        ]
    }

    #[test]
    fn test_batch_matches_sequential_runs() {
        let runner = BatchRunner::new(BacktestEngine::default(), 1000);
        let jobs = jobs();
        let parallel = runner.run(&jobs);

        assert_eq!(parallel.len(), jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            let sequential = runner.run_one(index, job);
            match (&parallel[index], &sequential) {
                (Ok(a), Ok(b)) => assert_eq!(a, b),
                (Err(_), Err(_)) => {}
                _ => panic!("job {} diverged", index),
            }
        }
    }

    #[test]
    fn test_failed_job_does_not_abort_batch() {
        let runner = BatchRunner::new(BacktestEngine::default(), 7);
        let results = runner.run(&jobs());
        assert!(results[..3].iter().all(|r| r.is_ok()));
        assert!(matches!(results[3], Err(BacktestError::InvalidSpot(_))));
    }

    #[test]
    fn test_classified_jobs_pick_regime() {
        let jobs = jobs();
        assert_eq!(jobs[0].regime, VolatilityRegime::HighVolatility);
        assert_eq!(jobs[1].regime, VolatilityRegime::Moderate);
    }

    #[test]
    fn test_snapshot_and_path_draws_independent() {
        let runner = BatchRunner::new(BacktestEngine::default(), 42);
        let classifier = SectorClassifier::default();
        let company = classifier.company("MRNA").unwrap();
        let today = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let profile = VolatilityRegime::HighVolatility.profile();
        let simulator = PathSimulator::new(BacktestConfig::default(), profile);

        for index in 0..5 {
            let snapshot = MarketSnapshot::generate(company, today, &mut runner.market_rng(index));
            let path = simulator.simulate(snapshot.stock_price, &mut runner.path_rng(index));

            let spot_draw = (snapshot.stock_price - 50.0) / 450.0;
            let shock_draw = (path.shock.magnitude - profile.shock_min) / profile.shock_span;
            assert!((spot_draw - shock_draw).abs() > 1e-9, "job {index} reused its draw");

            assert_ne!(
                runner.market_rng(index).random::<u64>(),
                runner.path_rng(index).random::<u64>()
            );
        }
    }

    #[test]
    fn test_path_stream_drives_run_one() {
        let runner = BatchRunner::new(BacktestEngine::default(), 9);
        let job = BatchJob::classified(straddle("MRNA", 100.0), 100.0);
        let expected = BacktestEngine::default()
            .run(&job.strategy, job.initial_spot, job.regime, &mut runner.path_rng(3))
            .unwrap();
        assert_eq!(runner.run_one(3, &job).unwrap(), expected);
    }

    #[test]
    fn test_seeds_offset_by_index() {
        let runner = BatchRunner::new(BacktestEngine::default(), u64::MAX);
        assert_eq!(runner.seed_for(0), u64::MAX);
        assert_eq!(runner.seed_for(1), 0);
    }
}
