//! Catalyst backtest CLI.
//!
//! # Backtest one or more strategy definitions
//! catalyst-backtest run --strategy strategies/mrna_condor.json --seed 7
//!
//! # Price a single option
//! catalyst-backtest price --spot 100 --strike 100 --days 30 --vol 0.3
//!
//! # Market snapshot for a covered company
//! catalyst-backtest snapshot --ticker MRNA
//!
//! # Sector classification
//! catalyst-backtest classify --ticker VRTX
//!
//! # Paper trading
//! catalyst-backtest paper execute --strategy strategies/mrna_condor.json --price 142.5

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use catalyst_backtest::backtest::{BacktestEngine, BatchJob, BatchRunner};
use catalyst_backtest::config::BacktestConfig;
use catalyst_backtest::data::OptionType;
use catalyst_backtest::portfolio::PaperBook;
use catalyst_backtest::pricing::{BlackScholes, DAYS_PER_YEAR, RISK_FREE_RATE};
use catalyst_backtest::regime::builtin as builtin_classifier;
use catalyst_backtest::simulation::MarketSnapshot;
use catalyst_backtest::strategy::{Strategy, StrategyDefinition};

#[derive(Parser)]
#[command(name = "catalyst-backtest")]
#[command(about = "Catalyst-driven options strategy backtester")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest strategy definitions over simulated catalyst paths
    Run {
        /// Strategy definition JSON files
        #[arg(short, long, required = true, num_args = 1..)]
        strategy: Vec<PathBuf>,

        /// Path to configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Starting spot (default: from a generated market snapshot)
        #[arg(long)]
        spot: Option<f64>,

        /// Base RNG seed; run i uses seed + i
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Black-Scholes price of a single option
    Price {
        #[arg(long)]
        spot: f64,

        #[arg(long)]
        strike: f64,

        /// Days to expiry
        #[arg(long, default_value_t = 30.0)]
        days: f64,

        /// Annualized volatility (0.3 = 30%)
        #[arg(long)]
        vol: f64,

        #[arg(long, default_value_t = RISK_FREE_RATE)]
        rate: f64,

        /// CALL or PUT
        #[arg(long = "type", default_value = "CALL")]
        option_type: String,
    },

    /// Generate a market snapshot for a covered company
    Snapshot {
        #[arg(short, long)]
        ticker: String,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long)]
        json: bool,
    },

    /// Show the volatility regime for a ticker, or list covered companies
    Classify {
        #[arg(short, long)]
        ticker: Option<String>,
    },

    /// Manage the paper trading book
    Paper {
        /// Book file
        #[arg(long, default_value = "paper_trades.json")]
        book: PathBuf,

        #[command(subcommand)]
        action: PaperAction,
    },
}

#[derive(Subcommand)]
enum PaperAction {
    /// Execute a strategy at the current underlying price
    Execute {
        #[arg(short, long)]
        strategy: PathBuf,

        #[arg(long)]
        price: f64,
    },

    /// Apply a price update to open trades on a ticker
    Update {
        #[arg(short, long)]
        ticker: String,

        #[arg(long)]
        price: f64,
    },

    /// Close an open trade
    Close {
        #[arg(long)]
        id: u64,

        #[arg(long)]
        price: f64,
    },

    /// List trades
    List,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("catalyst_backtest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            strategy,
            config,
            spot,
            seed,
            json,
        } => run_backtests(&strategy, config, spot, seed, json),
        Commands::Price {
            spot,
            strike,
            days,
            vol,
            rate,
            option_type,
        } => {
            let Some(option_type) = OptionType::parse(&option_type) else {
                bail!("Unknown option type: {}", option_type);
            };
            let price = BlackScholes::new(rate).price(spot, strike, days / DAYS_PER_YEAR, vol, option_type);
            println!("{} {} @ {:.2} ({} days, vol {:.1}%): {:.4}", option_type, strike, spot, days, vol * 100.0, price);
            Ok(())
        }
        Commands::Snapshot { ticker, seed, json } => {
            let snapshot = snapshot_for(&ticker, &mut ChaCha8Rng::seed_from_u64(seed))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&snapshot)?);
            } else {
                print_snapshot(&snapshot);
            }
            Ok(())
        }
        Commands::Classify { ticker } => {
            let classifier = builtin_classifier();
            match ticker {
                Some(ticker) => {
                    let regime = classifier.classify(&ticker);
                    match classifier.company(&ticker) {
                        Some(company) => println!(
                            "{} ({}, {:?}): {}",
                            company.ticker,
                            company.name,
                            company.sector,
                            regime.description()
                        ),
                        None => println!("{} (not covered): {}", ticker.to_uppercase(), regime.description()),
                    }
                }
                None => {
                    for company in classifier.companies() {
                        println!(
                            "{:<6} {:<28} {:?} {}",
                            company.ticker, company.name, company.sector, company.market_cap
                        );
                    }
                }
            }
            Ok(())
        }
        Commands::Paper { book, action } => run_paper(book, action),
    }
}

fn load_strategy(path: &PathBuf) -> Result<Strategy> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read strategy file {}", path.display()))?;
    let strategy = StrategyDefinition::from_json(&content)
        .and_then(StrategyDefinition::parse)
        .with_context(|| format!("Invalid strategy definition in {}", path.display()))?;
    Ok(strategy)
}

fn snapshot_for(ticker: &str, rng: &mut ChaCha8Rng) -> Result<MarketSnapshot> {
    let classifier = builtin_classifier();
    let Some(company) = classifier.company(ticker) else {
        bail!("{} is not in the covered company list", ticker.to_uppercase());
    };
    Ok(MarketSnapshot::generate(company, Utc::now().date_naive(), rng))
}

fn run_backtests(
    paths: &[PathBuf],
    config: Option<PathBuf>,
    spot: Option<f64>,
    seed: u64,
    json: bool,
) -> Result<()> {
    let config = match config {
        Some(path) => BacktestConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BacktestConfig::default(),
    };
    let runner = BatchRunner::new(BacktestEngine::new(config)?, seed);

    let mut jobs = Vec::with_capacity(paths.len());
    for (i, path) in paths.iter().enumerate() {
        let strategy = load_strategy(path)?;
        let initial_spot = match spot {
            Some(spot) => spot,
            None => snapshot_for(&strategy.ticker, &mut runner.market_rng(i))?.stock_price,
        };
        jobs.push(BatchJob::classified(strategy, initial_spot));
    }

    info!("Loaded {} strategies", jobs.len());

    let mut outcomes = Vec::with_capacity(jobs.len());
    for (job, result) in jobs.iter().zip(runner.run(&jobs)) {
        let outcome = result.with_context(|| format!("Backtest failed for {}", job.strategy.name))?;
        outcomes.push(outcome);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        for outcome in &outcomes {
            println!("{}\n", outcome.summary());
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &MarketSnapshot) {
    println!(
        "{} @ {:.2}  IV {:.1}%  catalyst {}  ({} quotes)",
        snapshot.ticker,
        snapshot.stock_price,
        snapshot.implied_volatility,
        snapshot.catalyst_date,
        snapshot.options_chain.total_quotes()
    );
    println!("{:>8} {:>9} {:>9} {:>9} {:>9}", "strike", "call bid", "call ask", "put bid", "put ask");
    let chain = &snapshot.options_chain;
    for strike in chain.strikes() {
        if let (Some(call), Some(put)) = (chain.call_at_strike(strike), chain.put_at_strike(strike)) {
            println!(
                "{:>8.2} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
                strike, call.bid, call.ask, put.bid, put.ask
            );
        }
    }
}

fn run_paper(path: PathBuf, action: PaperAction) -> Result<()> {
    let mut book = PaperBook::load(&path)
        .with_context(|| format!("Failed to load paper book {}", path.display()))?;
    let now = Utc::now();

    match action {
        PaperAction::Execute { strategy, price } => {
            let strategy = load_strategy(&strategy)?;
            let (id, notification) = book.execute(strategy, price, now)?;
            println!("[{:?}] {} (id {})", notification.kind, notification.message, id);
        }
        PaperAction::Update { ticker, price } => {
            for notification in book.on_price(&ticker, price, now)? {
                println!("[{:?}] {}", notification.kind, notification.message);
            }
        }
        PaperAction::Close { id, price } => {
            let trade = book.close(id, price, now)?;
            println!("Closed {} ({}): P/L ${:.2}", trade.id, trade.strategy.ticker, trade.unrealized_pnl);
        }
        PaperAction::List => {
            for trade in book.trades() {
                println!(
                    "{:>4} {:<6} {:?} entry ${:.2} value ${:.2} P/L ${:.2} ({:.1}%)",
                    trade.id,
                    trade.strategy.ticker,
                    trade.status,
                    trade.entry_value,
                    trade.current_value,
                    trade.unrealized_pnl,
                    trade.pnl_pct()
                );
            }
            println!("Open P/L: ${:.2}", book.open_pnl());
            return Ok(());
        }
    }

    book.save(&path)
        .with_context(|| format!("Failed to save paper book {}", path.display()))?;
    Ok(())
}
