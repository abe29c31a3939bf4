//! Sector-based volatility regime classifier.
//!
//! Maps tickers to a sector and the sector to the simulation parameters
//! used around a catalyst event.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Industry sector of a covered company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sector {
    Biotechnology,
    Technology,
}

impl Sector {
    /// Volatility regime typical for catalysts in this sector.
    pub fn regime(&self) -> VolatilityRegime {
        match self {
            Self::Biotechnology => VolatilityRegime::HighVolatility,
            Self::Technology => VolatilityRegime::Moderate,
        }
    }
}

/// Volatility regime classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum VolatilityRegime {
    /// Binary-event names (clinical readouts, FDA decisions).
    HighVolatility,
    /// Large-cap names around earnings or product events.
    #[default]
    Moderate,
}

impl VolatilityRegime {
    /// Simulation parameters for this regime.
    pub fn profile(&self) -> RegimeProfile {
        match self {
            Self::HighVolatility => RegimeProfile {
                daily_volatility: 0.10,
                pre_catalyst_iv: 1.5,
                post_catalyst_iv: 0.4,
                shock_min: 0.4,
                shock_span: 0.5,
            },
            Self::Moderate => RegimeProfile {
                daily_volatility: 0.05,
                pre_catalyst_iv: 0.8,
                post_catalyst_iv: 0.3,
                shock_min: 0.1,
                shock_span: 0.15,
            },
        }
    }

    /// Base and span (percent) of the implied volatility quoted before the event.
    pub fn quoted_iv(&self) -> (f64, f64) {
        match self {
            Self::HighVolatility => (150.0, 50.0),
            Self::Moderate => (80.0, 40.0),
        }
    }

    /// Description of the regime.
    pub fn description(&self) -> &'static str {
        match self {
            Self::HighVolatility => "High volatility, binary catalyst",
            Self::Moderate => "Moderate volatility, scheduled event",
        }
    }
}

/// Parameters driving the price path and the pricer for one regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeProfile {
    /// Scale of each intraday move as a fraction of the open.
    pub daily_volatility: f64,
    /// Implied volatility before the catalyst.
    pub pre_catalyst_iv: f64,
    /// Implied volatility from the catalyst day on.
    pub post_catalyst_iv: f64,
    /// Lower bound of the catalyst shock as a fraction of the initial spot.
    pub shock_min: f64,
    /// Width of the shock range.
    pub shock_span: f64,
}

impl RegimeProfile {
    /// Implied volatility in force on a given day.
    pub fn iv_for_day(&self, day: u32, catalyst_day: u32) -> f64 {
        if day >= catalyst_day {
            self.post_catalyst_iv
        } else {
            self.pre_catalyst_iv
        }
    }
}

/// A company covered by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub ticker: String,
    pub name: String,
    pub domain: String,
    pub pipeline: String,
    pub market_cap: String,
    pub sector: Sector,
}

const COMPANIES: &[(&str, &str, &str, &str, &str, Sector)] = &[
    ("VRTX", "Vertex Pharmaceuticals", "vrtx.com", "Cystic Fibrosis & Gene Editing", "$120B", Sector::Biotechnology),
    ("BIIB", "Biogen Inc.", "biogen.com", "Neurological Diseases (Alzheimer's, MS)", "$33B", Sector::Biotechnology),
    ("MRNA", "Moderna, Inc.", "modernatx.com", "mRNA Vaccines & Therapeutics", "$60B", Sector::Biotechnology),
    ("CRSP", "CRISPR Therapeutics", "crisprtx.com", "Gene-based medicines for serious diseases", "$5B", Sector::Biotechnology),
    ("AAPL", "Apple Inc.", "apple.com", "Consumer Electronics, Software & Services", "$3.2T", Sector::Technology),
    ("MSFT", "Microsoft Corp.", "microsoft.com", "Cloud Computing, OS & Business Software", "$3.1T", Sector::Technology),
    ("GOOGL", "Alphabet Inc.", "abc.xyz", "Search, Cloud & Autonomous Driving", "$2.2T", Sector::Technology),
    ("AMZN", "Amazon.com, Inc.", "amazon.com", "E-commerce, Cloud & AI", "$1.9T", Sector::Technology),
    ("NVDA", "NVIDIA Corp.", "nvidia.com", "GPUs, AI Accelerators & Data Centers", "$2.8T", Sector::Technology),
    ("TSLA", "Tesla, Inc.", "tesla.com", "Electric Vehicles, Energy & AI", "$580B", Sector::Technology),
    ("META", "Meta Platforms, Inc.", "meta.com", "Social Media, VR/AR & AI", "$1.2T", Sector::Technology),
    ("AMD", "Advanced Micro Devices", "amd.com", "CPUs, GPUs & Server Processors", "$260B", Sector::Technology),
    ("NFLX", "Netflix, Inc.", "netflix.com", "Streaming Media & Content Production", "$265B", Sector::Technology),
    ("CRM", "Salesforce, Inc.", "salesforce.com", "Cloud-based CRM & Enterprise Software", "$230B", Sector::Technology),
    ("INTC", "Intel Corporation", "intel.com", "Semiconductors & Data Center Solutions", "$130B", Sector::Technology),
    ("ORCL", "Oracle Corporation", "oracle.com", "Database Software, Cloud & ERP", "$340B", Sector::Technology),
];

/// Ticker to sector lookup over the covered universe.
pub struct SectorClassifier {
    companies: HashMap<String, Company>,
}

impl Default for SectorClassifier {
    fn default() -> Self {
        Self::new(
            COMPANIES
                .iter()
                .map(|&(ticker, name, domain, pipeline, market_cap, sector)| Company {
                    ticker: ticker.to_string(),
                    name: name.to_string(),
                    domain: domain.to_string(),
                    pipeline: pipeline.to_string(),
                    market_cap: market_cap.to_string(),
                    sector,
                })
                .collect(),
        )
    }
}

impl SectorClassifier {
    /// Create a classifier over a custom universe.
    pub fn new(companies: Vec<Company>) -> Self {
        Self {
            companies: companies
                .into_iter()
                .map(|c| (c.ticker.to_uppercase(), c))
                .collect(),
        }
    }

    /// Look up a covered company.
    pub fn company(&self, ticker: &str) -> Option<&Company> {
        self.companies.get(&ticker.trim().to_uppercase())
    }

    /// Classify a ticker. Unknown tickers are treated as moderate.
    pub fn classify(&self, ticker: &str) -> VolatilityRegime {
        self.company(ticker)
            .map(|c| c.sector.regime())
            .unwrap_or_default()
    }

    /// Covered companies sorted by ticker.
    pub fn companies(&self) -> Vec<&Company> {
        let mut companies: Vec<_> = self.companies.values().collect();
        companies.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        companies
    }

    pub fn len(&self) -> usize {
        self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }
}

/// Shared classifier over the built-in universe, built on first use.
pub fn builtin() -> &'static SectorClassifier {
    static BUILTIN: OnceLock<SectorClassifier> = OnceLock::new();
    BUILTIN.get_or_init(SectorClassifier::default)
}

/// Classify a ticker against the built-in universe.
pub fn classify(ticker: &str) -> VolatilityRegime {
    builtin().classify(ticker)
}
