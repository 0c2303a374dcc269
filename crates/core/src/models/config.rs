use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use crate::errors::CoreError;

/// A tracked stock position: bought on `purchase_date` with the report's
/// fixed per-symbol investment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    /// Ticker symbol, uppercased (e.g., "NVDA", "MSFT")
    pub symbol: String,
    pub purchase_date: NaiveDate,
}

impl Holding {
    pub fn new(symbol: impl Into<String>, purchase_date: NaiveDate) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            purchase_date,
        }
    }
}

/// A reference market index, evaluated with the same fixed-investment
/// methodology as holdings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benchmark {
    pub symbol: String,
    /// Display name (e.g., "S&P 500 (SPY)")
    pub name: String,
}

impl Benchmark {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            name: name.into(),
        }
    }
}

/// What to do with the persisted purchase-price snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CachePolicy {
    /// Load the cached purchase prices; fetch only symbols the cache lacks.
    #[default]
    ReuseCached,
    /// Ignore the cache, refetch every purchase price and overwrite the cache.
    ForceRefresh,
}

impl std::fmt::Display for CachePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CachePolicy::ReuseCached => write!(f, "reuse-cached"),
            CachePolicy::ForceRefresh => write!(f, "force-refresh"),
        }
    }
}

const DEFAULT_HOLDINGS: [&str; 10] = [
    "NVDA", "MSFT", "GOOGL", "AMZN", "META", "AVGO", "TSM", "AMD", "PLTR", "ORCL",
];

const DEFAULT_BENCHMARKS: [(&str, &str); 3] = [
    ("SPY", "S&P 500 (SPY)"),
    ("QQQ", "NASDAQ 100 (QQQ)"),
    ("TQQQ", "NASDAQ 3x (TQQQ)"),
];

const DEFAULT_INVESTMENT_PER_SYMBOL: f64 = 1_000.0;
const DEFAULT_CURRENT_WINDOW_DAYS: u32 = 5;

/// Immutable report configuration, built once at start-up and handed to
/// the price service, the calculator and the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub holdings: Vec<Holding>,
    pub benchmarks: Vec<Benchmark>,

    /// Purchase date used for benchmarks and as the default for holdings
    pub purchase_date: NaiveDate,

    /// Dollar amount notionally invested in every holding and benchmark
    pub investment_per_symbol: f64,

    pub cache_policy: CachePolicy,

    /// Trailing window (calendar days) scanned for the latest close
    pub current_window_days: u32,

    /// Directory holding the purchase cache, latest snapshot and history files
    pub data_dir: PathBuf,

    /// Where the rendered report is written
    pub output_path: PathBuf,

    pub report_title: String,

    /// Optional API keys for providers that require them (e.g., "alphavantage").
    pub api_keys: HashMap<String, String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let purchase_date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap_or_default();
        Self {
            holdings: DEFAULT_HOLDINGS
                .iter()
                .map(|s| Holding::new(*s, purchase_date))
                .collect(),
            benchmarks: DEFAULT_BENCHMARKS
                .iter()
                .map(|(s, n)| Benchmark::new(*s, *n))
                .collect(),
            purchase_date,
            investment_per_symbol: DEFAULT_INVESTMENT_PER_SYMBOL,
            cache_policy: CachePolicy::default(),
            current_window_days: DEFAULT_CURRENT_WINDOW_DAYS,
            data_dir: PathBuf::from("data"),
            output_path: PathBuf::from("docs/index.html"),
            report_title: "Portfolio Performance Report".to_string(),
            api_keys: HashMap::new(),
        }
    }
}

// ── TOML overlay ────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    purchase_date: Option<NaiveDate>,
    investment_per_symbol: Option<f64>,
    cache_policy: Option<CachePolicy>,
    current_window_days: Option<u32>,
    data_dir: Option<PathBuf>,
    output_path: Option<PathBuf>,
    report_title: Option<String>,
    holdings: Option<Vec<HoldingEntry>>,
    benchmarks: Option<Vec<Benchmark>>,
    #[serde(default)]
    api_keys: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HoldingEntry {
    symbol: String,
    purchase_date: Option<NaiveDate>,
}

impl ReportConfig {
    /// Parse a TOML document. Keys that are absent keep their compiled-in
    /// defaults; holdings without a `purchase_date` inherit the report's.
    pub fn from_toml_str(s: &str) -> Result<Self, CoreError> {
        let file: ConfigFile = toml::from_str(s)?;
        let mut config = Self::default();

        if let Some(date) = file.purchase_date {
            config.purchase_date = date;
            for holding in &mut config.holdings {
                holding.purchase_date = date;
            }
        }
        if let Some(amount) = file.investment_per_symbol {
            config.investment_per_symbol = amount;
        }
        if let Some(policy) = file.cache_policy {
            config.cache_policy = policy;
        }
        if let Some(days) = file.current_window_days {
            config.current_window_days = days;
        }
        if let Some(dir) = file.data_dir {
            config.data_dir = dir;
        }
        if let Some(path) = file.output_path {
            config.output_path = path;
        }
        if let Some(title) = file.report_title {
            config.report_title = title;
        }
        if let Some(entries) = file.holdings {
            let default_date = config.purchase_date;
            config.holdings = entries
                .into_iter()
                .map(|e| Holding::new(e.symbol, e.purchase_date.unwrap_or(default_date)))
                .collect();
        }
        if let Some(benchmarks) = file.benchmarks {
            config.benchmarks = benchmarks
                .into_iter()
                .map(|b| Benchmark::new(b.symbol, b.name))
                .collect();
        }
        config.api_keys.extend(file.api_keys);

        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!("Cannot read config file {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    /// Check the structural invariants of the configuration.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.holdings.is_empty() {
            return Err(CoreError::Config("At least one holding is required".into()));
        }

        let mut seen = HashSet::new();
        for holding in &self.holdings {
            if holding.symbol.is_empty() {
                return Err(CoreError::Config("Holding symbol must not be empty".into()));
            }
            if !seen.insert(holding.symbol.as_str()) {
                return Err(CoreError::Config(format!(
                    "Duplicate holding symbol: {}",
                    holding.symbol
                )));
            }
        }

        let mut names = HashSet::new();
        for benchmark in &self.benchmarks {
            if benchmark.symbol.is_empty() {
                return Err(CoreError::Config(format!(
                    "Benchmark '{}' has an empty symbol",
                    benchmark.name
                )));
            }
            if !names.insert(benchmark.name.as_str()) {
                return Err(CoreError::Config(format!(
                    "Duplicate benchmark name: {}",
                    benchmark.name
                )));
            }
        }

        if !self.investment_per_symbol.is_finite() || self.investment_per_symbol <= 0.0 {
            return Err(CoreError::Config(format!(
                "investment_per_symbol must be a positive number, got {}",
                self.investment_per_symbol
            )));
        }

        if self.current_window_days == 0 {
            return Err(CoreError::Config(
                "current_window_days must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Every distinct symbol the run needs prices for (holdings first, then
    /// benchmarks), in configuration order.
    pub fn all_symbols(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.holdings
            .iter()
            .map(|h| &h.symbol)
            .chain(self.benchmarks.iter().map(|b| &b.symbol))
            .filter(|s| seen.insert(s.to_string()))
            .cloned()
            .collect()
    }

    /// Same configuration with a different cache policy.
    #[must_use]
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }
}
