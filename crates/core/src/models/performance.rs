use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Return of a fixed investment in one symbol since its purchase date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub symbol: String,

    /// Close on the purchase date
    pub purchase_price: f64,

    /// Latest close
    pub current_price: f64,

    /// Units bought: investment_amount / purchase_price
    pub shares: f64,

    /// Simple return: (current_price - purchase_price) / purchase_price × 100
    pub change_percent: f64,

    pub investment_amount: f64,

    /// shares × current_price
    pub current_value: f64,

    /// current_value - investment_amount
    pub profit_loss: f64,
}

/// A benchmark evaluated like a holding, plus its display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRecord {
    pub name: String,
    #[serde(flatten)]
    pub record: PerformanceRecord,
}

/// Aggregate over the holdings that made it into the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_invested: f64,
    pub total_current_value: f64,
    pub total_profit_loss: f64,

    /// (total_current_value - total_invested) / total_invested × 100, or 0 when nothing was invested
    pub portfolio_return_percent: f64,

    pub holdings_included: usize,
    pub holdings_skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolRole {
    Holding,
    Benchmark,
}

/// A configured symbol left out of the report, and why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedSymbol {
    pub symbol: String,
    pub role: SymbolRole,
    pub reason: String,
}

/// Calculator output: everything the report shows, without a timestamp.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub portfolio: Vec<PerformanceRecord>,
    pub benchmarks: Vec<BenchmarkRecord>,
    pub summary: PortfolioSummary,
    #[serde(default)]
    pub skipped: Vec<SkippedSymbol>,
}

/// A report stamped with the moment it was produced. This is the content
/// of the latest-report file and the renderer's input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSnapshot {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub report: PerformanceReport,
}

impl ReportSnapshot {
    pub fn new(report: PerformanceReport, timestamp: DateTime<Utc>) -> Self {
        Self { timestamp, report }
    }
}
