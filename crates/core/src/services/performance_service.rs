use tracing::warn;

use crate::models::config::{Benchmark, Holding};
use crate::models::performance::{
    BenchmarkRecord, PerformanceRecord, PerformanceReport, PortfolioSummary, SkippedSymbol,
    SymbolRole,
};
use crate::models::price::{PriceResolution, PriceSnapshot};

/// Turns a purchase/current snapshot pair into the report figures.
///
/// Every holding and benchmark is treated as a fixed `investment_per_symbol`
/// placed at its purchase close. Returns are simple (not compounded) since
/// that date. Symbols without a resolved price in both snapshots are left
/// out and listed in `skipped`; they contribute nothing to the totals.
pub struct PerformanceCalculator;

impl PerformanceCalculator {
    pub fn compute(
        holdings: &[Holding],
        benchmarks: &[Benchmark],
        purchase: &PriceSnapshot,
        current: &PriceSnapshot,
        investment_per_symbol: f64,
    ) -> PerformanceReport {
        let mut report = PerformanceReport::default();

        for holding in holdings {
            match Self::evaluate(&holding.symbol, purchase, current, investment_per_symbol) {
                Ok(record) => report.portfolio.push(record),
                Err(reason) => {
                    warn!(symbol = %holding.symbol, %reason, "holding skipped");
                    report.skipped.push(SkippedSymbol {
                        symbol: holding.symbol.clone(),
                        role: SymbolRole::Holding,
                        reason,
                    });
                }
            }
        }

        for benchmark in benchmarks {
            match Self::evaluate(&benchmark.symbol, purchase, current, investment_per_symbol) {
                Ok(record) => report.benchmarks.push(BenchmarkRecord {
                    name: benchmark.name.clone(),
                    record,
                }),
                Err(reason) => {
                    warn!(symbol = %benchmark.symbol, name = %benchmark.name, %reason, "benchmark skipped");
                    report.skipped.push(SkippedSymbol {
                        symbol: benchmark.symbol.clone(),
                        role: SymbolRole::Benchmark,
                        reason,
                    });
                }
            }
        }

        let holdings_skipped = report
            .skipped
            .iter()
            .filter(|s| s.role == SymbolRole::Holding)
            .count();
        report.summary = Self::summarize(&report.portfolio, holdings_skipped);
        report
    }

    /// Fixed-investment performance of one symbol, or why it cannot be computed.
    pub fn evaluate(
        symbol: &str,
        purchase: &PriceSnapshot,
        current: &PriceSnapshot,
        investment: f64,
    ) -> Result<PerformanceRecord, String> {
        let purchase_price = resolved(purchase, symbol)?;
        let current_price = resolved(current, symbol)?;

        let shares = investment / purchase_price;
        let current_value = shares * current_price;

        Ok(PerformanceRecord {
            symbol: symbol.to_string(),
            purchase_price,
            current_price,
            shares,
            change_percent: (current_price - purchase_price) / purchase_price * 100.0,
            investment_amount: investment,
            current_value,
            profit_loss: current_value - investment,
        })
    }

    /// Totals over the included holdings. A zero investment total yields a
    /// 0% return.
    pub fn summarize(records: &[PerformanceRecord], holdings_skipped: usize) -> PortfolioSummary {
        let total_invested: f64 = records.iter().map(|r| r.investment_amount).sum();
        let total_current_value: f64 = records.iter().map(|r| r.current_value).sum();
        let total_profit_loss = total_current_value - total_invested;

        let portfolio_return_percent = if total_invested > 0.0 {
            total_profit_loss / total_invested * 100.0
        } else {
            0.0
        };

        PortfolioSummary {
            total_invested,
            total_current_value,
            total_profit_loss,
            portfolio_return_percent,
            holdings_included: records.len(),
            holdings_skipped,
        }
    }
}

fn resolved(snapshot: &PriceSnapshot, symbol: &str) -> Result<f64, String> {
    match snapshot.resolution(symbol) {
        Some(PriceResolution::Resolved(price)) => Ok(*price),
        Some(PriceResolution::Unresolved(reason)) => {
            Err(format!("{} price unresolved: {reason}", snapshot.kind))
        }
        None => Err(format!("no {} price", snapshot.kind)),
    }
}
