use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::performance::ReportSnapshot;

/// One line of the performance history: created once per run, appended,
/// never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(rename = "date")]
    pub timestamp: DateTime<Utc>,

    #[serde(rename = "portfolio_return")]
    pub portfolio_return_percent: f64,

    #[serde(rename = "total_value")]
    pub total_current_value: f64,

    /// Benchmark symbol → change percent
    #[serde(rename = "benchmarks", default)]
    pub benchmark_returns: BTreeMap<String, f64>,

    /// Fields this version does not know, written back unchanged.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl HistoryEntry {
    pub fn from_snapshot(snapshot: &ReportSnapshot) -> Self {
        let summary = &snapshot.report.summary;
        Self {
            timestamp: snapshot.timestamp,
            portfolio_return_percent: summary.portfolio_return_percent,
            total_current_value: summary.total_current_value,
            benchmark_returns: snapshot
                .report
                .benchmarks
                .iter()
                .map(|b| (b.record.symbol.clone(), b.record.change_percent))
                .collect(),
            extra: Map::new(),
        }
    }
}
