use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::price::PricePoint;

/// Daily closes per symbol, sorted by date. A symbol the provider had no
/// data for is either absent or maps to an empty list.
pub type ClosesBySymbol = HashMap<String, Vec<PricePoint>>;

/// Seam between the report and whatever quote service backs it.
///
/// The report only needs two batch lookups, so any service able to answer
/// them can stand in for Yahoo Finance. Implementations return `Err` only
/// when the whole call failed; per-symbol gaps are expressed in the map.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Daily closes for every symbol between `from` and `to`, both inclusive.
    async fn get_closes_in_range(
        &self,
        symbols: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ClosesBySymbol, CoreError>;

    /// Daily closes for every symbol over the trailing `window_days` calendar
    /// days, ending today.
    async fn get_recent_closes(
        &self,
        symbols: &[String],
        window_days: u32,
    ) -> Result<ClosesBySymbol, CoreError>;
}
