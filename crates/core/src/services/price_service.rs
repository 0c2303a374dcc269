use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::errors::CoreError;
use crate::models::config::{Benchmark, CachePolicy, Holding};
use crate::models::price::{PricePoint, PriceSnapshot, PurchaseCache, SnapshotKind};
use crate::providers::registry::QuoteProviderRegistry;
use crate::providers::traits::ClosesBySymbol;
use crate::storage::report_store::ReportStore;

const DEFAULT_CURRENT_WINDOW_DAYS: u32 = 5;

/// Which lookup a fetch performs.
#[derive(Debug, Clone, Copy)]
enum Lookup {
    Range { from: NaiveDate, to: NaiveDate },
    Recent { window_days: u32 },
}

/// Fetches purchase-date and current closes from the quote providers.
///
/// Retry policy, per phase:
/// - one batch call (providers tried in registry order until one answers),
/// - then, for each symbol the batch left unpriced, one individual request,
///   sequentially. For purchase prices that request also covers the prior
///   calendar day.
///
/// Symbols that still have no price end up `Unresolved` in the snapshot.
/// Only a phase in which *no* symbol could be priced is an error.
pub struct PriceService {
    registry: QuoteProviderRegistry,
    current_window_days: u32,
}

impl PriceService {
    pub fn new(registry: QuoteProviderRegistry) -> Self {
        Self {
            registry,
            current_window_days: DEFAULT_CURRENT_WINDOW_DAYS,
        }
    }

    #[must_use]
    pub fn with_current_window(mut self, days: u32) -> Self {
        self.current_window_days = days.max(1);
        self
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.provider_names()
    }

    /// Close on `purchase_date` for every symbol.
    ///
    /// Symbols missing from the batch answer are retried one by one over
    /// `[purchase_date - 1 day, purchase_date]`, taking the latest close on
    /// or before the purchase date.
    pub async fn fetch_purchase_prices(
        &self,
        symbols: &[String],
        purchase_date: NaiveDate,
    ) -> Result<PriceSnapshot, CoreError> {
        info!(symbols = symbols.len(), %purchase_date, "fetching purchase prices");

        let batch = self
            .batch(symbols, Lookup::Range { from: purchase_date, to: purchase_date })
            .await?;

        let mut snapshot = PriceSnapshot::new(SnapshotKind::Purchase);
        let mut missing = Vec::new();
        for symbol in symbols {
            match batch.get(symbol).and_then(|p| close_on_or_before(p, purchase_date)) {
                Some(price) => snapshot.insert_price(symbol, price),
                None => missing.push(symbol.clone()),
            }
        }

        let retry_window = Lookup::Range {
            from: purchase_date - Duration::days(1),
            to: purchase_date,
        };
        for symbol in missing {
            debug!(symbol = %symbol, "retrying purchase price individually");
            match self.single(&symbol, retry_window).await {
                Ok(points) => match close_on_or_before(&points, purchase_date) {
                    Some(price) => snapshot.insert_price(&symbol, price),
                    None => {
                        warn!(symbol = %symbol, %purchase_date, "no purchase price available");
                        snapshot.insert_unresolved(
                            &symbol,
                            format!("no close on {purchase_date} or the day before"),
                        );
                    }
                },
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "purchase price lookup failed");
                    snapshot.insert_unresolved(&symbol, e.to_string());
                }
            }
        }

        ensure_any_resolved(&snapshot, "purchase prices")?;
        Ok(snapshot)
    }

    /// Latest close within the trailing window for every symbol.
    /// Symbols the batch did not price are requested again individually.
    pub async fn fetch_current_prices(&self, symbols: &[String]) -> Result<PriceSnapshot, CoreError> {
        info!(symbols = symbols.len(), window_days = self.current_window_days, "fetching current prices");

        let lookup = Lookup::Recent {
            window_days: self.current_window_days,
        };
        let batch = self.batch(symbols, lookup).await?;

        let mut snapshot = PriceSnapshot::new(SnapshotKind::Current);
        let mut missing = Vec::new();
        for symbol in symbols {
            match batch.get(symbol).and_then(|p| last_valid_close(p)) {
                Some(price) => snapshot.insert_price(symbol, price),
                None => missing.push(symbol.clone()),
            }
        }

        for symbol in missing {
            debug!(symbol = %symbol, "retrying current price individually");
            match self.single(&symbol, lookup).await {
                Ok(points) => match last_valid_close(&points) {
                    Some(price) => snapshot.insert_price(&symbol, price),
                    None => {
                        warn!(symbol = %symbol, "no current price available");
                        snapshot.insert_unresolved(
                            &symbol,
                            format!("no close in the last {} days", self.current_window_days),
                        );
                    }
                },
                Err(e) => {
                    warn!(symbol = %symbol, error = %e, "current price lookup failed");
                    snapshot.insert_unresolved(&symbol, e.to_string());
                }
            }
        }

        ensure_any_resolved(&snapshot, "current prices")?;
        Ok(snapshot)
    }

    /// Purchase prices for every holding and benchmark, honouring the cache policy.
    ///
    /// - `ReuseCached`: a cached price is used only when it was fetched for the
    ///   symbol's current purchase date; everything else is fetched, and the
    ///   cache is rewritten when that added prices.
    /// - `ForceRefresh`: everything is fetched and the cache overwritten.
    ///
    /// Holdings are fetched per distinct purchase date; benchmarks use
    /// `default_date`.
    pub async fn load_purchase_prices(
        &self,
        holdings: &[Holding],
        benchmarks: &[Benchmark],
        default_date: NaiveDate,
        policy: CachePolicy,
        store: &ReportStore,
    ) -> Result<PriceSnapshot, CoreError> {
        let cached = match policy {
            CachePolicy::ReuseCached => store.load_purchase_prices()?.unwrap_or_default(),
            CachePolicy::ForceRefresh => PurchaseCache::new(),
        };

        let wanted = purchase_dates(holdings, benchmarks, default_date);
        let mut snapshot = PriceSnapshot::from_cache(&cached, &wanted);

        let mut to_fetch: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
        for (symbol, date) in &wanted {
            if snapshot.price(symbol).is_none() {
                if let Some(stale) = cached.get(symbol).filter(|c| c.date != *date) {
                    info!(symbol = %symbol, cached_date = %stale.date, %date, "cached purchase price is for another date");
                }
                to_fetch.entry(*date).or_default().push(symbol.clone());
            }
        }

        if to_fetch.is_empty() {
            info!(symbols = wanted.len(), %policy, "purchase prices served from cache");
            return Ok(snapshot);
        }

        let mut fetched_any = false;
        for (date, symbols) in &to_fetch {
            match self.fetch_purchase_prices(symbols, *date).await {
                Ok(fetched) => {
                    fetched_any |= fetched.resolved_count() > 0;
                    snapshot.merge(fetched);
                }
                // Other date groups or the cache may still cover the report.
                Err(CoreError::NoData(msg)) => {
                    warn!(%date, "{msg}");
                    for symbol in symbols {
                        snapshot.insert_unresolved(symbol, format!("no purchase price for {date}"));
                    }
                }
                Err(e) => return Err(e),
            }
        }

        ensure_any_resolved(&snapshot, "purchase prices")?;

        if fetched_any {
            let mut cache = cached;
            cache.extend(snapshot.to_cache(&wanted));
            store.save_purchase_prices(&cache)?;
        }
        Ok(snapshot)
    }

    // ── Internal ────────────────────────────────────────────────────

    /// One batch call, trying providers in order until one answers.
    /// When every provider fails the result is empty, so that the caller's
    /// per-symbol retry still runs.
    async fn batch(&self, symbols: &[String], lookup: Lookup) -> Result<ClosesBySymbol, CoreError> {
        if self.registry.is_empty() {
            return Err(CoreError::NoProvider);
        }
        if symbols.is_empty() {
            return Ok(ClosesBySymbol::new());
        }

        for provider in self.registry.providers() {
            let result = match lookup {
                Lookup::Range { from, to } => provider.get_closes_in_range(symbols, from, to).await,
                Lookup::Recent { window_days } => provider.get_recent_closes(symbols, window_days).await,
            };
            match result {
                Ok(closes) => {
                    debug!(provider = provider.name(), returned = closes.len(), "batch answered");
                    return Ok(closes);
                }
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "batch request failed");
                }
            }
        }
        Ok(ClosesBySymbol::new())
    }

    /// Individual lookup for one symbol with provider fallback. Returns the
    /// first non-empty answer, or the last error.
    async fn single(&self, symbol: &str, lookup: Lookup) -> Result<Vec<PricePoint>, CoreError> {
        let symbols = [symbol.to_string()];
        let mut last_error = None;

        for provider in self.registry.providers() {
            let result = match lookup {
                Lookup::Range { from, to } => provider.get_closes_in_range(&symbols, from, to).await,
                Lookup::Recent { window_days } => provider.get_recent_closes(&symbols, window_days).await,
            };
            match result {
                Ok(mut closes) => {
                    let points = closes.remove(symbol).unwrap_or_default();
                    if points.iter().any(PricePoint::is_valid) {
                        return Ok(points);
                    }
                }
                Err(e) => last_error = Some(e),
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(Vec::new()),
        }
    }
}

/// Latest valid close dated on or before `date`.
fn close_on_or_before(points: &[PricePoint], date: NaiveDate) -> Option<f64> {
    points
        .iter()
        .filter(|p| p.date <= date && p.is_valid())
        .max_by_key(|p| p.date)
        .map(|p| p.price)
}

/// Most recent valid close.
fn last_valid_close(points: &[PricePoint]) -> Option<f64> {
    points
        .iter()
        .filter(|p| p.is_valid())
        .max_by_key(|p| p.date)
        .map(|p| p.price)
}

/// `symbol → purchase date` for all configured symbols. A symbol that is
/// both a holding and a benchmark keeps the holding's date.
fn purchase_dates(
    holdings: &[Holding],
    benchmarks: &[Benchmark],
    default_date: NaiveDate,
) -> BTreeMap<String, NaiveDate> {
    let mut dates = BTreeMap::new();
    for holding in holdings {
        dates.insert(holding.symbol.clone(), holding.purchase_date);
    }
    for benchmark in benchmarks {
        dates.entry(benchmark.symbol.clone()).or_insert(default_date);
    }
    dates
}

fn ensure_any_resolved(snapshot: &PriceSnapshot, what: &str) -> Result<(), CoreError> {
    if snapshot.resolved_count() == 0 {
        return Err(CoreError::NoData(format!(
            "no {what} could be retrieved for any of {} symbols",
            snapshot.len()
        )));
    }
    Ok(())
}
