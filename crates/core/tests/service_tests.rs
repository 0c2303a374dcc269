// ═══════════════════════════════════════════════════════════════════
// Service Tests — PriceService (fetch, retry, cache policy) and
// PerformanceCalculator
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use portfolio_report_core::errors::CoreError;
use portfolio_report_core::models::config::{Benchmark, CachePolicy, Holding};
use portfolio_report_core::models::performance::SymbolRole;
use portfolio_report_core::models::price::{
    CachedPrice, PricePoint, PriceResolution, PriceSnapshot, SnapshotKind,
};
use portfolio_report_core::providers::registry::QuoteProviderRegistry;
use portfolio_report_core::providers::traits::{ClosesBySymbol, QuoteProvider};
use portfolio_report_core::services::performance_service::PerformanceCalculator;
use portfolio_report_core::services::price_service::PriceService;
use portfolio_report_core::storage::report_store::ReportStore;

// ═══════════════════════════════════════════════════════════════════
// Mock Provider
// ═══════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Range(Vec<String>, NaiveDate, NaiveDate),
    Recent(Vec<String>),
}

type CallLog = Arc<Mutex<Vec<Call>>>;

/// Serves closes from in-memory tables and records every call.
struct MockQuoteProvider {
    name: String,
    history: HashMap<String, Vec<PricePoint>>,
    recent: HashMap<String, Vec<PricePoint>>,
    /// Fail any call asking for more than one symbol
    fail_batches: bool,
    /// Fail every call
    fail_all: bool,
    log: CallLog,
}

impl MockQuoteProvider {
    fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            history: HashMap::new(),
            recent: HashMap::new(),
            fail_batches: false,
            fail_all: false,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_close(mut self, symbol: &str, date: NaiveDate, price: f64) -> Self {
        let points = self.history.entry(symbol.into()).or_default();
        points.push(PricePoint::new(date, price));
        points.sort_by_key(|p| p.date);
        self
    }

    fn with_recent(mut self, symbol: &str, closes: &[(NaiveDate, f64)]) -> Self {
        self.recent.insert(
            symbol.into(),
            closes.iter().map(|(d, p)| PricePoint::new(*d, *p)).collect(),
        );
        self
    }

    fn failing_batches(mut self) -> Self {
        self.fail_batches = true;
        self
    }

    fn failing(mut self) -> Self {
        self.fail_all = true;
        self
    }

    fn log(&self) -> CallLog {
        Arc::clone(&self.log)
    }

    fn check_failure(&self, symbols: &[String]) -> Result<(), CoreError> {
        if self.fail_all || (self.fail_batches && symbols.len() > 1) {
            return Err(CoreError::Api {
                provider: self.name.clone(),
                message: "Simulated failure".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_closes_in_range(
        &self,
        symbols: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ClosesBySymbol, CoreError> {
        self.log
            .lock()
            .unwrap()
            .push(Call::Range(symbols.to_vec(), from, to));
        self.check_failure(symbols)?;

        let mut out = ClosesBySymbol::new();
        for symbol in symbols {
            if let Some(points) = self.history.get(symbol) {
                let in_range: Vec<PricePoint> = points
                    .iter()
                    .filter(|p| p.date >= from && p.date <= to)
                    .cloned()
                    .collect();
                out.insert(symbol.clone(), in_range);
            }
        }
        Ok(out)
    }

    async fn get_recent_closes(
        &self,
        symbols: &[String],
        _window_days: u32,
    ) -> Result<ClosesBySymbol, CoreError> {
        self.log.lock().unwrap().push(Call::Recent(symbols.to_vec()));
        self.check_failure(symbols)?;

        Ok(symbols
            .iter()
            .filter_map(|s| self.recent.get(s).map(|p| (s.clone(), p.clone())))
            .collect())
    }
}

fn make_date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn syms(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn service_with(provider: MockQuoteProvider) -> (PriceService, CallLog) {
    let log = provider.log();
    let mut registry = QuoteProviderRegistry::new();
    registry.register(Box::new(provider));
    (PriceService::new(registry), log)
}

fn snapshot(kind: SnapshotKind, prices: &[(&str, f64)]) -> PriceSnapshot {
    let mut s = PriceSnapshot::new(kind);
    for (symbol, price) in prices {
        s.insert_price(symbol, *price);
    }
    s
}

fn holdings(symbols: &[&str]) -> Vec<Holding> {
    symbols
        .iter()
        .map(|s| Holding::new(*s, make_date(2025, 1, 2)))
        .collect()
}

fn assert_close(actual: f64, expected: f64) {
    let tolerance = 1e-9 * expected.abs().max(1.0);
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected}, got {actual}"
    );
}

// ═══════════════════════════════════════════════════════════════════
// PriceService — purchase prices
// ═══════════════════════════════════════════════════════════════════

mod purchase_prices {
    use super::*;

    #[tokio::test]
    async fn batch_resolves_everything_in_one_call() {
        let d = make_date(2025, 1, 2);
        let provider = MockQuoteProvider::new("mock")
            .with_close("A", d, 10.0)
            .with_close("B", d, 20.0);
        let (svc, log) = service_with(provider);

        let snap = svc.fetch_purchase_prices(&syms(&["A", "B"]), d).await.unwrap();

        assert_eq!(snap.kind, SnapshotKind::Purchase);
        assert_eq!(snap.price("A"), Some(10.0));
        assert_eq!(snap.price("B"), Some(20.0));
        assert_eq!(*log.lock().unwrap(), vec![Call::Range(syms(&["A", "B"]), d, d)]);
    }

    #[tokio::test]
    async fn missing_date_retries_prior_day_individually() {
        let d = make_date(2025, 1, 2);
        let prior = make_date(2025, 1, 1);
        let provider = MockQuoteProvider::new("mock")
            .with_close("A", d, 10.0)
            .with_close("B", prior, 19.5);
        let (svc, log) = service_with(provider);

        let snap = svc.fetch_purchase_prices(&syms(&["A", "B"]), d).await.unwrap();

        assert_eq!(snap.price("A"), Some(10.0));
        assert_eq!(snap.price("B"), Some(19.5));
        let calls = log.lock().unwrap().clone();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], Call::Range(syms(&["B"]), prior, d));
    }

    #[tokio::test]
    async fn later_closes_are_not_used_as_purchase_price() {
        let d = make_date(2025, 1, 2);
        let provider = MockQuoteProvider::new("mock")
            .with_close("A", d, 10.0)
            .with_close("B", make_date(2025, 1, 3), 21.0);
        let (svc, _) = service_with(provider);

        let snap = svc.fetch_purchase_prices(&syms(&["A", "B"]), d).await.unwrap();
        assert_eq!(snap.price("B"), None);
        assert!(matches!(snap.resolution("B"), Some(PriceResolution::Unresolved(_))));
    }

    #[tokio::test]
    async fn unpriceable_symbol_is_unresolved_not_error() {
        let d = make_date(2025, 1, 2);
        let provider = MockQuoteProvider::new("mock").with_close("A", d, 10.0);
        let (svc, _) = service_with(provider);

        let snap = svc.fetch_purchase_prices(&syms(&["A", "ZZZ"]), d).await.unwrap();
        assert_eq!(snap.resolved_count(), 1);
        assert!(snap.contains("ZZZ"));
        assert_eq!(snap.price("ZZZ"), None);
    }

    #[tokio::test]
    async fn batch_failure_falls_back_to_individual_requests() {
        let d = make_date(2025, 1, 2);
        let provider = MockQuoteProvider::new("mock")
            .with_close("A", d, 10.0)
            .with_close("B", d, 20.0)
            .failing_batches();
        let (svc, log) = service_with(provider);

        let snap = svc.fetch_purchase_prices(&syms(&["A", "B"]), d).await.unwrap();
        assert_eq!(snap.price("A"), Some(10.0));
        assert_eq!(snap.price("B"), Some(20.0));
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn nothing_resolved_is_no_data() {
        let (svc, _) = service_with(MockQuoteProvider::new("mock"));
        let result = svc
            .fetch_purchase_prices(&syms(&["A", "B"]), make_date(2025, 1, 2))
            .await;
        assert!(matches!(result, Err(CoreError::NoData(_))));
    }

    #[tokio::test]
    async fn empty_registry_is_no_provider() {
        let svc = PriceService::new(QuoteProviderRegistry::new());
        let result = svc
            .fetch_purchase_prices(&syms(&["A"]), make_date(2025, 1, 2))
            .await;
        assert!(matches!(result, Err(CoreError::NoProvider)));
    }

    #[tokio::test]
    async fn non_positive_close_is_skipped() {
        let d = make_date(2025, 1, 2);
        let provider = MockQuoteProvider::new("mock")
            .with_close("A", d, 10.0)
            .with_close("B", d, 0.0);
        let (svc, _) = service_with(provider);

        let snap = svc.fetch_purchase_prices(&syms(&["A", "B"]), d).await.unwrap();
        assert_eq!(snap.price("B"), None);
    }
}

// ═══════════════════════════════════════════════════════════════════
// PriceService — current prices
// ═══════════════════════════════════════════════════════════════════

mod current_prices {
    use super::*;

    #[tokio::test]
    async fn picks_last_close_in_window() {
        let provider = MockQuoteProvider::new("mock").with_recent(
            "A",
            &[
                (make_date(2025, 6, 2), 11.0),
                (make_date(2025, 6, 4), 12.0),
                (make_date(2025, 6, 3), 11.5),
            ],
        );
        let (svc, log) = service_with(provider);

        let snap = svc.fetch_current_prices(&syms(&["A"])).await.unwrap();
        assert_eq!(snap.kind, SnapshotKind::Current);
        assert_eq!(snap.price("A"), Some(12.0));
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_subset_retried_individually() {
        let provider = MockQuoteProvider::new("mock")
            .with_recent("A", &[(make_date(2025, 6, 4), 12.0)])
            .with_recent("B", &[]);
        let (svc, log) = service_with(provider);

        let snap = svc.fetch_current_prices(&syms(&["A", "B", "C"])).await.unwrap();

        assert_eq!(snap.price("A"), Some(12.0));
        assert_eq!(snap.price("B"), None);
        assert_eq!(snap.price("C"), None);
        assert_eq!(snap.unresolved().count(), 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                Call::Recent(syms(&["A", "B", "C"])),
                Call::Recent(syms(&["B"])),
                Call::Recent(syms(&["C"])),
            ]
        );
    }

    #[tokio::test]
    async fn whole_batch_failure_recovers_per_symbol() {
        let provider = MockQuoteProvider::new("mock")
            .with_recent("A", &[(make_date(2025, 6, 4), 12.0)])
            .with_recent("B", &[(make_date(2025, 6, 4), 18.0)])
            .failing_batches();
        let (svc, log) = service_with(provider);

        let snap = svc.fetch_current_prices(&syms(&["A", "B"])).await.unwrap();
        assert_eq!(snap.price("A"), Some(12.0));
        assert_eq!(snap.price("B"), Some(18.0));
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn total_failure_is_no_data() {
        let (svc, _) = service_with(MockQuoteProvider::new("mock").failing());
        let result = svc.fetch_current_prices(&syms(&["A", "B"])).await;
        match result {
            Err(CoreError::NoData(msg)) => assert!(msg.contains("current prices")),
            other => panic!("Expected NoData, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn second_provider_used_when_first_fails() {
        let first = MockQuoteProvider::new("down").failing();
        let second = MockQuoteProvider::new("up").with_recent("A", &[(make_date(2025, 6, 4), 12.0)]);
        let first_log = first.log();
        let second_log = second.log();

        let mut registry = QuoteProviderRegistry::new();
        registry.register(Box::new(first));
        registry.register(Box::new(second));
        let svc = PriceService::new(registry);

        let snap = svc.fetch_current_prices(&syms(&["A"])).await.unwrap();
        assert_eq!(snap.price("A"), Some(12.0));
        assert_eq!(first_log.lock().unwrap().len(), 1);
        assert_eq!(second_log.lock().unwrap().len(), 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// PriceService — purchase cache policy
// ═══════════════════════════════════════════════════════════════════

mod purchase_cache {
    use super::*;

    fn cached(store: &ReportStore, prices: &[(&str, f64)]) {
        cached_on(store, make_date(2025, 1, 2), prices);
    }

    fn cached_on(store: &ReportStore, date: NaiveDate, prices: &[(&str, f64)]) {
        let mut cache = store.load_purchase_prices().unwrap().unwrap_or_default();
        for (symbol, price) in prices {
            cache.insert(symbol.to_string(), CachedPrice { date, price: *price });
        }
        store.save_purchase_prices(&cache).unwrap();
    }

    fn cached_price(store: &ReportStore, symbol: &str) -> Option<CachedPrice> {
        store.load_purchase_prices().unwrap().unwrap().get(symbol).copied()
    }

    #[tokio::test]
    async fn reuse_cached_makes_no_calls_when_complete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        cached(&store, &[("A", 10.0), ("SPY", 500.0)]);

        let (svc, log) = service_with(MockQuoteProvider::new("mock"));
        let snap = svc
            .load_purchase_prices(
                &holdings(&["A"]),
                &[Benchmark::new("SPY", "S&P 500")],
                make_date(2025, 1, 2),
                CachePolicy::ReuseCached,
                &store,
            )
            .await
            .unwrap();

        assert_eq!(snap.price("A"), Some(10.0));
        assert_eq!(snap.price("SPY"), Some(500.0));
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn reuse_cached_fetches_only_missing_and_updates_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        cached(&store, &[("A", 10.0)]);

        let d = make_date(2025, 1, 2);
        let provider = MockQuoteProvider::new("mock")
            .with_close("A", d, 99.0)
            .with_close("B", d, 20.0);
        let (svc, log) = service_with(provider);

        let snap = svc
            .load_purchase_prices(&holdings(&["A", "B"]), &[], d, CachePolicy::ReuseCached, &store)
            .await
            .unwrap();

        assert_eq!(snap.price("A"), Some(10.0), "cached price must win");
        assert_eq!(snap.price("B"), Some(20.0));
        assert_eq!(*log.lock().unwrap(), vec![Call::Range(syms(&["B"]), d, d)]);

        assert_eq!(cached_price(&store, "A").map(|c| c.price), Some(10.0));
        assert_eq!(cached_price(&store, "B"), Some(CachedPrice { date: d, price: 20.0 }));
    }

    #[tokio::test]
    async fn force_refresh_ignores_and_overwrites_cache() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        cached(&store, &[("A", 10.0)]);

        let d = make_date(2025, 1, 2);
        let (svc, log) = service_with(MockQuoteProvider::new("mock").with_close("A", d, 11.0));

        let snap = svc
            .load_purchase_prices(&holdings(&["A"]), &[], d, CachePolicy::ForceRefresh, &store)
            .await
            .unwrap();

        assert_eq!(snap.price("A"), Some(11.0));
        assert_eq!(log.lock().unwrap().len(), 1);
        assert_eq!(cached_price(&store, "A").map(|c| c.price), Some(11.0));
    }

    #[tokio::test]
    async fn force_refresh_total_failure_leaves_cache_alone() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        cached(&store, &[("A", 10.0)]);

        let (svc, _) = service_with(MockQuoteProvider::new("mock").failing());
        let result = svc
            .load_purchase_prices(
                &holdings(&["A"]),
                &[],
                make_date(2025, 1, 2),
                CachePolicy::ForceRefresh,
                &store,
            )
            .await;

        assert!(matches!(result, Err(CoreError::NoData(_))));
        assert_eq!(cached_price(&store, "A").map(|c| c.price), Some(10.0));
    }

    #[tokio::test]
    async fn changed_purchase_date_invalidates_cached_price() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let first = make_date(2025, 1, 2);
        let moved = make_date(2025, 1, 20);

        let provider = MockQuoteProvider::new("mock")
            .with_close("A", first, 2.0)
            .with_close("A", moved, 20.0);
        let (svc, log) = service_with(provider);

        let before = svc
            .load_purchase_prices(&[Holding::new("A", first)], &[], first, CachePolicy::ReuseCached, &store)
            .await
            .unwrap();
        assert_eq!(before.price("A"), Some(2.0));

        let after = svc
            .load_purchase_prices(&[Holding::new("A", moved)], &[], moved, CachePolicy::ReuseCached, &store)
            .await
            .unwrap();

        assert_eq!(after.price("A"), Some(20.0));
        assert_eq!(log.lock().unwrap().last(), Some(&Call::Range(syms(&["A"]), moved, moved)));
        assert_eq!(cached_price(&store, "A"), Some(CachedPrice { date: moved, price: 20.0 }));
    }

    #[tokio::test]
    async fn stale_entry_only_refetches_that_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let d = make_date(2025, 1, 2);
        let later = make_date(2025, 3, 3);
        cached_on(&store, d, &[("A", 10.0), ("SPY", 500.0)]);

        let (svc, log) = service_with(MockQuoteProvider::new("mock").with_close("A", later, 15.0));
        let snap = svc
            .load_purchase_prices(
                &[Holding::new("A", later)],
                &[Benchmark::new("SPY", "S&P 500")],
                d,
                CachePolicy::ReuseCached,
                &store,
            )
            .await
            .unwrap();

        assert_eq!(snap.price("A"), Some(15.0));
        assert_eq!(snap.price("SPY"), Some(500.0));
        assert_eq!(*log.lock().unwrap(), vec![Call::Range(syms(&["A"]), later, later)]);
    }

    #[tokio::test]
    async fn holdings_grouped_by_purchase_date() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let d1 = make_date(2025, 1, 2);
        let d2 = make_date(2024, 6, 3);

        let provider = MockQuoteProvider::new("mock")
            .with_close("A", d1, 10.0)
            .with_close("B", d2, 20.0)
            .with_close("SPY", d1, 500.0);
        let (svc, log) = service_with(provider);

        let hs = vec![Holding::new("A", d1), Holding::new("B", d2)];
        let snap = svc
            .load_purchase_prices(
                &hs,
                &[Benchmark::new("SPY", "S&P 500")],
                d1,
                CachePolicy::ReuseCached,
                &store,
            )
            .await
            .unwrap();

        assert_eq!(snap.resolved_count(), 3);
        let calls = log.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![
                Call::Range(syms(&["B"]), d2, d2),
                Call::Range(syms(&["A", "SPY"]), d1, d1),
            ]
        );
    }

    #[tokio::test]
    async fn one_empty_date_group_does_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        let store = ReportStore::new(dir.path());
        let d1 = make_date(2025, 1, 2);
        let d2 = make_date(2024, 6, 3);

        let (svc, _) = service_with(MockQuoteProvider::new("mock").with_close("A", d1, 10.0));
        let hs = vec![Holding::new("A", d1), Holding::new("B", d2)];
        let snap = svc
            .load_purchase_prices(&hs, &[], d1, CachePolicy::ReuseCached, &store)
            .await
            .unwrap();

        assert_eq!(snap.price("A"), Some(10.0));
        assert_eq!(snap.price("B"), None);
        assert!(snap.contains("B"));
    }
}

// ═══════════════════════════════════════════════════════════════════
// PerformanceCalculator
// ═══════════════════════════════════════════════════════════════════

mod calculator {
    use super::*;

    #[test]
    fn two_holding_example() {
        let purchase = snapshot(SnapshotKind::Purchase, &[("A", 10.0), ("B", 20.0)]);
        let current = snapshot(SnapshotKind::Current, &[("A", 12.0), ("B", 18.0)]);

        let report =
            PerformanceCalculator::compute(&holdings(&["A", "B"]), &[], &purchase, &current, 100.0);

        assert_eq!(report.portfolio.len(), 2);
        let a = &report.portfolio[0];
        assert_eq!(a.symbol, "A");
        assert_close(a.shares, 10.0);
        assert_close(a.current_value, 120.0);
        assert_close(a.profit_loss, 20.0);
        assert_close(a.change_percent, 20.0);

        let b = &report.portfolio[1];
        assert_eq!(b.symbol, "B");
        assert_close(b.shares, 5.0);
        assert_close(b.current_value, 90.0);
        assert_close(b.profit_loss, -10.0);
        assert_close(b.change_percent, -10.0);

        let s = &report.summary;
        assert_close(s.total_invested, 200.0);
        assert_close(s.total_current_value, 210.0);
        assert_close(s.total_profit_loss, 10.0);
        assert_close(s.portfolio_return_percent, 5.0);
        assert_eq!(s.holdings_included, 2);
        assert_eq!(s.holdings_skipped, 0);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn missing_current_price_excluded_from_everything() {
        let purchase = snapshot(SnapshotKind::Purchase, &[("A", 10.0), ("B", 20.0)]);
        let current = snapshot(SnapshotKind::Current, &[("A", 12.0)]);

        let report =
            PerformanceCalculator::compute(&holdings(&["A", "B"]), &[], &purchase, &current, 100.0);

        assert_eq!(report.portfolio.len(), 1);
        assert_eq!(report.portfolio[0].symbol, "A");
        assert_close(report.summary.total_invested, 100.0);
        assert_close(report.summary.total_current_value, 120.0);
        assert_close(report.summary.portfolio_return_percent, 20.0);
        assert_eq!(report.summary.holdings_skipped, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].symbol, "B");
        assert_eq!(report.skipped[0].role, SymbolRole::Holding);
    }

    #[test]
    fn unresolved_purchase_price_skipped_with_reason() {
        let mut purchase = snapshot(SnapshotKind::Purchase, &[("A", 10.0)]);
        purchase.insert_unresolved("B", "no close on 2025-01-02 or the day before");
        let current = snapshot(SnapshotKind::Current, &[("A", 12.0), ("B", 18.0)]);

        let report =
            PerformanceCalculator::compute(&holdings(&["A", "B"]), &[], &purchase, &current, 100.0);

        assert_eq!(report.portfolio.len(), 1);
        assert!(report.skipped[0].reason.contains("purchase price unresolved"));
        assert!(report.skipped[0].reason.contains("2025-01-02"));
    }

    #[test]
    fn nothing_included_gives_zero_return() {
        let purchase = snapshot(SnapshotKind::Purchase, &[]);
        let current = snapshot(SnapshotKind::Current, &[("A", 12.0)]);

        let report =
            PerformanceCalculator::compute(&holdings(&["A", "B"]), &[], &purchase, &current, 100.0);

        assert!(report.portfolio.is_empty());
        assert_eq!(report.summary.total_invested, 0.0);
        assert_eq!(report.summary.total_current_value, 0.0);
        assert_eq!(report.summary.portfolio_return_percent, 0.0);
        assert!(!report.summary.portfolio_return_percent.is_nan());
        assert_eq!(report.summary.holdings_skipped, 2);
    }

    #[test]
    fn benchmarks_use_same_methodology_and_keep_names() {
        let purchase = snapshot(SnapshotKind::Purchase, &[("A", 10.0), ("SPY", 500.0), ("QQQ", 400.0)]);
        let current = snapshot(SnapshotKind::Current, &[("A", 12.0), ("SPY", 550.0), ("QQQ", 380.0)]);
        let benchmarks = vec![
            Benchmark::new("SPY", "S&P 500 (SPY)"),
            Benchmark::new("QQQ", "NASDAQ 100 (QQQ)"),
            Benchmark::new("DIA", "Dow Jones (DIA)"),
        ];

        let report =
            PerformanceCalculator::compute(&holdings(&["A"]), &benchmarks, &purchase, &current, 1000.0);

        assert_eq!(report.benchmarks.len(), 2);
        assert_eq!(report.benchmarks[0].name, "S&P 500 (SPY)");
        assert_close(report.benchmarks[0].record.change_percent, 10.0);
        assert_close(report.benchmarks[0].record.current_value, 1100.0);
        assert_eq!(report.benchmarks[1].name, "NASDAQ 100 (QQQ)");
        assert_close(report.benchmarks[1].record.change_percent, -5.0);

        // benchmarks never count toward the portfolio
        assert_close(report.summary.total_invested, 1000.0);
        assert_eq!(report.summary.holdings_skipped, 0);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].role, SymbolRole::Benchmark);
    }

    #[test]
    fn record_invariants_hold_across_prices() {
        let purchases = [0.37, 1.0, 13.21, 187.44, 4321.9];
        let currents = [0.01, 0.5, 13.21, 250.0, 9999.99];
        let investment = 1234.56;

        for &p in &purchases {
            for &c in &currents {
                let purchase = snapshot(SnapshotKind::Purchase, &[("X", p)]);
                let current = snapshot(SnapshotKind::Current, &[("X", c)]);
                let r = PerformanceCalculator::evaluate("X", &purchase, &current, investment).unwrap();

                assert_close(r.current_value, (investment / p) * c);
                assert_close(r.profit_loss, r.current_value - investment);
                assert_close(r.change_percent, (c - p) / p * 100.0);
                assert_eq!(r.investment_amount, investment);
            }
        }
    }

    #[test]
    fn summary_sums_included_only() {
        let purchase = snapshot(SnapshotKind::Purchase, &[("A", 10.0), ("B", 20.0), ("C", 5.0)]);
        let current = snapshot(SnapshotKind::Current, &[("A", 11.0), ("C", 6.0)]);

        let report = PerformanceCalculator::compute(
            &holdings(&["A", "B", "C"]),
            &[],
            &purchase,
            &current,
            50.0,
        );

        let expected_value: f64 = report.portfolio.iter().map(|r| r.current_value).sum();
        assert_close(report.summary.total_invested, 100.0);
        assert_close(report.summary.total_current_value, expected_value);
        assert_close(
            report.summary.portfolio_return_percent,
            (expected_value - 100.0) / 100.0 * 100.0,
        );
    }

    #[test]
    fn output_follows_configuration_order() {
        let purchase = snapshot(SnapshotKind::Purchase, &[("Z", 1.0), ("A", 1.0), ("M", 1.0)]);
        let current = snapshot(SnapshotKind::Current, &[("Z", 2.0), ("A", 2.0), ("M", 2.0)]);
        let report =
            PerformanceCalculator::compute(&holdings(&["Z", "A", "M"]), &[], &purchase, &current, 10.0);
        let order: Vec<&str> = report.portfolio.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(order, vec!["Z", "A", "M"]);
    }
}
