pub mod errors;
pub mod models;
pub mod providers;
pub mod render;
pub mod services;
pub mod storage;

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::info;

use errors::CoreError;
use models::config::ReportConfig;
use models::performance::ReportSnapshot;
use providers::registry::QuoteProviderRegistry;
use render::html::HtmlRenderer;
use render::ReportRenderer;
use services::performance_service::PerformanceCalculator;
use services::price_service::PriceService;
use storage::report_store::ReportStore;

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub snapshot: ReportSnapshot,
    /// History length after this run's entry was appended
    pub history_len: usize,
    pub document_path: PathBuf,
}

/// Main entry point: one instance per process, one `run()` per scheduled
/// invocation.
///
/// A run fetches purchase and current prices, computes the report, then
/// writes the latest snapshot, the history entry and the rendered document.
/// Nothing is written unless prices were obtained and the report rendered.
#[must_use]
pub struct PortfolioReporter {
    config: ReportConfig,
    price_service: PriceService,
    store: ReportStore,
    renderer: Box<dyn ReportRenderer>,
}

impl std::fmt::Debug for PortfolioReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortfolioReporter")
            .field("holdings", &self.config.holdings.len())
            .field("benchmarks", &self.config.benchmarks.len())
            .field("providers", &self.price_service.provider_names())
            .field("data_dir", &self.store.dir())
            .field("cache_policy", &self.config.cache_policy)
            .finish()
    }
}

/// The document at `path` must carry the renderer's extension.
fn check_output_extension(path: &Path, expected: &str) -> Result<(), CoreError> {
    let actual = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(CoreError::Config(format!(
            "output_path {} does not match renderer extension '{expected}'",
            path.display()
        )))
    }
}

impl PortfolioReporter {
    /// Reporter with the default providers (Yahoo Finance, plus Alpha Vantage
    /// when keyed) and the HTML renderer.
    pub fn new(config: ReportConfig) -> Result<Self, CoreError> {
        let registry = QuoteProviderRegistry::new_with_defaults(&config.api_keys);
        let renderer = HtmlRenderer::new(config.report_title.clone());
        Self::with_components(config, registry, Box::new(renderer))
    }

    /// Reporter with explicit collaborators.
    pub fn with_components(
        config: ReportConfig,
        registry: QuoteProviderRegistry,
        renderer: Box<dyn ReportRenderer>,
    ) -> Result<Self, CoreError> {
        config.validate()?;
        if registry.is_empty() {
            return Err(CoreError::NoProvider);
        }
        check_output_extension(&config.output_path, renderer.extension())?;
        let price_service =
            PriceService::new(registry).with_current_window(config.current_window_days);
        let store = ReportStore::new(config.data_dir.clone());
        Ok(Self {
            config,
            price_service,
            store,
            renderer,
        })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    /// Produce the report as of now.
    pub async fn run(&self) -> Result<ReportOutcome, CoreError> {
        self.run_at(Utc::now()).await
    }

    /// Produce the report stamped with `now`.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<ReportOutcome, CoreError> {
        let config = &self.config;

        let purchase = self
            .price_service
            .load_purchase_prices(
                &config.holdings,
                &config.benchmarks,
                config.purchase_date,
                config.cache_policy,
                &self.store,
            )
            .await?;

        let current = self
            .price_service
            .fetch_current_prices(&config.all_symbols())
            .await?;

        let report = PerformanceCalculator::compute(
            &config.holdings,
            &config.benchmarks,
            &purchase,
            &current,
            config.investment_per_symbol,
        );
        info!(
            included = report.summary.holdings_included,
            skipped = report.summary.holdings_skipped,
            return_pct = format_args!("{:.2}", report.summary.portfolio_return_percent),
            "report computed"
        );

        let snapshot = ReportSnapshot::new(report, now);
        let document = self.renderer.render(&snapshot)?;

        self.store.save_snapshot(&snapshot)?;
        let history_len = self.store.append_history(&snapshot)?;
        self.store.write_document(&config.output_path, &document)?;

        Ok(ReportOutcome {
            snapshot,
            history_len,
            document_path: config.output_path.clone(),
        })
    }
}
