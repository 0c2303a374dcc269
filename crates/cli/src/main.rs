use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use portfolio_report_core::models::config::{CachePolicy, ReportConfig};
use portfolio_report_core::PortfolioReporter;

const ALPHAVANTAGE_KEY_ENV: &str = "ALPHAVANTAGE_API_KEY";

#[derive(Parser, Debug)]
#[command(name = "portfolio-report")]
#[command(
    version,
    about = "Generate the portfolio performance report (HTML + JSON history)"
)]
struct Cli {
    /// TOML file overriding the built-in portfolio configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for the purchase-price cache, latest report and history
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Where to write the rendered HTML report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ignore cached purchase prices and fetch them again
    #[arg(long)]
    refresh_purchase_prices: bool,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<ReportConfig> {
        let mut config = match &self.config {
            Some(path) => ReportConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => ReportConfig::default(),
        };

        if let Some(dir) = self.data_dir {
            config.data_dir = dir;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if self.refresh_purchase_prices {
            config.cache_policy = CachePolicy::ForceRefresh;
        }
        if let Ok(key) = std::env::var(ALPHAVANTAGE_KEY_ENV) {
            config.api_keys.insert("alphavantage".to_string(), key);
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.into_config()?;
    info!(
        holdings = config.holdings.len(),
        benchmarks = config.benchmarks.len(),
        purchase_date = %config.purchase_date,
        cache_policy = %config.cache_policy,
        "starting portfolio report"
    );

    let reporter = PortfolioReporter::new(config).context("Failed to initialise reporter")?;

    match reporter.run().await {
        Ok(outcome) => {
            let summary = &outcome.snapshot.report.summary;
            info!(
                document = %outcome.document_path.display(),
                history_entries = outcome.history_len,
                "report generated"
            );
            println!(
                "Report written to {} | value ${:.2} | invested ${:.2} | return {:+.2}%",
                outcome.document_path.display(),
                summary.total_current_value,
                summary.total_invested,
                summary.portfolio_return_percent,
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "report run failed");
            Err(e).context("Report run failed")
        }
    }
}
