use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::traits::{ClosesBySymbol, QuoteProvider};
use crate::errors::CoreError;
use crate::models::price::PricePoint;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage quote provider, used as a fallback behind Yahoo Finance.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (config `api_keys.alphavantage` or `ALPHAVANTAGE_API_KEY`).
/// - **Data**: `TIME_SERIES_DAILY` compact output, i.e. the last 100 trading
///   days. Purchase dates older than that come back empty.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_key }
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
}

/// Keep the closes inside `[from, to]`, sorted by date. Unparseable rows are dropped.
fn closes_between(
    series: &HashMap<String, DailyData>,
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<PricePoint> {
    let mut points: Vec<PricePoint> = series
        .iter()
        .filter_map(|(date_str, data)| {
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
            if date < from || date > to {
                return None;
            }
            let price: f64 = data.close.parse().ok()?;
            Some(PricePoint::new(date, price))
        })
        .collect();
    points.sort_by_key(|p| p.date);
    points
}

impl AlphaVantageProvider {
    async fn fetch_daily_series(
        &self,
        symbol: &str,
    ) -> Result<HashMap<String, DailyData>, CoreError> {
        let resp: TimeSeriesResponse = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", &symbol.to_uppercase()),
                ("outputsize", "compact"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse time series for {symbol}: {e}"),
            })?;

        if let Some(msg) = resp.error_message.or(resp.note) {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("{symbol}: {msg}"),
            });
        }

        resp.time_series.ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No time series data for {symbol}. API limit may be exceeded."),
        })
    }

    async fn batch(
        &self,
        symbols: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ClosesBySymbol, CoreError> {
        let mut out = ClosesBySymbol::new();
        let mut last_error = None;

        for symbol in symbols {
            match self.fetch_daily_series(symbol).await {
                Ok(series) => {
                    out.insert(symbol.clone(), closes_between(&series, from, to));
                }
                Err(e) => {
                    debug!(symbol = %symbol, error = %e, "{PROVIDER} request failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if out.is_empty() => Err(e),
            _ => Ok(out),
        }
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_closes_in_range(
        &self,
        symbols: &[String],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<ClosesBySymbol, CoreError> {
        self.batch(symbols, from, to).await
    }

    async fn get_recent_closes(
        &self,
        symbols: &[String],
        window_days: u32,
    ) -> Result<ClosesBySymbol, CoreError> {
        let today = Utc::now().date_naive();
        let from = today - Duration::days(i64::from(window_days));
        self.batch(symbols, from, today).await
    }
}
