use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use time::OffsetDateTime;
use tracing::debug;

use super::traits::{ClosesBySymbol, QuoteProvider};
use crate::errors::CoreError;
use crate::models::price::PricePoint;

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance quote provider.
///
/// - **Free**: No API key required.
/// - **Coverage**: Global equities, ETFs, indices.
/// - **Data**: daily OHLCV history via the `yahoo_finance_api` crate.
///
/// Yahoo has no multi-symbol history endpoint, so a batch lookup is one
/// request per symbol, issued sequentially. The batch only fails when every
/// request failed.
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Midnight UTC of `date` as the `time` crate's `OffsetDateTime`.
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let invalid = |e: String| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid date {date}: {e}"),
        };
        let month = time::Month::try_from(date.month() as u8).map_err(|e| invalid(e.to_string()))?;
        let day = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| invalid(e.to_string()))?;
        Ok(day.midnight().assume_utc())
    }

    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }

    /// Daily closes for one symbol, restricted to `[from, to]`.
    async fn closes_for(
        &self,
        symbol: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let start = Self::to_offset_datetime(from)?;
        // end is exclusive on Yahoo's side
        let end = Self::to_offset_datetime(to + Duration::days(1))?;

        let resp = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch history for {symbol} ({from}..={to}): {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::timestamp_to_naive_date(q.timestamp)?;
                (date >= from && date <= to).then(|| PricePoint::new(date, q.close))
            })
            .collect();
        points.sort_by_key(|p| p.date);
        Ok(points)
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
            match self.closes_for(symbol, from, to).await {
                Ok(points) => {
                    debug!(symbol = %symbol, points = points.len(), "{PROVIDER} closes");
                    out.insert(symbol.clone(), points);
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
impl QuoteProvider for YahooFinanceProvider {
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
