//! Quote history fetching from Yahoo Finance.

use crate::error::{DataError, Result};
use crate::source::QuoteSource;
use chrono::{DateTime, Utc};
use polars::prelude::*;
use std::time::Duration;
use tokio::time::sleep;
use yahoo_finance_api as yahoo;

/// Yahoo Finance quote provider with rate limiting.
pub struct YahooQuoteProvider {
    provider: yahoo::YahooConnector,
    rate_limit_delay: Duration,
}

impl std::fmt::Debug for YahooQuoteProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YahooQuoteProvider")
            .field("rate_limit_delay", &self.rate_limit_delay)
            .finish_non_exhaustive()
    }
}

impl YahooQuoteProvider {
    /// Create a new Yahoo Finance quote provider with default rate limiting (1 req/sec).
    pub fn new() -> Result<Self> {
        Self::with_rate_limit(Duration::from_millis(1000))
    }

    /// Create a new Yahoo Finance quote provider with custom rate limiting.
    pub fn with_rate_limit(rate_limit_delay: Duration) -> Result<Self> {
        Ok(Self {
            provider: yahoo::YahooConnector::new()?,
            rate_limit_delay,
        })
    }

    /// Fetch daily OHLCV data for a single symbol.
    ///
    /// # Arguments
    /// * `symbol` - The ticker symbol (e.g., "NUE")
    /// * `start` - Start date for the data
    /// * `end` - End date for the data
    ///
    /// # Returns
    /// A Polars DataFrame with columns: symbol, date, open, high, low, close, volume
    pub async fn fetch_quotes(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DataFrame> {
        if start > end {
            return Err(DataError::InvalidDateRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }

        if symbol.is_empty() {
            return Err(DataError::InvalidSymbol("Empty symbol".to_string()));
        }

        let start_time = time::OffsetDateTime::from_unix_timestamp(start.timestamp())
            .map_err(|e| DataError::TimeConversion(e.to_string()))?;
        let end_time = time::OffsetDateTime::from_unix_timestamp(end.timestamp())
            .map_err(|e| DataError::TimeConversion(e.to_string()))?;

        tracing::debug!(symbol, %start, %end, "Requesting quote history");
        let result = self
            .provider
            .get_quote_history(symbol, start_time, end_time)
            .await;

        // Rate limit regardless of outcome so a failing symbol does not speed up the loop
        sleep(self.rate_limit_delay).await;

        let quotes = result?
            .quotes()
            .map_err(|e| DataError::YahooApi(e.to_string()))?;

        if quotes.is_empty() {
            return Err(DataError::MissingData {
                symbol: symbol.to_string(),
                reason: "No data returned from Yahoo Finance".to_string(),
            });
        }

        let raw = DataFrame::new(vec![
            Series::new(
                "timestamp".into(),
                quotes.iter().map(|q| q.timestamp).collect::<Vec<i64>>(),
            )
            .into(),
            Series::new("open".into(), quotes.iter().map(|q| q.open).collect::<Vec<f64>>()).into(),
            Series::new("high".into(), quotes.iter().map(|q| q.high).collect::<Vec<f64>>()).into(),
            Series::new("low".into(), quotes.iter().map(|q| q.low).collect::<Vec<f64>>()).into(),
            Series::new(
                "close".into(),
                quotes.iter().map(|q| q.close).collect::<Vec<f64>>(),
            )
            .into(),
            Series::new(
                "volume".into(),
                quotes.iter().map(|q| q.volume).collect::<Vec<u64>>(),
            )
            .into(),
            Series::new(
                "adjusted_close".into(),
                quotes.iter().map(|q| q.adjclose).collect::<Vec<f64>>(),
            )
            .into(),
        ])?;

        normalize_history(symbol, raw)
    }
}

impl QuoteSource for YahooQuoteProvider {
    async fn fetch_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DataFrame> {
        self.fetch_quotes(symbol, start, end).await
    }
}

/// Turn a raw quote frame (unix `timestamp` in seconds plus OHLCV columns)
/// into a history frame: adds `symbol`, converts the timestamp to a calendar
/// `date`, drops adjusted close and sorts by date.
pub(crate) fn normalize_history(symbol: &str, mut raw: DataFrame) -> Result<DataFrame> {
    let symbol_col: Column = Series::new("symbol".into(), vec![symbol; raw.height()]).into();
    raw.with_column(symbol_col)?;

    let df = raw
        .lazy()
        .with_column(
            (col("timestamp") * lit(1_000_000_000))
                .cast(DataType::Datetime(TimeUnit::Nanoseconds, None))
                .cast(DataType::Date)
                .alias("date"),
        )
        .sort(["date"], SortMultipleOptions::default())
        .select(&[
            col("symbol"),
            col("date"),
            col("open"),
            col("high"),
            col("low"),
            col("close"),
            col("volume"),
        ])
        .collect()?;

    Ok(df)
}
