//! Metrics builder.
//!
//! Fetches history and fundamentals for each instrument and assembles one
//! [`MetricsRow`] per instrument, in input order. A symbol without usable
//! price history gets a null-filled row and no fundamentals request; a
//! fundamentals failure only empties the fundamental fields.

use crate::returns::{PriceSummary, trailing_returns};
use crate::row::MetricsRow;
use chrono::{DateTime, Duration, Months, Utc};
use steelwatch_data::{FundamentalData, FundamentalsSource, Instrument, QuoteSource};

/// History window requested for every symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookbackWindow {
    /// Window start.
    pub start: DateTime<Utc>,
    /// Window end (run time).
    pub end: DateTime<Utc>,
}

impl LookbackWindow {
    /// Length of the window in years.
    pub const YEARS: u32 = 2;

    /// Two years ending at `end`.
    pub fn ending(end: DateTime<Utc>) -> Self {
        let start = end
            .checked_sub_months(Months::new(Self::YEARS * 12))
            .unwrap_or_else(|| end - Duration::days(365 * i64::from(Self::YEARS)));
        Self { start, end }
    }

    /// Two years ending now.
    pub fn ending_now() -> Self {
        Self::ending(Utc::now())
    }
}

/// Builds metrics rows from a quote source and a fundamentals source.
#[derive(Debug)]
pub struct MetricsBuilder<Q, F> {
    quotes: Q,
    fundamentals: F,
}

impl<Q, F> MetricsBuilder<Q, F>
where
    Q: QuoteSource,
    F: FundamentalsSource,
{
    /// Create a builder over the given sources.
    pub const fn new(quotes: Q, fundamentals: F) -> Self {
        Self {
            quotes,
            fundamentals,
        }
    }

    /// Build the row for one instrument. Never fails; unavailable data leaves
    /// the corresponding fields empty.
    pub async fn build_row(&self, instrument: &Instrument, window: &LookbackWindow) -> MetricsRow {
        let Some(prices) = self.price_summary(&instrument.symbol, window).await else {
            return MetricsRow::empty(instrument);
        };
        let fundamentals = self.fundamentals(&instrument.symbol).await;
        MetricsRow::new(instrument, prices, fundamentals)
    }

    /// Build rows for all instruments, sequentially and in order.
    pub async fn build(&self, instruments: &[Instrument], window: &LookbackWindow) -> Vec<MetricsRow> {
        let mut rows = Vec::with_capacity(instruments.len());
        for instrument in instruments {
            rows.push(self.build_row(instrument, window).await);
        }
        rows
    }

    /// `None` when the symbol has no usable history.
    async fn price_summary(&self, symbol: &str, window: &LookbackWindow) -> Option<PriceSummary> {
        let history = match self.quotes.fetch_history(symbol, window.start, window.end).await {
            Ok(history) if history.height() > 0 => history,
            Ok(_) => {
                tracing::info!(symbol, "Empty price history");
                return None;
            }
            Err(e) if e.is_missing_data() => {
                tracing::info!(symbol, "No price history available");
                return None;
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Failed to fetch price history");
                return None;
            }
        };

        match trailing_returns(&history) {
            Ok(summary) => {
                tracing::debug!(symbol, sessions = history.height(), "Computed trailing returns");
                Some(summary)
            }
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Failed to compute trailing returns");
                None
            }
        }
    }

    async fn fundamentals(&self, symbol: &str) -> FundamentalData {
        match self.fundamentals.fetch_fundamentals(symbol).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(symbol, error = %e, "Failed to fetch fundamentals");
                FundamentalData::empty(symbol)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::returns::Horizon;
    use approx::assert_relative_eq;
    use chrono::TimeZone;
    use polars::prelude::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use steelwatch_data::{DataError, Result};

    fn history(symbol: &str, closes: &[f64]) -> DataFrame {
        let n = closes.len();
        let days: Vec<i32> = (0..n as i32).map(|d| 19_000 + d).collect();
        DataFrame::new(vec![
            Series::new("symbol".into(), vec![symbol; n]).into(),
            Series::new("date".into(), days)
                .cast(&DataType::Date)
                .unwrap()
                .into(),
            Series::new("close".into(), closes.to_vec()).into(),
        ])
        .unwrap()
    }

    #[derive(Default)]
    struct FakeQuotes {
        closes: HashMap<String, Vec<f64>>,
        failing: Vec<String>,
        calls: RefCell<Vec<(String, DateTime<Utc>, DateTime<Utc>)>>,
    }

    impl QuoteSource for FakeQuotes {
        async fn fetch_history(
            &self,
            symbol: &str,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<DataFrame> {
            self.calls.borrow_mut().push((symbol.to_string(), start, end));
            if self.failing.iter().any(|s| s == symbol) {
                return Err(DataError::YahooApi("connection reset".to_string()));
            }
            match self.closes.get(symbol) {
                Some(closes) => Ok(history(symbol, closes)),
                None => Err(DataError::MissingData {
                    symbol: symbol.to_string(),
                    reason: "unknown".to_string(),
                }),
            }
        }
    }

    #[derive(Default)]
    struct FakeFundamentals {
        data: HashMap<String, FundamentalData>,
        failing: Vec<String>,
        calls: RefCell<Vec<String>>,
    }

    impl FundamentalsSource for FakeFundamentals {
        async fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalData> {
            self.calls.borrow_mut().push(symbol.to_string());
            if self.failing.iter().any(|s| s == symbol) {
                return Err(DataError::Http("HTTP 500".to_string()));
            }
            Ok(self
                .data
                .get(symbol)
                .cloned()
                .unwrap_or_else(|| FundamentalData::empty(symbol)))
        }
    }

    fn instruments() -> Vec<Instrument> {
        vec![
            Instrument::new("NUE", "Steel", "Nucor"),
            Instrument::new("CLF", "Mining", "Cleveland-Cliffs"),
            Instrument::new("STLD", "Steel", "Steel Dynamics"),
        ]
    }

    fn window() -> LookbackWindow {
        LookbackWindow::ending(Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_lookback_window_is_two_years() {
        let window = window();
        assert_eq!(window.start, Utc.with_ymd_and_hms(2023, 3, 10, 12, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_lookback_window_leap_day() {
        let window = LookbackWindow::ending(Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
        assert_eq!(window.start, Utc.with_ymd_and_hms(2022, 2, 28, 0, 0, 0).unwrap());
    }

    #[tokio::test]
    async fn test_rows_follow_input_order() {
        let mut quotes = FakeQuotes::default();
        quotes.closes.insert("NUE".to_string(), vec![100.0, 110.0]);
        quotes.closes.insert("CLF".to_string(), vec![20.0, 19.0]);
        quotes.closes.insert("STLD".to_string(), vec![50.0, 50.0]);

        let builder = MetricsBuilder::new(quotes, FakeFundamentals::default());
        let rows = builder.build(&instruments(), &window()).await;

        let symbols: Vec<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["NUE", "CLF", "STLD"]);
        assert_relative_eq!(rows[0].return_for(Horizon::OneDay).unwrap(), 10.0, epsilon = 1e-9);
        assert_relative_eq!(rows[1].return_for(Horizon::OneDay).unwrap(), -5.0, epsilon = 1e-9);
        assert_relative_eq!(rows[2].return_for(Horizon::OneDay).unwrap(), 0.0, epsilon = 1e-9);
    }

    #[tokio::test]
    async fn test_requests_use_window() {
        let mut quotes = FakeQuotes::default();
        quotes.closes.insert("NUE".to_string(), vec![1.0]);
        let builder = MetricsBuilder::new(quotes, FakeFundamentals::default());

        let window = window();
        builder.build(&instruments()[..1], &window).await;

        let calls = builder.quotes.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], ("NUE".to_string(), window.start, window.end));
    }

    #[tokio::test]
    async fn test_symbol_without_history_keeps_row() {
        let mut quotes = FakeQuotes::default();
        quotes.closes.insert("NUE".to_string(), vec![100.0, 101.0]);
        quotes.closes.insert("STLD".to_string(), vec![50.0, 51.0]);

        let builder = MetricsBuilder::new(quotes, FakeFundamentals::default());
        let rows = builder.build(&instruments(), &window()).await;

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].symbol, "CLF");
        assert_eq!(rows[1].current_price, None);
        for horizon in Horizon::ALL {
            assert_eq!(rows[1].return_for(horizon), None);
        }
    }

    fn fundamentals_for(symbols: &[&str]) -> FakeFundamentals {
        let mut fundamentals = FakeFundamentals::default();
        for symbol in symbols {
            fundamentals.data.insert(
                symbol.to_string(),
                FundamentalData {
                    symbol: symbol.to_string(),
                    trailing_pe: Some(7.5),
                    market_cap: Some(4.2e9),
                    ..FundamentalData::default()
                },
            );
        }
        fundamentals
    }

    #[tokio::test]
    async fn test_history_failure_is_isolated() {
        let mut quotes = FakeQuotes::default();
        quotes.closes.insert("NUE".to_string(), vec![100.0, 110.0]);
        quotes.closes.insert("STLD".to_string(), vec![50.0, 55.0]);
        quotes.failing.push("CLF".to_string());

        let builder = MetricsBuilder::new(quotes, fundamentals_for(&["NUE", "CLF", "STLD"]));
        let rows = builder.build(&instruments(), &window()).await;

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], MetricsRow::empty(&instruments()[1]));
        assert_eq!(rows[0].current_price, Some(110.0));
        assert_eq!(rows[0].trailing_pe, Some(7.5));
        assert_eq!(rows[2].current_price, Some(55.0));
        assert_eq!(rows[2].market_cap, Some(4.2e9));
    }

    #[tokio::test]
    async fn test_zero_history_row_is_null_filled() {
        let mut quotes = FakeQuotes::default();
        quotes.closes.insert("NUE".to_string(), vec![100.0, 101.0]);
        quotes.closes.insert("STLD".to_string(), vec![]);

        let builder = MetricsBuilder::new(quotes, fundamentals_for(&["NUE", "CLF", "STLD"]));
        let rows = builder.build(&instruments(), &window()).await;

        // CLF has no history at all, STLD an empty frame
        assert_eq!(rows[1], MetricsRow::empty(&instruments()[1]));
        assert_eq!(rows[2], MetricsRow::empty(&instruments()[2]));
        assert_eq!(rows[1].trailing_pe, None);
        assert_eq!(rows[1].market_cap, None);
        // Fundamentals are only requested for symbols with prices
        assert_eq!(*builder.fundamentals.calls.borrow(), vec!["NUE".to_string()]);
    }

    #[tokio::test]
    async fn test_fundamentals_failure_is_isolated() {
        let mut quotes = FakeQuotes::default();
        quotes.closes.insert("NUE".to_string(), vec![100.0, 105.0]);

        let mut fundamentals = FakeFundamentals::default();
        fundamentals.failing.push("NUE".to_string());

        let builder = MetricsBuilder::new(quotes, fundamentals);
        let row = builder.build_row(&instruments()[0], &window()).await;

        assert_eq!(row.current_price, Some(105.0));
        assert_relative_eq!(row.return_for(Horizon::OneDay).unwrap(), 5.0, epsilon = 1e-9);
        assert_eq!(row.trailing_pe, None);
        assert_eq!(row.market_cap, None);
        assert_eq!(row.short_ratio, None);
        assert_eq!(row.forward_pe, None);
    }

    #[tokio::test]
    async fn test_empty_instrument_list() {
        let builder = MetricsBuilder::new(FakeQuotes::default(), FakeFundamentals::default());
        let rows = builder.build(&[], &window()).await;
        assert!(rows.is_empty());
    }
}
