//! Market data source traits.
//!
//! The metrics builder is generic over these traits so that the Yahoo
//! providers can be swapped for in-memory sources.

use crate::error::Result;
use chrono::{DateTime, Utc};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

/// Column names of a normalized price history frame, in order.
pub const HISTORY_COLUMNS: [&str; 7] = ["symbol", "date", "open", "high", "low", "close", "volume"];

/// Point-in-time fundamental fields for a symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FundamentalData {
    /// Stock symbol
    pub symbol: String,
    /// Trailing P/E ratio
    pub trailing_pe: Option<f64>,
    /// Market capitalization
    pub market_cap: Option<f64>,
    /// Short ratio (days to cover)
    pub short_ratio: Option<f64>,
    /// Forward P/E ratio
    pub forward_pe: Option<f64>,
}

impl FundamentalData {
    /// Fundamentals with every field absent.
    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }
}

/// Source of daily price history.
#[allow(async_fn_in_trait)]
pub trait QuoteSource {
    /// Fetch daily OHLCV observations for `symbol` between `start` and `end`.
    ///
    /// The frame has the columns in [`HISTORY_COLUMNS`], with `date` as a
    /// calendar date. A symbol with no data yields
    /// [`DataError::MissingData`](crate::DataError::MissingData).
    async fn fetch_history(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DataFrame>;
}

/// Source of point-in-time fundamentals.
#[allow(async_fn_in_trait)]
pub trait FundamentalsSource {
    /// Fetch the current fundamentals for `symbol`. Fields the source has no
    /// value for are `None`.
    async fn fetch_fundamentals(&self, symbol: &str) -> Result<FundamentalData>;
}
