//! The per-instrument output row.

use crate::returns::{Horizon, PriceSummary, TrailingReturns};
use serde::{Deserialize, Serialize};
use steelwatch_data::{FundamentalData, Instrument};

/// Metrics for one instrument: identity, latest close, trailing returns and
/// fundamentals. Every computed field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    /// Ticker symbol.
    pub symbol: String,
    /// Sector label.
    pub sector: String,
    /// Display name.
    pub name: String,
    /// Latest close in USD.
    pub current_price: Option<f64>,
    /// Trailing returns in percent.
    pub returns: TrailingReturns,
    /// Trailing P/E ratio.
    pub trailing_pe: Option<f64>,
    /// Market capitalization.
    pub market_cap: Option<f64>,
    /// Short ratio.
    pub short_ratio: Option<f64>,
    /// Forward P/E ratio.
    pub forward_pe: Option<f64>,
}

impl MetricsRow {
    /// Join an instrument with its price summary and fundamentals.
    pub fn new(instrument: &Instrument, prices: PriceSummary, fundamentals: FundamentalData) -> Self {
        Self {
            symbol: instrument.symbol.clone(),
            sector: instrument.sector.clone(),
            name: instrument.name.clone(),
            current_price: prices.current_price,
            returns: prices.returns,
            trailing_pe: fundamentals.trailing_pe,
            market_cap: fundamentals.market_cap,
            short_ratio: fundamentals.short_ratio,
            forward_pe: fundamentals.forward_pe,
        }
    }

    /// A row with every computed field absent.
    pub fn empty(instrument: &Instrument) -> Self {
        Self::new(
            instrument,
            PriceSummary::default(),
            FundamentalData::empty(&instrument.symbol),
        )
    }

    /// Return for a horizon.
    pub const fn return_for(&self, horizon: Horizon) -> Option<f64> {
        self.returns.get(horizon)
    }

    /// Whether the row carries a current price.
    pub const fn has_prices(&self) -> bool {
        self.current_price.is_some()
    }
}
