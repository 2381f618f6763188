//! Trailing Returns
//!
//! Percentage change between the latest close and the close a fixed number of
//! trading sessions earlier. Horizons are counted in sessions (rows of the
//! price history), not calendar days.

use crate::error::{MetricsError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The fixed return horizons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Horizon {
    /// 1 session
    OneDay,
    /// 7 sessions
    SevenDay,
    /// 30 sessions
    ThirtyDay,
    /// 180 sessions
    SixMonth,
}

impl Horizon {
    /// All horizons, shortest first.
    pub const ALL: [Self; 4] = [Self::OneDay, Self::SevenDay, Self::ThirtyDay, Self::SixMonth];

    /// Number of trading sessions the close is lagged by.
    pub const fn sessions(&self) -> usize {
        match self {
            Self::OneDay => 1,
            Self::SevenDay => 7,
            Self::ThirtyDay => 30,
            Self::SixMonth => 180,
        }
    }

    /// Column name in the published snapshot.
    pub const fn column_name(&self) -> &'static str {
        match self {
            Self::OneDay => "1-Day Return (%)",
            Self::SevenDay => "7-Day Return (%)",
            Self::ThirtyDay => "30-Day Return (%)",
            Self::SixMonth => "6-Month Return (%)",
        }
    }

    /// Short label for reports.
    pub const fn label(&self) -> &'static str {
        match self {
            Self::OneDay => "1-Day",
            Self::SevenDay => "7-Day",
            Self::ThirtyDay => "30-Day",
            Self::SixMonth => "6-Month",
        }
    }

    const fn lag_alias(&self) -> &'static str {
        match self {
            Self::OneDay => "lag_1",
            Self::SevenDay => "lag_7",
            Self::ThirtyDay => "lag_30",
            Self::SixMonth => "lag_180",
        }
    }
}

impl fmt::Display for Horizon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why a return could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnGap {
    /// The latest or lagged close is absent (short history, null or NaN).
    Missing,
    /// The lagged close is zero or negative.
    NonPositive,
}

impl fmt::Display for ReturnGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("close price missing"),
            Self::NonPositive => f.write_str("lagged close is not positive"),
        }
    }
}

/// `(current - lagged) / lagged * 100`.
pub fn percent_change(current: Option<f64>, lagged: Option<f64>) -> std::result::Result<f64, ReturnGap> {
    let current = current.filter(|v| v.is_finite()).ok_or(ReturnGap::Missing)?;
    let lagged = lagged.filter(|v| v.is_finite()).ok_or(ReturnGap::Missing)?;
    if lagged <= 0.0 {
        return Err(ReturnGap::NonPositive);
    }
    Ok((current - lagged) / lagged * 100.0)
}

/// Returns over each [`Horizon`], in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailingReturns {
    /// 1-session return
    pub one_day: Option<f64>,
    /// 7-session return
    pub seven_day: Option<f64>,
    /// 30-session return
    pub thirty_day: Option<f64>,
    /// 180-session return
    pub six_month: Option<f64>,
}

impl TrailingReturns {
    /// Return for a horizon.
    pub const fn get(&self, horizon: Horizon) -> Option<f64> {
        match horizon {
            Horizon::OneDay => self.one_day,
            Horizon::SevenDay => self.seven_day,
            Horizon::ThirtyDay => self.thirty_day,
            Horizon::SixMonth => self.six_month,
        }
    }

    /// Set the return for a horizon.
    pub const fn set(&mut self, horizon: Horizon, value: Option<f64>) {
        match horizon {
            Horizon::OneDay => self.one_day = value,
            Horizon::SevenDay => self.seven_day = value,
            Horizon::ThirtyDay => self.thirty_day = value,
            Horizon::SixMonth => self.six_month = value,
        }
    }
}

/// Latest close plus trailing returns for one symbol.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    /// Latest close
    pub current_price: Option<f64>,
    /// Trailing returns
    pub returns: TrailingReturns,
}

fn scalar(df: &DataFrame, name: &str) -> Result<Option<f64>> {
    Ok(df.column(name)?.as_materialized_series().f64()?.get(0))
}

/// Compute the latest close and trailing returns from a price history.
///
/// The history needs `date` and `close` columns; it is sorted by date before
/// lagging. An empty history gives an all-empty summary, and a horizon longer
/// than the history gives an empty return for that horizon.
pub fn trailing_returns(history: &DataFrame) -> Result<PriceSummary> {
    for required in ["date", "close"] {
        if history.get_column_index(required).is_none() {
            return Err(MetricsError::MissingColumn(required));
        }
    }
    if history.height() == 0 {
        return Ok(PriceSummary::default());
    }

    let close = || col("close").cast(DataType::Float64);
    let mut exprs = vec![close().last().alias("current")];
    exprs.extend(
        Horizon::ALL
            .iter()
            .map(|h| close().shift(lit(h.sessions() as i64)).last().alias(h.lag_alias())),
    );

    let latest = history
        .clone()
        .lazy()
        .sort(["date"], SortMultipleOptions::default())
        .select(exprs)
        .collect()?;

    let current_price = scalar(&latest, "current")?.filter(|v| v.is_finite());
    let mut returns = TrailingReturns::default();
    for horizon in Horizon::ALL {
        let lagged = scalar(&latest, horizon.lag_alias())?;
        match percent_change(current_price, lagged) {
            Ok(value) => returns.set(horizon, Some(value)),
            Err(gap) => {
                tracing::debug!(%horizon, reason = %gap, "Trailing return unavailable");
            }
        }
    }

    Ok(PriceSummary {
        current_price,
        returns,
    })
}
