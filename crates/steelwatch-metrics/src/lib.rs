#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/steelwatch/steelwatch/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod builder;
pub mod error;
pub mod returns;
pub mod row;

pub use builder::{LookbackWindow, MetricsBuilder};
pub use error::{MetricsError, Result};
pub use returns::{
    Horizon, PriceSummary, ReturnGap, TrailingReturns, percent_change, trailing_returns,
};
pub use row::MetricsRow;
