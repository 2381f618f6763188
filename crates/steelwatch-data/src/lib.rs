#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/steelwatch/steelwatch/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod instruments;
pub mod source;
pub mod yahoo;

pub use error::{DataError, Result};
pub use instruments::{Instrument, InstrumentSource, InstrumentTable, fetch_text};
pub use source::{FundamentalData, FundamentalsSource, HISTORY_COLUMNS, QuoteSource};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
