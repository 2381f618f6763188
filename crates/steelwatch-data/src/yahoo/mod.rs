//! Yahoo Finance data providers.

pub mod fundamentals;
pub mod quotes;

pub use fundamentals::YahooFundamentalsProvider;
pub use quotes::YahooQuoteProvider;
