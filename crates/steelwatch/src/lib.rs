#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/steelwatch/steelwatch/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod refresh;

// Re-export main types from sub-crates
pub use steelwatch_data as data;
pub use steelwatch_metrics as metrics;
pub use steelwatch_output as output;

pub use refresh::{RefreshReport, build_snapshot, refresh_snapshot};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
