#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/steelwatch/steelwatch/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod export;
pub mod publish;
pub mod report;
pub mod store;
pub mod summary;

pub use export::{ExportError, ExportFormat, Exporter, SNAPSHOT_COLUMNS, Snapshot, write_snapshot_csv};
pub use publish::{DEFAULT_SNAPSHOT_PATH, PublishOutcome, PublisherConfig, SnapshotPublisher};
pub use report::{Report, ReportError, ReportFormat};
pub use store::{GitHubStore, MemoryStore, PublishError, Revision, SnapshotStore, StoreConfig};
pub use summary::{
    CorrelationMatrix, DashboardSummary, HorizonStats, IndustryReturns, Leader, NUMERIC_COLUMNS,
};
