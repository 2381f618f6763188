//! Publishing the snapshot to a [`SnapshotStore`].

use crate::export::Snapshot;
use crate::store::{PublishError, Revision, SnapshotStore};
use serde::{Deserialize, Serialize};

/// Default artifact path inside the store.
pub const DEFAULT_SNAPSHOT_PATH: &str = "dashboard_source_data.csv";

/// Where the publisher writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublisherConfig {
    /// Artifact path inside the store.
    pub path: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            path: DEFAULT_SNAPSHOT_PATH.to_string(),
        }
    }
}

/// Result of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishOutcome {
    /// Revision of the artifact just written.
    pub revision: Revision,
    /// Revision that was replaced, if any.
    pub previous: Option<Revision>,
    /// Whether the artifact was created rather than replaced.
    pub created: bool,
    /// Size of the written CSV in bytes.
    pub bytes: usize,
}

/// Serializes snapshots and writes them with a revision precondition.
#[derive(Debug)]
pub struct SnapshotPublisher<S> {
    store: S,
    config: PublisherConfig,
}

impl<S: SnapshotStore> SnapshotPublisher<S> {
    /// Create a publisher writing to `config.path` in `store`.
    pub const fn new(store: S, config: PublisherConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Artifact path.
    pub fn path(&self) -> &str {
        &self.config.path
    }

    /// Replace the published snapshot.
    ///
    /// Reads the current revision, then writes conditioned on it. A write
    /// that lands between the two steps surfaces as
    /// [`PublishError::Conflict`]; nothing is retried.
    pub async fn publish(&self, snapshot: &Snapshot) -> Result<PublishOutcome, PublishError> {
        let csv = snapshot.to_csv()?;
        let path = self.path();

        let previous = self.store.current_revision(path).await?;
        match &previous {
            Some(revision) => tracing::info!(path, revision = %revision, "Replacing snapshot"),
            None => tracing::info!(path, "Creating snapshot"),
        }

        let revision = self
            .store
            .put(path, csv.as_bytes(), previous.as_ref())
            .await?;
        tracing::info!(path, revision = %revision, rows = snapshot.len(), "Published snapshot");

        Ok(PublishOutcome {
            created: previous.is_none(),
            revision,
            previous,
            bytes: csv.len(),
        })
    }
}
