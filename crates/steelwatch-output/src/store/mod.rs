//! Remote snapshot storage.
//!
//! A store keeps one artifact per path and tags each version with an opaque
//! [`Revision`]. Writes carry the revision the writer last saw; a store
//! rejects the write with [`PublishError::Conflict`] when that revision is no
//! longer current.

pub mod github;
pub mod memory;

pub use github::{GitHubStore, StoreConfig};
pub use memory::MemoryStore;

use crate::export::ExportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while reading or writing the snapshot store.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Transport error talking to the store.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The precondition revision is stale or the artifact appeared concurrently.
    #[error("Conflicting write to {path}: {message}")]
    Conflict {
        /// Artifact path
        path: String,
        /// Store message
        message: String,
    },

    /// The credential was refused.
    #[error("Unauthorized (HTTP {status}): {message}")]
    Unauthorized {
        /// HTTP status code
        status: u16,
        /// Store message
        message: String,
    },

    /// Any other non-success response.
    #[error("Store rejected request (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status code
        status: u16,
        /// Store message
        message: String,
    },

    /// Snapshot serialization failed.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// A store response could not be decoded.
    #[error("Failed to decode store response: {0}")]
    Decode(String),

    /// Store configuration is unusable.
    #[error("Invalid store configuration: {0}")]
    InvalidConfig(String),
}

/// Opaque version marker of a stored artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision(String);

impl Revision {
    /// Wrap a store-issued marker.
    pub fn new(marker: impl Into<String>) -> Self {
        Self(marker.into())
    }

    /// The raw marker.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A versioned content store holding the published snapshot.
#[allow(async_fn_in_trait)]
pub trait SnapshotStore {
    /// Current revision of the artifact at `path`, or `None` when it does not
    /// exist yet.
    async fn current_revision(&self, path: &str) -> Result<Option<Revision>, PublishError>;

    /// Create or replace the artifact at `path`.
    ///
    /// With `precondition` unset the artifact must not exist; otherwise it
    /// must still be at that revision. Returns the new revision.
    async fn put(
        &self,
        path: &str,
        content: &[u8],
        precondition: Option<&Revision>,
    ) -> Result<Revision, PublishError>;
}
