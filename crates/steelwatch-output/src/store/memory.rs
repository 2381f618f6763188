//! In-memory snapshot store.

use super::{PublishError, Revision, SnapshotStore};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Inner {
    artifacts: HashMap<String, (Revision, Vec<u8>)>,
    next_revision: u64,
    writes: usize,
}

impl Inner {
    fn store(&mut self, path: &str, content: Vec<u8>) -> Revision {
        self.next_revision += 1;
        self.writes += 1;
        let revision = Revision::new(format!("rev-{}", self.next_revision));
        self.artifacts
            .insert(path.to_string(), (revision.clone(), content));
        revision
    }
}

/// A [`SnapshotStore`] kept in process memory, with the same precondition
/// rules as the remote store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Content stored at `path`.
    pub fn content(&self, path: &str) -> Option<Vec<u8>> {
        self.lock()
            .artifacts
            .get(path)
            .map(|(_, content)| content.clone())
    }

    /// Revision stored at `path`.
    pub fn revision(&self, path: &str) -> Option<Revision> {
        self.lock()
            .artifacts
            .get(path)
            .map(|(revision, _)| revision.clone())
    }

    /// Number of accepted writes.
    pub fn writes(&self) -> usize {
        self.lock().writes
    }

    /// Write without a precondition, as a concurrent writer would.
    pub fn overwrite(&self, path: &str, content: &[u8]) -> Revision {
        self.lock().store(path, content.to_vec())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave the map half-updated
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl SnapshotStore for MemoryStore {
    async fn current_revision(&self, path: &str) -> Result<Option<Revision>, PublishError> {
        Ok(self.revision(path))
    }

    async fn put(
        &self,
        path: &str,
        content: &[u8],
        precondition: Option<&Revision>,
    ) -> Result<Revision, PublishError> {
        let mut inner = self.lock();
        let current = inner.artifacts.get(path).map(|(revision, _)| revision);

        match (current, precondition) {
            (None, None) => {}
            (Some(current), Some(expected)) if current == expected => {}
            (Some(current), None) => {
                return Err(PublishError::Conflict {
                    path: path.to_string(),
                    message: format!("artifact already exists at revision {}", current),
                });
            }
            (current, Some(expected)) => {
                return Err(PublishError::Conflict {
                    path: path.to_string(),
                    message: format!(
                        "expected revision {}, found {}",
                        expected,
                        current.map_or_else(|| "none".to_string(), ToString::to_string)
                    ),
                });
            }
        }

        Ok(inner.store(path, content.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_update() {
        let store = MemoryStore::new();
        assert_eq!(store.current_revision("a.csv").await.unwrap(), None);

        let first = store.put("a.csv", b"one", None).await.unwrap();
        assert_eq!(store.current_revision("a.csv").await.unwrap(), Some(first.clone()));

        let second = store.put("a.csv", b"two", Some(&first)).await.unwrap();
        assert_ne!(first, second);
        assert_eq!(store.content("a.csv"), Some(b"two".to_vec()));
        assert_eq!(store.writes(), 2);
    }

    #[tokio::test]
    async fn test_stale_precondition_rejected() {
        let store = MemoryStore::new();
        let first = store.put("a.csv", b"one", None).await.unwrap();
        store.overwrite("a.csv", b"other");

        let result = store.put("a.csv", b"two", Some(&first)).await;
        assert!(matches!(result, Err(PublishError::Conflict { .. })));
        assert_eq!(store.content("a.csv"), Some(b"other".to_vec()));
    }

    #[tokio::test]
    async fn test_create_over_existing_rejected() {
        let store = MemoryStore::new();
        store.overwrite("a.csv", b"existing");

        let result = store.put("a.csv", b"new", None).await;
        assert!(matches!(result, Err(PublishError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_precondition_on_missing_artifact_rejected() {
        let store = MemoryStore::new();
        let result = store.put("a.csv", b"new", Some(&Revision::new("rev-9"))).await;
        assert!(matches!(result, Err(PublishError::Conflict { message, .. }) if message.contains("none")));
    }
}
