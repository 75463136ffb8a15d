//! Persistence for the previous run's plain-text results.

use crate::error::{Result, WatchError};
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

/// Storage for the last rendered result page.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// The previous snapshot, or `None` when no run has persisted one yet.
    async fn load(&self) -> Result<Option<String>>;

    /// Replaces the snapshot with this run's plain-text page.
    async fn save(&self, content: &str) -> Result<()>;
}

/// Snapshot on the local filesystem.
pub struct FsSnapshotStore {
    path: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SnapshotStore for FsSnapshotStore {
    async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WatchError::SnapshotRead(format!("{}: {e}", self.path.display()))),
        }
    }

    async fn save(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| WatchError::Transport(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&self.path, content)
            .await
            .map_err(|e| WatchError::Transport(format!("{}: {e}", self.path.display())))?;
        debug!("Snapshot written to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(dir.path().join("last_results.txt"));

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(dir.path().join("last_results.txt"));

        store.save("Top 3/23 @ Mar 7, 9 PM\n").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("Top 3/23 @ Mar 7, 9 PM\n"));
    }

    #[tokio::test]
    async fn test_save_creates_missing_directories() {
        let dir = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(dir.path().join("resources/nested/last_results.txt"));

        store.save("content").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("content"));
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let store = FsSnapshotStore::new(dir.path().join("last_results.txt"));

        store.save("first").await.unwrap();
        store.save("second").await.unwrap();
        assert_eq!(store.load().await.unwrap().as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_unreadable_path_is_snapshot_read_error() {
        let dir = TempDir::new().unwrap();
        // A directory at the snapshot path is a read error, not "no snapshot"
        let store = FsSnapshotStore::new(dir.path());

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, WatchError::SnapshotRead(_)));
    }
}
