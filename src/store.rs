//! File-backed status store.
//!
//! One pretty-printed JSON document per cluster at `{namespace}/{name}.json`
//! under the state directory. Writes go through a temporary file and a rename
//! so a crashed pass never leaves a half-written status behind.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use cairn_reconciler::{
    ClusterKey, ClusterStatus, StatusMutation, StatusStore, StoreError, StoreResult,
};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Status store keeping each cluster's status in a JSON file.
pub struct FileStatusStore {
    root: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileStatusStore {
    /// Create a store rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// File holding the status of one cluster.
    ///
    /// Namespaces get their own directory, so keys never share a file name.
    pub fn path_for(&self, key: &ClusterKey) -> PathBuf {
        self.root
            .join(&key.namespace)
            .join(format!("{}.json", key.name))
    }

    async fn read(path: &Path) -> StoreResult<Option<ClusterStatus>> {
        match tokio::fs::read_to_string(path).await {
            Ok(contents) => serde_json::from_str(&contents).map(Some).map_err(|e| {
                StoreError::backend(format!("corrupt status file '{}': {e}", path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::backend(format!(
                "failed to read '{}': {e}",
                path.display()
            ))),
        }
    }

    async fn write(path: &Path, status: &ClusterStatus) -> StoreResult<()> {
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                StoreError::backend(format!(
                    "failed to create state directory '{}': {e}",
                    dir.display()
                ))
            })?;
        }

        let json = serde_json::to_string_pretty(status)
            .map_err(|e| StoreError::backend(format!("failed to encode status: {e}")))?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            StoreError::backend(format!("failed to write '{}': {e}", tmp.display()))
        })?;

        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                warn!(
                    path = %tmp.display(),
                    error = %cleanup,
                    "Failed to remove temporary status file"
                );
            }
            return Err(StoreError::backend(format!(
                "failed to replace '{}': {e}",
                path.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl StatusStore for FileStatusStore {
    async fn get_status(&self, key: &ClusterKey) -> StoreResult<Option<ClusterStatus>> {
        Self::read(&self.path_for(key)).await
    }

    async fn update_status(
        &self,
        key: &ClusterKey,
        mutate: StatusMutation<'_>,
    ) -> StoreResult<ClusterStatus> {
        let _guard = self.write_lock.lock().await;
        let path = self.path_for(key);

        let mut status = Self::read(&path).await?.unwrap_or_default();
        mutate(&mut status);
        Self::write(&path, &status).await?;

        debug!(cluster = %key, path = %path.display(), "Cluster status written");
        Ok(status)
    }
}
