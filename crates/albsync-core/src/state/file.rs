// # File Snapshot Store
//
// File-based implementation of SnapshotStore for non-S3 deployments.
//
// ## Layout
//
// One directory per store, two JSON files per load balancer:
//
// ```text
// <dir>/<lb>-active-registered-IPs.json
// <dir>/<lb>-pending-deregisteration-IPs.json
// ```
//
// (The "deregisteration" spelling matches the object-store key layout.)
//
// ## Durability
//
// - Atomic writes: write-then-rename via a `.tmp` sibling
// - A missing or unparseable document loads as absent (with a warning),
//   which gives the engine first-run semantics instead of a failed
//   invocation

use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::snapshot_store::{ActiveSnapshot, PendingLedger, SnapshotStore};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// File-based snapshot store
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub async fn new<P: AsRef<Path>>(dir: P) -> Result<Self, Error> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.exists() {
            fs::create_dir_all(&dir).await.map_err(|e| {
                Error::snapshot_store(format!(
                    "failed to create state directory {}: {e}",
                    dir.display()
                ))
            })?;
        }
        Ok(Self { dir })
    }

    fn snapshot_path(&self, load_balancer_name: &str) -> PathBuf {
        self.dir
            .join(format!("{load_balancer_name}-active-registered-IPs.json"))
    }

    fn pending_path(&self, load_balancer_name: &str) -> PathBuf {
        self.dir
            .join(format!("{load_balancer_name}-pending-deregisteration-IPs.json"))
    }

    async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, Error> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no document at {}", path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::snapshot_store(format!(
                    "failed to read {}: {e}",
                    path.display()
                )));
            }
        };

        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                // Corrupt state is treated as absent so the next cycle
                // reconverges from scratch instead of wedging the loop.
                tracing::warn!(
                    "unparseable document at {}, treating as absent: {e}",
                    path.display()
                );
                Ok(None)
            }
        }
    }

    async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(value)?;

        let mut temp = path.to_path_buf();
        temp.set_extension("tmp");
        {
            let mut file = fs::File::create(&temp).await.map_err(|e| {
                Error::snapshot_store(format!("failed to create {}: {e}", temp.display()))
            })?;
            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::snapshot_store(format!("failed to write {}: {e}", temp.display()))
            })?;
            file.flush().await.map_err(|e| {
                Error::snapshot_store(format!("failed to flush {}: {e}", temp.display()))
            })?;
        }

        fs::rename(&temp, path).await.map_err(|e| {
            Error::snapshot_store(format!(
                "failed to rename {} to {}: {e}",
                temp.display(),
                path.display()
            ))
        })?;

        tracing::trace!("wrote {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load_snapshot(
        &self,
        load_balancer_name: &str,
    ) -> Result<Option<ActiveSnapshot>, Error> {
        Self::load_json(&self.snapshot_path(load_balancer_name)).await
    }

    async fn store_snapshot(
        &self,
        load_balancer_name: &str,
        snapshot: &ActiveSnapshot,
    ) -> Result<(), Error> {
        Self::write_json(&self.snapshot_path(load_balancer_name), snapshot).await
    }

    async fn load_pending(
        &self,
        load_balancer_name: &str,
    ) -> Result<Option<PendingLedger>, Error> {
        Self::load_json(&self.pending_path(load_balancer_name)).await
    }

    async fn store_pending(
        &self,
        load_balancer_name: &str,
        ledger: &PendingLedger,
    ) -> Result<(), Error> {
        Self::write_json(&self.pending_path(load_balancer_name), ledger).await
    }
}
