// # Memory Snapshot Store
//
// In-memory implementation of SnapshotStore.
//
// ## Purpose
//
// Fast store with no persistence across restarts. Losing it is benign:
// the next invocation runs with first-run semantics, re-registers
// aggressively, and restarts the deregistration counters.
//
// ## When to Use
//
// - Contract tests (clones share state, simulating invocations that share
//   a store but no process memory)
// - Deployments where a one-cycle convergence delay after restart is fine

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::snapshot_store::{ActiveSnapshot, PendingLedger, SnapshotStore};
use async_trait::async_trait;

/// In-memory snapshot store
///
/// Clones share the same underlying maps, so separate engine instances can
/// be wired to "the same store" the way separate invocations share a bucket.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<String, ActiveSnapshot>>>,
    pending: Arc<RwLock<HashMap<String, PendingLedger>>>,
}

impl MemorySnapshotStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of load balancers with a stored snapshot
    pub async fn len(&self) -> usize {
        self.snapshots.read().await.len()
    }

    /// True when nothing has been stored yet
    pub async fn is_empty(&self) -> bool {
        self.snapshots.read().await.is_empty() && self.pending.read().await.is_empty()
    }

    /// Drop all stored documents
    pub async fn clear(&self) {
        self.snapshots.write().await.clear();
        self.pending.write().await.clear();
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load_snapshot(
        &self,
        load_balancer_name: &str,
    ) -> Result<Option<ActiveSnapshot>, Error> {
        Ok(self.snapshots.read().await.get(load_balancer_name).cloned())
    }

    async fn store_snapshot(
        &self,
        load_balancer_name: &str,
        snapshot: &ActiveSnapshot,
    ) -> Result<(), Error> {
        self.snapshots
            .write()
            .await
            .insert(load_balancer_name.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load_pending(
        &self,
        load_balancer_name: &str,
    ) -> Result<Option<PendingLedger>, Error> {
        Ok(self.pending.read().await.get(load_balancer_name).cloned())
    }

    async fn store_pending(
        &self,
        load_balancer_name: &str,
        ledger: &PendingLedger,
    ) -> Result<(), Error> {
        self.pending
            .write()
            .await
            .insert(load_balancer_name.to_string(), ledger.clone());
        Ok(())
    }
}
