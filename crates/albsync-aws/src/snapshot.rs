//! S3-backed snapshot store
//!
//! Two JSON objects per load balancer, under keys derived from its DNS
//! name. Plain get/put, no compare-and-swap: overlapping invocations race
//! and the last writer wins, which the reconciliation loop tolerates.

use albsync_core::traits::snapshot_store::{
    ActiveSnapshot, PendingLedger, SnapshotStore, active_object_key, pending_object_key,
};
use albsync_core::{Error, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::primitives::ByteStream;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

/// Snapshot store backed by an S3 bucket
#[derive(Debug, Clone)]
pub struct S3SnapshotStore {
    client: Client,
    bucket: String,
}

impl S3SnapshotStore {
    /// Create a store over the given bucket
    pub fn new(config: &aws_config::SdkConfig, bucket: impl Into<String>) -> Self {
        Self {
            client: Client::new(config),
            bucket: bucket.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                // Normal on the first invocation: the object does not exist
                // yet. Any other get failure also degrades to first-run
                // semantics rather than wedging the loop.
                info!("no readable document at {key} (first invocation is expected here): {e}");
                return Ok(None);
            }
        };

        let bytes = response
            .body
            .collect()
            .await
            .map_err(|e| Error::snapshot_store(format!("failed to read body of {key}: {e}")))?
            .into_bytes();
        match serde_json::from_slice(&bytes) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!("unparseable document at {key}, treating as absent: {e}");
                Ok(None)
            }
        }
    }

    async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let body = serde_json::to_vec(value)?;
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| Error::snapshot_store(format!("failed to upload {key}: {e}")))?;
        debug!("uploaded {key}");
        Ok(())
    }
}

#[async_trait]
impl SnapshotStore for S3SnapshotStore {
    async fn load_snapshot(&self, load_balancer_name: &str) -> Result<Option<ActiveSnapshot>> {
        self.get_json(&active_object_key(load_balancer_name)).await
    }

    async fn store_snapshot(
        &self,
        load_balancer_name: &str,
        snapshot: &ActiveSnapshot,
    ) -> Result<()> {
        self.put_json(&active_object_key(load_balancer_name), snapshot)
            .await
    }

    async fn load_pending(&self, load_balancer_name: &str) -> Result<Option<PendingLedger>> {
        self.get_json(&pending_object_key(load_balancer_name)).await
    }

    async fn store_pending(&self, load_balancer_name: &str, ledger: &PendingLedger) -> Result<()> {
        self.put_json(&pending_object_key(load_balancer_name), ledger)
            .await
    }
}
