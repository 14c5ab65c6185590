// # Snapshot Store Trait
//
// Defines the interface for the two persisted JSON documents, keyed by
// load-balancer name:
//
// - the active snapshot: "what DNS told the previous invocation"
// - the pending ledger: per-IP consecutive-absence counters (hysteresis)
//
// ## Consistency model
//
// get/put only, no compare-and-swap. Overlapping invocations can race and
// the last writer wins. That is acceptable: register/deregister are
// idempotent at the control plane, so a lost update delays convergence by
// one cycle but never produces a wrong permanent state.
//
// ## Document format
//
// Field names are the wire format shared with earlier deployments of this
// loop and must not change:
//
// ```json
// {"LoadBalancerName": "...", "TimeStamp": "2025-01-09 12:00:00",
//  "IPList": ["10.0.0.1"], "IPCount": 1}
// ```
//
// The pending ledger is a bare object of `"ip": count` entries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

/// Timestamp format used inside persisted snapshots
pub const TIME_STAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Object key for the active snapshot document of one load balancer
pub fn active_object_key(load_balancer_name: &str) -> String {
    format!(
        "{load_balancer_name}-active-registered-IPs/Active IP list of {load_balancer_name}.json"
    )
}

/// Object key for the pending-deregistration document of one load balancer
///
/// "deregisteration" is misspelled in the wire format; keep it.
pub fn pending_object_key(load_balancer_name: &str) -> String {
    format!(
        "{load_balancer_name}-pending-deregisteration-IPs/Pending deregisteration IP list of {load_balancer_name}.json"
    )
}

/// The persisted record of what DNS resolved to in one invocation
///
/// Written whole once per invocation, never partially updated. The engine
/// only reads it and returns a replacement value; the store owns the write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSnapshot {
    /// DNS name of the load balancer this snapshot belongs to
    #[serde(rename = "LoadBalancerName")]
    pub load_balancer_name: String,

    /// When the snapshot was taken (UTC)
    #[serde(rename = "TimeStamp", with = "snapshot_time")]
    pub time_stamp: DateTime<Utc>,

    /// The resolved IP set
    #[serde(rename = "IPList")]
    pub ip_list: BTreeSet<IpAddr>,

    /// Always equals `ip_list.len()`; kept explicit for the wire format
    #[serde(rename = "IPCount")]
    pub ip_count: usize,
}

impl ActiveSnapshot {
    /// Create a snapshot from this invocation's DNS answer
    pub fn new(load_balancer_name: impl Into<String>, ip_list: BTreeSet<IpAddr>) -> Self {
        let ip_count = ip_list.len();
        Self {
            load_balancer_name: load_balancer_name.into(),
            time_stamp: Utc::now(),
            ip_list,
            ip_count,
        }
    }
}

/// Per-IP consecutive-absence counters
///
/// An entry is created at 1 the first invocation an IP becomes a
/// deregistration candidate, incremented while it stays one, and removed the
/// moment it reappears in DNS. Counters are never decremented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PendingLedger(pub BTreeMap<IpAddr, u32>);

impl PendingLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter for one IP, if present
    pub fn count(&self, ip: &IpAddr) -> Option<u32> {
        self.0.get(ip).copied()
    }

    /// Number of IPs currently pending
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no IP is pending deregistration
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Trait for snapshot store implementations
///
/// Both documents are read once at invocation start and written once at
/// invocation end. A missing document is `Ok(None)`, which gives first-run
/// semantics; implementations should also map unreadable/corrupt documents
/// to `Ok(None)` with a log rather than failing the invocation.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the prior active snapshot
    async fn load_snapshot(
        &self,
        load_balancer_name: &str,
    ) -> Result<Option<ActiveSnapshot>, crate::Error>;

    /// Store the new active snapshot (overwrites, last writer wins)
    async fn store_snapshot(
        &self,
        load_balancer_name: &str,
        snapshot: &ActiveSnapshot,
    ) -> Result<(), crate::Error>;

    /// Load the prior pending-deregistration ledger
    async fn load_pending(
        &self,
        load_balancer_name: &str,
    ) -> Result<Option<PendingLedger>, crate::Error>;

    /// Store the updated pending-deregistration ledger
    async fn store_pending(
        &self,
        load_balancer_name: &str,
        ledger: &PendingLedger,
    ) -> Result<(), crate::Error>;
}

mod snapshot_time {
    use super::TIME_STAMP_FORMAT;
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIME_STAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let naive = NaiveDateTime::parse_from_str(&raw, TIME_STAMP_FORMAT)
            .map_err(de::Error::custom)?;
        Ok(DateTime::from_naive_utc_and_offset(naive, Utc))
    }
}
