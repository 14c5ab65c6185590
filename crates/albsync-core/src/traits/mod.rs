//! Core traits for the target sync system
//!
//! This module defines the abstract interfaces the engine is wired with.
//!
//! - [`DnsProber`]: Resolve the ALB domain to its current IP set
//! - [`TargetGroupClient`]: Read and mutate the NLB target group membership
//! - [`SnapshotStore`]: Persist the per-invocation snapshot and pending ledger
//! - [`MetricsSink`]: Publish the IP-count gauge

pub mod dns_prober;
pub mod metrics_sink;
pub mod snapshot_store;
pub mod target_group;

pub use dns_prober::DnsProber;
pub use metrics_sink::MetricsSink;
pub use snapshot_store::{ActiveSnapshot, PendingLedger, SnapshotStore};
pub use target_group::{RegisteredTarget, TargetGroupClient};
