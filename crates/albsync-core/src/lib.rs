// # albsync-core
//
// Core library for the ALB → NLB target sync system.
//
// ## Architecture Overview
//
// The system keeps a Network Load Balancer's static-IP target group
// converged with the DNS-resolved IP set of an Application Load Balancer,
// across stateless scheduled invocations that share no process memory:
//
// - **DnsProber**: resolve the ALB domain to its current IP set
// - **TargetGroupClient**: read and mutate NLB target group membership
// - **SnapshotStore**: persist the active snapshot and pending ledger
//   between invocations
// - **MetricsSink**: publish the IP-count gauge
// - **SyncEngine**: the invocation orchestrator around the pure
//   `reconcile()` function
//
// ## Design Principles
//
// 1. **Pure core**: `reconcile()` is a function of its inputs; all I/O sits
//    behind injected trait objects
// 2. **Aggressive registration, cautious deregistration**: register on any
//    positive signal, deregister only after sustained absence
// 3. **Eventual convergence over locking**: no cross-invocation mutual
//    exclusion; idempotent actions plus periodic re-invocation converge
//    even when invocations overlap or partially fail

pub mod config;
pub mod engine;
pub mod error;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::SyncConfig;
pub use engine::{EngineEvent, ReconcileInput, ReconcilePlan, SyncEngine, reconcile};
pub use error::{Error, Result};
pub use state::{FileSnapshotStore, MemorySnapshotStore};
pub use traits::{
    ActiveSnapshot, DnsProber, MetricsSink, PendingLedger, RegisteredTarget, SnapshotStore,
    TargetGroupClient,
};
