//! Test doubles and common utilities for the contract tests
//!
//! Call-counting doubles for the four engine seams. Every double is
//! `Clone` with shared interior state, so a test can keep a handle while
//! the engine owns the boxed copy — the same way separate invocations
//! share a bucket but no process memory.

// Each test binary compiles this module separately and uses a subset of it.
#![allow(dead_code)]

use albsync_core::error::Result;
use albsync_core::traits::{
    ActiveSnapshot, DnsProber, MetricsSink, PendingLedger, RegisteredTarget, SnapshotStore,
    TargetGroupClient,
};
use albsync_core::{Error, MemorySnapshotStore, SyncConfig};
use std::collections::BTreeSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

pub fn ip_set(list: &[&str]) -> BTreeSet<IpAddr> {
    list.iter().map(|s| ip(s)).collect()
}

/// A prober that answers from a settable script
#[derive(Clone)]
pub struct ScriptedProber {
    answer: Arc<Mutex<BTreeSet<IpAddr>>>,
    fail: Arc<Mutex<bool>>,
    resolve_calls: Arc<AtomicUsize>,
}

impl ScriptedProber {
    pub fn new(answer: BTreeSet<IpAddr>) -> Self {
        Self {
            answer: Arc::new(Mutex::new(answer)),
            fail: Arc::new(Mutex::new(false)),
            resolve_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        let prober = Self::new(BTreeSet::new());
        *prober.fail.lock().unwrap() = true;
        prober
    }

    /// Change the DNS answer for the next invocation
    pub fn set_answer(&self, answer: BTreeSet<IpAddr>) {
        *self.answer.lock().unwrap() = answer;
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DnsProber for ScriptedProber {
    async fn resolve(&self, domain: &str) -> Result<BTreeSet<IpAddr>> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap() {
            return Err(Error::resolution(format!("scripted failure for {domain}")));
        }
        let answer = self.answer.lock().unwrap().clone();
        if answer.is_empty() {
            return Err(Error::resolution(format!("empty answer for {domain}")));
        }
        Ok(answer)
    }

    fn prober_name(&self) -> &'static str {
        "scripted"
    }
}

/// A target-group double that applies register/deregister calls to an
/// in-memory membership set and records every per-IP call
#[derive(Clone, Default)]
pub struct MockTargetGroup {
    membership: Arc<Mutex<BTreeSet<IpAddr>>>,
    registered_ips: Arc<Mutex<Vec<RegisteredTarget>>>,
    deregistered_ips: Arc<Mutex<Vec<RegisteredTarget>>>,
    describe_calls: Arc<AtomicUsize>,
    describe_fails: Arc<Mutex<bool>>,
    /// register() fails for these IPs (per-IP failure injection)
    failing_registrations: Arc<Mutex<BTreeSet<IpAddr>>>,
}

impl MockTargetGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_membership(membership: BTreeSet<IpAddr>) -> Self {
        let mock = Self::default();
        *mock.membership.lock().unwrap() = membership;
        mock
    }

    pub fn fail_describe(&self) {
        *self.describe_fails.lock().unwrap() = true;
    }

    pub fn fail_registration_of(&self, ip: IpAddr) {
        self.failing_registrations.lock().unwrap().insert(ip);
    }

    pub fn membership(&self) -> BTreeSet<IpAddr> {
        self.membership.lock().unwrap().clone()
    }

    pub fn registered_ips(&self) -> Vec<RegisteredTarget> {
        self.registered_ips.lock().unwrap().clone()
    }

    pub fn deregistered_ips(&self) -> Vec<RegisteredTarget> {
        self.deregistered_ips.lock().unwrap().clone()
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn mutation_count(&self) -> usize {
        self.registered_ips.lock().unwrap().len() + self.deregistered_ips.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl TargetGroupClient for MockTargetGroup {
    async fn describe_registered(&self, _target_group: &str) -> Result<BTreeSet<IpAddr>> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        if *self.describe_fails.lock().unwrap() {
            return Err(Error::control_plane("scripted describe failure"));
        }
        Ok(self.membership())
    }

    async fn register(&self, _target_group: &str, targets: &[RegisteredTarget]) -> Result<()> {
        for target in targets {
            if self.failing_registrations.lock().unwrap().contains(&target.id) {
                return Err(Error::control_plane(format!(
                    "scripted register failure for {}",
                    target.id
                )));
            }
            self.membership.lock().unwrap().insert(target.id);
            self.registered_ips.lock().unwrap().push(*target);
        }
        Ok(())
    }

    async fn deregister(&self, _target_group: &str, targets: &[RegisteredTarget]) -> Result<()> {
        for target in targets {
            self.membership.lock().unwrap().remove(&target.id);
            self.deregistered_ips.lock().unwrap().push(*target);
        }
        Ok(())
    }
}

/// Snapshot store wrapper with write counters and failure injection
#[derive(Clone)]
pub struct CountingStore {
    inner: MemorySnapshotStore,
    snapshot_writes: Arc<AtomicUsize>,
    pending_writes: Arc<AtomicUsize>,
    fail_reads: Arc<Mutex<bool>>,
    fail_writes: Arc<Mutex<bool>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self {
            inner: MemorySnapshotStore::new(),
            snapshot_writes: Arc::new(AtomicUsize::new(0)),
            pending_writes: Arc::new(AtomicUsize::new(0)),
            fail_reads: Arc::new(Mutex::new(false)),
            fail_writes: Arc::new(Mutex::new(false)),
        }
    }

    pub fn fail_reads(&self) {
        *self.fail_reads.lock().unwrap() = true;
    }

    pub fn fail_writes(&self) {
        *self.fail_writes.lock().unwrap() = true;
    }

    pub fn snapshot_writes(&self) -> usize {
        self.snapshot_writes.load(Ordering::SeqCst)
    }

    pub fn pending_writes(&self) -> usize {
        self.pending_writes.load(Ordering::SeqCst)
    }

    pub fn write_count(&self) -> usize {
        self.snapshot_writes() + self.pending_writes()
    }

    pub async fn snapshot(&self, load_balancer_name: &str) -> Option<ActiveSnapshot> {
        self.inner.load_snapshot(load_balancer_name).await.unwrap()
    }

    pub async fn pending(&self, load_balancer_name: &str) -> Option<PendingLedger> {
        self.inner.load_pending(load_balancer_name).await.unwrap()
    }
}

#[async_trait::async_trait]
impl SnapshotStore for CountingStore {
    async fn load_snapshot(&self, load_balancer_name: &str) -> Result<Option<ActiveSnapshot>> {
        if *self.fail_reads.lock().unwrap() {
            return Err(Error::snapshot_store("scripted read failure"));
        }
        self.inner.load_snapshot(load_balancer_name).await
    }

    async fn store_snapshot(
        &self,
        load_balancer_name: &str,
        snapshot: &ActiveSnapshot,
    ) -> Result<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(Error::snapshot_store("scripted write failure"));
        }
        self.snapshot_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.store_snapshot(load_balancer_name, snapshot).await
    }

    async fn load_pending(&self, load_balancer_name: &str) -> Result<Option<PendingLedger>> {
        if *self.fail_reads.lock().unwrap() {
            return Err(Error::snapshot_store("scripted read failure"));
        }
        self.inner.load_pending(load_balancer_name).await
    }

    async fn store_pending(&self, load_balancer_name: &str, ledger: &PendingLedger) -> Result<()> {
        if *self.fail_writes.lock().unwrap() {
            return Err(Error::snapshot_store("scripted write failure"));
        }
        self.pending_writes.fetch_add(1, Ordering::SeqCst);
        self.inner.store_pending(load_balancer_name, ledger).await
    }
}

/// A metrics sink that records published gauge values
#[derive(Clone, Default)]
pub struct RecordingMetrics {
    published: Arc<Mutex<Vec<usize>>>,
    fail: Arc<Mutex<bool>>,
}

impl RecordingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let metrics = Self::default();
        *metrics.fail.lock().unwrap() = true;
        metrics
    }

    pub fn published(&self) -> Vec<usize> {
        self.published.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl MetricsSink for RecordingMetrics {
    async fn put_ip_count(&self, _load_balancer_name: &str, ip_count: usize) -> Result<()> {
        if *self.fail.lock().unwrap() {
            return Err(Error::metrics("scripted metrics failure"));
        }
        self.published.lock().unwrap().push(ip_count);
        Ok(())
    }
}

/// The load-balancer name used across the contract tests
pub const LB: &str = "internal-alb.example.com";

/// Listener port used across the contract tests
pub const PORT: u16 = 443;

/// Minimal config for testing, with the given deregistration threshold
pub fn test_config(threshold: u32) -> SyncConfig {
    SyncConfig {
        alb_dns_name: LB.to_string(),
        listener_port: PORT,
        target_group_arn: "arn:aws:elasticloadbalancing:eu-west-1:0:targetgroup/test/1".to_string(),
        max_lookups: 1,
        invocations_before_deregistration: threshold,
        publish_ip_count_metric: true,
        event_channel_capacity: 100,
    }
}

/// Build an engine over clones of the given doubles and run one invocation
pub async fn run_invocation(
    prober: &ScriptedProber,
    target_group: &MockTargetGroup,
    store: &CountingStore,
    metrics: &RecordingMetrics,
    config: SyncConfig,
) -> Result<()> {
    let (engine, _events) = albsync_core::SyncEngine::new(
        Box::new(prober.clone()),
        Box::new(target_group.clone()),
        Box::new(store.clone()),
        Box::new(metrics.clone()),
        config,
    )?;
    engine.run_once().await
}
