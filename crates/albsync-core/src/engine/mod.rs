//! Core reconciliation engine
//!
//! The engine keeps an NLB target group converged with the DNS-resolved IP
//! set of an ALB, one invocation at a time. Invocations are stateless and
//! share nothing in process; all cross-invocation memory lives in the
//! snapshot store.
//!
//! ## Invocation flow
//!
//! ```text
//! ┌────────────┐   ┌──────────────────┐
//! │ DnsProber  │   │ TargetGroupClient│   (independent reads, joined)
//! └─────┬──────┘   └────────┬─────────┘
//!       │  D                │  R
//!       ▼                   ▼
//!  GATE(D = ∅ → abort, no mutation)
//!       │
//!       ▼
//! ┌──────────────┐  prior A, P  ┌───────────────┐
//! │ SnapshotStore│─────────────▶│  reconcile()  │  (pure)
//! └──────────────┘              └───────┬───────┘
//!       ▲  new A', P'                   │ plan
//!       └───────────────────────────────┤
//!                                       ▼
//!                  register → deregister → metric
//! ```
//!
//! ## Policy
//!
//! Aggressive registration, cautious deregistration: an IP is registered as
//! soon as either DNS or the control plane shows it as new, but only
//! deregistered after it has been absent from DNS for a configured number of
//! consecutive invocations.

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::traits::{
    ActiveSnapshot, DnsProber, MetricsSink, PendingLedger, RegisteredTarget, SnapshotStore,
    TargetGroupClient,
};
use std::collections::BTreeSet;
use std::net::IpAddr;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Inputs to one reconciliation step
///
/// Everything the pure computation needs; no I/O handles.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileInput<'a> {
    /// DNS name of the load balancer (names the new snapshot)
    pub load_balancer_name: &'a str,
    /// IP set resolved from DNS this invocation (`D`, non-empty past the gate)
    pub dns: &'a BTreeSet<IpAddr>,
    /// IP set currently registered in the target group (`R`)
    pub registered: &'a BTreeSet<IpAddr>,
    /// Snapshot persisted by the previous invocation (`A`), if any
    pub prior_snapshot: Option<&'a ActiveSnapshot>,
    /// Pending-deregistration ledger from the previous invocation (`P`)
    pub prior_pending: &'a PendingLedger,
    /// Consecutive absent invocations required before deregistration (`M`)
    pub threshold: u32,
}

/// Output of one reconciliation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    /// IPs to register this invocation
    pub to_register: BTreeSet<IpAddr>,
    /// IPs whose absence counter reached the threshold this invocation
    pub to_deregister: BTreeSet<IpAddr>,
    /// Updated ledger to persist (threshold-crossers already removed)
    pub pending: PendingLedger,
    /// New snapshot to persist, built from the raw DNS answer
    pub snapshot: ActiveSnapshot,
}

/// Compute the register/deregister plan for one invocation
///
/// Pure function: identical inputs produce identical plans, and nothing here
/// touches the outside world.
///
/// Registration takes the union of two independent "newly seen" signals:
/// `D \ A` (new to DNS since the prior snapshot) and `D \ R` (missing from
/// the control plane, e.g. manually removed or a failed earlier attempt).
/// With no prior snapshot only `D \ R` applies.
///
/// Deregistration candidates are `(A \ D) ∪ (R \ D)`: wanted before or
/// registered now, but absent from this invocation's DNS truth. Candidates
/// accumulate one ledger count per consecutive invocation; reaching the
/// threshold moves an IP into `to_deregister` and drops its entry, so a
/// sustained-absence episode triggers at most one deregistration. An IP that
/// reappears in DNS is dropped from the ledger entirely, never decremented.
/// With no prior snapshot, deregistration is skipped for the whole
/// invocation and the returned ledger is empty.
pub fn reconcile(input: &ReconcileInput<'_>) -> ReconcilePlan {
    let dns = input.dns;
    let registered = input.registered;

    let new_from_describe: BTreeSet<IpAddr> = dns.difference(registered).copied().collect();

    let (to_register, to_deregister, pending) = match input.prior_snapshot {
        Some(prior) => {
            let new_from_snapshot: BTreeSet<IpAddr> =
                dns.difference(&prior.ip_list).copied().collect();
            let to_register: BTreeSet<IpAddr> = new_from_snapshot
                .union(&new_from_describe)
                .copied()
                .collect();

            let absent_from_snapshot = prior.ip_list.difference(dns).copied();
            let absent_from_describe = registered.difference(dns).copied();
            let candidates: BTreeSet<IpAddr> =
                absent_from_snapshot.chain(absent_from_describe).collect();

            let mut pending = PendingLedger::new();
            for ip in &candidates {
                let count = input.prior_pending.count(ip).unwrap_or(0) + 1;
                pending.0.insert(*ip, count);
            }
            // entries absent from `candidates` are dropped: the IP reappeared

            let to_deregister: BTreeSet<IpAddr> = pending
                .0
                .iter()
                .filter(|(_, count)| **count >= input.threshold)
                .map(|(ip, _)| *ip)
                .collect();
            for ip in &to_deregister {
                pending.0.remove(ip);
            }

            (to_register, to_deregister, pending)
        }
        // First run: no snapshot to diff against, so register whatever the
        // control plane is missing and do not start deregistration counters.
        None => (new_from_describe, BTreeSet::new(), PendingLedger::new()),
    };

    debug_assert!(to_register.is_disjoint(&to_deregister));

    ReconcilePlan {
        to_register,
        to_deregister,
        pending,
        snapshot: ActiveSnapshot::new(input.load_balancer_name, dns.clone()),
    }
}

/// Events emitted by the engine during an invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Invocation started
    Started { load_balancer_name: String },

    /// Invocation aborted before any mutation
    Aborted { reason: String },

    /// Plan computed
    Planned {
        register: usize,
        deregister: usize,
        pending: usize,
    },

    /// One IP registered with the target group
    Registered { ip: IpAddr },

    /// One IP deregistered from the target group
    Deregistered { ip: IpAddr },

    /// A register/deregister call failed for one IP (recovered)
    ActionFailed { ip: IpAddr, error: String },

    /// IP-count gauge published
    MetricPublished { ip_count: usize },

    /// Invocation ran to completion
    Finished,
}

/// One-shot sync engine
///
/// Owns the four injected seams and runs the invocation state machine:
/// probe → gate → load prior state → reconcile → persist → register →
/// deregister → metric. Construct once per process and call
/// [`SyncEngine::run_once`] per trigger.
///
/// ## Concurrency
///
/// An invocation is sequential apart from the two independent reads at the
/// start. There is no cross-invocation locking; overlapping invocations race
/// on the snapshot store and the last writer wins, which is tolerated
/// because every control-plane action is idempotent.
pub struct SyncEngine {
    prober: Box<dyn DnsProber>,
    target_group: Box<dyn TargetGroupClient>,
    store: Box<dyn SnapshotStore>,
    metrics: Box<dyn MetricsSink>,
    config: SyncConfig,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new engine
    ///
    /// Validates the configuration up front; invalid thresholds are fatal
    /// before any I/O.
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver) where the receiver yields
    /// [`EngineEvent`]s for external monitoring.
    pub fn new(
        prober: Box<dyn DnsProber>,
        target_group: Box<dyn TargetGroupClient>,
        store: Box<dyn SnapshotStore>,
        metrics: Box<dyn MetricsSink>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let engine = Self {
            prober,
            target_group,
            store,
            metrics,
            config,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run one reconciliation invocation
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the invocation ran to completion (individual action or
    ///   persistence failures may have been recovered and logged)
    /// - `Err(Error)`: the invocation aborted before any mutation
    pub async fn run_once(&self) -> Result<()> {
        let lb = self.config.alb_dns_name.as_str();
        self.emit_event(EngineEvent::Started {
            load_balancer_name: lb.to_string(),
        });

        // Independent reads; both must finish before reconciliation.
        let (dns_result, registered_result) = tokio::join!(
            self.prober.resolve(lb),
            self.target_group
                .describe_registered(&self.config.target_group_arn),
        );

        // Safety gate: an empty or failed DNS answer aborts the whole
        // invocation with no reads or writes of persisted state.
        let dns = match dns_result {
            Ok(set) if !set.is_empty() => set,
            Ok(_) => {
                let err = Error::resolution(format!("DNS returned zero IPs for {lb}"));
                self.emit_event(EngineEvent::Aborted {
                    reason: err.to_string(),
                });
                error!("{err}; not proceeding with changes");
                return Err(err);
            }
            Err(err) => {
                self.emit_event(EngineEvent::Aborted {
                    reason: err.to_string(),
                });
                error!("DNS probe via {} failed: {err}", self.prober.prober_name());
                return Err(err);
            }
        };
        info!("IPs detected by DNS lookup: {dns:?} ({} total)", dns.len());

        // Describe failure is recovered: reconcile against an empty
        // registered set and let idempotent re-registration heal it.
        let registered = match registered_result {
            Ok(set) => set,
            Err(err) => {
                warn!("describe registered targets failed, using empty set: {err}");
                BTreeSet::new()
            }
        };

        // Prior state; any read failure means first-run semantics.
        let prior_snapshot = match self.store.load_snapshot(lb).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                warn!("failed to load prior snapshot, treating as first run: {err}");
                None
            }
        };
        let prior_pending = match self.store.load_pending(lb).await {
            Ok(ledger) => ledger.unwrap_or_default(),
            Err(err) => {
                warn!("failed to load pending ledger, starting empty: {err}");
                PendingLedger::new()
            }
        };
        if prior_snapshot.is_none() {
            info!("no active IP list from a previous invocation, skipping deregistration");
        }

        let plan = reconcile(&ReconcileInput {
            load_balancer_name: lb,
            dns: &dns,
            registered: &registered,
            prior_snapshot: prior_snapshot.as_ref(),
            prior_pending: &prior_pending,
            threshold: self.config.invocations_before_deregistration,
        });
        self.emit_event(EngineEvent::Planned {
            register: plan.to_register.len(),
            deregister: plan.to_deregister.len(),
            pending: plan.pending.len(),
        });
        info!(
            "plan: register {:?}, deregister {:?}, pending {:?}",
            plan.to_register, plan.to_deregister, plan.pending
        );

        // Persist before acting. A failed write is logged and the invocation
        // continues; the next cycle reconciles against stale state instead.
        if let Err(err) = self.store.store_snapshot(lb, &plan.snapshot).await {
            warn!("failed to store active snapshot: {err}");
        }
        if let Err(err) = self.store.store_pending(lb, &plan.pending).await {
            warn!("failed to store pending ledger: {err}");
        }

        // Register before deregister, so an IP flapping between "new" and
        // "candidate" in the same run is never left unregistered.
        self.execute(&plan.to_register, Action::Register).await;
        self.execute(&plan.to_deregister, Action::Deregister).await;

        if self.config.publish_ip_count_metric {
            match self.metrics.put_ip_count(lb, plan.snapshot.ip_count).await {
                Ok(()) => self.emit_event(EngineEvent::MetricPublished {
                    ip_count: plan.snapshot.ip_count,
                }),
                Err(err) => warn!("failed to publish IP count metric: {err}"),
            }
        }

        self.emit_event(EngineEvent::Finished);
        Ok(())
    }

    /// Issue one control-plane call per IP
    ///
    /// Calls are wrapped individually: a failure on one IP is logged and
    /// does not block the rest of the batch.
    async fn execute(&self, ips: &BTreeSet<IpAddr>, action: Action) {
        if ips.is_empty() {
            debug!("no target to {}", action.verb());
            return;
        }

        let arn = self.config.target_group_arn.as_str();
        for ip in ips {
            let target = [RegisteredTarget::new(*ip, self.config.listener_port)];
            let result = match action {
                Action::Register => self.target_group.register(arn, &target).await,
                Action::Deregister => self.target_group.deregister(arn, &target).await,
            };
            match result {
                Ok(()) => {
                    info!("{}ed target {ip}", action.verb());
                    self.emit_event(match action {
                        Action::Register => EngineEvent::Registered { ip: *ip },
                        Action::Deregister => EngineEvent::Deregistered { ip: *ip },
                    });
                }
                Err(err) => {
                    error!("failed to {} target {ip}: {err}", action.verb());
                    self.emit_event(EngineEvent::ActionFailed {
                        ip: *ip,
                        error: err.to_string(),
                    });
                }
            }
        }
    }

    /// Emit an engine event
    fn emit_event(&self, event: EngineEvent) {
        // Dropping on overflow keeps a slow consumer from stalling the loop.
        if self.event_tx.try_send(event).is_err() {
            warn!("event channel full, dropping event");
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Register,
    Deregister,
}

impl Action {
    fn verb(self) -> &'static str {
        match self {
            Action::Register => "register",
            Action::Deregister => "deregister",
        }
    }
}
