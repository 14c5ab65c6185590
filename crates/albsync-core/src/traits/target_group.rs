// # Target Group Trait
//
// Defines the interface to the load-balancer control plane: reading the
// registered target set and issuing register/deregister calls.
//
// ## Idempotency
//
// The control plane treats registering an already-registered target and
// deregistering an absent one as no-ops. The engine leans on this:
// over-registering is harmless and a lost snapshot write only delays
// convergence by a cycle.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::net::IpAddr;

/// A target as the control plane sees it: an IP plus the fixed listener port
///
/// Targets are compared by IP only; the port is configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredTarget {
    /// Target IP address
    #[serde(rename = "Id")]
    pub id: IpAddr,
    /// Listener port
    #[serde(rename = "Port")]
    pub port: u16,
}

impl RegisteredTarget {
    /// Create a target for one IP
    pub fn new(id: IpAddr, port: u16) -> Self {
        Self { id, port }
    }

    /// Build a target list from a set of IPs and the configured port
    pub fn from_ips<I>(ips: I, port: u16) -> Vec<Self>
    where
        I: IntoIterator<Item = IpAddr>,
    {
        ips.into_iter().map(|ip| Self::new(ip, port)).collect()
    }
}

/// Trait for load-balancer control-plane clients
///
/// Read-only describe plus the two mutation calls. The engine owns all
/// decisions; implementations execute single calls and report errors.
#[async_trait]
pub trait TargetGroupClient: Send + Sync {
    /// Read the IPs currently registered in the target group
    ///
    /// # Returns
    ///
    /// - `Ok(set)`: the registered IP set (possibly empty)
    /// - `Err(Error::ControlPlane)`: describe failed; the engine recovers
    ///   by reconciling against an empty registered set
    async fn describe_registered(
        &self,
        target_group: &str,
    ) -> Result<BTreeSet<IpAddr>, crate::Error>;

    /// Register targets with the target group (no-op on empty input)
    async fn register(
        &self,
        target_group: &str,
        targets: &[RegisteredTarget],
    ) -> Result<(), crate::Error>;

    /// Deregister targets from the target group (no-op on empty input)
    async fn deregister(
        &self,
        target_group: &str,
        targets: &[RegisteredTarget],
    ) -> Result<(), crate::Error>;
}
