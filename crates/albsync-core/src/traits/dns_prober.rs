// # DNS Prober Trait
//
// Defines the interface for resolving the ALB domain name to its current
// set of IP addresses.
//
// ## Implementations
//
// - Hickory-based: `albsync-dns` crate
// - Scripted doubles in the contract tests
//
// ## Contract
//
// One best-effort query per invocation. There is no retry or backoff here:
// convergence relies on the invocation being re-triggered on a schedule, so
// a miss this cycle is picked up by the next one.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::IpAddr;

/// Trait for DNS prober implementations
///
/// # Empty answers
///
/// An ALB must always have at least one IP in DNS. Implementations must
/// return [`crate::Error::Resolution`] for an empty answer instead of an
/// empty set, so the caller's safety gate treats it as a resolver failure
/// and not as "zero IPs are real".
#[async_trait]
pub trait DnsProber: Send + Sync {
    /// Resolve a domain name to its current set of A-record addresses
    ///
    /// # Returns
    ///
    /// - `Ok(set)`: non-empty set of resolved addresses
    /// - `Err(Error::Resolution)`: resolver failure or empty answer
    async fn resolve(&self, domain: &str) -> Result<BTreeSet<IpAddr>, crate::Error>;

    /// Short prober name for logging
    fn prober_name(&self) -> &'static str;
}
