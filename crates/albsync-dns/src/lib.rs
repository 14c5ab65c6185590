// # albsync-dns
//
// Hickory-based DNS prober for the target sync system.
//
// One invocation issues one best-effort A-record lookup for the ALB's
// domain name. There is deliberately no retry, backoff, or caching here:
// the engine owns nothing either — convergence comes from the invocation
// schedule, and ALB DNS answers rotate, so results are expected to
// aggregate across invocations rather than be complete in one.

use albsync_core::traits::DnsProber;
use albsync_core::{Error, Result};
use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use std::collections::BTreeSet;
use std::net::IpAddr;
use tracing::{debug, warn};

/// DNS prober backed by hickory-resolver
///
/// Prefers the system resolver configuration (`/etc/resolv.conf`) and falls
/// back to the library defaults when it cannot be read — a Lambda-style
/// sandbox does not always ship one.
pub struct HickoryProber {
    resolver: TokioAsyncResolver,
}

impl HickoryProber {
    /// Create a prober from the system resolver configuration
    pub fn from_system_conf() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
            warn!("failed to read system resolver config, using defaults: {e}");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }

    /// Create a prober over an explicit resolver
    pub fn new(resolver: TokioAsyncResolver) -> Self {
        Self { resolver }
    }
}

impl Default for HickoryProber {
    fn default() -> Self {
        Self::from_system_conf()
    }
}

#[async_trait]
impl DnsProber for HickoryProber {
    async fn resolve(&self, domain: &str) -> Result<BTreeSet<IpAddr>> {
        let lookup = self
            .resolver
            .lookup_ip(domain)
            .await
            .map_err(|e| Error::resolution(format!("lookup for {domain} failed: {e}")))?;

        // ALB targets are registered by IPv4; keep the A records only.
        let ips: BTreeSet<IpAddr> = lookup.iter().filter(|ip| ip.is_ipv4()).collect();
        debug!("resolved {domain} to {} address(es)", ips.len());

        if ips.is_empty() {
            // Zero IPs for an ALB means the resolver lied, not that the
            // ALB is gone; the caller's safety gate hard-stops on this.
            return Err(Error::resolution(format!(
                "DNS returned no A records for {domain}"
            )));
        }
        Ok(ips)
    }

    fn prober_name(&self) -> &'static str {
        "hickory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn prober_constructs_without_network() {
        let prober = HickoryProber::from_system_conf();
        assert_eq!(prober.prober_name(), "hickory");
    }
}
