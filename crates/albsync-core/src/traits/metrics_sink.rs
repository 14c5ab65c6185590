// # Metrics Sink Trait
//
// One gauge: the number of IPs DNS resolved for the load balancer this
// invocation. Publication is best-effort; a sink failure is logged by the
// engine and never aborts the invocation.

use async_trait::async_trait;

/// Trait for metrics sink implementations
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Publish the IP-count gauge for one load balancer
    async fn put_ip_count(
        &self,
        load_balancer_name: &str,
        ip_count: usize,
    ) -> Result<(), crate::Error>;
}
