//! CloudWatch metrics sink
//!
//! One gauge: `LoadBalancerIPCount` in the `AWS/ApplicationELB` namespace,
//! dimensioned by load-balancer name, unit Count.

use albsync_core::traits::MetricsSink;
use albsync_core::{Error, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatch::Client;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum, StandardUnit};
use tracing::debug;

/// Metric namespace shared with the ALB's own metrics
const METRIC_NAMESPACE: &str = "AWS/ApplicationELB";

/// Name of the IP-count gauge
const METRIC_NAME: &str = "LoadBalancerIPCount";

/// Metrics sink backed by CloudWatch
#[derive(Debug, Clone)]
pub struct CloudWatchMetrics {
    client: Client,
}

impl CloudWatchMetrics {
    /// Create a sink from a shared SDK configuration
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }
}

#[async_trait]
impl MetricsSink for CloudWatchMetrics {
    async fn put_ip_count(&self, load_balancer_name: &str, ip_count: usize) -> Result<()> {
        let dimension = Dimension::builder()
            .name("LoadBalancerName")
            .value(load_balancer_name)
            .build();
        let datum = MetricDatum::builder()
            .metric_name(METRIC_NAME)
            .dimensions(dimension)
            .value(ip_count as f64)
            .unit(StandardUnit::Count)
            .build();

        self.client
            .put_metric_data()
            .namespace(METRIC_NAMESPACE)
            .metric_data(datum)
            .send()
            .await
            .map_err(|e| Error::metrics(e.to_string()))?;

        debug!("published {METRIC_NAME}={ip_count} for {load_balancer_name}");
        Ok(())
    }
}
