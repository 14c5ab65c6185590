//! Configuration types for the target sync system

use serde::{Deserialize, Serialize};

/// Configuration for one ALB → NLB sync loop
///
/// One instance of this config describes one load balancer pairing: the
/// ALB whose DNS name is probed and the NLB target group that is kept
/// converged with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Full DNS name of the ALB; also the key for persisted documents
    /// and the metric dimension value
    pub alb_dns_name: String,

    /// Listener port used for every registered target
    pub listener_port: u16,

    /// Identifier (ARN) of the NLB target group to keep in sync
    pub target_group_arn: String,

    /// Maximum DNS lookups per invocation (validated > 0; the loop issues
    /// one best-effort lookup and relies on re-invocation to aggregate)
    #[serde(default = "default_max_lookups")]
    pub max_lookups: u32,

    /// Consecutive invocations an IP must stay absent from DNS before it
    /// is deregistered
    #[serde(default = "default_invocations_before_deregistration")]
    pub invocations_before_deregistration: u32,

    /// Publish the LoadBalancerIPCount gauge after each invocation
    #[serde(default)]
    pub publish_ip_count_metric: bool,

    /// Capacity of the engine event channel; overflow drops events with
    /// a warning log
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SyncConfig {
    /// Create a configuration with defaults for the optional knobs
    pub fn new(
        alb_dns_name: impl Into<String>,
        listener_port: u16,
        target_group_arn: impl Into<String>,
    ) -> Self {
        Self {
            alb_dns_name: alb_dns_name.into(),
            listener_port,
            target_group_arn: target_group_arn.into(),
            max_lookups: default_max_lookups(),
            invocations_before_deregistration: default_invocations_before_deregistration(),
            publish_ip_count_metric: false,
            event_channel_capacity: default_event_channel_capacity(),
        }
    }

    /// Validate the configuration
    ///
    /// Runs before any I/O; a violation here is fatal for the invocation.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.alb_dns_name.is_empty() {
            return Err(crate::Error::config("ALB DNS name cannot be empty"));
        }
        if self.target_group_arn.is_empty() {
            return Err(crate::Error::config("target group ARN cannot be empty"));
        }
        if self.listener_port == 0 {
            return Err(crate::Error::config("listener port cannot be 0"));
        }
        if self.max_lookups == 0 {
            return Err(crate::Error::config(
                "max lookups per invocation must be > 0",
            ));
        }
        if self.invocations_before_deregistration == 0 {
            return Err(crate::Error::config(
                "invocations before deregistration must be > 0",
            ));
        }
        Ok(())
    }
}

fn default_max_lookups() -> u32 {
    1
}

fn default_invocations_before_deregistration() -> u32 {
    3
}

fn default_event_channel_capacity() -> usize {
    1000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> SyncConfig {
        SyncConfig::new("internal-alb.example.com", 443, "arn:aws:elasticloadbalancing:tg/x")
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let mut config = valid();
        config.invocations_before_deregistration = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_lookups_is_rejected() {
        let mut config = valid();
        config.max_lookups = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_names_are_rejected() {
        let mut config = valid();
        config.alb_dns_name.clear();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.target_group_arn.clear();
        assert!(config.validate().is_err());
    }
}
