//! ELBv2 target-group client
//!
//! `describe_target_health` for the read side, `register_targets` and
//! `deregister_targets` for the mutations. Both mutations are idempotent at
//! the API level, which the engine relies on.

use albsync_core::traits::{RegisteredTarget, TargetGroupClient};
use albsync_core::{Error, Result};
use async_trait::async_trait;
use aws_sdk_elasticloadbalancingv2::Client;
use aws_sdk_elasticloadbalancingv2::types::TargetDescription;
use std::collections::BTreeSet;
use std::net::IpAddr;
use tracing::{debug, warn};

/// Target-group client backed by the ELBv2 API
#[derive(Debug, Clone)]
pub struct Elbv2TargetGroup {
    client: Client,
}

impl Elbv2TargetGroup {
    /// Create a client from a shared SDK configuration
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    fn descriptions(targets: &[RegisteredTarget]) -> Result<Vec<TargetDescription>> {
        targets
            .iter()
            .map(|target| {
                Ok(TargetDescription::builder()
                    .id(target.id.to_string())
                    .port(i32::from(target.port))
                    .build())
            })
            .collect()
    }
}

#[async_trait]
impl TargetGroupClient for Elbv2TargetGroup {
    async fn describe_registered(&self, target_group: &str) -> Result<BTreeSet<IpAddr>> {
        debug!("describing target health for {target_group}");
        let response = self
            .client
            .describe_target_health()
            .target_group_arn(target_group)
            .send()
            .await
            .map_err(|e| Error::control_plane(e.to_string()))?;

        let mut registered = BTreeSet::new();
        for description in response.target_health_descriptions() {
            let Some(id) = description.target().and_then(|t| t.id()) else {
                continue;
            };
            match id.parse::<IpAddr>() {
                Ok(ip) => {
                    registered.insert(ip);
                }
                // Instance- or lambda-type targets have non-IP ids; this
                // loop only manages IP targets.
                Err(_) => warn!("ignoring non-IP target id {id:?}"),
            }
        }
        debug!("{} target(s) currently registered", registered.len());
        Ok(registered)
    }

    async fn register(&self, target_group: &str, targets: &[RegisteredTarget]) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }
        self.client
            .register_targets()
            .target_group_arn(target_group)
            .set_targets(Some(Self::descriptions(targets)?))
            .send()
            .await
            .map_err(|e| Error::control_plane(e.to_string()))?;
        Ok(())
    }

    async fn deregister(&self, target_group: &str, targets: &[RegisteredTarget]) -> Result<()> {
        if targets.is_empty() {
            return Ok(());
        }
        self.client
            .deregister_targets()
            .target_group_arn(target_group)
            .set_targets(Some(Self::descriptions(targets)?))
            .send()
            .await
            .map_err(|e| Error::control_plane(e.to_string()))?;
        Ok(())
    }
}
