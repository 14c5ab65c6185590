// # albsyncd - ALB target sync runner
//
// This binary is a THIN integration layer only:
// 1. Reading configuration from environment variables
// 2. Initializing the runtime and the AWS SDK configuration
// 3. Wiring the DNS, ELBv2, S3/file and CloudWatch adapters into the engine
// 4. Running exactly one sync invocation and exiting
//
// All sync logic lives in albsync-core. The process is meant to be invoked
// on a schedule (cron, EventBridge); nothing loops here.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Sync target
// - `ALB_DNS_NAME`: DNS name of the ALB to track
// - `ALB_LISTENER`: Traffic port targets are registered on
// - `NLB_TG_ARN`: ARN of the NLB target group to keep in sync
//
// ### State store
// - `S3_BUCKET`: Bucket holding the snapshot and ledger documents
// - `ALBSYNC_STATE_DIR`: Local directory for state instead of S3 (optional)
//
// ### Engine
// - `MAX_LOOKUP_PER_INVOCATION`: DNS lookup budget per invocation
// - `INVOCATIONS_BEFORE_DEREGISTRATION`: Consecutive absent invocations
//   before an IP is deregistered
// - `CW_METRIC_FLAG_IP_COUNT`: "true" to publish the IP-count metric
//
// ### Logging
// - `ALBSYNC_LOG_LEVEL`: trace, debug, info, warn, or error
//
// ## Example
//
// ```bash
// export ALB_DNS_NAME=internal-alb.example.com
// export ALB_LISTENER=443
// export NLB_TG_ARN=arn:aws:elasticloadbalancing:us-east-1:123456789012:targetgroup/alb-targets/0123456789abcdef
// export S3_BUCKET=alb-sync-state
// export INVOCATIONS_BEFORE_DEREGISTRATION=3
// export CW_METRIC_FLAG_IP_COUNT=true
//
// albsyncd
// ```

use albsync_aws::{CloudWatchMetrics, Elbv2TargetGroup, S3SnapshotStore};
use albsync_core::{EngineEvent, FileSnapshotStore, SnapshotStore, SyncConfig, SyncEngine};
use albsync_dns::HickoryProber;
use anyhow::Result;
use std::env;
use std::process::ExitCode;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean run
/// - 1: Configuration or startup error
/// - 2: Runtime error (aborted invocation)
#[derive(Debug, Clone, Copy)]
enum SyncExitCode {
    /// Invocation ran to completion
    CleanRun = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (invocation aborted before mutating anything)
    RuntimeError = 2,
}

impl From<SyncExitCode> for ExitCode {
    fn from(code: SyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
struct Config {
    alb_dns_name: String,
    listener_port: u16,
    target_group_arn: String,
    s3_bucket: Option<String>,
    state_dir: Option<String>,
    max_lookups: Option<u32>,
    invocations_before_deregistration: Option<u32>,
    cw_metric_flag: String,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Ok(Self {
            alb_dns_name: required_var("ALB_DNS_NAME")?,
            listener_port: required_var("ALB_LISTENER")?.parse().map_err(|_| {
                anyhow::anyhow!("ALB_LISTENER must be a port number between 1 and 65535")
            })?,
            target_group_arn: required_var("NLB_TG_ARN")?,
            s3_bucket: env::var("S3_BUCKET").ok(),
            state_dir: env::var("ALBSYNC_STATE_DIR").ok(),
            max_lookups: parse_var("MAX_LOOKUP_PER_INVOCATION")?,
            invocations_before_deregistration: parse_var("INVOCATIONS_BEFORE_DEREGISTRATION")?,
            cw_metric_flag: env::var("CW_METRIC_FLAG_IP_COUNT")
                .unwrap_or_else(|_| "false".to_string()),
            log_level: env::var("ALBSYNC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        })
    }

    /// Validate the configuration
    ///
    /// This performs comprehensive validation including:
    /// - Required field presence
    /// - Value format validation (domain name, target group ARN)
    /// - Numeric range validation
    /// - Flag enumeration validation
    fn validate(&self) -> Result<()> {
        self.validate_domain_name(&self.alb_dns_name)?;

        if self.listener_port == 0 {
            anyhow::bail!("ALB_LISTENER must not be 0");
        }

        if !self.target_group_arn.starts_with("arn:") {
            anyhow::bail!(
                "NLB_TG_ARN does not look like an ARN. Got: {}",
                self.target_group_arn
            );
        }

        // Exactly one state store backend must be selectable.
        if self.state_dir.is_none() && self.s3_bucket.as_ref().is_none_or(|b| b.is_empty()) {
            anyhow::bail!(
                "S3_BUCKET is required when ALBSYNC_STATE_DIR is not set. \
                Set it via: export S3_BUCKET=alb-sync-state"
            );
        }

        if let Some(ref dir) = self.state_dir
            && dir.is_empty()
        {
            anyhow::bail!("ALBSYNC_STATE_DIR cannot be empty when set");
        }

        if let Some(max_lookups) = self.max_lookups
            && max_lookups == 0
        {
            anyhow::bail!("MAX_LOOKUP_PER_INVOCATION must be at least 1");
        }

        if let Some(threshold) = self.invocations_before_deregistration
            && (threshold == 0 || threshold > 100)
        {
            anyhow::bail!(
                "INVOCATIONS_BEFORE_DEREGISTRATION must be between 1 and 100. Got: {}",
                threshold
            );
        }

        match self.cw_metric_flag.to_lowercase().as_str() {
            "true" | "false" => {}
            _ => anyhow::bail!(
                "CW_METRIC_FLAG_IP_COUNT '{}' is not valid. Valid values: true, false",
                self.cw_metric_flag
            ),
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ALBSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Validate that a string is a valid domain name
    ///
    /// This implements basic DNS domain name validation per RFC 1035.
    /// It's not comprehensive but catches common errors.
    fn validate_domain_name(&self, domain: &str) -> Result<()> {
        if domain.is_empty() {
            anyhow::bail!(
                "ALB_DNS_NAME is required. \
                Set it via: export ALB_DNS_NAME=internal-alb.example.com"
            );
        }

        // Total length limit (RFC 1035: 253 chars max)
        if domain.len() > 253 {
            anyhow::bail!(
                "ALB_DNS_NAME too long: {} chars (max 253). Got: {}",
                domain.len(),
                domain
            );
        }

        for label in domain.split('.') {
            if label.is_empty() {
                anyhow::bail!("ALB_DNS_NAME has empty label: '{}'", domain);
            }

            if label.len() > 63 {
                anyhow::bail!(
                    "ALB_DNS_NAME label too long: {} chars (max 63). Label: '{}'",
                    label.len(),
                    label
                );
            }

            if !label.chars().all(|c| c.is_alphanumeric() || c == '-') {
                anyhow::bail!(
                    "ALB_DNS_NAME label contains invalid characters. Label: '{}'. \
                    Valid: alphanumeric and hyphen only.",
                    label
                );
            }

            if label.starts_with('-') || label.ends_with('-') {
                anyhow::bail!(
                    "ALB_DNS_NAME label cannot start or end with hyphen. Label: '{}'",
                    label
                );
            }
        }

        Ok(())
    }

    fn publish_metric(&self) -> bool {
        self.cw_metric_flag.eq_ignore_ascii_case("true")
    }
}

fn required_var(name: &str) -> Result<String> {
    env::var(name).map_err(|_| anyhow::anyhow!("{name} is required. Set it via: export {name}=..."))
}

fn parse_var(name: &str) -> Result<Option<u32>> {
    match env::var(name) {
        Ok(raw) => {
            let value = raw
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("{name} must be a positive integer. Got: {raw}"))?;
            Ok(Some(value))
        }
        Err(_) => Ok(None),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return SyncExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return SyncExitCode::ConfigError.into();
    }

    info!("Starting albsyncd");
    info!(
        "Tracking {} into target group {}",
        config.alb_dns_name, config.target_group_arn
    );

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return SyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_sync(config).await {
            error!("Sync error: {}", e);
            SyncExitCode::RuntimeError
        } else {
            SyncExitCode::CleanRun
        }
    });

    result.into()
}

/// Run one sync invocation
async fn run_sync(config: Config) -> Result<()> {
    // One SDK configuration for the process; every adapter clones its
    // client from it.
    let aws = aws_config::load_from_env().await;

    let store: Box<dyn SnapshotStore> = match config.state_dir {
        Some(ref dir) => {
            info!("Using local state directory: {}", dir);
            Box::new(FileSnapshotStore::new(dir).await?)
        }
        None => {
            let bucket = config.s3_bucket.clone().ok_or_else(|| {
                anyhow::anyhow!("S3_BUCKET is required when ALBSYNC_STATE_DIR is not set")
            })?;
            info!("Using S3 state bucket: {}", bucket);
            Box::new(S3SnapshotStore::new(&aws, bucket))
        }
    };

    let mut sync_config = SyncConfig::new(
        config.alb_dns_name.as_str(),
        config.listener_port,
        config.target_group_arn.as_str(),
    );
    if let Some(max_lookups) = config.max_lookups {
        sync_config.max_lookups = max_lookups;
    }
    if let Some(threshold) = config.invocations_before_deregistration {
        sync_config.invocations_before_deregistration = threshold;
    }
    sync_config.publish_ip_count_metric = config.publish_metric();

    let (engine, mut events) = SyncEngine::new(
        Box::new(HickoryProber::from_system_conf()),
        Box::new(Elbv2TargetGroup::new(&aws)),
        store,
        Box::new(CloudWatchMetrics::new(&aws)),
        sync_config,
    )?;

    // Drain engine events into the log; the channel closes when the engine
    // is dropped below.
    let drain = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                EngineEvent::Started { load_balancer_name } => {
                    debug!("invocation started for {load_balancer_name}")
                }
                EngineEvent::Aborted { reason } => warn!("invocation aborted: {reason}"),
                EngineEvent::Planned {
                    register,
                    deregister,
                    pending,
                } => info!(
                    "planned {register} registration(s), {deregister} deregistration(s), \
                    {pending} pending"
                ),
                EngineEvent::Registered { ip } => debug!("registered {ip}"),
                EngineEvent::Deregistered { ip } => debug!("deregistered {ip}"),
                EngineEvent::ActionFailed { ip, error } => {
                    warn!("action failed for {ip}: {error}")
                }
                EngineEvent::MetricPublished { ip_count } => {
                    debug!("published IP count metric: {ip_count}")
                }
                EngineEvent::Finished => debug!("invocation finished"),
            }
        }
    });

    let outcome = engine.run_once().await;
    drop(engine);
    let _ = drain.await;

    outcome?;
    info!("Sync invocation complete");
    Ok(())
}
