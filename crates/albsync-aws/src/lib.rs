// # albsync-aws
//
// AWS implementations of the target sync seams:
//
// - [`Elbv2TargetGroup`]: NLB target group membership via the ELBv2 API
// - [`S3SnapshotStore`]: persisted snapshot/ledger documents in S3
// - [`CloudWatchMetrics`]: the LoadBalancerIPCount gauge
//
// All three are thin single-call adapters. They hold SDK clients built once
// from a shared `aws_config::SdkConfig` at process start and reused for the
// process lifetime; no policy lives here — retries beyond the SDK defaults,
// ordering, and failure recovery are owned by the engine.

pub mod metrics;
pub mod snapshot;
pub mod target_group;

pub use metrics::CloudWatchMetrics;
pub use snapshot::S3SnapshotStore;
pub use target_group::Elbv2TargetGroup;
