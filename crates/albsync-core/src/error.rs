//! Error types for the target sync system
//!
//! The variants follow the failure taxonomy of the control loop: fatal
//! configuration and resolution errors abort an invocation before any
//! mutation, while control-plane, store, and metrics errors are recovered
//! locally by the engine.

use thiserror::Error;

/// Result type alias for sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the target sync system
#[derive(Error, Debug)]
pub enum Error {
    /// DNS resolution failed or returned an empty answer.
    ///
    /// An ALB always has at least one IP in DNS, so an empty answer is
    /// treated as a resolver failure rather than a real zero-IP state.
    #[error("DNS resolution error: {0}")]
    Resolution(String),

    /// Load-balancer control-plane errors (describe/register/deregister)
    #[error("control plane error: {0}")]
    ControlPlane(String),

    /// Snapshot store errors (object store or local file)
    #[error("snapshot store error: {0}")]
    SnapshotStore(String),

    /// Configuration errors (fatal before any I/O)
    #[error("configuration error: {0}")]
    Config(String),

    /// Metrics sink errors (never fatal for an invocation)
    #[error("metrics error: {0}")]
    Metrics(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a control-plane error
    pub fn control_plane(msg: impl Into<String>) -> Self {
        Self::ControlPlane(msg.into())
    }

    /// Create a snapshot store error
    pub fn snapshot_store(msg: impl Into<String>) -> Self {
        Self::SnapshotStore(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a metrics error
    pub fn metrics(msg: impl Into<String>) -> Self {
        Self::Metrics(msg.into())
    }

    /// True for errors that must abort the invocation before any mutation
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Resolution(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
