//! Error types, split by failure domain.
//!
//! Startup-fatal failures are [`ConfigError`] and [`IdentityError`].
//! [`StoreError`] and [`DispatchError`] are per-cycle: the cycle that hit them
//! is abandoned without touching the tail cursor and the next tick retries.

/// Top-level kube-rtas error.
#[derive(Debug, thiserror::Error)]
pub enum RtasError {
    /// Configuration could not be loaded or is invalid
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Node identity could not be resolved
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Log store access failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Event sink rejected or failed a notification
    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Lifecycle misuse or initialization failure
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RtasError {
    /// Whether the error only affects the current polling cycle.
    ///
    /// Recoverable errors are logged and retried on the next tick; everything
    /// else must stop the process before the scheduler starts.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Dispatch(_))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Config file could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A field holds an unacceptable value
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Node identity errors
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// Neither an injected node name nor a host name is available
    #[error("node identity unavailable: {0}")]
    Unavailable(String),
}

/// Log store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be opened (missing file, corruption, lock contention)
    #[error("store unavailable at {path}: {reason}")]
    Unavailable { path: String, reason: String },

    /// A query failed to execute or a row failed to decode
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A store operation exceeded its deadline
    #[error("store operation '{operation}' timed out after {secs}s")]
    Timeout { operation: &'static str, secs: u64 },
}

/// Event sink errors
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Transport-level failure (connection refused, TLS, serialization)
    #[error("dispatch failed: {0}")]
    Failed(String),

    /// The sink answered with a non-success status
    #[error("event rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    /// The sink did not answer in time
    #[error("dispatch timed out after {secs}s")]
    Timeout { secs: u64 },
}

/// Lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// `start()` called on a running pipeline
    #[error("pipeline is already running")]
    AlreadyRunning,

    /// `stop()` called on a pipeline that is not running
    #[error("pipeline is not running")]
    NotRunning,

    /// Pipeline could not be assembled
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}
