//! Shared building blocks of kube-rtas.
//!
//! - [`config`]: `kube-rtas.toml` loading, env overrides, validation
//! - [`error`]: error taxonomy (startup-fatal vs. per-cycle)
//! - [`types`]: servicelog entries and the severity classifier
//! - [`event`]: node identity and the node event record
//! - [`pipeline`]: `Pipeline` lifecycle and `EventSink` traits
//! - [`metrics`]: metric names

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod types;

// errors
pub use error::{
    ConfigError, DispatchError, IdentityError, PipelineError, RtasError, StoreError,
};

// config
pub use config::RtasConfig;

// events
pub use event::{NodeEvent, NodeIdentity};

// traits
pub use pipeline::{EventSink, HealthStatus, Pipeline};

// domain types
pub use types::{LogEntry, SeverityClass, classify, severity_label};
