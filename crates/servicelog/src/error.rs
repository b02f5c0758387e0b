//! Servicelog engine errors
//!
//! [`ServicelogError`] covers configuration, store and dispatch failures of
//! the tailer. `From<ServicelogError> for RtasError` lets the daemon
//! propagate it with `?`.

use rtas_core::error::{ConfigError, DispatchError, PipelineError, RtasError, StoreError};

use crate::cycle::CycleStage;

/// Servicelog engine error
#[derive(Debug, thiserror::Error)]
pub enum ServicelogError {
    /// Invalid tailer setting
    #[error("config error: {field}: {reason}")]
    Config {
        /// Setting name
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// A required builder input was not supplied
    #[error("missing component: {0}")]
    MissingComponent(&'static str),

    /// The servicelog database file does not exist
    #[error("servicelog database not found: {path}")]
    StoreMissing {
        /// Configured database path
        path: String,
    },

    /// A store operation failed during a cycle
    #[error("store failure while {stage}: {source}")]
    Store {
        /// Last stage the cycle reached
        stage: CycleStage,
        /// Underlying failure
        #[source]
        source: StoreError,
    },

    /// Publishing an entry failed; the rest of the delta was not attempted
    #[error("dispatch of entry {entry_id} failed after {delivered} delivered: {source}")]
    Dispatch {
        /// Row id of the entry that failed
        entry_id: i64,
        /// Entries of the same delta delivered before the failure
        delivered: usize,
        /// Underlying failure
        #[source]
        source: DispatchError,
    },
}

impl ServicelogError {
    /// Metric label for the failed cycle result.
    pub fn result_label(&self) -> &'static str {
        match self {
            Self::Dispatch { .. } => "dispatch_error",
            _ => "store_error",
        }
    }
}

impl From<ServicelogError> for RtasError {
    fn from(err: ServicelogError) -> Self {
        match err {
            ServicelogError::Config { field, reason } => {
                RtasError::Config(ConfigError::InvalidValue { field, reason })
            }
            ServicelogError::MissingComponent(name) => {
                RtasError::Pipeline(PipelineError::InitFailed(format!("{name} is required")))
            }
            ServicelogError::StoreMissing { path } => RtasError::Store(StoreError::Unavailable {
                path,
                reason: "file does not exist".to_owned(),
            }),
            ServicelogError::Store { source, .. } => RtasError::Store(source),
            ServicelogError::Dispatch { source, .. } => RtasError::Dispatch(source),
        }
    }
}
