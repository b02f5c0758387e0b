//! Notifier errors
//!
//! Everything here is a startup failure: a sink that cannot be built stops
//! the daemon before the first cycle. Per-event failures use core's
//! [`DispatchError`](rtas_core::error::DispatchError) instead.

use rtas_core::error::{ConfigError, PipelineError, RtasError};

/// Sink initialisation error
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    /// No API server configured and in-cluster discovery failed
    #[error("kubernetes api server unknown: {0}")]
    ApiServerUnknown(String),

    /// Service-account token could not be read
    #[error("failed to read token from {path}: {reason}")]
    Token {
        /// Token file
        path: String,
        /// I/O failure
        reason: String,
    },

    /// CA bundle could not be read or parsed
    #[error("failed to load CA bundle from {path}: {reason}")]
    CaBundle {
        /// CA file
        path: String,
        /// Read or parse failure
        reason: String,
    },

    /// HTTP client construction failed
    #[error("http client error: {0}")]
    Client(String),

    /// Unknown sink kind
    #[error("unknown notifier kind '{0}'")]
    UnknownKind(String),
}

impl From<NotifierError> for RtasError {
    fn from(err: NotifierError) -> Self {
        match err {
            NotifierError::UnknownKind(kind) => RtasError::Config(ConfigError::InvalidValue {
                field: "notifier.kind".to_owned(),
                reason: format!("unknown kind '{kind}'"),
            }),
            other => RtasError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
