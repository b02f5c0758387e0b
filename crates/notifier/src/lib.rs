//! # rtas-notifier
//!
//! Where node events go.
//!
//! - [`identity`]: resolves the node name once at startup
//! - [`kube`]: [`KubeEventSink`], posts `core/v1` Events to the API server
//! - [`log_sink`]: [`LogEventSink`], writes events to the log only
//!
//! [`NodeNotifier`] picks one of them from `[notifier] kind`.

pub mod error;
pub mod identity;
pub mod kube;
pub mod log_sink;

pub use error::NotifierError;
pub use identity::resolve_node_identity;
pub use kube::{KubeEventSink, KubeSinkConfig};
pub use log_sink::LogEventSink;

use rtas_core::config::NotifierConfig;
use rtas_core::error::DispatchError;
use rtas_core::event::NodeEvent;
use rtas_core::pipeline::EventSink;

/// The sink selected by configuration.
#[derive(Debug, Clone)]
pub enum NodeNotifier {
    /// Kubernetes API server
    Kube(KubeEventSink),
    /// Log output only
    Log(LogEventSink),
}

impl NodeNotifier {
    /// Builds the sink named by `config.kind`.
    pub fn from_config(config: &NotifierConfig) -> Result<Self, NotifierError> {
        match config.kind.as_str() {
            "kubernetes" => {
                let sink_config = KubeSinkConfig::from_core(config)?;
                Ok(Self::Kube(KubeEventSink::new(sink_config)?))
            }
            "log" => Ok(Self::Log(LogEventSink::new())),
            other => Err(NotifierError::UnknownKind(other.to_owned())),
        }
    }
}

impl EventSink for NodeNotifier {
    fn name(&self) -> &str {
        match self {
            Self::Kube(sink) => sink.name(),
            Self::Log(sink) => sink.name(),
        }
    }

    async fn notify(&self, event: &NodeEvent) -> Result<(), DispatchError> {
        match self {
            Self::Kube(sink) => sink.notify(event).await,
            Self::Log(sink) => sink.notify(event).await,
        }
    }
}
