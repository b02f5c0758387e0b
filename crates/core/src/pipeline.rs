//! Extension points: the module lifecycle trait and the event sink seam.

use std::future::Future;

use serde::Serialize;

use crate::error::{DispatchError, RtasError};
use crate::event::NodeEvent;

/// Health of a running module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum HealthStatus {
    /// Operating normally
    Healthy,
    /// Running, but the last unit of work failed
    Degraded(String),
    /// Not running
    Unhealthy(String),
}

impl HealthStatus {
    /// `true` for [`HealthStatus::Healthy`].
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// `true` for [`HealthStatus::Unhealthy`].
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

/// Lifecycle of a long-running module managed by the daemon.
///
/// ```text
/// Initialized -> start() -> Running -> stop() -> Stopped
/// ```
pub trait Pipeline: Send + Sync {
    /// Spawns the module's background work.
    fn start(&mut self) -> impl Future<Output = Result<(), RtasError>> + Send;

    /// Stops the module and waits for its background work to finish.
    fn stop(&mut self) -> impl Future<Output = Result<(), RtasError>> + Send;

    /// Reports the current health.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// Destination for node events.
///
/// Implementations perform one outbound call per event. Retries are not the
/// sink's business: a failed event makes the polling cycle abort, and the
/// next cycle re-fetches and re-sends it.
pub trait EventSink: Send + Sync + 'static {
    /// Sink name for logging.
    fn name(&self) -> &str;

    /// Publishes one event.
    fn notify(&self, event: &NodeEvent) -> impl Future<Output = Result<(), DispatchError>> + Send;
}

impl<S: EventSink> EventSink for std::sync::Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn notify(&self, event: &NodeEvent) -> impl Future<Output = Result<(), DispatchError>> + Send {
        (**self).notify(event)
    }
}
