//! Turns servicelog entries into node events and hands them to the sink.

use std::time::Duration;

use metrics::counter;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use rtas_core::error::DispatchError;
use rtas_core::event::{NodeEvent, NodeIdentity};
use rtas_core::metrics as m;
use rtas_core::pipeline::EventSink;
use rtas_core::types::LogEntry;

/// Publishes entries for one node through an [`EventSink`].
pub struct Dispatcher<S> {
    sink: S,
    node: NodeIdentity,
    deadline: Duration,
}

impl<S: EventSink> Dispatcher<S> {
    /// Creates a dispatcher bound to `node`.
    ///
    /// `deadline` bounds each notification.
    pub fn new(sink: S, node: NodeIdentity, deadline: Duration) -> Self {
        Self {
            sink,
            node,
            deadline,
        }
    }

    /// Node the events refer to.
    pub fn node(&self) -> &NodeIdentity {
        &self.node
    }

    /// The underlying sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Publishes one entry.
    pub async fn dispatch(&self, entry: &LogEntry) -> Result<(), DispatchError> {
        match serde_json::to_string(entry) {
            Ok(json) => info!(entry = %json, "Retrieved RTAS event"),
            Err(e) => warn!(entry_id = entry.id, error = %e, "failed to encode entry"),
        }

        let event = NodeEvent::from_entry(&self.node, entry);
        debug!(
            sink = self.sink.name(),
            entry_id = entry.id,
            class = %event.class,
            severity = entry.severity_label(),
            "publishing node event"
        );

        timeout(self.deadline, self.sink.notify(&event))
            .await
            .map_err(|_| DispatchError::Timeout {
                secs: self.deadline.as_secs(),
            })??;

        counter!(
            m::SERVICELOG_ENTRIES_DISPATCHED_TOTAL,
            m::LABEL_CLASS => event.class.as_str()
        )
        .increment(1);
        Ok(())
    }
}
