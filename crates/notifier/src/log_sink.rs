//! Sink that only writes events to the log (standalone and dry-run use).

use metrics::counter;
use tracing::{info, warn};

use rtas_core::error::DispatchError;
use rtas_core::event::NodeEvent;
use rtas_core::metrics as m;
use rtas_core::pipeline::EventSink;
use rtas_core::types::SeverityClass;

/// Logs every event instead of publishing it.
#[derive(Debug, Clone, Default)]
pub struct LogEventSink;

impl LogEventSink {
    /// Creates the sink; it holds no state.
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, event: &NodeEvent) -> Result<(), DispatchError> {
        match event.class {
            SeverityClass::Normal => info!(
                node = %event.node,
                kind = %event.object_kind,
                reason = %event.reason,
                entry_id = event.entry_id,
                message = %event.message,
                "node event"
            ),
            SeverityClass::Warning => warn!(
                node = %event.node,
                kind = %event.object_kind,
                reason = %event.reason,
                entry_id = event.entry_id,
                message = %event.message,
                "node event"
            ),
        }
        counter!(m::NOTIFIER_REQUESTS_TOTAL, m::LABEL_SINK => "log").increment(1);
        Ok(())
    }
}
