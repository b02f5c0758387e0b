//! Daemon health report.
//!
//! Combines the tailer's health with its counters. Logged periodically by
//! the orchestrator; the JSON form is what an external probe would read.

use serde::Serialize;

use rtas_core::pipeline::HealthStatus;
use rtas_servicelog::TailerStatsSnapshot;

/// Health of the whole daemon.
#[derive(Debug, Clone, Serialize)]
pub struct DaemonHealth {
    /// Tailer health
    pub status: HealthStatus,
    /// Seconds since the daemon was built
    pub uptime_secs: u64,
    /// Node the events are published for
    pub node: String,
    /// Event sink in use
    pub sink: String,
    /// Polling cycles started
    pub cycles_run: u64,
    /// Polling cycles that failed
    pub cycles_failed: u64,
    /// Entries published
    pub entries_dispatched: u64,
    /// Row count confirmed as processed
    pub cursor: u64,
}

impl DaemonHealth {
    /// Builds the report from the tailer status and statistics.
    pub fn new(
        status: HealthStatus,
        uptime_secs: u64,
        node: &str,
        sink: &str,
        stats: &TailerStatsSnapshot,
    ) -> Self {
        Self {
            status,
            uptime_secs,
            node: node.to_owned(),
            sink: sink.to_owned(),
            cycles_run: stats.cycles_run,
            cycles_failed: stats.cycles_failed,
            entries_dispatched: stats.entries_dispatched,
            cursor: stats.cursor,
        }
    }

    /// Logs the report at a level matching its status.
    pub fn log(&self) {
        match &self.status {
            HealthStatus::Healthy => tracing::debug!(
                uptime_secs = self.uptime_secs,
                cursor = self.cursor,
                entries_dispatched = self.entries_dispatched,
                "daemon healthy"
            ),
            HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => tracing::warn!(
                reason = %reason,
                cycles_failed = self.cycles_failed,
                cursor = self.cursor,
                "daemon not healthy"
            ),
        }
    }
}
