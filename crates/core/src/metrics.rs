//! Metric names and descriptions.
//!
//! Every Prometheus metric emitted by kube-rtas is named here and recorded
//! through the `metrics` facade (`counter!`, `gauge!`, `histogram!`). Without
//! an installed recorder the calls are no-ops.
//!
//! # Naming
//!
//! - prefix `kube_rtas_`
//! - component `servicelog_`, `notifier_`, `daemon_`
//! - suffix `_total` (counter), `_seconds` (histogram), none (gauge)

// ─── Label keys ────────────────────────────────────────────────────

/// Event class label key (normal, warning)
pub const LABEL_CLASS: &str = "class";

/// Cycle result label key (advanced, noop, store_error, dispatch_error)
pub const LABEL_RESULT: &str = "result";

/// Sink label key (kubernetes, log)
pub const LABEL_SINK: &str = "sink";

// ─── Servicelog engine ─────────────────────────────────────────────

/// Polling cycles run (counter, label: result)
pub const SERVICELOG_CYCLES_TOTAL: &str = "kube_rtas_servicelog_cycles_total";

/// Entries successfully handed to the sink (counter, label: class)
pub const SERVICELOG_ENTRIES_DISPATCHED_TOTAL: &str =
    "kube_rtas_servicelog_entries_dispatched_total";

/// Failed dispatch attempts (counter)
pub const SERVICELOG_DISPATCH_FAILURES_TOTAL: &str =
    "kube_rtas_servicelog_dispatch_failures_total";

/// Store open/query failures (counter)
pub const SERVICELOG_STORE_ERRORS_TOTAL: &str = "kube_rtas_servicelog_store_errors_total";

/// Current tail cursor position (gauge)
pub const SERVICELOG_CURSOR_POSITION: &str = "kube_rtas_servicelog_cursor_position";

/// Rows counted but not yet confirmed (gauge)
pub const SERVICELOG_PENDING_ROWS: &str = "kube_rtas_servicelog_pending_rows";

/// Cycle duration (histogram, seconds)
pub const SERVICELOG_CYCLE_DURATION_SECONDS: &str = "kube_rtas_servicelog_cycle_duration_seconds";

// ─── Notifier ──────────────────────────────────────────────────────

/// Outbound notifications by sink (counter, label: sink)
pub const NOTIFIER_REQUESTS_TOTAL: &str = "kube_rtas_notifier_requests_total";

// ─── Daemon ────────────────────────────────────────────────────────

/// Daemon uptime (gauge, seconds)
pub const DAEMON_UPTIME_SECONDS: &str = "kube_rtas_daemon_uptime_seconds";

/// Build info (gauge, always 1, label: version)
pub const DAEMON_BUILD_INFO: &str = "kube_rtas_daemon_build_info";

// ─── Histogram buckets ─────────────────────────────────────────────

/// Cycle duration buckets (seconds): 1ms to 60s, covering slow API servers.
pub const CYCLE_DURATION_BUCKETS: [f64; 10] =
    [0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 60.0];

/// Registers HELP text for every metric.
///
/// Call once, right after the global recorder is installed.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        SERVICELOG_CYCLES_TOTAL,
        "Polling cycles run, by result"
    );
    describe_counter!(
        SERVICELOG_ENTRIES_DISPATCHED_TOTAL,
        "Servicelog entries published as node events, by class"
    );
    describe_counter!(
        SERVICELOG_DISPATCH_FAILURES_TOTAL,
        "Node event publications that failed and aborted their cycle"
    );
    describe_counter!(
        SERVICELOG_STORE_ERRORS_TOTAL,
        "Servicelog database open or query failures"
    );
    describe_gauge!(
        SERVICELOG_CURSOR_POSITION,
        "Row count confirmed as fully processed"
    );
    describe_gauge!(
        SERVICELOG_PENDING_ROWS,
        "Rows present in the servicelog but not yet confirmed"
    );
    describe_histogram!(
        SERVICELOG_CYCLE_DURATION_SECONDS,
        "Duration of one polling cycle in seconds"
    );
    describe_counter!(
        NOTIFIER_REQUESTS_TOTAL,
        "Notifications sent, by sink"
    );
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Daemon uptime in seconds");
    describe_gauge!(DAEMON_BUILD_INFO, "Build information, always 1");
}
