//! Domain types shared by the engine, the sinks and the daemon.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lowest severity code mapped to [`SeverityClass::Warning`].
pub const WARNING_SEVERITY_FLOOR: i64 = 4;

/// Text labels of the servicelog severity codes, indexed by code.
const SEVERITY_LABELS: [&str; 8] = [
    "",
    "DEBUG",
    "INFO",
    "EVENT",
    "WARNING",
    "ERROR_LOCAL",
    "ERROR",
    "FATAL",
];

/// One row of the servicelog `EVENTS` table.
///
/// Immutable once read; owned by the polling cycle that fetched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Store-assigned row identifier, strictly increasing
    #[serde(rename = "Id")]
    pub id: i64,
    /// Severity code, documented range 0..=7
    #[serde(rename = "Severity")]
    pub severity: i64,
    /// Free-text description written by the firmware diagnostics
    #[serde(rename = "Description")]
    pub description: String,
}

impl LogEntry {
    /// Creates a new entry.
    pub fn new(id: i64, severity: i64, description: impl Into<String>) -> Self {
        Self {
            id,
            severity,
            description: description.into(),
        }
    }

    /// Coarse class of this entry's severity.
    pub fn class(&self) -> SeverityClass {
        classify(self.severity)
    }

    /// Text label of this entry's severity.
    pub fn severity_label(&self) -> &'static str {
        severity_label(self.severity)
    }
}

/// Coarse event class published to the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeverityClass {
    /// Unassigned, DEBUG, INFO and EVENT
    Normal,
    /// WARNING and everything above it
    Warning,
}

impl SeverityClass {
    /// Kubernetes event `type` string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
        }
    }
}

impl fmt::Display for SeverityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a severity code to its event class.
///
/// Codes outside 0..=7 are not rejected; they follow the same `< 4` rule.
pub fn classify(severity: i64) -> SeverityClass {
    if severity < WARNING_SEVERITY_FLOOR {
        SeverityClass::Normal
    } else {
        SeverityClass::Warning
    }
}

/// Returns the text label of a severity code, `"UNKNOWN"` outside 0..=7.
pub fn severity_label(severity: i64) -> &'static str {
    usize::try_from(severity)
        .ok()
        .and_then(|idx| SEVERITY_LABELS.get(idx).copied())
        .unwrap_or("UNKNOWN")
}
