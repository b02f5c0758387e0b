//! Node event record, the unit handed to an [`EventSink`](crate::pipeline::EventSink).
//!
//! A [`NodeEvent`] is built from one [`LogEntry`] and the node identity that
//! was resolved at startup.

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::types::{LogEntry, SeverityClass};

/// Kind of the object every event refers to
pub const OBJECT_KIND_NODE: &str = "Node";

/// Reason tag attached to every published event
pub const REASON_PLATFORM_EVENT: &str = "PlatformEvent";

/// Identity of the node this agent runs on.
///
/// Resolved once at startup and shared read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeIdentity {
    name: String,
}

impl NodeIdentity {
    /// Wraps an already-resolved node name.
    ///
    /// Returns `None` for an empty (or whitespace-only) name.
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into().trim().to_owned();
        if name.is_empty() {
            None
        } else {
            Some(Self { name })
        }
    }

    /// The node name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// A cluster-visible event about the local node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeEvent {
    /// Node the event is about
    pub node: NodeIdentity,
    /// Involved object kind, always [`OBJECT_KIND_NODE`]
    pub object_kind: String,
    /// Normal or Warning
    pub class: SeverityClass,
    /// Reason tag, always [`REASON_PLATFORM_EVENT`]
    pub reason: String,
    /// Event message (the servicelog description)
    pub message: String,
    /// Servicelog row the event was built from
    pub entry_id: i64,
    /// Time the event was built
    pub timestamp: SystemTime,
}

impl NodeEvent {
    /// Builds the event published for `entry`.
    pub fn from_entry(node: &NodeIdentity, entry: &LogEntry) -> Self {
        Self {
            node: node.clone(),
            object_kind: OBJECT_KIND_NODE.to_owned(),
            class: entry.class(),
            reason: REASON_PLATFORM_EVENT.to_owned(),
            message: entry.description.clone(),
            entry_id: entry.id,
            timestamp: SystemTime::now(),
        }
    }
}

impl fmt::Display for NodeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} {} {}: {}",
            self.object_kind, self.node, self.class, self.reason, self.message
        )
    }
}
