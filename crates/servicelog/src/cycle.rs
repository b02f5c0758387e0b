//! One polling cycle.
//!
//! ```text
//! Idle -> StoreOpened -> Counted -> NoOp                               -> Idle
//!                                -> Fetching -> Dispatching -> Advanced -> Idle
//! ```
//!
//! Any store failure returns to `Idle` with the cursor untouched. A dispatch
//! failure stops the delta at the failing entry and also leaves the cursor
//! alone, so the next cycle re-fetches and re-sends the whole delta
//! (at-least-once delivery).

use std::fmt;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use tracing::{debug, trace, warn};

use rtas_core::metrics as m;
use rtas_core::pipeline::EventSink;

use crate::config::StartFrom;
use crate::cursor::TailCursor;
use crate::dispatch::Dispatcher;
use crate::error::ServicelogError;
use crate::store::{SqliteLogStore, StoreHandle};

/// Stage of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    /// No store handle held
    Idle,
    /// Connection open, nothing read yet
    StoreOpened,
    /// Row count known
    Counted,
    /// Nothing new since the last cycle
    NoOp,
    /// Reading the delta
    Fetching,
    /// Publishing the delta
    Dispatching,
    /// Whole delta published, cursor moved
    Advanced,
}

impl CycleStage {
    /// Lowercase stage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::StoreOpened => "store_opened",
            Self::Counted => "counted",
            Self::NoOp => "noop",
            Self::Fetching => "fetching",
            Self::Dispatching => "dispatching",
            Self::Advanced => "advanced",
        }
    }
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a cycle that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Row count equals the cursor
    NoPending {
        /// Unchanged cursor
        cursor: u64,
    },
    /// First cycle with [`StartFrom::End`]: cursor set to the row count,
    /// nothing published
    Baselined {
        /// New cursor
        cursor: u64,
    },
    /// Every entry of the delta was published
    Advanced {
        /// Entries published (only those above the threshold)
        dispatched: usize,
        /// New cursor
        cursor: u64,
    },
}

impl CycleOutcome {
    /// Metric label for this result.
    pub fn result_label(&self) -> &'static str {
        match self {
            Self::NoPending { .. } => "noop",
            Self::Baselined { .. } => "baselined",
            Self::Advanced { .. } => "advanced",
        }
    }

    /// Cursor after the cycle.
    pub fn cursor(&self) -> u64 {
        match self {
            Self::NoPending { cursor }
            | Self::Baselined { cursor }
            | Self::Advanced { cursor, .. } => *cursor,
        }
    }

    /// Entries published by the cycle.
    pub fn dispatched(&self) -> usize {
        match self {
            Self::Advanced { dispatched, .. } => *dispatched,
            _ => 0,
        }
    }
}

/// Everything one worker needs to run cycles: store, cursor, dispatcher.
///
/// Owned by exactly one task, so cycles never overlap.
pub struct CycleRunner<S> {
    store: SqliteLogStore,
    dispatcher: Dispatcher<S>,
    cursor: TailCursor,
    severity_threshold: i64,
    baseline_pending: bool,
}

impl<S: EventSink> CycleRunner<S> {
    /// Creates a runner with a fresh cursor.
    pub fn new(
        store: SqliteLogStore,
        dispatcher: Dispatcher<S>,
        severity_threshold: i64,
        start_from: StartFrom,
    ) -> Self {
        Self {
            store,
            dispatcher,
            cursor: TailCursor::new(),
            severity_threshold,
            baseline_pending: start_from == StartFrom::End,
        }
    }

    /// Current cursor position.
    pub fn cursor(&self) -> u64 {
        self.cursor.read()
    }

    /// The dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher<S> {
        &self.dispatcher
    }

    /// Runs one cycle and records its metrics.
    ///
    /// The store handle is released before this returns, on every path.
    pub async fn run_once(&mut self) -> Result<CycleOutcome, ServicelogError> {
        let started = Instant::now();
        let result = self.run_cycle().await;
        histogram!(m::SERVICELOG_CYCLE_DURATION_SECONDS).record(started.elapsed().as_secs_f64());

        let result_label = match &result {
            Ok(outcome) => outcome.result_label(),
            Err(e) => {
                match e {
                    ServicelogError::Dispatch { .. } => {
                        counter!(m::SERVICELOG_DISPATCH_FAILURES_TOTAL).increment(1)
                    }
                    _ => counter!(m::SERVICELOG_STORE_ERRORS_TOTAL).increment(1),
                }
                e.result_label()
            }
        };
        counter!(m::SERVICELOG_CYCLES_TOTAL, m::LABEL_RESULT => result_label).increment(1);
        gauge!(m::SERVICELOG_CURSOR_POSITION).set(self.cursor.read() as f64);

        result
    }

    async fn run_cycle(&mut self) -> Result<CycleOutcome, ServicelogError> {
        let mut handle = self
            .store
            .open_cycle()
            .await
            .map_err(|source| ServicelogError::Store {
                stage: CycleStage::Idle,
                source,
            })?;
        trace!(stage = %CycleStage::StoreOpened, "cycle stage");

        let result = self.process(&mut handle).await;
        handle.close().await;
        trace!(stage = %CycleStage::Idle, "cycle stage");
        result
    }

    async fn process(&mut self, handle: &mut StoreHandle) -> Result<CycleOutcome, ServicelogError> {
        let total = handle
            .count_rows()
            .await
            .map_err(|source| ServicelogError::Store {
                stage: CycleStage::StoreOpened,
                source,
            })?;
        trace!(stage = %CycleStage::Counted, total, "cycle stage");

        if self.baseline_pending {
            self.baseline_pending = false;
            let cursor = total.max(self.cursor.read());
            self.cursor.advance(cursor);
            debug!(cursor, "cursor baselined to current servicelog size");
            return Ok(CycleOutcome::Baselined { cursor });
        }

        let cursor = self.cursor.read();
        gauge!(m::SERVICELOG_PENDING_ROWS).set(total.saturating_sub(cursor) as f64);

        if total <= cursor {
            if total < cursor {
                warn!(total, cursor, "servicelog has fewer rows than the cursor, waiting for it to grow");
            }
            trace!(stage = %CycleStage::NoOp, "cycle stage");
            debug!(cursor, "no pending entries");
            return Ok(CycleOutcome::NoPending { cursor });
        }

        trace!(stage = %CycleStage::Fetching, cursor, "cycle stage");
        let delta = handle
            .fetch_delta(cursor, self.severity_threshold)
            .await
            .map_err(|source| ServicelogError::Store {
                stage: CycleStage::Fetching,
                source,
            })?;

        trace!(stage = %CycleStage::Dispatching, entries = delta.len(), "cycle stage");
        for (delivered, entry) in delta.iter().enumerate() {
            self.dispatcher
                .dispatch(entry)
                .await
                .map_err(|source| ServicelogError::Dispatch {
                    entry_id: entry.id,
                    delivered,
                    source,
                })?;
        }

        self.cursor.advance(total);
        gauge!(m::SERVICELOG_PENDING_ROWS).set(0.0);
        trace!(stage = %CycleStage::Advanced, cursor = total, "cycle stage");
        Ok(CycleOutcome::Advanced {
            dispatched: delta.len(),
            cursor: total,
        })
    }
}
