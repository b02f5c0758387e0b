//! Servicelog tailer: the poll scheduler around [`CycleRunner`].
//!
//! [`ServicelogTailer`] implements core's
//! [`Pipeline`](rtas_core::pipeline::Pipeline) so the daemon drives it with
//! the same start/stop/health_check lifecycle as any other module.
//!
//! # Scheduling
//! A single worker task owns the runner. It fires once immediately, then on
//! a fixed interval. Ticks that come due while a cycle is still running are
//! skipped, never queued. Shutdown is observed between cycles; an in-flight
//! cycle always finishes first.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use rtas_core::error::{PipelineError, RtasError};
use rtas_core::event::NodeIdentity;
use rtas_core::pipeline::{EventSink, HealthStatus, Pipeline};

use crate::config::TailerConfig;
use crate::cycle::{CycleOutcome, CycleRunner};
use crate::dispatch::Dispatcher;
use crate::error::ServicelogError;
use crate::store::SqliteLogStore;

/// Tailer run state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TailerState {
    Initialized,
    Running,
    Stopped,
}

/// Counters shared between the worker and observers.
#[derive(Debug, Default)]
pub struct TailerStats {
    cycles_run: AtomicU64,
    cycles_failed: AtomicU64,
    entries_dispatched: AtomicU64,
    cursor: AtomicU64,
    last_error: RwLock<Option<String>>,
}

impl TailerStats {
    async fn record(&self, result: &Result<CycleOutcome, ServicelogError>, cursor: u64) {
        self.cycles_run.fetch_add(1, Ordering::Relaxed);
        self.cursor.store(cursor, Ordering::Relaxed);
        match result {
            Ok(outcome) => {
                self.entries_dispatched
                    .fetch_add(outcome.dispatched() as u64, Ordering::Relaxed);
                *self.last_error.write().await = None;
            }
            Err(e) => {
                self.cycles_failed.fetch_add(1, Ordering::Relaxed);
                *self.last_error.write().await = Some(e.to_string());
            }
        }
    }

    /// Point-in-time copy of the counters.
    pub async fn snapshot(&self) -> TailerStatsSnapshot {
        TailerStatsSnapshot {
            cycles_run: self.cycles_run.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            entries_dispatched: self.entries_dispatched.load(Ordering::Relaxed),
            cursor: self.cursor.load(Ordering::Relaxed),
            last_error: self.last_error.read().await.clone(),
        }
    }
}

/// Copy of [`TailerStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TailerStatsSnapshot {
    /// Cycles started
    pub cycles_run: u64,
    /// Cycles that ended with an error
    pub cycles_failed: u64,
    /// Entries published
    pub entries_dispatched: u64,
    /// Cursor after the latest cycle
    pub cursor: u64,
    /// Error of the latest cycle, if it failed
    pub last_error: Option<String>,
}

/// Polls the servicelog and publishes new entries as node events.
///
/// # Example
/// ```ignore
/// use rtas_servicelog::ServicelogTailerBuilder;
///
/// let mut tailer = ServicelogTailerBuilder::new()
///     .config(config)
///     .node(identity)
///     .sink(sink)
///     .build()?;
/// tailer.start().await?;
/// ```
pub struct ServicelogTailer<S: EventSink> {
    config: TailerConfig,
    state: TailerState,
    /// Present while idle; moved into the worker while running
    runner: Option<CycleRunner<S>>,
    worker: Option<JoinHandle<CycleRunner<S>>>,
    cancel: CancellationToken,
    stats: Arc<TailerStats>,
}

impl<S: EventSink> ServicelogTailer<S> {
    /// Current state name.
    pub fn state_name(&self) -> &str {
        match self.state {
            TailerState::Initialized => "initialized",
            TailerState::Running => "running",
            TailerState::Stopped => "stopped",
        }
    }

    /// Tailer settings.
    pub fn config(&self) -> &TailerConfig {
        &self.config
    }

    /// Shared statistics handle.
    pub fn stats(&self) -> Arc<TailerStats> {
        Arc::clone(&self.stats)
    }
}

impl<S: EventSink> Pipeline for ServicelogTailer<S> {
    async fn start(&mut self) -> Result<(), RtasError> {
        if self.state == TailerState::Running {
            return Err(PipelineError::AlreadyRunning.into());
        }

        let runner = self.runner.take().ok_or_else(|| {
            RtasError::Pipeline(PipelineError::InitFailed(
                "cycle runner not available".to_owned(),
            ))
        })?;

        info!(
            db_path = %self.config.db_path.display(),
            poll_interval_secs = self.config.poll_interval_secs,
            severity_threshold = self.config.severity_threshold,
            start_from = %self.config.start_from,
            cursor = runner.cursor(),
            "starting servicelog tailer"
        );

        self.cancel = CancellationToken::new();
        self.worker = Some(tokio::spawn(run_worker(
            runner,
            self.config.poll_interval(),
            self.cancel.clone(),
            Arc::clone(&self.stats),
        )));

        self.state = TailerState::Running;
        info!("servicelog tailer started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), RtasError> {
        if self.state != TailerState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping servicelog tailer");
        self.cancel.cancel();

        if let Some(worker) = self.worker.take() {
            match worker.await {
                Ok(runner) => self.runner = Some(runner),
                Err(e) => error!(error = %e, "servicelog worker terminated abnormally"),
            }
        }

        self.state = TailerState::Stopped;
        info!("servicelog tailer stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            TailerState::Running => match self.stats.last_error.read().await.as_ref() {
                Some(reason) => HealthStatus::Degraded(format!("last cycle failed: {reason}")),
                None => HealthStatus::Healthy,
            },
            TailerState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            TailerState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

async fn run_worker<S: EventSink>(
    mut runner: CycleRunner<S>,
    poll_interval: Duration,
    cancel: CancellationToken,
    stats: Arc<TailerStats>,
) -> CycleRunner<S> {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("servicelog worker received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                let result = runner.run_once().await;
                match &result {
                    Ok(CycleOutcome::Advanced { dispatched, cursor }) => {
                        info!(dispatched, cursor, "servicelog cycle complete");
                    }
                    Ok(outcome) => debug!(result = outcome.result_label(), cursor = outcome.cursor(), "servicelog cycle complete"),
                    Err(e) => error!(error = %e, cursor = runner.cursor(), "servicelog cycle failed, retrying next tick"),
                }
                stats.record(&result, runner.cursor()).await;
            }
        }
    }

    runner
}

/// Builder for [`ServicelogTailer`].
pub struct ServicelogTailerBuilder<S> {
    config: TailerConfig,
    node: Option<NodeIdentity>,
    sink: Option<S>,
}

impl<S: EventSink> ServicelogTailerBuilder<S> {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: TailerConfig::default(),
            node: None,
            sink: None,
        }
    }

    /// Sets the tailer settings.
    pub fn config(mut self, config: TailerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the node the events refer to.
    pub fn node(mut self, node: NodeIdentity) -> Self {
        self.node = Some(node);
        self
    }

    /// Sets the event sink.
    pub fn sink(mut self, sink: S) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Builds the tailer.
    pub fn build(self) -> Result<ServicelogTailer<S>, ServicelogError> {
        self.config.validate()?;
        let node = self.node.ok_or(ServicelogError::MissingComponent("node identity"))?;
        let sink = self.sink.ok_or(ServicelogError::MissingComponent("event sink"))?;

        let store = SqliteLogStore::new(&self.config.db_path, self.config.store_timeout());
        let dispatcher = Dispatcher::new(sink, node, self.config.dispatch_timeout());
        let runner = CycleRunner::new(
            store,
            dispatcher,
            self.config.severity_threshold,
            self.config.start_from,
        );

        Ok(ServicelogTailer {
            config: self.config,
            state: TailerState::Initialized,
            runner: Some(runner),
            worker: None,
            cancel: CancellationToken::new(),
            stats: Arc::new(TailerStats::default()),
        })
    }
}

impl<S: EventSink> Default for ServicelogTailerBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use rtas_core::error::DispatchError;
    use rtas_core::event::NodeEvent;

    use super::*;

    struct NullSink;

    impl EventSink for NullSink {
        fn name(&self) -> &str {
            "null"
        }

        async fn notify(&self, _event: &NodeEvent) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    fn builder() -> ServicelogTailerBuilder<NullSink> {
        ServicelogTailerBuilder::new()
            .node(NodeIdentity::new("worker-1").unwrap())
            .sink(NullSink)
    }

    #[test]
    fn builder_creates_tailer() {
        let tailer = builder().build().unwrap();
        assert_eq!(tailer.state_name(), "initialized");
        assert_eq!(tailer.config().poll_interval_secs, 10);
    }

    #[test]
    fn builder_requires_node_and_sink() {
        let result = ServicelogTailerBuilder::<NullSink>::new().sink(NullSink).build();
        assert!(matches!(
            result,
            Err(ServicelogError::MissingComponent("node identity"))
        ));

        let result = ServicelogTailerBuilder::<NullSink>::new()
            .node(NodeIdentity::new("n").unwrap())
            .build();
        assert!(matches!(
            result,
            Err(ServicelogError::MissingComponent("event sink"))
        ));
    }

    #[test]
    fn builder_with_invalid_config_fails() {
        let config = TailerConfig {
            poll_interval_secs: 0,
            ..Default::default()
        };
        assert!(builder().config(config).build().is_err());
    }

    #[tokio::test]
    async fn lifecycle_errors_before_start() {
        let mut tailer = builder().build().unwrap();
        assert!(tailer.health_check().await.is_unhealthy());
        assert!(tailer.stop().await.is_err());
    }

    #[tokio::test]
    async fn stats_start_empty() {
        let tailer = builder().build().unwrap();
        assert_eq!(
            tailer.stats().snapshot().await,
            TailerStatsSnapshot::default()
        );
    }
}
