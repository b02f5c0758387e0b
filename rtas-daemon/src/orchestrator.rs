//! Startup, run loop and shutdown of kube-rtas.
//!
//! # Startup order
//! 1. PID file
//! 2. Prometheus recorder (when enabled)
//! 3. Node identity
//! 4. Event sink
//! 5. Servicelog database must exist
//! 6. Tailer start (in [`Orchestrator::run`])
//!
//! Any failure up to step 6 aborts startup and the PID file is removed.
//! Once the tailer runs, failures are per cycle and never stop the daemon.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::broadcast;

use rtas_core::config::RtasConfig;
use rtas_core::event::NodeIdentity;
use rtas_core::metrics as m;
use rtas_core::pipeline::{EventSink, Pipeline};
use rtas_notifier::{NodeNotifier, resolve_node_identity};
use rtas_servicelog::{
    ServicelogTailer, ServicelogTailerBuilder, SqliteLogStore, TailerConfig,
};

use crate::health::DaemonHealth;
use crate::metrics_server;
use crate::pid_file::PidFile;

/// Seconds between health reports in the run loop.
const HEALTH_REPORT_INTERVAL_SECS: u64 = 60;

/// Seconds between uptime gauge updates.
const UPTIME_UPDATE_INTERVAL_SECS: u64 = 10;

/// Owns every long-lived part of the daemon.
pub struct Orchestrator {
    config: RtasConfig,
    node: NodeIdentity,
    sink_name: String,
    tailer: ServicelogTailer<NodeNotifier>,
    shutdown_tx: broadcast::Sender<()>,
    start_time: Instant,
    pid_file: Option<PidFile>,
}

impl Orchestrator {
    /// Loads the config file and builds the daemon.
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = RtasConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {e}"))?;
        Self::build_from_config(config).await
    }

    /// Builds the daemon from an already-loaded configuration.
    pub async fn build_from_config(config: RtasConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {e}"))?;

        let pid_file = if config.general.pid_file.is_empty() {
            None
        } else {
            Some(PidFile::create(&config.general.pid_file)?)
        };

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            record_daemon_metrics();
        }

        let node = resolve_node_identity(&config.notifier.node_name)
            .map_err(|e| anyhow::anyhow!("failed to resolve node identity: {e}"))?;
        tracing::info!(node = %node, "node identity resolved");

        let sink = NodeNotifier::from_config(&config.notifier)
            .map_err(|e| anyhow::anyhow!("failed to initialize event sink: {e}"))?;
        let sink_name = sink.name().to_owned();
        tracing::info!(sink = %sink_name, "event sink initialized");

        let tailer_config = TailerConfig::from_core(&config.servicelog, &config.notifier)?;
        SqliteLogStore::new(&tailer_config.db_path, tailer_config.store_timeout())
            .ensure_exists()?;

        let tailer = ServicelogTailerBuilder::new()
            .config(tailer_config)
            .node(node.clone())
            .sink(sink)
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build servicelog tailer: {e}"))?;

        let (shutdown_tx, _) = broadcast::channel(4);

        Ok(Self {
            config,
            node,
            sink_name,
            tailer,
            shutdown_tx,
            start_time: Instant::now(),
            pid_file,
        })
    }

    /// Runs until SIGTERM or SIGINT.
    ///
    /// Signal handlers are in place before the tailer starts.
    pub async fn run(&mut self) -> Result<()> {
        let mut signals = ShutdownSignals::install()?;
        self.run_until(async move { signals.recv().await }).await
    }

    /// Runs until `shutdown` resolves, then stops the tailer and removes the
    /// PID file. The future's output names the trigger in the log.
    pub async fn run_until(
        &mut self,
        shutdown: impl Future<Output = &'static str>,
    ) -> Result<()> {
        self.tailer.start().await?;

        let uptime_task = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(self.start_time, self.shutdown_tx.subscribe()));

        tracing::info!(node = %self.node, "kube-rtas running");

        let mut health_ticker =
            tokio::time::interval(Duration::from_secs(HEALTH_REPORT_INTERVAL_SECS));
        health_ticker.tick().await;
        tokio::pin!(shutdown);

        let trigger = loop {
            tokio::select! {
                trigger = &mut shutdown => break trigger,
                _ = health_ticker.tick() => self.health().await.log(),
            }
        };
        tracing::info!(trigger, "shutdown requested");

        let _ = self.shutdown_tx.send(());
        if let Some(task) = uptime_task {
            let _ = task.await;
        }

        let stopped = self.tailer.stop().await;
        self.pid_file.take();
        stopped?;

        tracing::info!("kube-rtas stopped");
        Ok(())
    }

    /// Current health report.
    pub async fn health(&self) -> DaemonHealth {
        let stats = self.tailer.stats().snapshot().await;
        DaemonHealth::new(
            self.tailer.health_check().await,
            self.start_time.elapsed().as_secs(),
            self.node.name(),
            &self.sink_name,
            &stats,
        )
    }

    /// Loaded configuration.
    pub fn config(&self) -> &RtasConfig {
        &self.config
    }

    /// Resolved node identity.
    pub fn node(&self) -> &NodeIdentity {
        &self.node
    }
}

/// Installed SIGTERM and SIGINT handlers.
pub struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignals {
    /// Replaces the default terminate/interrupt action for the process.
    pub fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {e}"))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {e}"))?;
        Ok(Self { sigterm, sigint })
    }

    /// Waits for the next signal and returns its name.
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        }
    }
}

fn record_daemon_metrics() {
    metrics::gauge!(m::DAEMON_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);
}

fn spawn_uptime_updater(
    start_time: Instant,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(UPTIME_UPDATE_INTERVAL_SECS));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::DAEMON_UPTIME_SECONDS).set(start_time.elapsed().as_secs() as f64);
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
