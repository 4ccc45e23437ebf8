//! Module lifecycle controller -- worker supervision and coordinated shutdown.
//!
//! The [`Controller`] owns one worker task per detection module
//! (network_monitor, static_analysis, file_monitor), plus the always-on
//! alert-processing loop and the alert forwarder. Modules start and stop
//! independently; process-level termination signals trigger a single
//! coordinated `stop_all`.
//!
//! # State machine (per module)
//!
//! ```text
//! Stopped -> Starting -> Running -> Stopping -> Stopped
//! ```
//!
//! Stopping is cooperative: the worker's cancellation token is signalled
//! and the join is awaited with a bounded timeout. A worker that exceeds
//! the timeout is logged and treated as stopped (best-effort join).

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use hostwatch_core::config::HostwatchConfig;
use hostwatch_core::error::{HostwatchError, ModuleError};
use hostwatch_core::event::{
    ALL_MODULES, AnalysisTask, FileChangeEvent, MODULE_FILE, MODULE_NETWORK, MODULE_STATIC,
    SharedReceiver, shared_receiver,
};
use hostwatch_core::pipeline::{AlertSink, FalsePositiveGate, StaticAnalyzer};
use hostwatch_core::store::AggregationStore;
use hostwatch_core::types::{Alert, DecodedPacket};

use hostwatch_alert_relay::{AlertForwarder, AlertLog};
use hostwatch_file_reactor::FileReactorBuilder;
use hostwatch_net_monitor::NetworkMonitorBuilder;

use crate::workers;

/// Bounded wait for a worker to exit after cancellation.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Capacity of the in-memory committed-alert queue.
const ALERT_QUEUE_CAPACITY: usize = 256;

/// State for one live worker.
///
/// At most one live worker exists per module name. The running flag is
/// derived from the join handle.
struct ModuleState {
    name: String,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    #[allow(dead_code)] // Exposed for status/uptime reporting
    started_at: SystemTime,
}

impl ModuleState {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// External collaborator hookups for the controller.
///
/// The capture/decode library feeds `packet_rx`; the filesystem watcher
/// feeds `fs_event_rx`. Gate and analyzer are injected policies.
pub struct ControllerPorts {
    /// Decoded packets from the capture/decode collaborator.
    pub packet_rx: mpsc::Receiver<DecodedPacket>,
    /// Filesystem change events from the watch collaborator.
    pub fs_event_rx: mpsc::Receiver<FileChangeEvent>,
    /// False-positive suppression policy.
    pub gate: Arc<dyn FalsePositiveGate>,
    /// Static-analysis collaborator.
    pub analyzer: Arc<dyn StaticAnalyzer>,
}

/// The module lifecycle controller.
pub struct Controller {
    config: HostwatchConfig,
    store: Arc<AggregationStore>,
    gate: Arc<dyn FalsePositiveGate>,
    analyzer: Arc<dyn StaticAnalyzer>,
    alert_log: Arc<AlertLog>,

    packet_rx: SharedReceiver<DecodedPacket>,
    fs_event_rx: SharedReceiver<FileChangeEvent>,
    analysis_tx: mpsc::Sender<AnalysisTask>,
    analysis_rx: SharedReceiver<AnalysisTask>,
    alert_tx: mpsc::Sender<Alert>,
    alert_rx: SharedReceiver<Alert>,

    modules: HashMap<String, ModuleState>,
    alert_worker: Option<ModuleState>,
    forwarder_worker: Option<ModuleState>,
}

impl Controller {
    /// Build the controller.
    ///
    /// Opens the durable alert log; failure to secure the log's storage
    /// location is the one fatal startup error in this core.
    pub fn new(
        config: HostwatchConfig,
        store: Arc<AggregationStore>,
        ports: ControllerPorts,
    ) -> Result<Self, HostwatchError> {
        let alert_log = AlertLog::open(&config.alerts.log_path).map_err(|e| {
            tracing::error!(
                path = %config.alerts.log_path,
                error = %e,
                "cannot secure durable alert log location, aborting startup"
            );
            HostwatchError::from(e)
        })?;

        let (alert_tx, alert_rx) = mpsc::channel(ALERT_QUEUE_CAPACITY);
        let (analysis_tx, analysis_rx) = mpsc::channel(config.static_analysis.queue_capacity);

        Ok(Self {
            config,
            store,
            gate: ports.gate,
            analyzer: ports.analyzer,
            alert_log: Arc::new(alert_log),
            packet_rx: shared_receiver(ports.packet_rx),
            fs_event_rx: shared_receiver(ports.fs_event_rx),
            analysis_tx,
            analysis_rx: shared_receiver(analysis_rx),
            alert_tx,
            alert_rx: shared_receiver(alert_rx),
            modules: HashMap::new(),
            alert_worker: None,
            forwarder_worker: None,
        })
    }

    /// Shared aggregation store handle (read by the console collaborator).
    pub fn store(&self) -> Arc<AggregationStore> {
        Arc::clone(&self.store)
    }

    /// Path of the durable alert log.
    pub fn alert_log_path(&self) -> &Path {
        self.alert_log.path()
    }

    /// Sender half of the committed-alert queue.
    ///
    /// Other producers (e.g. an embedding application) can submit alerts
    /// for the processing loop to record into the aggregation store.
    pub fn alert_sender(&self) -> mpsc::Sender<Alert> {
        self.alert_tx.clone()
    }

    /// Start one detection module.
    ///
    /// A duplicate start while the worker is alive is a warn-level no-op,
    /// not an error.
    pub fn start_module(&mut self, name: &str) -> Result<(), HostwatchError> {
        if let Some(state) = self.modules.get(name)
            && state.is_running()
        {
            tracing::warn!(module = name, "module is already running");
            return Ok(());
        }

        let cancel = CancellationToken::new();
        let handle = match name {
            MODULE_NETWORK => {
                let monitor = NetworkMonitorBuilder::new()
                    .network_config(self.config.network.clone())
                    .alert_config(self.config.alerts.clone())
                    .gate(Arc::clone(&self.gate))
                    .sink(Arc::clone(&self.alert_log) as Arc<dyn AlertSink>)
                    .store(Arc::clone(&self.store))
                    .alert_sender(self.alert_tx.clone())
                    .packet_receiver(Arc::clone(&self.packet_rx))
                    .build()?;
                tokio::spawn(monitor.run(cancel.clone()))
            }
            MODULE_FILE => {
                let reactor = FileReactorBuilder::new()
                    .config(self.config.file_monitor.clone())
                    .store(Arc::clone(&self.store))
                    .analysis_sender(self.analysis_tx.clone())
                    .event_receiver(Arc::clone(&self.fs_event_rx))
                    .build()?;
                tokio::spawn(reactor.run(cancel.clone()))
            }
            MODULE_STATIC => tokio::spawn(workers::run_static_analysis(
                Arc::clone(&self.analysis_rx),
                Arc::clone(&self.analyzer),
                Arc::clone(&self.store),
                cancel.clone(),
            )),
            _ => {
                return Err(ModuleError::Unknown {
                    name: name.to_owned(),
                }
                .into());
            }
        };

        self.modules.insert(
            name.to_owned(),
            ModuleState {
                name: name.to_owned(),
                cancel,
                handle,
                started_at: SystemTime::now(),
            },
        );
        tracing::info!(module = name, "module started");
        Ok(())
    }

    /// Stop one detection module.
    ///
    /// Stopping a module that is not running is a warn-level no-op.
    pub async fn stop_module(&mut self, name: &str) {
        match self.modules.remove(name) {
            None => {
                tracing::warn!(module = name, "module is not running");
            }
            Some(state) => stop_worker(state).await,
        }
    }

    /// Start all configured-enabled modules plus the always-on workers.
    pub async fn start_all(&mut self) -> Result<(), HostwatchError> {
        for name in ALL_MODULES {
            if self.config.module_enabled(name) {
                self.start_module(name)?;
            } else {
                tracing::debug!(module = name, "module disabled in configuration, skipping");
            }
        }

        // Alert processing is always on while the controller runs.
        if !self
            .alert_worker
            .as_ref()
            .map(ModuleState::is_running)
            .unwrap_or(false)
        {
            let cancel = CancellationToken::new();
            let handle = tokio::spawn(workers::run_alert_processor(
                Arc::clone(&self.alert_rx),
                Arc::clone(&self.store),
                cancel.clone(),
            ));
            self.alert_worker = Some(ModuleState {
                name: "alert_processor".to_owned(),
                cancel,
                handle,
                started_at: SystemTime::now(),
            });
        }

        if self.config.alerts.forward_enabled
            && !self
                .forwarder_worker
                .as_ref()
                .map(ModuleState::is_running)
                .unwrap_or(false)
        {
            let forwarder = AlertForwarder::new(
                &self.config.alerts.log_path,
                self.config.alerts.collector_url.clone(),
                Duration::from_secs(self.config.alerts.poll_interval_secs),
            )
            .map_err(HostwatchError::from)?;
            let cancel = CancellationToken::new();
            let forward_cancel = cancel.clone();
            let handle = tokio::spawn(async move {
                let _ = forwarder.run(forward_cancel).await;
            });
            self.forwarder_worker = Some(ModuleState {
                name: "alert_forwarder".to_owned(),
                cancel,
                handle,
                started_at: SystemTime::now(),
            });
        }

        Ok(())
    }

    /// Stop every running worker.
    ///
    /// Detection modules stop first (producers), then the forwarder, then
    /// the alert processor so it can drain the queue. Idempotent: calling
    /// with nothing running only emits warnings.
    pub async fn stop_all(&mut self) {
        tracing::info!("stopping all modules");

        for name in ALL_MODULES {
            if self.modules.contains_key(name) {
                self.stop_module(name).await;
            }
        }
        if let Some(state) = self.forwarder_worker.take() {
            stop_worker(state).await;
        }
        if let Some(state) = self.alert_worker.take() {
            stop_worker(state).await;
        }

        tracing::info!("all modules stopped");
    }

    /// Report module name -> running flag for the three detection modules.
    pub fn status(&self) -> HashMap<String, bool> {
        ALL_MODULES
            .iter()
            .map(|name| {
                let running = self
                    .modules
                    .get(*name)
                    .map(ModuleState::is_running)
                    .unwrap_or(false);
                ((*name).to_owned(), running)
            })
            .collect()
    }

    /// Run until a termination signal, then shut down exactly once.
    pub async fn run(&mut self) -> Result<(), HostwatchError> {
        if !self.config.general.pid_file.is_empty() {
            let path = self.config.general.pid_file.clone();
            write_pid_file(Path::new(&path))?;
        }

        self.start_all().await?;

        tracing::info!("hostwatch-daemon running -- modules active");
        let signal = wait_for_shutdown_signal().await?;
        tracing::info!(signal, "shutdown signal received");

        self.stop_all().await;

        if !self.config.general.pid_file.is_empty() {
            remove_pid_file(Path::new(&self.config.general.pid_file));
        }

        Ok(())
    }
}

/// Cancel a worker and wait for it with a bounded timeout.
///
/// A worker blocked in an external call may exceed the timeout; the
/// controller logs the limitation and proceeds as if stopped.
async fn stop_worker(state: ModuleState) {
    state.cancel.cancel();
    match tokio::time::timeout(STOP_TIMEOUT, state.handle).await {
        Ok(_) => {
            tracing::info!(module = %state.name, "module stopped");
        }
        Err(_) => {
            let err = ModuleError::StopTimeout {
                name: state.name.clone(),
                timeout_secs: STOP_TIMEOUT.as_secs(),
            };
            tracing::warn!(error = %err, "proceeding as stopped (best-effort join)");
        }
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
async fn wait_for_shutdown_signal() -> Result<&'static str, HostwatchError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Write the current process PID to a file.
///
/// Uses `create_new` to fail if another instance already holds the file,
/// and refuses non-regular files.
fn write_pid_file(path: &Path) -> Result<(), HostwatchError> {
    use std::fs::{self, OpenOptions};
    use std::io::{ErrorKind, Write};

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let pid = std::process::id();
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            let existing = fs::read_to_string(path).unwrap_or_else(|_| "unknown".to_owned());
            return Err(HostwatchError::Io(std::io::Error::new(
                ErrorKind::AlreadyExists,
                format!(
                    "PID file {} already exists with PID {}. Is another instance running?",
                    path.display(),
                    existing.trim()
                ),
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if !file.metadata()?.is_file() {
        let _ = fs::remove_file(path);
        return Err(HostwatchError::Io(std::io::Error::other(format!(
            "PID file {} is not a regular file",
            path.display()
        ))));
    }

    writeln!(file, "{pid}")?;
    tracing::info!(pid, path = %path.display(), "PID file written");
    Ok(())
}

/// Remove the PID file on daemon shutdown.
///
/// Logs a warning but does not fail if the file cannot be removed.
fn remove_pid_file(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!(path = %path.display(), error = %e, "failed to remove PID file");
    } else {
        tracing::info!(path = %path.display(), "PID file removed");
    }
}
