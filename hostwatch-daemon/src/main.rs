use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

use hostwatch_core::config::HostwatchConfig;
use hostwatch_core::store::AggregationStore;
use hostwatch_daemon::cli::DaemonCli;
use hostwatch_daemon::controller::{Controller, ControllerPorts};
use hostwatch_daemon::logging;
use hostwatch_daemon::workers::FileTypeAnalyzer;
use hostwatch_file_reactor::FsWatcher;
use hostwatch_net_monitor::AllowListGate;

/// Capacity of the decoded-packet channel from the capture collaborator.
const PACKET_CHANNEL_CAPACITY: usize = 1024;

/// Capacity of the filesystem-event channel from the watch collaborator.
const FS_EVENT_CHANNEL_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = DaemonCli::parse();

    let mut config = HostwatchConfig::load_or_default(&cli.config).await;

    // CLI overrides take precedence over file and environment
    if let Some(level) = cli.log_level {
        config.general.log_level = level;
    }
    if let Some(format) = cli.log_format {
        config.general.log_format = format;
    }
    if let Some(pid_file) = cli.pid_file {
        config.general.pid_file = pid_file;
    }

    if cli.validate {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("configuration invalid: {}", e))?;
        println!("configuration OK: {}", cli.config.display());
        return Ok(());
    }

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("configuration invalid: {}", e))?;

    logging::init_tracing(&config.general)?;
    tracing::info!(config = %cli.config.display(), "hostwatch-daemon starting");

    // Channel fed by the capture/decode collaborator. The sender stays
    // alive for the daemon's lifetime; the capture integration pushes
    // decoded packets into it.
    let (packet_tx, packet_rx) = mpsc::channel(PACKET_CHANNEL_CAPACITY);
    let _capture_port = packet_tx;

    // Filesystem watcher feeding the file reactor.
    let (fs_event_tx, fs_event_rx) = mpsc::channel(FS_EVENT_CHANNEL_CAPACITY);
    let _fs_watcher = if config.file_monitor.enabled {
        let watch_paths: Vec<std::path::PathBuf> = config
            .file_monitor
            .watch_paths
            .iter()
            .map(std::path::PathBuf::from)
            .collect();
        let watcher = FsWatcher::spawn(&watch_paths, fs_event_tx)
            .map_err(|e| anyhow::anyhow!("failed to start filesystem watcher: {}", e))?;
        tracing::info!(watched = watcher.watched_count(), "filesystem watcher active");
        Some(watcher)
    } else {
        None
    };

    let store = Arc::new(AggregationStore::new());
    let gate = Arc::new(AllowListGate::new(
        config.network.benign_domains.clone(),
        config.network.benign_hosts.clone(),
    ));

    let ports = ControllerPorts {
        packet_rx,
        fs_event_rx,
        gate,
        analyzer: Arc::new(FileTypeAnalyzer),
    };

    let mut controller = Controller::new(config, store, ports)
        .map_err(|e| anyhow::anyhow!("failed to build controller: {}", e))?;

    controller
        .run()
        .await
        .map_err(|e| anyhow::anyhow!("daemon failed: {}", e))?;

    tracing::info!("hostwatch-daemon shut down");
    Ok(())
}
