//! Always-on worker loops and the built-in static-analysis collaborator.
//!
//! The alert-processing loop drains committed alerts from the in-memory
//! queue into the aggregation store. The static-analysis loop consumes
//! dispatched analysis tasks and folds the collaborator's verdicts into
//! the static-analysis snapshot.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use hostwatch_core::error::HostwatchError;
use hostwatch_core::event::{AnalysisTask, SharedReceiver};
use hostwatch_core::pipeline::StaticAnalyzer;
use hostwatch_core::store::{AggregationStore, HistorySample, StaticAnalysisStats};
use hostwatch_core::types::{Alert, Disposition, FileVerdict};

/// Drain the alert queue into the aggregation store until shutdown.
///
/// Every committed alert ends up in the alert history exactly once.
/// The loop blocks only on the cancellable channel receive.
pub async fn run_alert_processor(
    alert_rx: SharedReceiver<Alert>,
    store: Arc<AggregationStore>,
    cancel: CancellationToken,
) {
    tracing::info!("alert processor started");
    let mut alert_rx = alert_rx.lock().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("alert processor cancelled");
                break;
            }
            maybe_alert = alert_rx.recv() => {
                match maybe_alert {
                    Some(alert) => {
                        tracing::warn!(
                            technique_id = %alert.technique_id,
                            "ALERT: {alert}"
                        );
                        store.add_alert(alert.to_string());
                    }
                    None => {
                        tracing::debug!("alert queue closed, exiting alert processor");
                        break;
                    }
                }
            }
        }
    }

    tracing::info!("alert processor stopped");
}

/// Consume analysis tasks, invoke the static-analysis collaborator, and
/// fold verdicts into the static-analysis snapshot.
///
/// A failed analysis is logged and skipped; it never stops the loop.
pub async fn run_static_analysis(
    task_rx: SharedReceiver<AnalysisTask>,
    analyzer: Arc<dyn StaticAnalyzer>,
    store: Arc<AggregationStore>,
    cancel: CancellationToken,
) {
    tracing::info!(analyzer = analyzer.name(), "static analysis worker started");
    let mut task_rx = task_rx.lock().await;

    let mut files_analyzed: u64 = 0;
    let mut malicious_files: u64 = 0;
    let mut suspicious_files: u64 = 0;
    let mut file_types: HashMap<String, u64> = HashMap::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!("static analysis worker cancelled");
                break;
            }
            maybe_task = task_rx.recv() => {
                let Some(task) = maybe_task else {
                    tracing::debug!("analysis queue closed, exiting static analysis worker");
                    break;
                };

                match analyzer.analyze(&task.path) {
                    Ok(verdict) => {
                        files_analyzed += 1;
                        *file_types.entry(verdict.file_type.clone()).or_insert(0) += 1;

                        let detection_sample = match verdict.disposition {
                            Disposition::Malicious => {
                                malicious_files += 1;
                                tracing::warn!(verdict = %verdict, "malicious file detected");
                                Some(HistorySample::now(1, Some(verdict.to_string())))
                            }
                            Disposition::Suspicious => {
                                suspicious_files += 1;
                                tracing::warn!(verdict = %verdict, "suspicious file detected");
                                Some(HistorySample::now(1, Some(verdict.to_string())))
                            }
                            Disposition::Clean => {
                                tracing::debug!(verdict = %verdict, "file analyzed");
                                None
                            }
                        };

                        store.update_static(StaticAnalysisStats {
                            files_analyzed,
                            malicious_files,
                            suspicious_files,
                            file_types: file_types.clone(),
                            detection_sample,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %task.path.display(),
                            error = %e,
                            "static analysis failed, skipping file"
                        );
                    }
                }
            }
        }
    }

    tracing::info!(
        files = files_analyzed,
        malicious = malicious_files,
        "static analysis worker stopped"
    );
}

/// Built-in file-type classifier.
///
/// Labels files by extension and always returns a clean disposition;
/// real scoring belongs to an external collaborator plugged in through
/// the [`StaticAnalyzer`] trait.
pub struct FileTypeAnalyzer;

impl StaticAnalyzer for FileTypeAnalyzer {
    fn name(&self) -> &str {
        "file-type"
    }

    fn analyze(&self, path: &Path) -> Result<FileVerdict, HostwatchError> {
        let file_type = match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("exe") | Some("com") | Some("scr") => "executable",
            Some("dll") | Some("so") => "library",
            Some("bat") | Some("ps1") | Some("vbs") | Some("sh") => "script",
            Some("pdf") | Some("doc") | Some("docx") | Some("xls") | Some("xlsx") => "document",
            _ => "other",
        };

        Ok(FileVerdict {
            path: path.to_path_buf(),
            file_type: file_type.to_owned(),
            disposition: Disposition::Clean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use hostwatch_core::event::shared_receiver;

    struct ScriptedAnalyzer;

    impl StaticAnalyzer for ScriptedAnalyzer {
        fn name(&self) -> &str {
            "scripted"
        }

        fn analyze(&self, path: &Path) -> Result<FileVerdict, HostwatchError> {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            let disposition = if name.contains("malware") {
                Disposition::Malicious
            } else if name.contains("odd") {
                Disposition::Suspicious
            } else {
                Disposition::Clean
            };
            Ok(FileVerdict {
                path: path.to_path_buf(),
                file_type: "executable".to_owned(),
                disposition,
            })
        }
    }

    #[test]
    fn file_type_analyzer_classifies_by_extension() {
        let analyzer = FileTypeAnalyzer;
        let verdict = analyzer.analyze(Path::new("/tmp/tool.exe")).unwrap();
        assert_eq!(verdict.file_type, "executable");
        assert_eq!(verdict.disposition, Disposition::Clean);

        assert_eq!(
            analyzer.analyze(Path::new("/tmp/lib.so")).unwrap().file_type,
            "library"
        );
        assert_eq!(
            analyzer.analyze(Path::new("/tmp/run.PS1")).unwrap().file_type,
            "script"
        );
        assert_eq!(
            analyzer.analyze(Path::new("/tmp/readme")).unwrap().file_type,
            "other"
        );
    }

    #[tokio::test]
    async fn alert_processor_records_alerts_into_store() {
        let (alert_tx, alert_rx) = mpsc::channel(8);
        let store = Arc::new(AggregationStore::new());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_alert_processor(
            shared_receiver(alert_rx),
            Arc::clone(&store),
            cancel.clone(),
        ));

        let alert = Alert::new(
            "T1040",
            "ICMP Tunneling or Discovery",
            "test alert",
            "10.0.0.5".parse().unwrap(),
            "8.8.8.8".parse().unwrap(),
        );
        alert_tx.send(alert).await.unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;

        let alerts = store.alerts();
        assert_eq!(alerts.len(), 1);
        assert!(alerts[0].message.contains("T1040"));
    }

    #[tokio::test]
    async fn static_analysis_worker_folds_verdicts() {
        let (task_tx, task_rx) = mpsc::channel(8);
        let store = Arc::new(AggregationStore::new());
        let cancel = CancellationToken::new();

        let handle = tokio::spawn(run_static_analysis(
            shared_receiver(task_rx),
            Arc::new(ScriptedAnalyzer),
            Arc::clone(&store),
            cancel.clone(),
        ));

        for name in ["malware.exe", "odd.exe", "normal.exe"] {
            task_tx
                .send(AnalysisTask::new(PathBuf::from("/tmp").join(name)))
                .await
                .unwrap();
        }

        tokio::time::sleep(Duration::from_millis(80)).await;
        cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;

        let snapshot = store.static_analysis();
        assert_eq!(snapshot.files_analyzed, 3);
        assert_eq!(snapshot.malicious_files, 1);
        assert_eq!(snapshot.suspicious_files, 1);
        assert_eq!(snapshot.file_types.get("executable"), Some(&3));
        // Clean verdicts leave no detection-history entry
        assert_eq!(snapshot.detection_history.len(), 2);
    }
}
