//! 파일 변경 리액터 — 변경 이벤트 집계와 정적 분석 디스패치
//!
//! [`FileReactor`]는 감시 협력자가 공급하는 [`FileChangeEvent`] 채널을
//! 소비합니다. 제외 경로 아래의 이벤트는 버리고, 수락한 이벤트마다
//! 변경 종류 카운터와 전체 파일 수를 갱신해 집계 저장소로 밀어넣습니다.
//! 생성/수정된 파일의 확장자가 분석 가능 집합에 들면 정적 분석 작업을
//! 비동기로 디스패치합니다 — 이벤트 전달 경로는 분석을 기다리지 않습니다.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use hostwatch_core::config::FileMonitorConfig;
use hostwatch_core::error::{ConfigError, HostwatchError};
use hostwatch_core::event::{AnalysisTask, ChangeKind, FileChangeEvent, SharedReceiver};
use hostwatch_core::store::{AggregationStore, FileMonitorStats, HistorySample};

/// 정적 분석 대상 확장자 (실행 파일, 라이브러리, 스크립트)
pub const ANALYZABLE_EXTENSIONS: [&str; 5] = ["exe", "dll", "bat", "ps1", "vbs"];

/// 파일 변경 리액터 워커
#[derive(Debug)]
pub struct FileReactor {
    watch_paths: Vec<PathBuf>,
    excluded_paths: Vec<PathBuf>,
    alert_on: HashSet<ChangeKind>,
    store: Arc<AggregationStore>,
    analysis_tx: mpsc::Sender<AnalysisTask>,
    event_rx: SharedReceiver<FileChangeEvent>,

    // 실행 중 누적 통계
    change_types: HashMap<String, u64>,
    suspicious_changes: u64,
}

impl FileReactor {
    /// 워커 루프를 실행합니다. 취소 토큰이 신호될 때까지 변경 이벤트를
    /// 처리합니다.
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!(
            watch_paths = self.watch_paths.len(),
            excluded_paths = self.excluded_paths.len(),
            "file reactor started"
        );

        let event_rx = Arc::clone(&self.event_rx);
        let mut event_rx = event_rx.lock().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!("file reactor cancelled");
                    break;
                }
                maybe_event = event_rx.recv() => {
                    match maybe_event {
                        Some(event) => self.handle_event(&event),
                        None => {
                            tracing::warn!("file event source closed, stopping file reactor");
                            break;
                        }
                    }
                }
            }
        }

        tracing::info!("file reactor stopped");
    }

    /// 단일 변경 이벤트를 처리합니다.
    fn handle_event(&mut self, event: &FileChangeEvent) {
        if !self.should_monitor(&event.path) {
            tracing::debug!(path = %event.path.display(), "event under excluded path, ignored");
            return;
        }
        if !self.alert_on.contains(&event.kind) {
            tracing::debug!(
                kind = %event.kind,
                path = %event.path.display(),
                "event kind not in alert_on, ignored"
            );
            return;
        }

        tracing::warn!(kind = %event.kind, path = %event.path.display(), "file change observed");

        *self
            .change_types
            .entry(event.kind.as_str().to_owned())
            .or_insert(0) += 1;

        // 삭제는 터미널 상태 — 분석 대상이 아님
        if event.kind != ChangeKind::Deleted && self.maybe_dispatch(&event.path) {
            self.suspicious_changes += 1;
        }

        let stats = FileMonitorStats {
            monitored_dirs: self.watch_paths.len() as u64,
            total_files: count_files(&self.watch_paths),
            suspicious_changes: self.suspicious_changes,
            change_types: self.change_types.clone(),
            change_sample: Some(HistorySample::now(
                1,
                Some(format!("{} {}", event.kind, event.path.display())),
            )),
        };
        self.store.update_file(stats);
    }

    /// 경로가 제외 접두사 아래에 있지 않은지 확인합니다.
    fn should_monitor(&self, path: &Path) -> bool {
        !self
            .excluded_paths
            .iter()
            .any(|excluded| path.starts_with(excluded))
    }

    /// 분석 가능한 파일이면 정적 분석 작업을 디스패치합니다.
    ///
    /// 디스패치 시점에 파일이 이미 사라졌으면 건너뜁니다 (에러 아님).
    /// 디스패치했으면 `true`를 반환합니다.
    fn maybe_dispatch(&self, path: &Path) -> bool {
        if !is_analyzable(path) {
            tracing::debug!(path = %path.display(), "extension not analyzable, skipping analysis");
            return false;
        }
        if !path.exists() {
            tracing::warn!(path = %path.display(), "file no longer exists, skipping analysis");
            return false;
        }

        match self.analysis_tx.try_send(AnalysisTask::new(path)) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "static analysis dispatched");
                true
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "analysis queue full, task dropped");
                false
            }
        }
    }
}

/// 확장자가 분석 가능 집합에 드는지 확인합니다.
fn is_analyzable(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            ANALYZABLE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// 감시 경로 아래의 전체 파일 수를 셉니다.
///
/// 읽을 수 없는 디렉토리는 건너뜁니다 — 카운트는 best-effort입니다.
fn count_files(paths: &[PathBuf]) -> u64 {
    let mut total = 0;
    for path in paths {
        total += count_files_in(path);
    }
    total
}

fn count_files_in(path: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(path) else {
        return 0;
    };
    let mut count = 0;
    for entry in entries.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            count += count_files_in(&entry.path());
        } else if file_type.is_file() {
            count += 1;
        }
    }
    count
}

/// 파일 리액터 빌더
pub struct FileReactorBuilder {
    config: FileMonitorConfig,
    store: Option<Arc<AggregationStore>>,
    analysis_tx: Option<mpsc::Sender<AnalysisTask>>,
    event_rx: Option<SharedReceiver<FileChangeEvent>>,
}

impl FileReactorBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: FileMonitorConfig::default(),
            store: None,
            analysis_tx: None,
            event_rx: None,
        }
    }

    /// 파일 모니터 설정을 지정합니다.
    pub fn config(mut self, config: FileMonitorConfig) -> Self {
        self.config = config;
        self
    }

    /// 집계 저장소를 지정합니다 (필수).
    pub fn store(mut self, store: Arc<AggregationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// 분석 작업 송신측을 지정합니다 (필수).
    pub fn analysis_sender(mut self, tx: mpsc::Sender<AnalysisTask>) -> Self {
        self.analysis_tx = Some(tx);
        self
    }

    /// 변경 이벤트 수신 채널을 지정합니다 (필수).
    pub fn event_receiver(mut self, rx: SharedReceiver<FileChangeEvent>) -> Self {
        self.event_rx = Some(rx);
        self
    }

    /// 리액터를 빌드합니다.
    pub fn build(self) -> Result<FileReactor, HostwatchError> {
        let mut alert_on = HashSet::new();
        for key in &self.config.alert_on {
            match ChangeKind::from_config_key(key) {
                Some(kind) => {
                    alert_on.insert(kind);
                }
                None => {
                    return Err(ConfigError::InvalidValue {
                        field: "file_monitor.alert_on".to_owned(),
                        reason: format!("unknown event type '{key}'"),
                    }
                    .into());
                }
            }
        }

        Ok(FileReactor {
            watch_paths: self.config.watch_paths.iter().map(PathBuf::from).collect(),
            excluded_paths: self
                .config
                .excluded_paths
                .iter()
                .map(PathBuf::from)
                .collect(),
            alert_on,
            store: self.store.ok_or_else(|| missing("store"))?,
            analysis_tx: self.analysis_tx.ok_or_else(|| missing("analysis_sender"))?,
            event_rx: self.event_rx.ok_or_else(|| missing("event_receiver"))?,
            change_types: HashMap::new(),
            suspicious_changes: 0,
        })
    }
}

impl Default for FileReactorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn missing(field: &str) -> HostwatchError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: "required component not provided".to_owned(),
    }
    .into()
}
