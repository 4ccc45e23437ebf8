//! 파일시스템 감시 어댑터 — notify 이벤트를 리액터 채널로 변환
//!
//! OS 수준 변경 통지는 외부 협력자의 영역입니다. 이 어댑터는 `notify`의
//! 콜백을 [`FileChangeEvent`]로 변환해 채널로 밀어넣는 일만 합니다.
//! 채널이 가득 차면 이벤트를 버리고 경고를 남깁니다 — 감시자 스레드를
//! 막지 않습니다.

use std::path::PathBuf;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use hostwatch_core::event::{ChangeKind, FileChangeEvent};

use crate::error::ReactorError;

/// notify 기반 파일시스템 감시자
///
/// 값이 drop되면 감시도 중단됩니다.
pub struct FsWatcher {
    // 감시 수명 유지용
    _watcher: RecommendedWatcher,
    watched: usize,
}

impl FsWatcher {
    /// 감시를 시작하고 변경 이벤트를 `tx`로 전달합니다.
    ///
    /// 존재하지 않는 경로는 경고만 남기고 건너뜁니다. 감시에 성공한
    /// 경로가 하나도 없어도 에러가 아닙니다 — 감시할 것이 없을 뿐입니다.
    pub fn spawn(
        watch_paths: &[PathBuf],
        tx: mpsc::Sender<FileChangeEvent>,
    ) -> Result<Self, ReactorError> {
        let mut watcher =
            notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
                match result {
                    Ok(event) => {
                        let Some(kind) = map_event_kind(&event.kind) else {
                            return;
                        };
                        for path in event.paths {
                            if let Err(e) = tx.try_send(FileChangeEvent::new(kind, path)) {
                                tracing::warn!(error = %e, "file event channel full, event dropped");
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "filesystem watcher error");
                    }
                }
            })
            .map_err(|e| ReactorError::Watch(e.to_string()))?;

        let mut watched = 0;
        for path in watch_paths {
            if !path.exists() {
                tracing::warn!(path = %path.display(), "watch path does not exist, skipping");
                continue;
            }
            match watcher.watch(path, RecursiveMode::Recursive) {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "watching path");
                    watched += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to watch path");
                }
            }
        }

        Ok(Self {
            _watcher: watcher,
            watched,
        })
    }

    /// 감시에 성공한 경로 수를 반환합니다.
    pub fn watched_count(&self) -> usize {
        self.watched
    }
}

/// notify 이벤트 종류를 리액터의 변경 종류로 변환합니다.
///
/// 접근(access) 등 관심 없는 이벤트는 `None`입니다.
fn map_event_kind(kind: &notify::EventKind) -> Option<ChangeKind> {
    match kind {
        notify::EventKind::Create(_) => Some(ChangeKind::Created),
        notify::EventKind::Modify(_) => Some(ChangeKind::Modified),
        notify::EventKind::Remove(_) => Some(ChangeKind::Deleted),
        _ => None,
    }
}
