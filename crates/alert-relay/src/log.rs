//! 내구 알림 로그 — append-only JSON Lines 파일
//!
//! 커밋된 알림 하나가 한 라인입니다. 라인은 절대 다시 쓰이지 않으며,
//! 이 파일이 "이 알림이 발행되었는가"의 단일 진실 공급원입니다.
//! 프로세스 재시작 후에도 유지됩니다.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use hostwatch_core::error::HostwatchError;
use hostwatch_core::pipeline::AlertSink;
use hostwatch_core::types::Alert;

use crate::error::RelayError;

/// append 재시도 횟수
const APPEND_ATTEMPTS: u32 = 3;

/// 내구 알림 로그
///
/// 여러 검사기가 하나의 [`AlertSink`]를 통해 호출하므로, 내부 mutex가
/// 프로세스 내 append를 직렬화합니다. 한 알림은 개행으로 끝나는 단일
/// write로 기록됩니다.
#[derive(Debug)]
pub struct AlertLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl AlertLog {
    /// 알림 로그를 엽니다. 파일이 없으면 생성하고, 있으면 끝에 이어 씁니다.
    ///
    /// 로그 저장 위치를 확보하지 못하면 에러를 반환합니다 — 호출자(데몬)는
    /// 이를 기동 실패로 처리해야 합니다.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RelayError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| RelayError::Open {
                path: path.display().to_string(),
                reason: format!("cannot create parent directory: {e}"),
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| RelayError::Open {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        tracing::info!(path = %path.display(), "alert log opened");
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// 알림 한 건을 로그에 추가합니다.
    ///
    /// 개행 구분 JSON 한 라인을 쓰고 flush합니다. 일시적 쓰기 오류는
    /// 제한 횟수까지 재시도하며, 최종 실패 시 에러를 반환합니다 — 성공
    /// 전까지 호출자는 알림을 "전송됨"으로 간주하면 안 됩니다.
    pub fn append(&self, alert: &Alert) -> Result<(), RelayError> {
        let line = serde_json::to_string(alert)?;

        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        let mut last_error = String::new();
        for attempt in 1..=APPEND_ATTEMPTS {
            match writeln!(file, "{line}").and_then(|()| file.flush()) {
                Ok(()) => {
                    tracing::debug!(
                        technique_id = %alert.technique_id,
                        attempt,
                        "alert appended to durable log"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        error = %e,
                        "alert log append failed, retrying"
                    );
                    last_error = e.to_string();
                }
            }
        }

        Err(RelayError::Append {
            attempts: APPEND_ATTEMPTS,
            reason: last_error,
        })
    }

    /// 로그 파일 경로를 반환합니다.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AlertSink for AlertLog {
    fn submit(&self, alert: &Alert) -> Result<(), HostwatchError> {
        self.append(alert).map_err(Into::into)
    }
}
