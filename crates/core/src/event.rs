//! 이벤트 타입 — 모듈 간 통신의 기본 단위
//!
//! 협력자(파일시스템 감시자, 캡처/디코드 라이브러리)가 생산한 이벤트는
//! `tokio::mpsc` 채널로 각 모듈 워커에 전달됩니다. 워커가 정지/재시작을
//! 반복해도 채널 수신측을 재사용할 수 있도록 [`SharedReceiver`]로
//! 감싸서 보관합니다.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tokio::sync::{Mutex, mpsc};

// --- 모듈명 상수 ---

/// 네트워크 모니터 모듈명
pub const MODULE_NETWORK: &str = "network_monitor";
/// 정적 분석 모듈명
pub const MODULE_STATIC: &str = "static_analysis";
/// 파일 모니터 모듈명
pub const MODULE_FILE: &str = "file_monitor";

/// 탐지 모듈 전체 목록 (시작/정지 순서)
pub const ALL_MODULES: [&str; 3] = [MODULE_NETWORK, MODULE_STATIC, MODULE_FILE];

/// 워커 재시작을 지원하는 공유 수신 채널
///
/// 워커는 실행 동안 lock을 잡고, 취소되면 놓습니다. 같은 모듈을
/// 다시 시작하면 새 워커가 동일한 수신측을 이어받습니다.
pub type SharedReceiver<T> = Arc<Mutex<mpsc::Receiver<T>>>;

/// `mpsc::Receiver`를 [`SharedReceiver`]로 감쌉니다.
pub fn shared_receiver<T>(rx: mpsc::Receiver<T>) -> SharedReceiver<T> {
    Arc::new(Mutex::new(rx))
}

/// 파일시스템 변경 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// 파일 생성
    Created,
    /// 파일 수정
    Modified,
    /// 파일 삭제 (터미널 상태 — 분석 대상 아님)
    Deleted,
}

impl ChangeKind {
    /// 집계 카테고리 키를 반환합니다.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }

    /// 설정 파일의 `alert_on` 키를 반환합니다.
    pub fn config_key(self) -> &'static str {
        match self {
            Self::Created => "file_creation",
            Self::Modified => "file_modification",
            Self::Deleted => "file_deletion",
        }
    }

    /// 설정 키에서 변경 종류를 파싱합니다.
    pub fn from_config_key(key: &str) -> Option<Self> {
        match key {
            "file_creation" => Some(Self::Created),
            "file_modification" => Some(Self::Modified),
            "file_deletion" => Some(Self::Deleted),
            _ => None,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 파일시스템 변경 이벤트
///
/// OS 수준 감시 협력자가 공급합니다. 제외 경로 필터링은
/// 이벤트를 소비하는 리액터의 책임입니다.
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    /// 변경 종류
    pub kind: ChangeKind,
    /// 절대 경로
    pub path: PathBuf,
    /// 관측 시각
    pub observed_at: SystemTime,
}

impl FileChangeEvent {
    /// 새 변경 이벤트를 생성합니다.
    pub fn new(kind: ChangeKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
            observed_at: SystemTime::now(),
        }
    }
}

impl fmt::Display for FileChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path.display())
    }
}

/// 정적 분석 작업
///
/// 파일 리액터가 분석 대상 파일을 발견하면 생성하여
/// 정적 분석 워커로 비동기 전달합니다.
#[derive(Debug, Clone)]
pub struct AnalysisTask {
    /// 분석할 파일 경로
    pub path: PathBuf,
    /// 요청 시각
    pub requested_at: SystemTime,
}

impl AnalysisTask {
    /// 새 분석 작업을 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            requested_at: SystemTime::now(),
        }
    }
}

impl fmt::Display for AnalysisTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "analyze {}", self.path.display())
    }
}
