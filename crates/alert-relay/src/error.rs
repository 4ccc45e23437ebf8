//! 알림 전달 에러 타입
//!
//! [`RelayError`]는 내구 로그와 전달 루프에서 발생하는 에러를 표현합니다.
//! `From<RelayError> for HostwatchError` 변환이 구현되어 있어 상위
//! 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use hostwatch_core::error::HostwatchError;

/// 알림 로그/전달 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// 로그 파일 열기 실패 — 기동을 중단시키는 유일한 치명 에러
    #[error("failed to open alert log at {path}: {reason}")]
    Open { path: String, reason: String },

    /// 재시도 후에도 append 실패
    #[error("failed to append alert after {attempts} attempts: {reason}")]
    Append { attempts: u32, reason: String },

    /// HTTP 클라이언트 구성 실패
    #[error("failed to build http client: {0}")]
    Client(String),

    /// 알림 직렬화 실패
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RelayError> for HostwatchError {
    fn from(err: RelayError) -> Self {
        HostwatchError::Relay(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_error_display() {
        let err = RelayError::Open {
            path: "/var/lib/hostwatch/alerts.jsonl".to_owned(),
            reason: "permission denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("alerts.jsonl"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn converts_to_hostwatch_error() {
        let err = RelayError::Append {
            attempts: 3,
            reason: "disk full".to_owned(),
        };
        let hostwatch_err: HostwatchError = err.into();
        assert!(matches!(hostwatch_err, HostwatchError::Relay(_)));
        assert!(hostwatch_err.to_string().contains("disk full"));
    }
}
