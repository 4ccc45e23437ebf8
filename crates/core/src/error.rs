//! 에러 타입 — 도메인별 에러 정의

/// Hostwatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum HostwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 검사기 에러
    #[error("inspect error: {0}")]
    Inspect(#[from] InspectError),

    /// 오탐 게이트 에러
    #[error("gate error: {0}")]
    Gate(#[from] GateError),

    /// 모듈 생명주기 에러
    #[error("module error: {0}")]
    Module(#[from] ModuleError),

    /// 알림 로그/전달 에러
    #[error("relay error: {0}")]
    Relay(String),

    /// 파일 리액터 에러
    #[error("reactor error: {0}")]
    Reactor(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 검사기 에러
///
/// 단일 패킷 처리 중의 오류입니다. 호출자가 로그로 남기고
/// 다음 패킷/검사기 처리를 계속합니다.
#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    /// 계층은 있으나 필수 필드가 없음
    #[error("missing field '{field}' in layer '{layer}'")]
    MissingField { layer: String, field: String },

    /// 필드 값이 형식에 맞지 않음
    #[error("malformed value for '{field}': {reason}")]
    MalformedValue { field: String, reason: String },
}

/// 오탐 게이트 에러
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// 정책 평가 실패
    #[error("policy evaluation failed: {0}")]
    Policy(String),
}

/// 모듈 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    /// 알 수 없는 모듈명
    #[error("unknown module: {name}")]
    Unknown { name: String },

    /// 정지 제한시간 초과
    #[error("module '{name}' did not stop within {timeout_secs}s")]
    StopTimeout { name: String, timeout_secs: u64 },
}
