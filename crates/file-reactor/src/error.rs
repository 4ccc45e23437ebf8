//! 파일 리액터 에러 타입

use hostwatch_core::error::HostwatchError;

/// 파일 리액터 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ReactorError {
    /// 감시자 초기화/등록 실패
    #[error("watcher error: {0}")]
    Watch(String),

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ReactorError> for HostwatchError {
    fn from(err: ReactorError) -> Self {
        HostwatchError::Reactor(err.to_string())
    }
}
