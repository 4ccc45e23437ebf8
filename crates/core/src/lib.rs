#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod event;
pub mod pipeline;
pub mod store;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, GateError, HostwatchError, InspectError, ModuleError};

// 설정
pub use config::HostwatchConfig;

// 이벤트
pub use event::{AnalysisTask, ChangeKind, FileChangeEvent, SharedReceiver, shared_receiver};

// 확장 trait
pub use pipeline::{AlertSink, FalsePositiveGate, StaticAnalyzer};

// 집계 저장소
pub use store::{
    AggregationStore, AlertRecord, FileMonitorSnapshot, FileMonitorStats, HistorySample,
    NetworkSnapshot, NetworkStats, StaticAnalysisSnapshot, StaticAnalysisStats,
};

// 도메인 타입
pub use types::{Alert, DecodedPacket, Disposition, FileVerdict};
