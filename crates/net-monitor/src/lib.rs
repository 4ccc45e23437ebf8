#![doc = include_str!("../README.md")]
//!
//! # 아키텍처
//!
//! ```text
//! capture/decode -> mpsc -> NetworkMonitor -> InspectorRegistry -> FalsePositiveGate
//!                                                |                      |
//!                                          candidate Alert        commit: AlertSink(내구 로그)
//!                                                                        + 알림 큐 + 집계 저장소
//! ```

pub mod gate;
pub mod inspect;
pub mod monitor;

// --- 주요 타입 re-export ---

pub use gate::AllowListGate;
pub use inspect::{InspectorRegistry, ProtocolInspector};
pub use monitor::{NetworkMonitor, NetworkMonitorBuilder};
