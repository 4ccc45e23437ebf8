//! 확장 지점 trait — 교체 가능한 협력자 계약 정의
//!
//! 오탐 정책과 정적 분석 채점은 외부 협력자이며, 이 trait들로만
//! 코어와 연결됩니다. 구현체는 생성 시점에 주입합니다.

use std::path::Path;

use crate::error::{GateError, HostwatchError};
use crate::types::{Alert, FileVerdict};

/// 오탐 억제 정책을 구현하는 trait
///
/// 후보 알림이 커밋되기 전에 동기적으로 호출됩니다.
/// 같은 알림과 정책 상태에 대해 결정적이어야 하고, 부수 효과가 없어야 하며,
/// 패킷 처리 경로를 의미 있게 지연시키지 않을 만큼 빨라야 합니다.
/// 내부 오류 시의 처리(억제/통과)는 호출자의 설정이 결정합니다.
pub trait FalsePositiveGate: Send + Sync {
    /// 정책 이름
    fn name(&self) -> &str;

    /// 후보 알림을 억제할지 결정합니다. `true`면 알림을 버립니다.
    fn suppress(&self, candidate: &Alert) -> Result<bool, GateError>;
}

/// 정적 분석 협력자 trait
///
/// 파일 경로를 받아 사전 채점된 판정을 반환합니다.
/// 채점 내부(PE 파싱, 시그니처 매칭 등)는 이 코어의 범위 밖입니다.
pub trait StaticAnalyzer: Send + Sync {
    /// 분석기 이름
    fn name(&self) -> &str;

    /// 파일을 분석하여 판정을 반환합니다.
    fn analyze(&self, path: &Path) -> Result<FileVerdict, HostwatchError>;
}

/// 커밋된 알림의 내구 기록 계약
///
/// 게이트를 통과한 알림은 이 trait을 통해 기록됩니다. 구현체는
/// 프로세스 내 단일 기록자로서 내부적으로 추가 쓰기를 직렬화해야 하며,
/// 반환이 성공이면 알림이 내구적으로 기록된 것입니다.
pub trait AlertSink: Send + Sync {
    /// 알림을 내구 기록합니다. 성공 전까지는 "전송됨"으로 간주하지 않습니다.
    fn submit(&self, alert: &Alert) -> Result<(), HostwatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::IpAddr;
    use std::sync::Mutex;

    struct DenyAllGate;

    impl FalsePositiveGate for DenyAllGate {
        fn name(&self) -> &str {
            "deny-all"
        }

        fn suppress(&self, _candidate: &Alert) -> Result<bool, GateError> {
            Ok(true)
        }
    }

    struct VecSink {
        alerts: Mutex<Vec<Alert>>,
    }

    impl AlertSink for VecSink {
        fn submit(&self, alert: &Alert) -> Result<(), HostwatchError> {
            self.alerts
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(alert.clone());
            Ok(())
        }
    }

    fn sample_alert() -> Alert {
        let src: IpAddr = "10.0.0.5".parse().unwrap();
        let dst: IpAddr = "8.8.8.8".parse().unwrap();
        Alert::new("T1040", "ICMP Tunneling or Discovery", "test", src, dst)
    }

    #[test]
    fn gate_trait_is_object_safe() {
        let gate: Box<dyn FalsePositiveGate> = Box::new(DenyAllGate);
        assert_eq!(gate.name(), "deny-all");
        assert!(gate.suppress(&sample_alert()).unwrap());
    }

    #[test]
    fn sink_trait_is_object_safe() {
        let sink: Box<dyn AlertSink> = Box::new(VecSink {
            alerts: Mutex::new(Vec::new()),
        });
        sink.submit(&sample_alert()).unwrap();
    }
}
