//! 프로토콜 검사기 — 디코딩된 패킷을 알려진 기법과 대조합니다.
//!
//! 각 검사기는 하나의 프로토콜만 이해하며, 패킷을 읽기 전용으로 받아
//! 후보 알림을 0개 또는 1개 반환합니다. 새 프로토콜은
//! [`InspectorRegistry`]에 구현체를 등록하는 것으로 추가합니다.
//!
//! # 격리 규칙
//! 단일 패킷 처리 중의 오류(필드 누락, 잘못된 값)는
//! [`InspectorRegistry::inspect_all`]이 warn 로그로 남기고 다음 검사기를
//! 계속 실행합니다. 검사기는 서로의 실패와 캡처 루프의 실패로부터
//! 격리됩니다.

pub mod dhcp;
pub mod dns;
pub mod ftp;
pub mod http;
pub mod icmp;
pub mod rdp;
pub mod smb;
pub mod smtp;
pub mod snmp;
pub mod ssh;
pub mod telnet;
pub mod tls;
pub mod tor;

pub use dhcp::DhcpInspector;
pub use dns::DnsInspector;
pub use ftp::FtpInspector;
pub use http::HttpInspector;
pub use icmp::IcmpInspector;
pub use rdp::RdpInspector;
pub use smb::SmbInspector;
pub use smtp::SmtpInspector;
pub use snmp::SnmpInspector;
pub use ssh::SshInspector;
pub use telnet::TelnetInspector;
pub use tls::TlsInspector;
pub use tor::TorInspector;

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

/// 단일 프로토콜을 검사하는 trait
///
/// 구현체는 상태가 없어야 하며(stateless), 패킷이 자신의 프로토콜을
/// 담고 있지 않으면 부수 효과 없이 `Ok(None)`을 반환합니다.
pub trait ProtocolInspector: Send + Sync {
    /// 검사기 이름 (로깅과 중복 등록 검사에 사용)
    fn name(&self) -> &str;

    /// 패킷을 검사하여 후보 알림을 반환합니다.
    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError>;
}

/// 프로토콜 검사기 레지스트리
///
/// 등록 순서를 보존하며, 모든 검사기는 같은 패킷을 독립적으로
/// 검사합니다. 검사기 간 실행 순서에 대한 보장은 없습니다.
pub struct InspectorRegistry {
    inspectors: Vec<Box<dyn ProtocolInspector>>,
}

impl InspectorRegistry {
    /// 빈 레지스트리를 생성합니다.
    pub fn new() -> Self {
        Self {
            inspectors: Vec::new(),
        }
    }

    /// 기본 검사기 13종을 등록한 레지스트리를 생성합니다.
    pub fn with_defaults() -> Self {
        // 기본 검사기의 이름은 서로 겹치지 않음
        Self {
            inspectors: vec![
                Box::new(DnsInspector),
                Box::new(HttpInspector),
                Box::new(FtpInspector),
                Box::new(IcmpInspector),
                Box::new(DhcpInspector),
                Box::new(RdpInspector),
                Box::new(SmbInspector),
                Box::new(SmtpInspector),
                Box::new(SnmpInspector),
                Box::new(SshInspector),
                Box::new(TelnetInspector),
                Box::new(TlsInspector),
                Box::new(TorInspector),
            ],
        }
    }

    /// 검사기를 등록합니다. 동일한 이름이 이미 있으면 에러를 반환합니다.
    pub fn register(
        &mut self,
        inspector: Box<dyn ProtocolInspector>,
    ) -> Result<(), InspectError> {
        let name = inspector.name();
        if self.inspectors.iter().any(|i| i.name() == name) {
            return Err(InspectError::MalformedValue {
                field: "inspector".to_owned(),
                reason: format!("inspector '{name}' already registered"),
            });
        }
        self.inspectors.push(inspector);
        Ok(())
    }

    /// 등록된 검사기 수를 반환합니다.
    pub fn count(&self) -> usize {
        self.inspectors.len()
    }

    /// 등록된 검사기 이름 목록을 반환합니다.
    pub fn names(&self) -> Vec<&str> {
        self.inspectors.iter().map(|i| i.name()).collect()
    }

    /// 모든 검사기를 패킷에 대해 실행하고 후보 알림을 모읍니다.
    ///
    /// 개별 검사기의 실패는 warn 로그로 남기고 다음 검사기를 계속
    /// 실행합니다. 패킷 하나의 오류가 나머지 처리를 중단시키지 않습니다.
    pub fn inspect_all(&self, packet: &DecodedPacket) -> Vec<Alert> {
        let mut candidates = Vec::new();
        for inspector in &self.inspectors {
            match inspector.inspect(packet) {
                Ok(Some(alert)) => candidates.push(alert),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(
                        inspector = inspector.name(),
                        error = %e,
                        packet = %packet,
                        "inspector failed on packet"
                    );
                }
            }
        }
        candidates
    }
}

impl Default for InspectorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
