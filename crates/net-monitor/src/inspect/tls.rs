//! TLS 검사기 — SNI 없는 ClientHello와 의심 SNI 탐지
//!
//! 정상 브라우저/라이브러리는 거의 항상 SNI를 보냅니다. SNI가 없는
//! ClientHello는 하드코딩된 IP로 접속하는 C2 클라이언트의 흔한
//! 특징입니다. SNI가 있으면 DNS 검사기와 같은 의심 TLD 규칙을
//! 적용합니다.

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1573";
const TECHNIQUE: &str = "Encrypted Channel";

const SUSPICIOUS_TLDS: [&str; 4] = [".xyz", ".tk", ".top", ".gq"];

/// TLS 핸드셰이크 검사기
pub struct TlsInspector;

impl ProtocolInspector for TlsInspector {
    fn name(&self) -> &str {
        "tls"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !packet.has_layer("tls") {
            return Ok(None);
        }

        // 핸드셰이크 시작 레코드만 검사 (암호화된 본문은 볼 수 없음)
        if packet.field("tls", "handshake_type") != Some("client_hello") {
            return Ok(None);
        }

        match packet.field("tls", "sni") {
            None => {
                let alert = Alert::new(
                    TECHNIQUE_ID,
                    TECHNIQUE,
                    format!(
                        "TLS ClientHello without SNI from {} to {}:{}",
                        packet.src_ip, packet.dst_ip, packet.dst_port
                    ),
                    packet.src_ip,
                    packet.dst_ip,
                )
                .with_extra("sni", "absent")
                .with_extra("dst_port", packet.dst_port.to_string());
                Ok(Some(alert))
            }
            Some(sni) => {
                let sni_lower = sni.to_ascii_lowercase();
                let Some(tld) = SUSPICIOUS_TLDS
                    .iter()
                    .find(|tld| sni_lower.ends_with(*tld))
                else {
                    return Ok(None);
                };

                let alert = Alert::new(
                    TECHNIQUE_ID,
                    TECHNIQUE,
                    format!("TLS handshake with suspicious SNI: {sni}"),
                    packet.src_ip,
                    packet.dst_ip,
                )
                .with_extra("sni", sni)
                .with_extra("tld", *tld);
                Ok(Some(alert))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_hello(sni: Option<&str>) -> DecodedPacket {
        let mut packet =
            DecodedPacket::new("192.168.0.21".parse().unwrap(), "203.0.113.60".parse().unwrap())
                .with_ports(49888, 443)
                .with_protocol(6)
                .with_field("tls", "handshake_type", "client_hello");
        if let Some(sni) = sni {
            packet = packet.with_field("tls", "sni", sni);
        }
        packet
    }

    #[test]
    fn flags_client_hello_without_sni() {
        let alert = TlsInspector.inspect(&client_hello(None)).unwrap().unwrap();
        assert_eq!(alert.technique_id, "T1573");
        assert_eq!(alert.extra.get("sni").map(String::as_str), Some("absent"));
    }

    #[test]
    fn flags_suspicious_sni_tld() {
        let alert = TlsInspector
            .inspect(&client_hello(Some("beacon.c2host.top")))
            .unwrap()
            .unwrap();
        assert_eq!(alert.extra.get("tld").map(String::as_str), Some(".top"));
    }

    #[test]
    fn ignores_benign_sni() {
        assert!(
            TlsInspector
                .inspect(&client_hello(Some("www.example.com")))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn ignores_non_handshake_records() {
        let packet =
            DecodedPacket::new("192.168.0.21".parse().unwrap(), "203.0.113.60".parse().unwrap())
                .with_field("tls", "record_type", "application_data");
        assert!(TlsInspector.inspect(&packet).unwrap().is_none());
    }
}
