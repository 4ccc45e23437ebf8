//! DNS 검사기 — 의심 TLD 질의 탐지
//!
//! 일회성 캠페인에 자주 쓰이는 저가/무료 TLD로의 질의를 후보 알림으로
//! 올립니다. 질의명이 없는 DNS 레코드는 필드 누락 에러로 처리되어
//! 호출자가 로그로 남깁니다.

use hostwatch_core::error::InspectError;
use hostwatch_core::types::{Alert, DecodedPacket};

use super::ProtocolInspector;

const TECHNIQUE_ID: &str = "T1071.004";
const TECHNIQUE: &str = "Application Layer Protocol: DNS";

/// 의심 TLD 목록
const SUSPICIOUS_TLDS: [&str; 4] = [".xyz", ".tk", ".top", ".gq"];

/// DNS 질의 검사기
pub struct DnsInspector;

impl ProtocolInspector for DnsInspector {
    fn name(&self) -> &str {
        "dns"
    }

    fn inspect(&self, packet: &DecodedPacket) -> Result<Option<Alert>, InspectError> {
        if !packet.has_layer("dns") {
            return Ok(None);
        }

        let query = packet
            .field("dns", "qry_name")
            .ok_or_else(|| InspectError::MissingField {
                layer: "dns".to_owned(),
                field: "qry_name".to_owned(),
            })?;

        let query_lower = query.to_ascii_lowercase();
        let Some(tld) = SUSPICIOUS_TLDS
            .iter()
            .find(|tld| query_lower.ends_with(*tld))
        else {
            return Ok(None);
        };

        let alert = Alert::new(
            TECHNIQUE_ID,
            TECHNIQUE,
            format!("Suspicious DNS query to uncommon TLD: {query}"),
            packet.src_ip,
            packet.dst_ip,
        )
        .with_extra("query", query)
        .with_extra("tld", *tld);

        Ok(Some(alert))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dns_packet(query: &str) -> DecodedPacket {
        DecodedPacket::new("192.168.0.10".parse().unwrap(), "1.1.1.1".parse().unwrap())
            .with_ports(53412, 53)
            .with_protocol(17)
            .with_field("dns", "qry_name", query)
    }

    #[test]
    fn flags_suspicious_tld() {
        let alert = DnsInspector
            .inspect(&dns_packet("update-server.xyz"))
            .unwrap()
            .unwrap();
        assert_eq!(alert.technique_id, "T1071.004");
        assert_eq!(
            alert.extra.get("query").map(String::as_str),
            Some("update-server.xyz")
        );
        assert_eq!(alert.extra.get("tld").map(String::as_str), Some(".xyz"));
    }

    #[test]
    fn tld_match_is_case_insensitive() {
        let alert = DnsInspector.inspect(&dns_packet("EVIL.TK")).unwrap();
        assert!(alert.is_some());
    }

    #[test]
    fn ignores_common_tlds() {
        assert!(
            DnsInspector
                .inspect(&dns_packet("example.com"))
                .unwrap()
                .is_none()
        );
        // ".tk"가 도메인 중간에 있으면 매칭하지 않음
        assert!(
            DnsInspector
                .inspect(&dns_packet("tk.example.org"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn missing_query_name_is_an_error() {
        let packet = DecodedPacket::new("10.0.0.1".parse().unwrap(), "1.1.1.1".parse().unwrap())
            .with_layer("dns");
        let err = DnsInspector.inspect(&packet).unwrap_err();
        assert!(err.to_string().contains("qry_name"));
    }

    #[test]
    fn ignores_non_dns_packets() {
        let packet = DecodedPacket::new("10.0.0.1".parse().unwrap(), "1.1.1.1".parse().unwrap())
            .with_layer("udp");
        assert!(DnsInspector.inspect(&packet).unwrap().is_none());
    }
}
